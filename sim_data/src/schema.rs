use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DataErr, Result};

/// Describes the simulation a dataset was produced by: the names and bounds
/// of the simulation's input parameters (the quantities a model predicts)
/// and of its output quantities (the data a model consumes).
///
/// Column order in a data file is a contract: simulation inputs first, then
/// simulation outputs, then any generation-parameter columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub sim_input_names: Vec<String>,
    pub sim_output_names: Vec<String>,
    pub sim_input_mins: Vec<f32>,
    pub sim_input_maxs: Vec<f32>,
    pub sim_output_mins: Vec<f32>,
    pub sim_output_maxs: Vec<f32>,
}

impl SimulationInfo {
    #[inline]
    pub fn num_sim_inputs(&self) -> usize {
        self.sim_input_names.len()
    }

    #[inline]
    pub fn num_sim_outputs(&self) -> usize {
        self.sim_output_names.len()
    }

    /// The column layout implied by this schema.
    #[inline]
    pub fn layout(&self) -> Layout {
        Layout {
            num_labels: self.num_sim_inputs(),
            num_inputs: self.num_sim_outputs(),
        }
    }

    /// Reads a schema from a JSON file.
    ///
    /// # Errors
    /// Returns `DataErr::Io` on read failures and `DataErr::BadSchema` on
    /// malformed or inconsistent content.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let info: Self =
            serde_json::from_str(&text).map_err(|e| DataErr::BadSchema(e.to_string()))?;
        info.validate()?;
        Ok(info)
    }

    /// Checks that every per-column vector agrees in length and that every
    /// bound pair is ordered.
    pub fn validate(&self) -> Result<()> {
        if self.sim_input_names.is_empty() || self.sim_output_names.is_empty() {
            return Err(DataErr::BadSchema(
                "a simulation needs at least one input and one output column".into(),
            ));
        }
        if self.sim_input_mins.len() != self.num_sim_inputs()
            || self.sim_input_maxs.len() != self.num_sim_inputs()
        {
            return Err(DataErr::BadSchema("input bounds length mismatch".into()));
        }
        if self.sim_output_mins.len() != self.num_sim_outputs()
            || self.sim_output_maxs.len() != self.num_sim_outputs()
        {
            return Err(DataErr::BadSchema("output bounds length mismatch".into()));
        }
        let ordered = |mins: &[f32], maxs: &[f32]| mins.iter().zip(maxs).all(|(lo, hi)| lo <= hi);
        if !ordered(&self.sim_input_mins, &self.sim_input_maxs)
            || !ordered(&self.sim_output_mins, &self.sim_output_maxs)
        {
            return Err(DataErr::BadSchema("a min bound exceeds its max".into()));
        }
        Ok(())
    }
}

/// Column ranges of a data table: labels (simulation inputs) first, then
/// network inputs (simulation outputs), then whatever generation-parameter
/// columns remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub num_labels: usize,
    pub num_inputs: usize,
}

impl Layout {
    #[inline]
    pub fn labels(&self) -> Range<usize> {
        0..self.num_labels
    }

    #[inline]
    pub fn inputs(&self) -> Range<usize> {
        self.num_labels..self.num_labels + self.num_inputs
    }

    /// Width of the label + input block.
    #[inline]
    pub fn data_width(&self) -> usize {
        self.num_labels + self.num_inputs
    }

    /// The generation-parameter columns of a table `total_columns` wide.
    #[inline]
    pub fn gen_params(&self, total_columns: usize) -> Range<usize> {
        self.data_width()..total_columns
    }
}
