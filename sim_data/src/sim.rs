use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;
use rand::Rng;

use crate::csv::{load_csv, save_csv};
use crate::schema::SimulationInfo;
use crate::table::Table;
use crate::{DataErr, Result};

/// A loaded dataset bound to its simulation schema.
///
/// Loading verifies the column contract: the first columns must carry the
/// schema's input and output names in order, and any remaining columns must
/// either be absent or number exactly `gan_n`.
#[derive(Debug, Clone)]
pub struct SimulationData {
    info: SimulationInfo,
    table: Table,
}

impl SimulationData {
    /// Loads and verifies a CSV data file.
    ///
    /// # Arguments
    /// * `path` - The CSV file to read.
    /// * `info` - The simulation schema the file must follow.
    /// * `gan_n` - Configured latent width; extra columns must match it.
    ///
    /// # Errors
    /// Returns `DataErr` when the file cannot be read or violates the schema.
    pub fn load(path: &Path, info: &SimulationInfo, gan_n: usize) -> Result<Self> {
        info.validate()?;
        let table = load_csv(path)?;

        let expected: Vec<&String> = info
            .sim_input_names
            .iter()
            .chain(info.sim_output_names.iter())
            .collect();

        if table.num_columns() < expected.len() {
            return Err(DataErr::MissingColumns {
                got: table.num_columns(),
                expected: expected.len(),
            });
        }

        for (position, name) in expected.iter().enumerate() {
            if &table.names()[position] != *name {
                return Err(DataErr::ColumnName {
                    position: position + 1,
                    got: table.names()[position].clone(),
                    expected: (*name).clone(),
                });
            }
        }

        let extra = table.num_columns() - expected.len();
        if extra != 0 && extra != gan_n {
            return Err(DataErr::GanColumnMismatch {
                got: extra,
                expected: gan_n,
            });
        }

        Ok(Self {
            info: info.clone(),
            table,
        })
    }

    #[inline]
    pub fn info(&self) -> &SimulationInfo {
        &self.info
    }

    #[inline]
    pub fn table(&self) -> &Table {
        &self.table
    }

    #[inline]
    pub fn num_samples(&self) -> usize {
        self.table.num_rows()
    }

    /// Number of generation-parameter columns present in the file.
    #[inline]
    pub fn num_gen_param_columns(&self) -> usize {
        self.table.num_columns() - self.info.layout().data_width()
    }

    /// The full numeric contents: labels, inputs, then generation parameters.
    #[inline]
    pub fn rows(&self) -> ArrayView2<'_, f32> {
        self.table.rows().view()
    }

    /// Writes a result table next to this dataset's schema.
    pub fn save(path: &Path, table: &Table) -> Result<()> {
        save_csv(path, table)
    }
}

/// Writes a synthetic dataset for pipeline smoke tests: input columns are
/// zero, output columns are sampled uniformly within their schema bounds.
pub fn generate<R: Rng>(
    path: &Path,
    info: &SimulationInfo,
    num_rows: usize,
    rng: &mut R,
) -> Result<()> {
    info.validate()?;
    let mut writer = BufWriter::new(File::create(path)?);

    let header: Vec<&str> = info
        .sim_input_names
        .iter()
        .chain(info.sim_output_names.iter())
        .map(String::as_str)
        .collect();
    writeln!(writer, "{}", header.join(","))?;

    for _ in 0..num_rows {
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        cells.extend(info.sim_input_names.iter().map(|_| "0".to_string()));
        for (lo, hi) in info.sim_output_mins.iter().zip(&info.sim_output_maxs) {
            let value = if hi > lo { rng.random_range(*lo..*hi) } else { *lo };
            cells.push(value.to_string());
        }
        writeln!(writer, "{}", cells.join(","))?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn toy_info() -> SimulationInfo {
        SimulationInfo {
            sim_input_names: vec!["current".into(), "gap".into()],
            sim_output_names: vec!["force".into()],
            sim_input_mins: vec![0.0, 0.0],
            sim_input_maxs: vec![10.0, 1.0],
            sim_output_mins: vec![0.0],
            sim_output_maxs: vec![100.0],
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sim_data_sim_{}_{name}", std::process::id()))
    }

    #[test]
    fn load_accepts_matching_columns() {
        let path = temp_path("ok.csv");
        std::fs::write(&path, "current,gap,force\n1,0.5,30\n2,0.25,60\n").unwrap();

        let sim = SimulationData::load(&path, &toy_info(), 3).unwrap();
        assert_eq!(sim.num_samples(), 2);
        assert_eq!(sim.num_gen_param_columns(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_accepts_exact_gen_param_columns() {
        let path = temp_path("gan.csv");
        std::fs::write(
            &path,
            "current,gap,force,GAN_0,GAN_1\n1,0.5,30,0.1,0.2\n",
        )
        .unwrap();

        let sim = SimulationData::load(&path, &toy_info(), 2).unwrap();
        assert_eq!(sim.num_gen_param_columns(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_wrong_gen_param_count() {
        let path = temp_path("gan_bad.csv");
        std::fs::write(&path, "current,gap,force,GAN_0\n1,0.5,30,0.1\n").unwrap();

        match SimulationData::load(&path, &toy_info(), 3) {
            Err(DataErr::GanColumnMismatch { got: 1, expected: 3 }) => {}
            other => panic!("expected GanColumnMismatch, got {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_misnamed_columns() {
        let path = temp_path("names.csv");
        std::fs::write(&path, "current,width,force\n1,0.5,30\n").unwrap();
        assert!(matches!(
            SimulationData::load(&path, &toy_info(), 0),
            Err(DataErr::ColumnName { position: 2, .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn generate_writes_rows_within_output_bounds() {
        let path = temp_path("generated.csv");
        let info = toy_info();
        let mut rng = StdRng::seed_from_u64(5);

        generate(&path, &info, 20, &mut rng).unwrap();
        let sim = SimulationData::load(&path, &info, 0).unwrap();
        assert_eq!(sim.num_samples(), 20);

        let layout = info.layout();
        for row in sim.rows().rows() {
            for c in layout.labels() {
                assert_eq!(row[c], 0.0);
            }
            for (i, c) in layout.inputs().enumerate() {
                assert!(row[c] >= info.sim_output_mins[i]);
                assert!(row[c] < info.sim_output_maxs[i]);
            }
        }
        std::fs::remove_file(&path).ok();
    }
}
