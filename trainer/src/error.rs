use std::{error::Error, fmt, io};

use ml_core::MlErr;
use sim_data::DataErr;

/// The training engine's result type.
pub type Result<T> = std::result::Result<T, TrainerErr>;

/// Failures surfaced by the training and inference entry points.
#[derive(Debug)]
pub enum TrainerErr {
    /// A required argument is missing or out of range. Raised before any
    /// computation starts.
    Config(String),

    /// The loaded data disagrees with the schema or configuration.
    Data(DataErr),

    /// A numeric-core invariant was violated.
    Core(MlErr),

    Io(io::Error),

    /// Fixed generation parameters were requested but the data has none.
    MissingGenParamColumns,

    /// A persisted model blob is unreadable or carries unexpected tensors.
    ModelFormat(String),

    /// A loaded model's dimensions disagree with the schema in use.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// A declared but unbuilt feature was invoked.
    Unimplemented(&'static str),
}

impl fmt::Display for TrainerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainerErr::Config(msg) => write!(f, "configuration error: {msg}"),
            TrainerErr::Data(e) => write!(f, "data error: {e}"),
            TrainerErr::Core(e) => write!(f, "numeric error: {e}"),
            TrainerErr::Io(e) => write!(f, "io error: {e}"),
            TrainerErr::MissingGenParamColumns => write!(
                f,
                "fixed generation parameters were requested, but the loaded data \
                 has no generation-parameter columns"
            ),
            TrainerErr::ModelFormat(msg) => write!(f, "bad model file: {msg}"),
            TrainerErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "model/schema mismatch in {what}: got {got}, expected {expected}"
            ),
            TrainerErr::Unimplemented(what) => {
                write!(f, "the {what} action is not yet implemented")
            }
        }
    }
}

impl Error for TrainerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainerErr::Data(e) => Some(e),
            TrainerErr::Core(e) => Some(e),
            TrainerErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DataErr> for TrainerErr {
    fn from(value: DataErr) -> Self {
        Self::Data(value)
    }
}

impl From<MlErr> for TrainerErr {
    fn from(value: MlErr) -> Self {
        Self::Core(value)
    }
}

impl From<io::Error> for TrainerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
