use std::{error::Error, fmt, io};

/// The data module's result type.
pub type Result<T> = std::result::Result<T, DataErr>;

/// Failures while loading, validating or saving simulation data.
#[derive(Debug)]
pub enum DataErr {
    Io(io::Error),
    /// A CSV cell could not be parsed as a number.
    Parse {
        line: usize,
        column: usize,
    },
    /// A CSV row has the wrong number of cells.
    RowWidth {
        line: usize,
        got: usize,
        expected: usize,
    },
    /// The CSV is missing a column the schema requires at that position.
    ColumnName {
        position: usize,
        got: String,
        expected: String,
    },
    /// The file has fewer columns than the schema requires.
    MissingColumns {
        got: usize,
        expected: usize,
    },
    /// Generation-parameter columns are present but their count disagrees
    /// with the configured latent width.
    GanColumnMismatch {
        got: usize,
        expected: usize,
    },
    /// A schema descriptor is internally inconsistent.
    BadSchema(String),
    /// The file contains no data rows.
    Empty,
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io(e) => write!(f, "io error: {e}"),
            DataErr::Parse { line, column } => {
                write!(f, "line {line}, column {column}: not a number")
            }
            DataErr::RowWidth {
                line,
                got,
                expected,
            } => write!(f, "line {line}: got {got} cells, expected {expected}"),
            DataErr::ColumnName {
                position,
                got,
                expected,
            } => write!(
                f,
                "column {position}: got `{got}', expected `{expected}' per the simulation schema"
            ),
            DataErr::MissingColumns { got, expected } => {
                write!(f, "got {got} columns, the schema requires at least {expected}")
            }
            DataErr::GanColumnMismatch { got, expected } => write!(
                f,
                "the number of generation-parameter columns in the data does not match \
                 the configured latent width: {got} != {expected}"
            ),
            DataErr::BadSchema(msg) => write!(f, "bad simulation schema: {msg}"),
            DataErr::Empty => write!(f, "the data contains no sample rows"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
