mod csv;
mod error;
mod schema;
mod sim;
mod table;

pub use csv::{load_csv, save_csv};
pub use error::{DataErr, Result};
pub use schema::{Layout, SimulationInfo};
pub use sim::{generate, SimulationData};
pub use table::Table;
