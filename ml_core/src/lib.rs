mod act;
mod batch;
mod error;
mod loss;
mod net;
mod optim;
mod split;
mod stats;

pub use act::ActFn;
pub use batch::BatchPlan;
pub use error::{MlErr, Result};
pub use loss::{Bce, Mse};
pub use net::{Dense, Gradients, Mlp, Trace};
pub use optim::Sgd;
pub use split::{shuffle_rows, split_rows};
pub use stats::{column_quantiles, column_std, column_var, ColumnStats};
