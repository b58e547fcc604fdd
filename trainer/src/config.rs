use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fraction of the dataset reserved for the testing partition.
pub const TEST_PROPORTION: f32 = 0.2;

/// Seed for the train/test split shuffle. Fixed so the partition is
/// reproducible across runs; all other randomness uses its own handle.
pub const TESTING_SPLIT_SEED: u64 = 42;

/// Optimizer hyperparameters shared by every network.
pub const MOMENTUM: f32 = 0.9;
pub const WEIGHT_DECAY: f32 = 0.0;
pub const DAMPENING: f32 = 0.0;
pub const NESTEROV: bool = false;

/// Discriminator targets for real and generated pairs.
pub const REAL_LABEL: f32 = 1.0;
pub const GENERATED_LABEL: f32 = 0.0;

/// Hidden layer widths used when building a fresh network.
pub const DEFAULT_HIDDEN: [usize; 2] = [64, 64];

pub const DEFAULT_GAN_N: usize = 3;

/// Controls the adversarial loss-balance pause heuristic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseConfig {
    /// Master switch; when false neither side is ever paused.
    pub enabled: bool,
    /// How far one side's loss must fall below the other's before pausing.
    pub threshold: f32,
    /// Minimum discriminator training samples per epoch before pausing.
    pub min_samples_per_epoch: usize,
    /// Epochs of unconditional warm-up before pausing may trigger.
    pub min_epochs: usize,
    /// Last epoch (exclusive upper window) where pausing applies; 0 means
    /// no upper bound.
    pub max_epochs: usize,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.1,
            min_samples_per_epoch: 128,
            min_epochs: 10,
            max_epochs: 0,
        }
    }
}

/// Arguments of the training entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub use_gan: bool,
    /// When set, resume from this persisted model instead of building fresh.
    pub load_model_path: Option<PathBuf>,
    pub save_model_path: Option<PathBuf>,
    pub load_data_path: Option<PathBuf>,
    /// When set, the per-epoch metrics table is written here.
    pub save_data_path: Option<PathBuf>,
    pub gan_n: usize,
    pub num_epochs: usize,
    /// Log a status line every this many epochs; 0 disables epoch status.
    pub status_every_epoch: usize,
    /// Within a status epoch, log every this many samples; 0 disables.
    pub status_every_sample: usize,
    /// Requested batch size; 0 means one batch per partition.
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Take generation parameters from the data instead of sampling them.
    pub gan_force_fixed_gen_params: bool,
    pub pause: PauseConfig,
    /// Training RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            use_gan: true,
            load_model_path: None,
            save_model_path: None,
            load_data_path: None,
            save_data_path: None,
            gan_n: DEFAULT_GAN_N,
            num_epochs: 100,
            status_every_epoch: 1,
            status_every_sample: 0,
            batch_size: 64,
            learning_rate: 1e-3,
            gan_force_fixed_gen_params: false,
            pause: PauseConfig::default(),
            seed: None,
        }
    }
}

/// Arguments of the inference entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub use_gan: bool,
    pub load_model_path: Option<PathBuf>,
    pub load_data_path: Option<PathBuf>,
    pub save_data_path: Option<PathBuf>,
    pub gan_n: usize,
    /// Keep prediction rows that fall outside the schema bounds.
    pub output_keep_out_of_bounds_samples: bool,
    /// Latent-sampling RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            use_gan: true,
            load_model_path: None,
            load_data_path: None,
            save_data_path: None,
            gan_n: DEFAULT_GAN_N,
            output_keep_out_of_bounds_samples: false,
            seed: None,
        }
    }
}
