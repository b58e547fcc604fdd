//! Training and inference engine for simulation-parameter prediction.
//!
//! The engine learns the inverse mapping of a simulator: networks consume
//! simulation *outputs* and predict the simulation *input* parameters that
//! produced them, either with a plain regression network or with a
//! generator/discriminator pair conditioned on latent generation
//! parameters.

mod adversarial;
mod config;
mod error;
mod inference;
mod logger;
mod metrics;
mod model;
mod pause;
mod regression;
mod report;
mod status;

use std::path::Path;

use ndarray::s;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ml_core::{split_rows, ColumnStats};
use sim_data::{SimulationData, SimulationInfo};

pub use config::{
    PauseConfig, RunConfig, TrainConfig, DEFAULT_GAN_N, DEFAULT_HIDDEN, GENERATED_LABEL,
    REAL_LABEL, TESTING_SPLIT_SEED, TEST_PROPORTION,
};
pub use error::{Result, TrainerErr};
pub use logger::{LogLevel, LogSink, Logger, MemoryLogger};
pub use metrics::{BceMetrics, EpochLossRow, MseMetrics, BCE_COLUMNS};
pub use model::{AdversarialModel, Model, Normalizer, RegressionModel};
pub use pause::{PauseController, PauseDecision, PauseState};
pub use report::{
    fit_width, format_names, format_stats, print_regression_summary, terminal_width,
};

use adversarial::AdversarialTrainer;
use regression::RegressionTrainer;

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Trains a model on a dataset and persists it.
///
/// Loads the data, computes standardization statistics, splits off the
/// testing partition with the fixed split seed, runs the epoch loop of the
/// configured model family, reports summary statistics, optionally exports
/// the per-epoch metrics table, and saves the model.
///
/// # Errors
/// Fails before any computation when a required path is missing, when
/// `num_epochs` is below one, or when the dataset is empty or violates the
/// schema.
pub fn train(cfg: &TrainConfig, info: &SimulationInfo, logger: &dyn Logger) -> Result<()> {
    let load_data_path = cfg
        .load_data_path
        .as_deref()
        .ok_or_else(|| TrainerErr::Config("train requires a load-data path".into()))?;
    let save_model_path = cfg
        .save_model_path
        .as_deref()
        .ok_or_else(|| TrainerErr::Config("train requires a save-model path".into()))?;
    if cfg.num_epochs < 1 {
        return Err(TrainerErr::Config(
            "train requires num_epochs to be at least 1".into(),
        ));
    }

    let sim = SimulationData::load(load_data_path, info, cfg.gan_n)?;
    if sim.num_samples() == 0 {
        return Err(TrainerErr::Config(
            "train requires at least one sample in the data".into(),
        ));
    }
    if cfg.gan_force_fixed_gen_params && sim.num_gen_param_columns() == 0 {
        return Err(TrainerErr::MissingGenParamColumns);
    }

    let layout = info.layout();
    let data = sim.rows().to_owned();

    let norm = Normalizer {
        input: ColumnStats::fit(data.slice(s![.., layout.inputs()]))?,
        label: ColumnStats::fit(data.slice(s![.., layout.labels()]))?,
    };

    let mut rng = generate_rng(cfg.seed);
    let mut model = match cfg.load_model_path.as_deref() {
        Some(path) => Model::load(path)?,
        None => Model::build(cfg.use_gan, cfg.gan_n, layout, norm, &mut rng),
    };

    if model.is_adversarial() != cfg.use_gan {
        return Err(TrainerErr::Config(format!(
            "the loaded model is {}, but the requested family is {}",
            model.kind(),
            if cfg.use_gan { "adversarial" } else { "regression" },
        )));
    }
    if model.num_inputs() != layout.num_inputs {
        return Err(TrainerErr::ShapeMismatch {
            what: "model input width",
            got: model.num_inputs(),
            expected: layout.num_inputs,
        });
    }
    if model.num_labels() != layout.num_labels {
        return Err(TrainerErr::ShapeMismatch {
            what: "model label width",
            got: model.num_labels(),
            expected: layout.num_labels,
        });
    }
    if let Model::Adversarial(m) = &model {
        if m.gan_n() != cfg.gan_n {
            return Err(TrainerErr::ShapeMismatch {
                what: "latent width",
                got: m.gan_n(),
                expected: cfg.gan_n,
            });
        }
    }

    // Reproducible partition; all later randomness comes from `rng`.
    let (testing, training) = split_rows(&data, TEST_PROPORTION, TESTING_SPLIT_SEED);

    match &mut model {
        Model::Regression(m) => {
            let metrics =
                RegressionTrainer::new(m, training, testing, layout, cfg, rng).run(logger)?;

            logger.info("");
            logger.info("Done training last epoch.  Preparing statistics...");
            print_regression_summary(
                logger,
                &metrics,
                data.slice(s![.., layout.labels()]),
                &info.sim_input_names,
                terminal_width(),
            );

            if let Some(path) = cfg.save_data_path.as_deref() {
                let table = metrics.into_table(&info.sim_input_names)?;
                sim_data::save_csv(path, &table)?;
                logger.info("");
                logger.info(&format!(
                    "Wrote MSE errors (testing MSE for each epoch and then training MSE for \
                     each epoch) to `{}'.",
                    path.display()
                ));
            }
        }
        Model::Adversarial(m) => {
            let metrics =
                AdversarialTrainer::new(m, training, testing, layout, cfg, rng).run(logger)?;

            if let Some(path) = cfg.save_data_path.as_deref() {
                let table = metrics.into_table()?;
                sim_data::save_csv(path, &table)?;
                logger.info("");
                logger.info(&format!(
                    "Wrote training epoch data to `{}'.",
                    path.display()
                ));
            }
        }
    }

    model.save(save_model_path)?;
    logger.info("");
    logger.info(&format!(
        "Saved trained model to `{}'.",
        save_model_path.display()
    ));
    logger.info("");
    logger.info("Done training all epochs.");

    Ok(())
}

/// Loads a model and a dataset, predicts every row, and writes the
/// augmented prediction table.
///
/// # Errors
/// Fails before any computation when a required path is missing, and on
/// schema or model-family mismatches.
pub fn run(cfg: &RunConfig, info: &SimulationInfo, logger: &dyn Logger) -> Result<()> {
    inference::execute(cfg, info, logger)
}

/// Statistics-only reporting over a previously written metrics table.
///
/// # Errors
/// Always fails: the action is declared but not yet built.
pub fn stats(save_data_path: &Path, logger: &dyn Logger) -> Result<()> {
    let _ = save_data_path;
    logger.error("the stats action is not yet implemented");
    Err(TrainerErr::Unimplemented("stats"))
}
