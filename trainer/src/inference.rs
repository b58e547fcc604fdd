use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ml_core::{column_std, column_var};
use sim_data::{SimulationData, SimulationInfo, Table};

use crate::config::RunConfig;
use crate::logger::Logger;
use crate::model::Model;
use crate::{Result, TrainerErr};

/// A predicted column whose stddev falls below this fraction of its
/// configured bound range is flagged as low-variance.
const STD_WARN_FRACTION: f32 = 0.1;

/// Distinct-value diagnostics kick in at or below this many unique values.
const UNIQUE_WARN_THRESHOLD: usize = 25;

/// Relative tolerance for grouping near-identical predictions.
const CLOSE_RTOL: f32 = 1e-6;

/// Loads a model and a dataset, predicts every row, validates and filters
/// the predictions, reports diagnostics and errors, and writes the
/// augmented table.
pub(crate) fn execute(cfg: &RunConfig, info: &SimulationInfo, logger: &dyn Logger) -> Result<()> {
    let load_model_path = cfg
        .load_model_path
        .as_deref()
        .ok_or_else(|| TrainerErr::Config("run requires a load-model path".into()))?;
    let load_data_path = cfg
        .load_data_path
        .as_deref()
        .ok_or_else(|| TrainerErr::Config("run requires a load-data path".into()))?;
    let save_data_path = cfg
        .save_data_path
        .as_deref()
        .ok_or_else(|| TrainerErr::Config("run requires a save-data path".into()))?;

    let sim = SimulationData::load(load_data_path, info, cfg.gan_n)?;
    if sim.num_samples() == 0 {
        return Err(TrainerErr::Config(
            "run requires at least one sample in the data".into(),
        ));
    }

    let model = Model::load(load_model_path)?;
    if model.is_adversarial() != cfg.use_gan {
        return Err(TrainerErr::Config(format!(
            "the loaded model is {}, but the requested family is {}",
            model.kind(),
            if cfg.use_gan { "adversarial" } else { "regression" },
        )));
    }

    let layout = info.layout();
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

    let rows = sim.rows();
    let inputs = rows.slice(s![.., layout.inputs()]);
    let labels = rows.slice(s![.., layout.labels()]);
    let fixed_gen = sim.num_gen_param_columns() != 0;

    let (predictions, generated_latents) = match &model {
        Model::Regression(m) => (m.predict(inputs), None),
        Model::Adversarial(m) => {
            if m.gan_n() != cfg.gan_n {
                return Err(TrainerErr::ShapeMismatch {
                    what: "latent width",
                    got: m.gan_n(),
                    expected: cfg.gan_n,
                });
            }

            let latents = if fixed_gen {
                rows.slice(s![.., layout.gen_params(rows.ncols())]).to_owned()
            } else {
                let mut rng = match cfg.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                Array2::from_shape_fn((rows.nrows(), m.gan_n()), |_| rng.random::<f32>())
            };

            let preds = m.generate(inputs, latents.view());
            let appended = if fixed_gen { None } else { Some(latents) };
            (preds, appended)
        }
    };

    // Original columns with the predictions inserted after the label+input
    // block; generated latents are appended as new columns.
    let width = layout.data_width();
    let mut names: Vec<String> = sim.table().names()[..width].to_vec();
    names.extend(info.sim_input_names.iter().map(|n| format!("pred_{n}")));
    names.extend(sim.table().names()[width..].iter().cloned());
    if generated_latents.is_some() {
        names.extend((0..cfg.gan_n).map(|i| format!("GAN_{i}")));
    }

    let tail: Array2<f32> = match &generated_latents {
        Some(latents) => latents.clone(),
        None => rows.slice(s![.., width..]).to_owned(),
    };
    let augmented = concatenate![
        Axis(1),
        rows.slice(s![.., ..width]),
        predictions.view(),
        tail.view()
    ];
    let mut table = Table::new(names, augmented)?;

    if !cfg.output_keep_out_of_bounds_samples {
        let mask = in_bounds_mask(
            predictions.view(),
            &info.sim_input_mins,
            &info.sim_input_maxs,
        );
        let kept: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();

        let lost = mask.len() - kept.len();
        if lost == 0 {
            logger.info("All model predictions are within the minimum and maximum boundaries.");
            logger.info("");
        } else {
            logger.warn(&format!(
                "WARNING: {lost}/{} sample rows have been discarded from the CSV output due \
                 to out-of-bounds predictions.",
                mask.len()
            ));
            logger.warn("");
        }

        table = table.select_rows(&kept);
    }

    prediction_diagnostics(predictions.view(), info, logger);
    report_prediction_errors(predictions.view(), labels, info, logger);

    SimulationData::save(save_data_path, &table)?;
    logger.info(&format!(
        "Wrote CSV output with predictions to `{}'.",
        save_data_path.display()
    ));

    Ok(())
}

/// True for every row whose predicted values all lie within the per-column
/// `[min, max]` bounds.
pub(crate) fn in_bounds_mask(preds: ArrayView2<f32>, mins: &[f32], maxs: &[f32]) -> Vec<bool> {
    preds
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .all(|(c, &v)| v >= mins[c] && v <= maxs[c])
        })
        .collect()
}

fn is_close(a: f32, b: f32) -> bool {
    (a - b).abs() <= CLOSE_RTOL * a.abs().max(b.abs())
}

/// Warns about degenerate prediction columns: zero or low variance, or few
/// distinct values (enumerated as closeness clusters, most frequent first).
fn prediction_diagnostics(preds: ArrayView2<f32>, info: &SimulationInfo, logger: &dyn Logger) {
    if preds.nrows() < 2 {
        return;
    }

    let stds = column_std(preds, 0.0);
    let mut num_warnings = 0;
    let mut warn = |logger: &dyn Logger, msg: &str| {
        if num_warnings >= 1 {
            logger.warn("");
        }
        logger.warn(msg);
        num_warnings += 1;
    };

    for (idx, name) in info.sim_input_names.iter().enumerate() {
        let col: Vec<f32> = preds.column(idx).to_vec();
        let std = stds[idx];
        let threshold = STD_WARN_FRACTION * (info.sim_input_maxs[idx] - info.sim_input_mins[idx]);

        if std <= 0.0 {
            warn(
                logger,
                &format!(
                    "WARNING: all predictions for simulation input parameter #{} (`{}') are \
                     the same!  Prediction: {:.6}.",
                    idx + 1,
                    name,
                    col[0]
                ),
            );
        } else if std <= threshold {
            warn(
                logger,
                &format!(
                    "WARNING: there is little variance in the predictions for simulation \
                     input parameter #{} (`{}'): std <= threshold: {:.6} <= {:.6}.",
                    idx + 1,
                    name,
                    std,
                    threshold
                ),
            );
        }

        let mut unique = col.clone();
        unique.sort_by(f32::total_cmp);
        unique.dedup();

        if unique.len() <= UNIQUE_WARN_THRESHOLD {
            warn(
                logger,
                &format!(
                    "WARNING: there are few unique values (#{}) for predictions for \
                     simulation input parameter #{} (`{}'):",
                    unique.len(),
                    idx + 1,
                    name
                ),
            );

            for (close, value, exact) in closeness_clusters(&col, &unique) {
                if close > exact {
                    logger.warn(&format!("  {value} x{exact} ({close} close)"));
                } else if exact > 1 {
                    logger.warn(&format!("  {value} x{exact}"));
                } else {
                    logger.warn(&format!("  {value}"));
                }
            }
        }
    }

    if num_warnings >= 1 {
        logger.warn("");
    }
}

/// Groups sorted unique values into closeness clusters and counts, for each
/// cluster representative, its exact and close occurrences in `col`.
/// Returned as `(close_count, value, exact_count)`, most frequent first.
fn closeness_clusters(col: &[f32], unique: &[f32]) -> Vec<(usize, f32, usize)> {
    let mut groups = Vec::new();
    let mut visited = vec![false; unique.len()];

    for i in 0..unique.len() {
        if visited[i] {
            continue;
        }
        let value = unique[i];
        for (j, &other) in unique.iter().enumerate().skip(i) {
            if is_close(other, value) {
                visited[j] = true;
            }
        }

        let exact = col.iter().filter(|&&x| x == value).count();
        let close = col.iter().filter(|&&x| is_close(x, value)).count();
        groups.push((close, value, exact));
    }

    groups.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.total_cmp(&b.1)));
    groups
}

/// Per-column MSE/RMSE of the predictions against the ground-truth labels,
/// reported alongside the labels' own spread.
fn report_prediction_errors(
    preds: ArrayView2<f32>,
    labels: ArrayView2<f32>,
    info: &SimulationInfo,
    logger: &dyn Logger,
) {
    let errors = (&preds - &labels).mapv(|e| e * e);
    let mse = errors
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::from_elem(preds.ncols(), f32::NAN));
    let rmse = mse.mapv(f32::sqrt);

    let var = column_var(labels, 0.0);
    let std = column_std(labels, 0.0);

    let join = |values: &Array1<f32>| {
        values
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    logger.info("");
    logger.info(&format!(
        "Columns: <{}>",
        info.sim_input_names.join(", ")
    ));
    logger.info("");
    logger.info(&format!("Prediction MSEs for each column: <{}>", join(&mse)));
    logger.info(&format!("Label variance for each column: <{}>", join(&var)));
    logger.info("");
    logger.info(&format!("Prediction RMSEs for each column: <{}>", join(&rmse)));
    logger.info(&format!("Label stddev for each column: <{}>", join(&std)));
    logger.info("");
    logger.info(&format!(
        "Mean of column MSEs: {:.6}",
        mse.mean().unwrap_or(f32::NAN)
    ));
    logger.info(&format!(
        "Mean of label variances: {:.6}",
        var.mean().unwrap_or(f32::NAN)
    ));
    logger.info("");
    logger.info(&format!(
        "Mean of column RMSEs: {:.6}",
        rmse.mean().unwrap_or(f32::NAN)
    ));
    logger.info(&format!(
        "Mean of label stddevs: {:.6}",
        std.mean().unwrap_or(f32::NAN)
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, MemoryLogger};
    use ndarray::array;

    #[test]
    fn mask_keeps_only_rows_within_bounds() {
        let preds = array![[-1.0], [0.5], [2.0]];
        let mask = in_bounds_mask(preds.view(), &[0.0], &[1.0]);
        assert_eq!(mask, vec![false, true, false]);
    }

    #[test]
    fn mask_requires_every_column_in_bounds() {
        let preds = array![[0.5, 5.0], [0.5, 0.5]];
        let mask = in_bounds_mask(preds.view(), &[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(mask, vec![false, true]);
    }

    #[test]
    fn identical_predictions_warn_as_zero_variance() {
        let info = SimulationInfo {
            sim_input_names: vec!["p".into()],
            sim_output_names: vec!["o".into()],
            sim_input_mins: vec![0.0],
            sim_input_maxs: vec![1.0],
            sim_output_mins: vec![0.0],
            sim_output_maxs: vec![1.0],
        };
        let preds = array![[0.5], [0.5], [0.5]];
        let logger = MemoryLogger::new();

        prediction_diagnostics(preds.view(), &info, &logger);

        let warnings = logger.lines_at(LogLevel::Warn);
        assert!(warnings.iter().any(|l| l.contains("are the same")));
        assert!(warnings.iter().any(|l| l.contains("few unique values (#1)")));
    }

    #[test]
    fn closeness_clusters_order_by_frequency() {
        let col = vec![1.0, 1.0, 1.0, 2.0, 2.0, 5.0];
        let unique = vec![1.0, 2.0, 5.0];
        let groups = closeness_clusters(&col, &unique);
        assert_eq!(groups[0], (3, 1.0, 3));
        assert_eq!(groups[1], (2, 2.0, 2));
        assert_eq!(groups[2], (1, 5.0, 1));
    }

    #[test]
    fn near_identical_values_fold_into_one_cluster() {
        let a = 1.0f32;
        let b = 1.0f32 + 1e-7;
        let col = vec![a, b];
        let mut unique = col.clone();
        unique.sort_by(f32::total_cmp);
        unique.dedup();
        assert_eq!(unique.len(), 2);

        let groups = closeness_clusters(&col, &unique);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, 2);
        assert_eq!(groups[0].2, 1);
    }

    #[test]
    fn single_row_predictions_skip_diagnostics() {
        let info = SimulationInfo {
            sim_input_names: vec!["p".into()],
            sim_output_names: vec!["o".into()],
            sim_input_mins: vec![0.0],
            sim_input_maxs: vec![1.0],
            sim_output_mins: vec![0.0],
            sim_output_maxs: vec![1.0],
        };
        let logger = MemoryLogger::new();
        prediction_diagnostics(array![[0.5]].view(), &info, &logger);
        assert!(logger.lines().is_empty());
    }
}
