use ndarray::{s, Array2, Axis};
use rand::rngs::StdRng;

use ml_core::{shuffle_rows, BatchPlan, Gradients, Mse, Sgd};
use sim_data::Layout;

use crate::config::{TrainConfig, DAMPENING, MOMENTUM, NESTEROV, WEIGHT_DECAY};
use crate::logger::Logger;
use crate::metrics::MseMetrics;
use crate::model::RegressionModel;
use crate::status::{epoch_status_enabled, sample_status_enabled};
use crate::Result;

/// Epoch/batch loop for the regression model.
///
/// Each epoch shuffles the training partition, zeroes the gradient buffers,
/// runs every training batch (forward, loss, residual recording, backward,
/// one optimizer step), then runs every testing batch forward-only into a
/// separate residual buffer. Both residual buffers are owned here and
/// cleared at the top of each epoch; their contents are meaningless before
/// the epoch's first write.
pub(crate) struct RegressionTrainer<'a> {
    model: &'a mut RegressionModel,
    training: Array2<f32>,
    testing: Array2<f32>,
    layout: Layout,
    cfg: &'a TrainConfig,
    rng: StdRng,
}

impl<'a> RegressionTrainer<'a> {
    pub fn new(
        model: &'a mut RegressionModel,
        training: Array2<f32>,
        testing: Array2<f32>,
        layout: Layout,
        cfg: &'a TrainConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            model,
            training,
            testing,
            layout,
            cfg,
            rng,
        }
    }

    pub fn run(mut self, logger: &dyn Logger) -> Result<MseMetrics> {
        let cfg = self.cfg;
        let num_labels = self.layout.num_labels;
        let num_training = self.training.nrows();
        let num_testing = self.testing.nrows();
        let num_samples = num_training + num_testing;

        let training_plan = BatchPlan::new(num_training, cfg.batch_size);
        let testing_plan = BatchPlan::new(num_testing, cfg.batch_size);

        let mut metrics = MseMetrics::new(cfg.num_epochs, num_labels);
        let mut training_errors = Array2::<f32>::zeros((num_training, num_labels));
        let mut testing_errors = Array2::<f32>::zeros((num_testing, num_labels));

        let loss_fn = Mse;
        let mut grads = Gradients::zeros_like(self.model.net());
        let mut optimizer = Sgd::new(
            cfg.learning_rate,
            MOMENTUM,
            WEIGHT_DECAY,
            DAMPENING,
            NESTEROV,
        );

        for epoch in 0..cfg.num_epochs {
            let status_enabled = epoch_status_enabled(cfg.status_every_epoch, epoch);
            if status_enabled {
                logger.info("");
                logger.info(&format!(
                    "Beginning epoch {}/{}.",
                    epoch + 1,
                    cfg.num_epochs
                ));
            }

            self.training = shuffle_rows(&self.training, &mut self.rng);

            training_errors.fill(0.0);
            testing_errors.fill(0.0);
            grads.zero();

            for batch in 0..training_plan.num_batches() {
                let substatus = status_enabled
                    && sample_status_enabled(
                        cfg.status_every_sample,
                        batch,
                        training_plan.batch_size(),
                    );
                if substatus {
                    logger.info(&format!(
                        "  Beginning sample {}/{} (epoch {}/{}).",
                        batch * training_plan.batch_size() + 1,
                        num_samples,
                        epoch + 1,
                        cfg.num_epochs
                    ));
                }

                let range = training_plan.range(batch);
                let x = self.training.slice(s![range.clone(), self.layout.inputs()]);
                let y = self.training.slice(s![range.clone(), self.layout.labels()]);

                let (pred, trace) = self.model.forward(x);
                let loss = loss_fn.loss(pred.view(), y);
                if substatus {
                    logger.info(&format!("    MSE loss, mean of columns: {loss:.6}"));
                }

                training_errors
                    .slice_mut(s![range, ..])
                    .assign(&(&pred - &y));

                self.model
                    .backward(&trace, loss_fn.grad(pred.view(), y), &mut grads);
                optimizer.step(self.model.net_mut(), &grads);
            }

            let training_mse = training_errors
                .mapv(|e| e * e)
                .mean_axis(Axis(0))
                .unwrap_or_else(|| ndarray::Array1::from_elem(num_labels, f32::NAN));

            // Testing phase: forward passes only, no gradient work.
            for batch in 0..testing_plan.num_batches() {
                let total_batch = batch + training_plan.num_batches();
                let substatus = status_enabled
                    && sample_status_enabled(
                        cfg.status_every_sample,
                        total_batch,
                        testing_plan.batch_size(),
                    );
                if substatus {
                    logger.info(&format!(
                        "  Beginning sample {}/{} (testing phase) (epoch {}/{}).",
                        total_batch * testing_plan.batch_size() + 1,
                        num_samples,
                        epoch + 1,
                        cfg.num_epochs
                    ));
                }

                let range = testing_plan.range(batch);
                let x = self.testing.slice(s![range.clone(), self.layout.inputs()]);
                let y = self.testing.slice(s![range.clone(), self.layout.labels()]);

                let pred = self.model.predict(x);
                if substatus {
                    let loss = loss_fn.loss(pred.view(), y);
                    logger.info(&format!("    MSE loss, mean of columns: {loss:.6}"));
                }

                testing_errors.slice_mut(s![range, ..]).assign(&(&pred - &y));
            }

            let testing_mse = testing_errors
                .mapv(|e| e * e)
                .mean_axis(Axis(0))
                .unwrap_or_else(|| ndarray::Array1::from_elem(num_labels, f32::NAN));

            metrics.record(epoch, training_mse.view(), testing_mse.view());

            if status_enabled {
                let norm = |v: &ndarray::Array1<f32>| v.mapv(|x| x * x).sum().sqrt();
                let mean = |v: &ndarray::Array1<f32>| v.mean().unwrap_or_default();
                logger.info(&format!(
                    "Done training epoch {}/{} (testing MSE norm (mean) vs. training MSE norm \
                     (mean): {:.6} ({:.6}) vs. {:.6} ({:.6}) (lower is more accurate)).",
                    epoch + 1,
                    cfg.num_epochs,
                    norm(&testing_mse),
                    mean(&testing_mse),
                    norm(&training_mse),
                    mean(&training_mse),
                ));
            }
        }

        Ok(metrics)
    }
}
