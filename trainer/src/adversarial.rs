use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::Rng;

use ml_core::{shuffle_rows, BatchPlan, Bce, Gradients, Sgd};
use sim_data::Layout;

use crate::config::{
    TrainConfig, DAMPENING, GENERATED_LABEL, MOMENTUM, NESTEROV, REAL_LABEL, WEIGHT_DECAY,
};
use crate::logger::Logger;
use crate::metrics::{BceMetrics, EpochLossRow};
use crate::model::AdversarialModel;
use crate::pause::PauseController;
use crate::status::{epoch_status_enabled, sample_status_enabled};
use crate::Result;

/// Epoch/batch loop for the generator/discriminator pair.
///
/// Per training batch, in order: the discriminator is scored on the real
/// pair against the real target, the generator produces a synthetic label,
/// the discriminator is scored on the synthetic pair against the generated
/// target, and the generator's loss is the discriminator's synthetic-pair
/// output scored against the real target. The pause controller then decides
/// which side gets its backward passes and optimizer steps. The pause
/// comparison uses the mean of the two discriminator losses against the
/// generator loss as-is; the two scalars come from different forward
/// passes and are compared without correction.
pub(crate) struct AdversarialTrainer<'a> {
    model: &'a mut AdversarialModel,
    training: Array2<f32>,
    testing: Array2<f32>,
    layout: Layout,
    cfg: &'a TrainConfig,
    pause: PauseController,
    rng: StdRng,
}

/// Fixed generation parameters from the partition's trailing columns, or
/// fresh uniform samples in `[0, 1)`.
fn batch_latents(
    force_fixed: bool,
    layout: Layout,
    partition: &Array2<f32>,
    range: std::ops::Range<usize>,
    gan_n: usize,
    rng: &mut StdRng,
) -> Array2<f32> {
    if force_fixed {
        let gen_range = layout.gen_params(partition.ncols());
        partition.slice(s![range, gen_range]).to_owned()
    } else {
        Array2::from_shape_fn((range.len(), gan_n), |_| rng.random::<f32>())
    }
}

impl<'a> AdversarialTrainer<'a> {
    pub fn new(
        model: &'a mut AdversarialModel,
        training: Array2<f32>,
        testing: Array2<f32>,
        layout: Layout,
        cfg: &'a TrainConfig,
        rng: StdRng,
    ) -> Self {
        let pause = PauseController::new(cfg.pause);
        Self {
            model,
            training,
            testing,
            layout,
            cfg,
            pause,
            rng,
        }
    }

    pub fn run(mut self, logger: &dyn Logger) -> Result<BceMetrics> {
        let cfg = self.cfg;
        let num_training = self.training.nrows();
        let num_testing = self.testing.nrows();
        let num_samples = num_training + num_testing;

        let training_plan = BatchPlan::new(num_training, cfg.batch_size);
        let testing_plan = BatchPlan::new(num_testing, cfg.batch_size);

        let mut metrics = BceMetrics::new(cfg.num_epochs);

        // Columns: discriminator-real, discriminator-generated, generator.
        let mut training_losses = Array2::<f32>::zeros((num_training, 3));
        let mut testing_losses = Array2::<f32>::zeros((num_testing, 3));

        let loss_fn = Bce;
        let mut generator_grads = Gradients::zeros_like(self.model.generator());
        let mut discriminator_grads = Gradients::zeros_like(self.model.discriminator());
        let mut generator_optimizer = Sgd::new(
            cfg.learning_rate,
            MOMENTUM,
            WEIGHT_DECAY,
            DAMPENING,
            NESTEROV,
        );
        let mut discriminator_optimizer = Sgd::new(
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

            self.pause.begin_epoch();
            training_losses.fill(0.0);
            testing_losses.fill(0.0);
            generator_grads.zero();
            discriminator_grads.zero();

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
                let len = range.len();
                let latents = batch_latents(
                    cfg.gan_force_fixed_gen_params,
                    self.layout,
                    &self.training,
                    range.clone(),
                    self.model.gan_n(),
                    &mut self.rng,
                );

                let x = self.training.slice(s![range.clone(), self.layout.inputs()]);
                let y = self.training.slice(s![range.clone(), self.layout.labels()]);

                let real_target = Array2::from_elem((len, 1), REAL_LABEL);
                let generated_target = Array2::from_elem((len, 1), GENERATED_LABEL);

                // Discriminator on the real pair.
                let (real_out, real_trace) = self.model.discriminator_forward(x, y);
                let real_unreduced = loss_fn.unreduced(real_out.view(), real_target.view());
                let real_loss = real_unreduced.mean().unwrap_or(f32::NAN);

                // Generator, then discriminator on the synthetic pair.
                let (synthetic, gen_trace) = self.model.generator_forward(x, latents.view());
                let (generated_out, generated_trace) =
                    self.model.discriminator_forward(x, synthetic.view());
                let generated_unreduced =
                    loss_fn.unreduced(generated_out.view(), generated_target.view());
                let generated_loss = generated_unreduced.mean().unwrap_or(f32::NAN);

                let discriminator_loss = (real_loss + generated_loss) / 2.0;

                // The generator is rewarded for fooling the discriminator.
                let generator_unreduced =
                    loss_fn.unreduced(generated_out.view(), real_target.view());
                let generator_loss = generator_unreduced.mean().unwrap_or(f32::NAN);

                let decision = self.pause.decide(epoch, discriminator_loss, generator_loss);

                if !decision.discriminator {
                    self.pause.record_discriminator(len);

                    let d = loss_fn.grad(real_out.view(), real_target.view());
                    self.model
                        .discriminator_backward(&real_trace, d, &mut discriminator_grads);
                    discriminator_optimizer
                        .step(self.model.discriminator_mut(), &discriminator_grads);

                    let d = loss_fn.grad(generated_out.view(), generated_target.view());
                    self.model
                        .discriminator_backward(&generated_trace, d, &mut discriminator_grads);
                    discriminator_optimizer
                        .step(self.model.discriminator_mut(), &discriminator_grads);
                }

                if !decision.generator {
                    self.pause.record_generator(len);

                    let d = loss_fn.grad(generated_out.view(), real_target.view());
                    self.model.generator_backward(
                        &gen_trace,
                        &generated_trace,
                        d,
                        &mut generator_grads,
                    );
                    generator_optimizer.step(self.model.generator_mut(), &generator_grads);
                }

                if substatus {
                    logger.info(&format!(
                        "    BCE loss (disc_real, disc_gen, gen): {real_loss:.6}, \
                         {generated_loss:.6}, {generator_loss:.6}"
                    ));
                }

                training_losses
                    .slice_mut(s![range.clone(), 0])
                    .assign(&real_unreduced.column(0));
                training_losses
                    .slice_mut(s![range.clone(), 1])
                    .assign(&generated_unreduced.column(0));
                training_losses
                    .slice_mut(s![range, 2])
                    .assign(&generator_unreduced.column(0));
            }

            // Testing phase: forward passes only, no pausing, no gradients.
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
                let len = range.len();
                let latents = batch_latents(
                    cfg.gan_force_fixed_gen_params,
                    self.layout,
                    &self.testing,
                    range.clone(),
                    self.model.gan_n(),
                    &mut self.rng,
                );

                let x = self.testing.slice(s![range.clone(), self.layout.inputs()]);
                let y = self.testing.slice(s![range.clone(), self.layout.labels()]);

                let real_target = Array2::from_elem((len, 1), REAL_LABEL);
                let generated_target = Array2::from_elem((len, 1), GENERATED_LABEL);

                let real_out = self.model.discriminate(x, y);
                let real_unreduced = loss_fn.unreduced(real_out.view(), real_target.view());

                let synthetic = self.model.generate(x, latents.view());
                let generated_out = self.model.discriminate(x, synthetic.view());
                let generated_unreduced =
                    loss_fn.unreduced(generated_out.view(), generated_target.view());
                let generator_unreduced =
                    loss_fn.unreduced(generated_out.view(), real_target.view());

                testing_losses
                    .slice_mut(s![range.clone(), 0])
                    .assign(&real_unreduced.column(0));
                testing_losses
                    .slice_mut(s![range.clone(), 1])
                    .assign(&generated_unreduced.column(0));
                testing_losses
                    .slice_mut(s![range, 2])
                    .assign(&generator_unreduced.column(0));
            }

            let column_mean = |buffer: &Array2<f32>, c: usize| {
                buffer.column(c).mean().unwrap_or(f32::NAN)
            };
            let state = self.pause.state();
            let row = EpochLossRow {
                training: [
                    column_mean(&training_losses, 0),
                    column_mean(&training_losses, 1),
                    column_mean(&training_losses, 2),
                ],
                testing: [
                    column_mean(&testing_losses, 0),
                    column_mean(&testing_losses, 1),
                    column_mean(&testing_losses, 2),
                ],
                num_training_samples: num_training,
                num_discriminator_paused: num_training - state.discriminator_samples,
                num_generator_paused: num_training - state.generator_samples,
            };
            metrics.record(epoch, row);

            if status_enabled {
                logger.info(&format!(
                    "Done training epoch {}/{} (mean training disc_real, disc_gen, gen loss: \
                     {:.6}, {:.6}, {:.6}) (mean testing disc_real, disc_gen, gen loss: {:.6}, \
                     {:.6}, {:.6}) (paused disc, gen: {}, {}).",
                    epoch + 1,
                    cfg.num_epochs,
                    row.training[0],
                    row.training[1],
                    row.training[2],
                    row.testing[0],
                    row.testing[1],
                    row.testing[2],
                    row.num_discriminator_paused,
                    row.num_generator_paused,
                ));
            }
        }

        Ok(metrics)
    }
}
