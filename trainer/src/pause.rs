use crate::config::PauseConfig;

/// Per-epoch counters of how many samples actually updated each
/// adversarial sub-network.
#[derive(Debug, Default, Clone, Copy)]
pub struct PauseState {
    pub discriminator_samples: usize,
    pub generator_samples: usize,
}

/// Which sub-networks to skip for the current batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PauseDecision {
    pub discriminator: bool,
    pub generator: bool,
}

impl PauseDecision {
    const NONE: Self = Self {
        discriminator: false,
        generator: false,
    };
}

/// Keeps the generator and discriminator trainings in balance by pausing
/// whichever side is too far ahead of the other.
#[derive(Debug)]
pub struct PauseController {
    cfg: PauseConfig,
    state: PauseState,
}

impl PauseController {
    pub fn new(cfg: PauseConfig) -> Self {
        Self {
            cfg,
            state: PauseState::default(),
        }
    }

    /// Resets the per-epoch sample counters.
    pub fn begin_epoch(&mut self) {
        self.state = PauseState::default();
    }

    #[inline]
    pub fn state(&self) -> PauseState {
        self.state
    }

    /// Records that the discriminator trained on `n` more samples.
    #[inline]
    pub fn record_discriminator(&mut self, n: usize) {
        self.state.discriminator_samples += n;
    }

    /// Records that the generator trained on `n` more samples.
    #[inline]
    pub fn record_generator(&mut self, n: usize) {
        self.state.generator_samples += n;
    }

    /// Decides which sides to pause for one batch. Rules are evaluated in
    /// order and the first match wins:
    ///
    /// 1. pausing disabled -> pause nothing;
    /// 2. `epoch` below the warm-up window -> pause nothing;
    /// 3. `epoch` past a configured upper window -> pause nothing;
    /// 4. the discriminator has not had its minimum training dose this
    ///    epoch -> pause nothing;
    /// 5. otherwise pause each side whose loss undercuts the other's by at
    ///    least the threshold.
    pub fn decide(
        &self,
        epoch: usize,
        discriminator_loss: f32,
        generator_loss: f32,
    ) -> PauseDecision {
        let cfg = &self.cfg;

        if !cfg.enabled {
            return PauseDecision::NONE;
        }
        if epoch < cfg.min_epochs {
            return PauseDecision::NONE;
        }
        if cfg.max_epochs > 0 && epoch > cfg.max_epochs {
            return PauseDecision::NONE;
        }
        if self.state.discriminator_samples < cfg.min_samples_per_epoch {
            return PauseDecision::NONE;
        }

        PauseDecision {
            discriminator: discriminator_loss <= generator_loss - cfg.threshold,
            generator: generator_loss <= discriminator_loss - cfg.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_cfg() -> PauseConfig {
        PauseConfig {
            enabled: true,
            threshold: 0.1,
            min_samples_per_epoch: 0,
            min_epochs: 0,
            max_epochs: 0,
        }
    }

    #[test]
    fn disabled_pausing_never_pauses() {
        let cfg = PauseConfig {
            enabled: false,
            ..active_cfg()
        };
        let ctl = PauseController::new(cfg);
        assert_eq!(ctl.decide(100, 0.0, 10.0), PauseDecision::NONE);
        assert_eq!(ctl.decide(100, 10.0, 0.0), PauseDecision::NONE);
    }

    #[test]
    fn warm_up_epochs_never_pause() {
        let cfg = PauseConfig {
            min_epochs: 5,
            ..active_cfg()
        };
        let ctl = PauseController::new(cfg);
        assert_eq!(ctl.decide(4, 0.0, 10.0), PauseDecision::NONE);
        assert!(ctl.decide(5, 0.0, 10.0).discriminator);
    }

    #[test]
    fn pausing_stops_past_the_upper_window() {
        let cfg = PauseConfig {
            max_epochs: 10,
            ..active_cfg()
        };
        let ctl = PauseController::new(cfg);
        assert!(ctl.decide(10, 0.0, 10.0).discriminator);
        assert_eq!(ctl.decide(11, 0.0, 10.0), PauseDecision::NONE);
    }

    #[test]
    fn minimum_training_dose_blocks_pausing() {
        let cfg = PauseConfig {
            min_samples_per_epoch: 32,
            ..active_cfg()
        };
        let mut ctl = PauseController::new(cfg);
        assert_eq!(ctl.decide(0, 0.0, 10.0), PauseDecision::NONE);

        ctl.record_discriminator(32);
        assert!(ctl.decide(0, 0.0, 10.0).discriminator);

        ctl.begin_epoch();
        assert_eq!(ctl.decide(0, 0.0, 10.0), PauseDecision::NONE);
    }

    #[test]
    fn equal_losses_never_pause() {
        let ctl = PauseController::new(active_cfg());
        assert_eq!(ctl.decide(0, 0.7, 0.7), PauseDecision::NONE);
    }

    #[test]
    fn the_side_with_the_much_smaller_loss_pauses() {
        let ctl = PauseController::new(active_cfg());

        let d = ctl.decide(0, 0.2, 0.8);
        assert!(d.discriminator);
        assert!(!d.generator);

        let g = ctl.decide(0, 0.8, 0.2);
        assert!(!g.discriminator);
        assert!(g.generator);
    }

    #[test]
    fn losses_within_the_threshold_do_not_pause() {
        let ctl = PauseController::new(active_cfg());
        let d = ctl.decide(0, 0.75, 0.8);
        assert_eq!(d, PauseDecision::NONE);
    }

    #[test]
    fn both_sides_pause_only_when_both_undercut() {
        let cfg = PauseConfig {
            threshold: 0.0,
            ..active_cfg()
        };
        let ctl = PauseController::new(cfg);
        let d = ctl.decide(0, 0.5, 0.5);
        assert!(d.discriminator && d.generator);
    }
}
