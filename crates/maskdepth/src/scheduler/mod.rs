//! Learning rate schedulers
//!
//! - [`StepLr`] - Step decay by `gamma` every `step_size` steps
//! - [`ExponentialLr`] - Decay by `gamma` every step
//! - [`OneCycleLr`] - Cosine warmup then cosine annealing
//! - [`ReduceLrOnPlateau`] - Reduce when the test loss stops improving
//!
//! A scheduler either steps once per batch (`batch_scheduler`) or once per
//! epoch. The plateau scheduler is driven by the mean test loss of each epoch
//! instead of by steps.

mod exponential;
mod one_cycle;
mod plateau;
mod step;

use serde::{Deserialize, Serialize};

pub use exponential::{ExponentialLr, ExponentialLrConfig};
pub use one_cycle::{OneCycleLr, OneCycleLrConfig};
pub use plateau::{ReduceLrOnPlateau, ReduceLrOnPlateauConfig};
pub use step::{StepLr, StepLrConfig};

use crate::error::{TrainerError, TrainerResult};

/// Learning rate scheduler trait
pub trait LrScheduler: Send {
    /// Learning rate of the next optimizer step.
    fn current_lr(&self) -> f64;

    /// Advance the schedule by one step.
    fn step(&mut self);

    /// Report a monitored metric. Only metric-driven schedulers react.
    fn observe(&mut self, _metric: f64) {}

    /// Whether the schedule follows [`LrScheduler::observe`] rather than steps.
    fn is_metric_driven(&self) -> bool {
        false
    }
}

/// Scheduler selection, tagged by `type` in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchedulerConfig {
    Step(StepLrConfig),
    Exponential(ExponentialLrConfig),
    OneCycle(OneCycleLrConfig),
    Plateau(ReduceLrOnPlateauConfig),
}

impl SchedulerConfig {
    /// Build the scheduler.
    ///
    /// `total_steps` is the number of [`LrScheduler::step`] calls of the run,
    /// used by one-cycle when its own `total_steps` is unset.
    pub fn init(&self, base_lr: f64, total_steps: usize) -> Box<dyn LrScheduler> {
        match self {
            Self::Step(config) => Box::new(config.init(base_lr)),
            Self::Exponential(config) => Box::new(config.init(base_lr)),
            Self::OneCycle(config) => Box::new(config.init(base_lr, total_steps)),
            Self::Plateau(config) => Box::new(config.init(base_lr)),
        }
    }

    pub fn is_plateau(&self) -> bool {
        matches!(self, Self::Plateau(_))
    }
}

/// Learning rate of a run: a fixed base rate or a scheduler, and when the
/// scheduler advances.
pub struct LearningRate {
    base_lr: f64,
    scheduler: Option<Box<dyn LrScheduler>>,
    per_batch: bool,
}

impl LearningRate {
    pub fn constant(base_lr: f64) -> Self {
        Self {
            base_lr,
            scheduler: None,
            per_batch: false,
        }
    }

    /// Attach a scheduler stepping per batch or per epoch.
    ///
    /// A metric-driven scheduler cannot step per batch.
    pub fn scheduled(
        base_lr: f64,
        scheduler: Box<dyn LrScheduler>,
        per_batch: bool,
    ) -> TrainerResult<Self> {
        if per_batch && scheduler.is_metric_driven() {
            return Err(TrainerError::InvalidConfig {
                reason: "a plateau scheduler cannot be used as a batch scheduler".to_owned(),
            });
        }

        Ok(Self {
            base_lr,
            scheduler: Some(scheduler),
            per_batch,
        })
    }

    pub fn current(&self) -> f64 {
        self.scheduler
            .as_ref()
            .map_or(self.base_lr, |scheduler| scheduler.current_lr())
    }

    /// Called after every optimizer step.
    pub fn after_batch(&mut self) {
        if self.per_batch {
            if let Some(scheduler) = self.scheduler.as_mut() {
                scheduler.step();
            }
        }
    }

    /// Called with the mean test loss of every epoch.
    pub fn after_test(&mut self, mean_loss: f64) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            if scheduler.is_metric_driven() {
                scheduler.observe(mean_loss);
            }
        }
    }

    /// Called once at the end of every epoch.
    pub fn after_epoch(&mut self) {
        if self.per_batch {
            return;
        }
        if let Some(scheduler) = self.scheduler.as_mut() {
            if !scheduler.is_metric_driven() {
                scheduler.step();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rate_ignores_every_event() {
        let mut lr = LearningRate::constant(0.01);

        lr.after_batch();
        lr.after_test(1.0);
        lr.after_epoch();

        assert_eq!(lr.current(), 0.01);
    }

    #[test]
    fn batch_scheduler_steps_only_after_batches() {
        let scheduler = SchedulerConfig::Exponential(ExponentialLrConfig::new().with_gamma(0.5));
        let mut lr = LearningRate::scheduled(1.0, scheduler.init(1.0, 10), true).unwrap();

        lr.after_batch();
        lr.after_batch();
        lr.after_epoch();

        assert_eq!(lr.current(), 0.25);
    }

    #[test]
    fn epoch_scheduler_steps_only_after_epochs() {
        let scheduler = SchedulerConfig::Step(StepLrConfig::new().with_step_size(1).with_gamma(0.1));
        let mut lr = LearningRate::scheduled(1.0, scheduler.init(1.0, 10), false).unwrap();

        lr.after_batch();
        lr.after_test(3.0);
        assert_eq!(lr.current(), 1.0);

        lr.after_epoch();
        assert!((lr.current() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn plateau_scheduler_follows_test_loss() {
        let scheduler =
            SchedulerConfig::Plateau(ReduceLrOnPlateauConfig::new().with_patience(0));
        let mut lr = LearningRate::scheduled(1.0, scheduler.init(1.0, 10), false).unwrap();

        lr.after_test(1.0);
        lr.after_epoch();
        assert_eq!(lr.current(), 1.0);

        lr.after_test(2.0);
        assert!((lr.current() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn plateau_as_batch_scheduler_is_rejected() {
        let scheduler = SchedulerConfig::Plateau(ReduceLrOnPlateauConfig::new());

        let result = LearningRate::scheduled(1.0, scheduler.init(1.0, 10), true);

        assert!(matches!(result, Err(TrainerError::InvalidConfig { .. })));
        assert!(scheduler.is_plateau());
    }

    #[test]
    fn scheduler_config_json_is_tagged() {
        let config = SchedulerConfig::OneCycle(OneCycleLrConfig::new().with_max_lr(Some(0.1)));

        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["type"], "OneCycle");
        assert_eq!(json["max_lr"], 0.1);
        let back: SchedulerConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(back, SchedulerConfig::OneCycle(_)));
    }
}
