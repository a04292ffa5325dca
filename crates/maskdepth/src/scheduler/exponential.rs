//! Exponential decay learning rate scheduler

use burn::config::Config;

use super::LrScheduler;

/// Configuration of an [`ExponentialLr`] scheduler.
#[derive(Config, Debug)]
pub struct ExponentialLrConfig {
    /// Multiplicative decay applied at every step. Default: 0.95
    #[config(default = 0.95)]
    pub gamma: f64,
}

impl ExponentialLrConfig {
    pub fn init(&self, initial_lr: f64) -> ExponentialLr {
        ExponentialLr {
            lr: initial_lr,
            gamma: self.gamma,
        }
    }
}

/// Formula: lr_t = lr_initial * gamma^t
#[derive(Debug, Clone)]
pub struct ExponentialLr {
    lr: f64,
    gamma: f64,
}

impl LrScheduler for ExponentialLr {
    fn current_lr(&self) -> f64 {
        self.lr
    }

    fn step(&mut self) {
        self.lr *= self.gamma;
    }
}
