//! Reduce the learning rate when a monitored loss stops improving.

use burn::config::Config;

use super::LrScheduler;

/// Configuration of a [`ReduceLrOnPlateau`] scheduler.
#[derive(Config, Debug)]
pub struct ReduceLrOnPlateauConfig {
    /// Multiplicative reduction. Default: 0.1
    #[config(default = 0.1)]
    pub factor: f64,

    /// Observations without improvement tolerated before reducing. Default: 10
    #[config(default = 10)]
    pub patience: usize,

    /// Relative improvement required to reset patience. Default: 1e-4
    #[config(default = 1e-4)]
    pub threshold: f64,

    /// Observations to wait after a reduction. Default: 0
    #[config(default = 0)]
    pub cooldown: usize,

    /// Lower bound of the learning rate. Default: 0
    #[config(default = 0.0)]
    pub min_lr: f64,

    /// Reductions smaller than this are ignored. Default: 1e-8
    #[config(default = 1e-8)]
    pub eps: f64,
}

impl ReduceLrOnPlateauConfig {
    pub fn init(&self, initial_lr: f64) -> ReduceLrOnPlateau {
        ReduceLrOnPlateau {
            lr: initial_lr,
            factor: self.factor,
            patience: self.patience,
            threshold: self.threshold,
            cooldown: self.cooldown,
            min_lr: self.min_lr,
            eps: self.eps,
            best: f64::INFINITY,
            bad_observations: 0,
            cooldown_left: 0,
        }
    }
}

/// Minimizing plateau scheduler with a relative threshold.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    lr: f64,
    factor: f64,
    patience: usize,
    threshold: f64,
    cooldown: usize,
    min_lr: f64,
    eps: f64,
    best: f64,
    bad_observations: usize,
    cooldown_left: usize,
}

impl LrScheduler for ReduceLrOnPlateau {
    fn current_lr(&self) -> f64 {
        self.lr
    }

    /// Plateau reduction is driven by [`LrScheduler::observe`] only.
    fn step(&mut self) {}

    fn observe(&mut self, metric: f64) {
        if metric < self.best * (1.0 - self.threshold) {
            self.best = metric;
            self.bad_observations = 0;
        } else {
            self.bad_observations += 1;
        }

        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            self.bad_observations = 0;
        }

        if self.bad_observations > self.patience {
            let reduced = (self.lr * self.factor).max(self.min_lr);
            if self.lr - reduced > self.eps {
                tracing::info!(from = self.lr, to = reduced, "reducing learning rate on plateau");
                self.lr = reduced;
            }
            self.cooldown_left = self.cooldown;
            self.bad_observations = 0;
        }
    }

    fn is_metric_driven(&self) -> bool {
        true
    }
}
