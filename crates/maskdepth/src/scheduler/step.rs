//! Step decay learning rate scheduler

use burn::config::Config;

use super::LrScheduler;

/// Configuration of a [`StepLr`] scheduler.
#[derive(Config, Debug)]
pub struct StepLrConfig {
    /// Decay every `step_size` steps. Default: 10
    #[config(default = 10)]
    pub step_size: usize,

    /// Multiplicative decay factor. Default: 0.1
    #[config(default = 0.1)]
    pub gamma: f64,
}

impl StepLrConfig {
    pub fn init(&self, initial_lr: f64) -> StepLr {
        StepLr {
            initial_lr,
            step_size: self.step_size,
            gamma: self.gamma,
            current_step: 0,
        }
    }
}

/// Multiplies the learning rate by `gamma` every `step_size` steps.
///
/// Formula: lr_t = lr_initial * gamma^(floor(t / step_size))
#[derive(Debug, Clone)]
pub struct StepLr {
    initial_lr: f64,
    step_size: usize,
    gamma: f64,
    current_step: usize,
}

impl LrScheduler for StepLr {
    fn current_lr(&self) -> f64 {
        if self.step_size == 0 {
            return self.initial_lr;
        }
        let decays = self.current_step / self.step_size;
        self.initial_lr * self.gamma.powi(decays as i32)
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lr_decays_every_step_size() {
        let mut scheduler = StepLrConfig::new().with_step_size(2).with_gamma(0.5).init(1.0);

        let mut lrs = Vec::new();
        for _ in 0..5 {
            lrs.push(scheduler.current_lr());
            scheduler.step();
        }

        assert_eq!(lrs, [1.0, 1.0, 0.5, 0.5, 0.25]);
    }

    #[test]
    fn step_lr_zero_step_size_is_constant() {
        let mut scheduler = StepLrConfig::new().with_step_size(0).init(0.3);
        scheduler.step();
        scheduler.step();

        assert_eq!(scheduler.current_lr(), 0.3);
    }
}
