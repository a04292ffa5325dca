//! One-cycle learning rate policy with cosine annealing.
//!
//! The learning rate warms up from `max_lr / div_factor` to `max_lr` over the
//! first `pct_start` of the schedule, then anneals down to
//! `max_lr / (div_factor * final_div_factor)`.

use std::f64::consts::PI;

use burn::config::Config;

use super::LrScheduler;

/// Configuration of a [`OneCycleLr`] scheduler.
#[derive(Config, Debug)]
pub struct OneCycleLrConfig {
    /// Peak learning rate. Defaults to the training learning rate.
    #[config(default = "None")]
    pub max_lr: Option<f64>,

    /// Length of the cycle. Defaults to the number of scheduler steps of the run.
    #[config(default = "None")]
    pub total_steps: Option<usize>,

    /// Fraction of the cycle spent increasing the learning rate. Default: 0.3
    #[config(default = 0.3)]
    pub pct_start: f64,

    /// `initial_lr = max_lr / div_factor`. Default: 25
    #[config(default = 25.0)]
    pub div_factor: f64,

    /// `min_lr = initial_lr / final_div_factor`. Default: 1e4
    #[config(default = 1e4)]
    pub final_div_factor: f64,
}

impl OneCycleLrConfig {
    pub fn init(&self, base_lr: f64, total_steps: usize) -> OneCycleLr {
        let max_lr = self.max_lr.unwrap_or(base_lr);
        let total_steps = self.total_steps.unwrap_or(total_steps).max(1);
        let initial_lr = max_lr / self.div_factor;

        OneCycleLr {
            initial_lr,
            max_lr,
            min_lr: initial_lr / self.final_div_factor,
            warmup_end: self.pct_start * total_steps as f64 - 1.0,
            last_step: (total_steps - 1) as f64,
            current_step: 0,
        }
    }
}

/// One-cycle learning rate policy.
#[derive(Debug, Clone)]
pub struct OneCycleLr {
    initial_lr: f64,
    max_lr: f64,
    min_lr: f64,
    warmup_end: f64,
    last_step: f64,
    current_step: usize,
}

fn cosine_anneal(start: f64, end: f64, pct: f64) -> f64 {
    end + (start - end) / 2.0 * ((PI * pct).cos() + 1.0)
}

fn progress(step: f64, start: f64, end: f64) -> f64 {
    if end <= start {
        1.0
    } else {
        ((step - start) / (end - start)).clamp(0.0, 1.0)
    }
}

impl LrScheduler for OneCycleLr {
    fn current_lr(&self) -> f64 {
        let step = self.current_step as f64;
        if step <= self.warmup_end {
            let pct = progress(step, 0.0, self.warmup_end);
            cosine_anneal(self.initial_lr, self.max_lr, pct)
        } else {
            let pct = progress(step, self.warmup_end.max(0.0), self.last_step);
            cosine_anneal(self.max_lr, self.min_lr, pct)
        }
    }

    fn step(&mut self) {
        self.current_step += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn one_cycle_warms_up_then_anneals() {
        let mut scheduler = OneCycleLrConfig::new().init(0.1, 10);

        let mut lrs = Vec::new();
        for _ in 0..10 {
            lrs.push(scheduler.current_lr());
            scheduler.step();
        }

        assert_close(lrs[0], 0.1 / 25.0);
        assert_close(lrs[2], 0.1);
        assert_close(lrs[9], 0.1 / 25.0 / 1e4);
        assert!(lrs[1] > lrs[0] && lrs[1] < lrs[2]);
        assert!(lrs.windows(2).skip(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn one_cycle_explicit_settings_override_defaults() {
        let scheduler = OneCycleLrConfig::new()
            .with_max_lr(Some(1.0))
            .with_total_steps(Some(100))
            .with_div_factor(10.0)
            .init(0.01, 5);

        assert_close(scheduler.current_lr(), 0.1);
    }

    #[test]
    fn one_cycle_past_the_end_stays_at_minimum() {
        let mut scheduler = OneCycleLrConfig::new().init(1.0, 4);
        for _ in 0..10 {
            scheduler.step();
        }

        assert_close(scheduler.current_lr(), 1.0 / 25.0 / 1e4);
    }
}
