//! Training configuration, loaded from and saved to JSON.

use std::{fs, path::Path};

use burn::{
    config::Config,
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, AdamConfig, AdamWConfig, SgdConfig,
    },
};
use maskdepth_loss::{DualHeadLossConfig, MsSsimConfig, StructuralKind};
use maskdepth_model::DualHeadNetConfig;
use maskdepth_train::{AugmentationConfig, DatasetResult, Normalization};

use crate::{
    error::{TrainerError, TrainerResult},
    scheduler::SchedulerConfig,
};

/// Complete configuration of a training run.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Dataset locations and preprocessing.
    pub dataset: DataConfig,

    /// Default model hyperparameters.
    #[config(default = "DualHeadNetConfig::new()")]
    pub model: DualHeadNetConfig,

    /// Composite loss of the training split; the test split uses its SSIM variant.
    #[config(default = "DualHeadLossConfig::new()")]
    pub loss: DualHeadLossConfig,

    #[config(default = "OptimizerConfig::new()")]
    pub optimizer: OptimizerConfig,

    /// Learning rate scheduler, constant learning rate when absent.
    #[config(default = "None")]
    pub scheduler: Option<SchedulerConfig>,

    /// Step the scheduler after every batch instead of every epoch.
    #[config(default = false)]
    pub batch_scheduler: bool,

    /// Weight of the L1 parameter penalty; disabled at 0.
    #[config(default = 0.0)]
    pub l1_lambda: f64,

    #[config(default = 0.01)]
    pub learning_rate: f64,

    #[config(default = 10)]
    pub num_epochs: usize,

    #[config(default = 8)]
    pub batch_size: usize,

    #[config(default = 2)]
    pub num_workers: usize,

    /// Random seed for reproducibility.
    #[config(default = 42)]
    pub seed: u64,

    #[config(default = "LoggingConfig::new()")]
    pub logging: LoggingConfig,

    /// Directory of the final model record and the stats file.
    #[config(default = "String::from(\"./artifacts\")")]
    pub artifact_dir: String,
}

/// Dataset roots and preprocessing options.
#[derive(Config, Debug)]
pub struct DataConfig {
    /// Root of the training triplets (`fgbg/`, `mask/`, `depth/`).
    pub train_dir: String,

    /// Root of the test triplets.
    pub test_dir: String,

    /// Square side every sample is resized to.
    #[config(default = 64)]
    pub image_size: u32,

    /// Augmentation of the training split.
    #[config(default = "AugmentationConfig::new()")]
    pub augmentation: AugmentationConfig,

    /// Per-channel fgbg normalization, none when absent.
    #[config(default = "None")]
    pub normalization: Option<NormalizationConfig>,
}

/// Per-channel mean and standard deviation of the fgbg input.
#[derive(Config, Debug)]
pub struct NormalizationConfig {
    #[config(default = "[0.5, 0.5, 0.5]")]
    pub mean: [f32; 3],

    #[config(default = "[0.5, 0.5, 0.5]")]
    pub std: [f32; 3],
}

impl NormalizationConfig {
    pub fn init(&self) -> DatasetResult<Normalization> {
        Normalization::new(self.mean, self.std)
    }
}

/// Logging cadence and output locations.
#[derive(Config, Debug)]
pub struct LoggingConfig {
    /// Log the training loss every N batches.
    #[config(default = 500)]
    pub scalar_every: usize,

    /// Log prediction grids and save plots every N batches.
    #[config(default = 30)]
    pub image_every: usize,

    /// Directory of saved input/target/prediction images.
    #[config(default = "String::from(\"./plots\")")]
    pub plots_dir: String,

    /// Directory of the scalar and image log.
    #[config(default = "String::from(\"./runs\")")]
    pub log_dir: String,
}

/// Optimizer family.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Sgd,
    Adam,
    AdamW,
}

/// Optimizer selection and hyperparameters.
#[derive(Config, Debug)]
pub struct OptimizerConfig {
    #[config(default = "OptimizerKind::Sgd")]
    pub kind: OptimizerKind,

    /// SGD momentum; disabled at 0.
    #[config(default = 0.9)]
    pub momentum: f64,

    /// L2 penalty (decoupled for AdamW); disabled at 0.
    #[config(default = 0.0)]
    pub weight_decay: f32,
}

impl OptimizerConfig {
    pub fn sgd(&self) -> SgdConfig {
        let momentum = (self.momentum > 0.0).then(|| {
            MomentumConfig::new()
                .with_momentum(self.momentum)
                .with_dampening(0.0)
        });
        SgdConfig::new()
            .with_momentum(momentum)
            .with_weight_decay(self.weight_decay_config())
    }

    pub fn adam(&self) -> AdamConfig {
        AdamConfig::new().with_weight_decay(self.weight_decay_config())
    }

    pub fn adamw(&self) -> AdamWConfig {
        AdamWConfig::new().with_weight_decay(self.weight_decay)
    }

    fn weight_decay_config(&self) -> Option<WeightDecayConfig> {
        (self.weight_decay > 0.0).then(|| WeightDecayConfig::new(self.weight_decay))
    }
}

impl TrainingConfig {
    /// Loads a training configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> TrainerResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| TrainerError::io(path, e))?;
        serde_json::from_str(&json).map_err(|source| TrainerError::Serialization {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves this configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> TrainerResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            TrainerError::Serialization {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|e| TrainerError::io(path, e))
    }

    /// Checks settings that would only fail later in the run.
    pub fn validate(&self) -> TrainerResult<()> {
        let invalid = |reason: String| Err(TrainerError::InvalidConfig { reason });

        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".to_owned());
        }
        if self.learning_rate <= 0.0 {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.l1_lambda < 0.0 {
            return invalid(format!("l1_lambda must be non-negative, got {}", self.l1_lambda));
        }
        if self.logging.scalar_every == 0 || self.logging.image_every == 0 {
            return invalid("logging intervals must be at least 1".to_owned());
        }
        if self.batch_scheduler && self.scheduler.as_ref().is_some_and(SchedulerConfig::is_plateau) {
            return invalid("a plateau scheduler cannot be used as a batch scheduler".to_owned());
        }

        let multiple = self.model.size_multiple() as u32;
        if self.dataset.image_size == 0 || self.dataset.image_size % multiple != 0 {
            return invalid(format!(
                "image_size {} must be a positive multiple of {multiple}",
                self.dataset.image_size
            ));
        }

        let uses_ms_ssim = [&self.loss.mask, &self.loss.depth]
            .iter()
            .any(|head| head.structural == StructuralKind::MsSsim);
        let min_side = MsSsimConfig::new().init().min_side() as u32;
        if uses_ms_ssim && self.dataset.image_size < min_side {
            return invalid(format!(
                "image_size {} is below the MS-SSIM minimum of {min_side}",
                self.dataset.image_size
            ));
        }

        Ok(())
    }

    /// Number of scheduler steps of the whole run.
    pub fn scheduler_steps(&self, train_items: usize) -> usize {
        if self.batch_scheduler {
            train_items.div_ceil(self.batch_size.max(1)) * self.num_epochs
        } else {
            self.num_epochs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{OneCycleLrConfig, ReduceLrOnPlateauConfig};

    fn config() -> TrainingConfig {
        TrainingConfig::new(DataConfig::new("data/train".into(), "data/test".into()))
    }

    #[test]
    fn default_config_is_valid() {
        let config = config();

        config.validate().unwrap();
        assert_eq!(config.logging.scalar_every, 500);
        assert_eq!(config.logging.image_every, 30);
        assert_eq!(config.optimizer.kind, OptimizerKind::Sgd);
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = config()
            .with_scheduler(Some(SchedulerConfig::OneCycle(OneCycleLrConfig::new())))
            .with_batch_scheduler(true)
            .with_l1_lambda(1e-5);

        config.save(&path).unwrap();
        let loaded = TrainingConfig::load(&path).unwrap();

        assert!(loaded.batch_scheduler);
        assert_eq!(loaded.l1_lambda, 1e-5);
        assert!(matches!(loaded.scheduler, Some(SchedulerConfig::OneCycle(_))));
        assert_eq!(loaded.dataset.train_dir, "data/train");
    }

    #[test]
    fn plateau_batch_scheduler_is_invalid() {
        let config = config()
            .with_scheduler(Some(SchedulerConfig::Plateau(ReduceLrOnPlateauConfig::new())))
            .with_batch_scheduler(true);

        assert!(matches!(
            config.validate(),
            Err(TrainerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn image_size_must_fit_the_model() {
        let mut config = config();
        config.dataset.image_size = 60;

        assert!(config.validate().is_err());
    }

    #[test]
    fn ms_ssim_needs_sixteen_pixels() {
        let mut config = config().with_model(DualHeadNetConfig::new().with_levels(2));
        config.dataset.image_size = 8;
        assert!(config.validate().is_err());

        config.dataset.image_size = 16;
        config.validate().unwrap();
    }

    #[test]
    fn scheduler_steps_count_batches_or_epochs() {
        let config = config().with_batch_size(4).with_num_epochs(3);

        assert_eq!(config.scheduler_steps(10), 3);
        assert_eq!(config.clone().with_batch_scheduler(true).scheduler_steps(10), 9);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let result = TrainingConfig::load("/nonexistent/config.json");

        assert!(matches!(result, Err(TrainerError::Io { .. })));
    }
}
