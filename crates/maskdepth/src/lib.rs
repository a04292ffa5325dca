//! # maskdepth
//!
//! Training and evaluation loop for models predicting a segmentation mask and
//! a depth map from a composite fgbg image.
//!
//! Each epoch runs a training pass (composite MS-SSIM + pixel loss, optional
//! L1 parameter penalty, optimizer step) and a test pass (SSIM variant of the
//! loss, no autodiff). Losses, learning rates and quantitative error measures
//! are collected in [`ModelStats`]; scalars and image grids go to a
//! [`SummaryWriter`].
//!
//! ```no_run
//! use maskdepth::{backend::TrainingBackend, config::TrainingConfig, training::run_training};
//!
//! # fn main() -> maskdepth::TrainerResult<()> {
//! let config = TrainingConfig::load("train.json")?;
//! let outcome = run_training::<TrainingBackend>(&config, maskdepth::backend::create_device())?;
//! println!("{}", outcome.stats.epoch_desc());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod stats;
pub mod summary;
pub mod trainer;
pub mod training;

#[doc(inline)]
pub use config::TrainingConfig;
#[doc(inline)]
pub use error::{TrainerError, TrainerResult};
#[doc(inline)]
pub use stats::{EpochStats, ModelStats};
#[doc(inline)]
pub use summary::SummaryWriter;
#[doc(inline)]
pub use trainer::{ModelTrainer, TestEpoch, TrainEpoch, TrainingOutcome};

#[doc(inline)]
pub use maskdepth_loss as loss;
#[doc(inline)]
pub use maskdepth_metric as metric;
#[doc(inline)]
pub use maskdepth_model as model;
#[doc(inline)]
pub use maskdepth_train as train;
#[doc(inline)]
pub use maskdepth_util as util;
