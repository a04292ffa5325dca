//! Building a run from a [`TrainingConfig`] and launching it.

use std::{fs, path::Path, sync::Arc};

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    optim::Optimizer,
    tensor::backend::{AutodiffBackend, Backend},
};
use maskdepth_model::{DualHeadNet, MaskDepthBatch};
use maskdepth_train::{MaskDepthBatcher, MaskDepthDataset, Normalization};

use crate::{
    config::{NormalizationConfig, OptimizerKind, TrainingConfig},
    error::{TrainerError, TrainerResult},
    scheduler::LearningRate,
    summary::SummaryWriter,
    trainer::{ModelTrainer, TestEpoch, TrainEpoch, TrainingOutcome},
};

/// Train the default [`DualHeadNet`] as described by `config`.
///
/// The configuration is copied to `<artifact_dir>/config.json`; statistics and
/// the model record are written next to it at the end of the run.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a dataset cannot be
/// listed, or logs and artifacts cannot be written.
pub fn run_training<B: AutodiffBackend>(
    config: &TrainingConfig,
    device: B::Device,
) -> TrainerResult<TrainingOutcome<DualHeadNet<B>>> {
    config.validate()?;
    B::seed(config.seed);
    tracing::info!(?device, seed = config.seed, "initializing training");

    let artifact_dir = Path::new(&config.artifact_dir);
    fs::create_dir_all(artifact_dir).map_err(|e| TrainerError::io(artifact_dir, e))?;
    config.save(artifact_dir.join("config.json"))?;

    let size = (config.dataset.image_size, config.dataset.image_size);
    let train_set = MaskDepthDataset::new(&config.dataset.train_dir, size)?
        .with_augmentation(&config.dataset.augmentation);
    let test_set = MaskDepthDataset::new(&config.dataset.test_dir, size)?;
    let train_items = train_set.len();
    tracing::info!(
        train = train_items,
        test = test_set.len(),
        image_size = config.dataset.image_size,
        "datasets loaded"
    );

    let normalization = config
        .dataset
        .normalization
        .as_ref()
        .map(NormalizationConfig::init)
        .transpose()?;
    let train_loader: Arc<dyn DataLoader<B, MaskDepthBatch<B>>> =
        DataLoaderBuilder::new(batcher::<B>(normalization.clone()))
            .batch_size(config.batch_size)
            .shuffle(config.seed)
            .num_workers(config.num_workers)
            .build(train_set);
    let test_loader: Arc<dyn DataLoader<B::InnerBackend, MaskDepthBatch<B::InnerBackend>>> =
        DataLoaderBuilder::new(batcher::<B::InnerBackend>(normalization))
            .batch_size(config.batch_size)
            .num_workers(config.num_workers)
            .build(test_set);

    let model = config
        .model
        .clone()
        .with_batch_size(config.batch_size)
        .init::<B>(&device)?;

    let lr = match &config.scheduler {
        Some(scheduler) => {
            let steps = config.scheduler_steps(train_items);
            tracing::info!(?scheduler, steps, per_batch = config.batch_scheduler, "scheduler created");
            LearningRate::scheduled(
                config.learning_rate,
                scheduler.init(config.learning_rate, steps),
                config.batch_scheduler,
            )?
        }
        None => LearningRate::constant(config.learning_rate),
    };

    let train = TrainEpoch::new(
        train_loader,
        config.loss.init(),
        config.l1_lambda,
        config.logging.clone(),
    )?;
    let test = TestEpoch::new(
        test_loader,
        config.loss.for_evaluation().init(),
        &config.logging.plots_dir,
    )?;
    let writer = SummaryWriter::new(&config.logging.log_dir)?;

    tracing::info!(optimizer = ?config.optimizer.kind, lr = config.learning_rate, "optimizer created");
    match config.optimizer.kind {
        OptimizerKind::Sgd => {
            let optim = config.optimizer.sgd().init::<B, DualHeadNet<B>>();
            fit(config, model, optim, lr, train, test, writer)
        }
        OptimizerKind::Adam => {
            let optim = config.optimizer.adam().init::<B, DualHeadNet<B>>();
            fit(config, model, optim, lr, train, test, writer)
        }
        OptimizerKind::AdamW => {
            let optim = config.optimizer.adamw().init::<B, DualHeadNet<B>>();
            fit(config, model, optim, lr, train, test, writer)
        }
    }
}

fn fit<B, O>(
    config: &TrainingConfig,
    model: DualHeadNet<B>,
    optim: O,
    lr: LearningRate,
    train: TrainEpoch<B>,
    test: TestEpoch<B::InnerBackend>,
    writer: SummaryWriter,
) -> TrainerResult<TrainingOutcome<DualHeadNet<B>>>
where
    B: AutodiffBackend,
    O: Optimizer<DualHeadNet<B>, B>,
{
    tracing::info!(epochs = config.num_epochs, "starting training");
    ModelTrainer::new(model, optim, lr, train, test, writer, &config.artifact_dir)
        .run(config.num_epochs)
}

fn batcher<B: Backend>(normalization: Option<Normalization>) -> MaskDepthBatcher<B> {
    match normalization {
        Some(normalization) => MaskDepthBatcher::with_normalization(normalization),
        None => MaskDepthBatcher::new(),
    }
}
