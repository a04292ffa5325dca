//! Epoch orchestration: a training pass, a test pass, statistics and
//! learning rate bookkeeping, then the final record.

mod test_epoch;
mod train_epoch;

use std::{fs, path::PathBuf};

use burn::{
    module::{AutodiffModule, Module},
    optim::Optimizer,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
};
use maskdepth_metric::DualErrors;
use maskdepth_model::DualHeadModel;

pub use test_epoch::TestEpoch;
pub use train_epoch::TrainEpoch;

use crate::{
    error::{TrainerError, TrainerResult},
    scheduler::LearningRate,
    stats::ModelStats,
    summary::SummaryWriter,
};

/// Model and history of a finished run.
pub struct TrainingOutcome<M> {
    pub model: M,
    pub stats: ModelStats,
}

/// Drives a model through training and test epochs.
pub struct ModelTrainer<B: AutodiffBackend, M, O> {
    model: M,
    optim: O,
    lr: LearningRate,
    stats: ModelStats,
    writer: SummaryWriter,
    train: TrainEpoch<B>,
    test: TestEpoch<B::InnerBackend>,
    artifact_dir: PathBuf,
}

impl<B, M, O> ModelTrainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + DualHeadModel<B>,
    M::InnerModule: DualHeadModel<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    /// Statistics are saved to `<artifact_dir>/stats.json` and the model to
    /// `<artifact_dir>/model`.
    pub fn new(
        model: M,
        optim: O,
        lr: LearningRate,
        train: TrainEpoch<B>,
        test: TestEpoch<B::InnerBackend>,
        writer: SummaryWriter,
        artifact_dir: impl Into<PathBuf>,
    ) -> Self {
        let artifact_dir = artifact_dir.into();
        Self {
            model,
            optim,
            lr,
            stats: ModelStats::new(artifact_dir.join("stats.json")),
            writer,
            train,
            test,
            artifact_dir,
        }
    }

    pub fn run(self, epochs: usize) -> TrainerResult<TrainingOutcome<M>> {
        let Self {
            mut model,
            mut optim,
            mut lr,
            mut stats,
            mut writer,
            train,
            test,
            artifact_dir,
        } = self;

        for epoch in 1..=epochs {
            tracing::info!(epoch, epochs, lr = lr.current(), "epoch started");

            model = train.run(model, &mut optim, &mut stats, &mut writer, &mut lr)?;
            test.run(&model.valid(), &mut stats, &mut lr, epoch)?;

            stats.next_epoch(lr.current());
            tracing::info!("{}", stats.epoch_desc());

            lr.after_epoch();
            tracing::info!(epoch, lr = lr.current(), "learning rate");
            writer.flush();
        }

        fs::create_dir_all(&artifact_dir).map_err(|e| TrainerError::io(&artifact_dir, e))?;
        stats.save()?;

        let record_path = artifact_dir.join("model");
        model
            .clone()
            .save_file(record_path.clone(), &CompactRecorder::new())
            .map_err(|e| TrainerError::Record {
                reason: e.to_string(),
            })?;
        writer.close();

        tracing::info!(
            epochs,
            batches = stats.batches(),
            model = %record_path.display(),
            "training finished"
        );
        Ok(TrainingOutcome { model, stats })
    }
}

/// Log the quantitative measures of both heads.
fn log_measures(split: &str, errors: &DualErrors) {
    for (head, measures) in [("mask", errors.mask), ("depth", errors.depth)] {
        match measures {
            Some(measures) => tracing::info!(split, head, "{measures}"),
            None => tracing::info!(split, head, "no samples"),
        }
    }
}
