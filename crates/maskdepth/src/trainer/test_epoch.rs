use std::{fs, path::PathBuf, sync::Arc};

use burn::{
    data::dataloader::DataLoader,
    tensor::{backend::Backend, cast::ToElement, Tensor},
};
use maskdepth_loss::DualHeadLoss;
use maskdepth_metric::DualErrorAccumulator;
use maskdepth_model::{DualHeadModel, DualOutput, MaskDepthBatch};
use maskdepth_util::{GridOptions, ImageGrid};

use super::log_measures;
use crate::{
    error::{TrainerError, TrainerResult},
    scheduler::LearningRate,
    stats::ModelStats,
};

/// Images of the first test batch written to the plots directory.
const SHOWN_SAMPLES: usize = 8;

/// One pass over the test split, without autodiff.
pub struct TestEpoch<B: Backend> {
    loader: Arc<dyn DataLoader<B, MaskDepthBatch<B>>>,
    loss: DualHeadLoss,
    plots_dir: PathBuf,
}

impl<B: Backend> TestEpoch<B> {
    pub fn new(
        loader: Arc<dyn DataLoader<B, MaskDepthBatch<B>>>,
        loss: DualHeadLoss,
        plots_dir: impl Into<PathBuf>,
    ) -> TrainerResult<Self> {
        let plots_dir = plots_dir.into();
        fs::create_dir_all(&plots_dir).map_err(|e| TrainerError::io(&plots_dir, e))?;

        Ok(Self {
            loader,
            loss,
            plots_dir,
        })
    }

    /// Evaluate `model` on every batch. `epoch` numbers the saved plots.
    pub fn run<M: DualHeadModel<B>>(
        &self,
        model: &M,
        stats: &mut ModelStats,
        lr: &mut LearningRate,
        epoch: usize,
    ) -> TrainerResult<()> {
        let mut errors = DualErrorAccumulator::new();
        let mut last_loss = None;

        for (index, batch) in self.loader.iter().enumerate() {
            let output = model.forward_dual(batch.fgbg.clone());
            errors.update(&output, &batch);

            let loss = self.loss.forward(&output, &batch).total.into_scalar().to_f64();
            if index == 0 {
                self.show(epoch, &output, &batch)?;
            }
            stats.add_batch_test_stats(loss, batch.batch_size());
            last_loss = Some(loss);
        }

        tracing::info!(epoch, test_loss = stats.current_test_loss(), "test epoch finished");
        // The plateau scheduler follows the loss of the final batch.
        if let Some(loss) = last_loss {
            lr.after_test(loss);
        }

        let measures = errors.finish();
        log_measures("test", &measures);
        stats.set_test_errors(measures);

        Ok(())
    }

    fn show(
        &self,
        epoch: usize,
        output: &DualOutput<B>,
        batch: &MaskDepthBatch<B>,
    ) -> TrainerResult<()> {
        let shown = batch.batch_size().min(SHOWN_SAMPLES);
        let take = |tensor: &Tensor<B, 4>| tensor.clone().narrow(0, 0, shown);

        ImageGrid::save(
            take(&batch.fgbg),
            self.plots_dir.join(format!("test_fgbg_epoch{epoch}.jpg")),
            &GridOptions::new().with_normalize(true),
        )?;

        // One row per tensor: mask, predicted mask, depth, predicted depth.
        let results = Tensor::cat(
            vec![
                take(&batch.mask),
                take(&output.mask),
                take(&batch.depth),
                take(&output.depth),
            ],
            0,
        );
        ImageGrid::save(
            results,
            self.plots_dir.join(format!("test_results_epoch{epoch}.jpg")),
            &GridOptions::new().with_nrow(shown),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use burn::data::dataloader::DataLoaderBuilder;
    use maskdepth_loss::DualHeadLossConfig;
    use maskdepth_model::DualHeadNetConfig;
    use maskdepth_train::{MaskDepthBatcher, MaskDepthDataset};

    use super::*;
    use crate::{
        scheduler::LrScheduler,
        tests::{write_triplets, TestBackend},
    };

    /// Metric-driven scheduler remembering every observed value.
    struct Recording(Arc<Mutex<Vec<f64>>>);

    impl LrScheduler for Recording {
        fn current_lr(&self) -> f64 {
            0.1
        }

        fn step(&mut self) {}

        fn observe(&mut self, metric: f64) {
            self.0.lock().unwrap().push(metric);
        }

        fn is_metric_driven(&self) -> bool {
            true
        }
    }

    #[test]
    fn scheduler_observes_the_final_batch_loss() {
        let dir = tempfile::tempdir().unwrap();
        write_triplets(&dir.path().join("test"), &["a", "b"], 16, 16);
        let dataset = MaskDepthDataset::new(dir.path().join("test"), (16, 16)).unwrap();
        let loader = DataLoaderBuilder::new(MaskDepthBatcher::<TestBackend>::new())
            .batch_size(1)
            .build(dataset);
        let epoch = TestEpoch::new(
            loader,
            DualHeadLossConfig::new().for_evaluation().init(),
            dir.path().join("plots"),
        )
        .unwrap();
        let model = DualHeadNetConfig::new()
            .with_base_channels(4)
            .with_levels(2)
            .with_batch_size(1)
            .init::<TestBackend>(&Default::default())
            .unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let mut lr =
            LearningRate::scheduled(0.1, Box::new(Recording(observed.clone())), false).unwrap();
        let mut stats = ModelStats::new(dir.path().join("stats.json"));

        epoch.run(&model, &mut stats, &mut lr, 1).unwrap();

        let losses = stats.batch_test_losses();
        assert_eq!(losses.len(), 2);
        assert_ne!(losses[0], losses[1]);
        assert_eq!(*observed.lock().unwrap(), vec![losses[1]]);
        assert!(dir.path().join("plots/test_fgbg_epoch1.jpg").is_file());
        assert!(dir.path().join("plots/test_results_epoch1.jpg").is_file());
    }
}
