use std::{fs, path::PathBuf, sync::Arc};

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, backend::Backend, cast::ToElement},
};
use maskdepth_loss::{l1_penalty, DualHeadLoss};
use maskdepth_metric::DualErrorAccumulator;
use maskdepth_model::{DualHeadModel, DualOutput, MaskDepthBatch};
use maskdepth_util::{GridOptions, ImageGrid};

use super::log_measures;
use crate::{
    config::LoggingConfig,
    error::{TrainerError, TrainerResult},
    scheduler::LearningRate,
    stats::ModelStats,
    summary::SummaryWriter,
};

/// One pass over the training split.
pub struct TrainEpoch<B: AutodiffBackend> {
    loader: Arc<dyn DataLoader<B, MaskDepthBatch<B>>>,
    loss: DualHeadLoss,
    l1_lambda: f64,
    logging: LoggingConfig,
    plots_dir: PathBuf,
}

impl<B: AutodiffBackend> TrainEpoch<B> {
    /// Creates `logging.plots_dir` if needed.
    pub fn new(
        loader: Arc<dyn DataLoader<B, MaskDepthBatch<B>>>,
        loss: DualHeadLoss,
        l1_lambda: f64,
        logging: LoggingConfig,
    ) -> TrainerResult<Self> {
        let plots_dir = PathBuf::from(&logging.plots_dir);
        fs::create_dir_all(&plots_dir).map_err(|e| TrainerError::io(&plots_dir, e))?;

        Ok(Self {
            loader,
            loss,
            l1_lambda,
            logging,
            plots_dir,
        })
    }

    /// Train `model` on every batch once and return the updated model.
    pub fn run<M, O>(
        &self,
        mut model: M,
        optim: &mut O,
        stats: &mut ModelStats,
        writer: &mut SummaryWriter,
        lr: &mut LearningRate,
    ) -> TrainerResult<M>
    where
        M: AutodiffModule<B> + DualHeadModel<B>,
        O: Optimizer<M, B>,
    {
        let mut errors = DualErrorAccumulator::new();

        for batch in self.loader.iter() {
            let output = model.forward_dual(batch.fgbg.clone());
            let mut loss = self.loss.forward(&output, &batch).total;
            if self.l1_lambda > 0.0 {
                let penalty = l1_penalty(&model, &batch.fgbg.device());
                loss = loss + penalty.mul_scalar(self.l1_lambda);
            }
            let loss_value = loss.clone().into_scalar().to_f64();

            let step = stats.batches();
            if step % self.logging.scalar_every == 0 {
                writer.add_scalar("loss/train", loss_value, step);
            }

            let output = output.inner();
            let targets = batch.inner();
            if (step + 1) % self.logging.image_every == 0 {
                self.save_images(writer, step, &output, &targets)?;
            }
            errors.update(&output, &targets);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            let current_lr = lr.current();
            model = optim.step(current_lr, model, grads);

            stats.add_batch_train_stats(loss_value, targets.batch_size(), current_lr);
            tracing::debug!("{}", stats.latest_batch_desc());
            lr.after_batch();
        }

        let measures = errors.finish();
        log_measures("train", &measures);
        stats.set_train_errors(measures);

        Ok(model)
    }

    /// Log the predictions at `step` and save inputs, targets and predictions
    /// as `<name>{step + 1}.jpg`.
    fn save_images<IB: Backend>(
        &self,
        writer: &mut SummaryWriter,
        step: usize,
        output: &DualOutput<IB>,
        targets: &MaskDepthBatch<IB>,
    ) -> TrainerResult<()> {
        let plain = GridOptions::new();
        writer.add_image("imagesmask", output.mask.clone(), step, &plain)?;
        writer.add_image("imagesdepth", output.depth.clone(), step, &plain)?;

        let plots = [
            ("fgbg", targets.fgbg.clone(), GridOptions::new().with_normalize(true)),
            ("orimask", targets.mask.clone(), plain.clone()),
            ("oridepth", targets.depth.clone(), plain.clone()),
            ("predmask", output.mask.clone(), plain.clone()),
            ("preddepth", output.depth.clone(), plain),
        ];
        for (name, images, options) in plots {
            let path = self.plots_dir.join(format!("{name}{}.jpg", step + 1));
            ImageGrid::save(images, &path, &options)?;
        }

        tracing::debug!(step, plots_dir = %self.plots_dir.display(), "saved training images");
        Ok(())
    }
}
