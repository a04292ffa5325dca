//! Per-batch and per-epoch training statistics.

use std::{
    fs,
    path::{Path, PathBuf},
};

use maskdepth_metric::DualErrors;
use serde::{Deserialize, Serialize};

use crate::error::{TrainerError, TrainerResult};

/// Summary of one finished epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    pub test_loss: f64,
    pub lr: f64,
    pub train_errors: Option<DualErrors>,
    pub test_errors: Option<DualErrors>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct RunningLoss {
    sum: f64,
    count: usize,
}

impl RunningLoss {
    fn add(&mut self, loss: f64, count: usize) {
        self.sum += loss * count as f64;
        self.count += count;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StatsRecord {
    batch_train_loss: Vec<f64>,
    batch_lr: Vec<f64>,
    batch_test_loss: Vec<f64>,
    epochs: Vec<EpochStats>,
}

/// Loss and learning rate history of a run.
///
/// Batch losses are weighted by their sample count when averaged over an epoch.
#[derive(Debug, Clone)]
pub struct ModelStats {
    path: PathBuf,
    record: StatsRecord,
    train: RunningLoss,
    test: RunningLoss,
    train_errors: Option<DualErrors>,
    test_errors: Option<DualErrors>,
}

impl ModelStats {
    /// Statistics saved to `path` by [`ModelStats::save`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: StatsRecord::default(),
            train: RunningLoss::default(),
            test: RunningLoss::default(),
            train_errors: None,
            test_errors: None,
        }
    }

    /// Number of training batches recorded over the whole run.
    pub fn batches(&self) -> usize {
        self.record.batch_train_loss.len()
    }

    /// Number of finished epochs.
    pub fn epochs(&self) -> usize {
        self.record.epochs.len()
    }

    pub fn history(&self) -> &[EpochStats] {
        &self.record.epochs
    }

    /// Loss of every test batch of the run, in order.
    pub fn batch_test_losses(&self) -> &[f64] {
        &self.record.batch_test_loss
    }

    pub fn add_batch_train_stats(&mut self, loss: f64, count: usize, lr: f64) {
        self.record.batch_train_loss.push(loss);
        self.record.batch_lr.push(lr);
        self.train.add(loss, count);
    }

    pub fn add_batch_test_stats(&mut self, loss: f64, count: usize) {
        self.record.batch_test_loss.push(loss);
        self.test.add(loss, count);
    }

    pub fn set_train_errors(&mut self, errors: DualErrors) {
        self.train_errors = Some(errors);
    }

    pub fn set_test_errors(&mut self, errors: DualErrors) {
        self.test_errors = Some(errors);
    }

    /// Mean test loss of the epoch in progress.
    pub fn current_test_loss(&self) -> f64 {
        self.test.mean()
    }

    /// Close the current epoch with the learning rate it ran at.
    pub fn next_epoch(&mut self, lr: f64) -> &EpochStats {
        let epoch = EpochStats {
            epoch: self.epochs() + 1,
            train_loss: self.train.mean(),
            test_loss: self.test.mean(),
            lr,
            train_errors: self.train_errors.take(),
            test_errors: self.test_errors.take(),
        };
        self.train = RunningLoss::default();
        self.test = RunningLoss::default();
        self.record.epochs.push(epoch);
        &self.record.epochs[self.record.epochs.len() - 1]
    }

    pub fn latest_batch_desc(&self) -> String {
        match (
            self.record.batch_train_loss.last(),
            self.record.batch_lr.last(),
        ) {
            (Some(loss), Some(lr)) => format!(
                "Batch={} Loss={loss:0.4} Avg Loss={:0.4} LR={lr:0.6}",
                self.batches(),
                self.train.mean()
            ),
            _ => "Batch=0".to_owned(),
        }
    }

    pub fn epoch_desc(&self) -> String {
        match self.record.epochs.last() {
            Some(epoch) => format!(
                "Epoch={} Train Loss={:0.4} Test Loss={:0.4} LR={:0.6}",
                epoch.epoch, epoch.train_loss, epoch.test_loss, epoch.lr
            ),
            None => "Epoch=0".to_owned(),
        }
    }

    /// Write the history as pretty JSON, creating parent directories.
    pub fn save(&self) -> TrainerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TrainerError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.record).map_err(|source| {
            TrainerError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|e| TrainerError::io(&self.path, e))
    }

    /// Read a history written by [`ModelStats::save`].
    pub fn load(path: impl AsRef<Path>) -> TrainerResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| TrainerError::io(path, e))?;
        let record = serde_json::from_str(&json).map_err(|source| TrainerError::Serialization {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            record,
            ..Self::new(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_loss_is_weighted_by_batch_size() {
        let mut stats = ModelStats::new("stats.json");

        stats.add_batch_train_stats(1.0, 3, 0.1);
        stats.add_batch_train_stats(3.0, 1, 0.1);
        stats.add_batch_test_stats(2.0, 2);
        let epoch = stats.next_epoch(0.1).clone();

        assert_eq!(stats.batches(), 2);
        assert_eq!(epoch.epoch, 1);
        assert!((epoch.train_loss - 1.5).abs() < 1e-12);
        assert!((epoch.test_loss - 2.0).abs() < 1e-12);
    }

    #[test]
    fn next_epoch_resets_running_losses_but_not_batch_count() {
        let mut stats = ModelStats::new("stats.json");
        stats.add_batch_train_stats(1.0, 1, 0.1);
        stats.next_epoch(0.1);

        let epoch = stats.next_epoch(0.05).clone();

        assert_eq!(epoch.epoch, 2);
        assert_eq!(epoch.train_loss, 0.0);
        assert_eq!(epoch.test_loss, 0.0);
        assert_eq!(stats.batches(), 1);
        assert_eq!(stats.epochs(), 2);
    }

    #[test]
    fn descriptions_report_latest_values() {
        let mut stats = ModelStats::new("stats.json");
        assert_eq!(stats.latest_batch_desc(), "Batch=0");
        assert_eq!(stats.epoch_desc(), "Epoch=0");

        stats.add_batch_train_stats(0.5, 2, 0.01);
        assert_eq!(
            stats.latest_batch_desc(),
            "Batch=1 Loss=0.5000 Avg Loss=0.5000 LR=0.010000"
        );

        stats.add_batch_test_stats(0.25, 2);
        stats.next_epoch(0.01);
        assert_eq!(
            stats.epoch_desc(),
            "Epoch=1 Train Loss=0.5000 Test Loss=0.2500 LR=0.010000"
        );
    }

    #[test]
    fn errors_are_attached_to_the_closing_epoch() {
        let mut stats = ModelStats::new("stats.json");
        let errors = DualErrors {
            mask: None,
            depth: None,
        };
        stats.set_train_errors(errors);

        let first = stats.next_epoch(0.1).clone();
        let second = stats.next_epoch(0.1).clone();

        assert_eq!(first.train_errors, Some(errors));
        assert_eq!(second.train_errors, None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");
        let mut stats = ModelStats::new(&path);
        stats.add_batch_train_stats(0.5, 2, 0.01);
        stats.next_epoch(0.01);

        stats.save().unwrap();
        let loaded = ModelStats::load(&path).unwrap();

        assert_eq!(loaded.batches(), 1);
        assert_eq!(loaded.history(), stats.history());
    }
}
