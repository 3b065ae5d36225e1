//! Training metrics and logging.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metrics for a single training epoch.
///
/// # Example
///
/// ```
/// use dex_training::EpochMetrics;
///
/// let metrics = EpochMetrics::new(1, 1.25, Some(0.4));
/// assert_eq!(metrics.epoch, 1);
/// assert!(metrics.test_accuracy.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, 1-indexed as it is logged.
    pub epoch: usize,

    /// Mean cross-entropy over the epoch's batches.
    pub train_loss: f32,

    /// Test accuracy in `[0, 1]`, on epochs where it was measured.
    pub test_accuracy: Option<f32>,

    /// Learning rate used.
    pub learning_rate: f32,

    /// Wall time of the epoch in seconds.
    pub train_time_secs: f32,

    /// Training samples processed.
    pub train_samples: usize,
}

impl EpochMetrics {
    /// Creates new epoch metrics.
    #[must_use]
    pub const fn new(epoch: usize, train_loss: f32, test_accuracy: Option<f32>) -> Self {
        Self {
            epoch,
            train_loss,
            test_accuracy,
            learning_rate: 0.0,
            train_time_secs: 0.0,
            train_samples: 0,
        }
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the training time.
    #[must_use]
    pub const fn with_train_time(mut self, secs: f32) -> Self {
        self.train_time_secs = secs;
        self
    }

    /// Sets the sample count.
    #[must_use]
    pub const fn with_samples(mut self, train: usize) -> Self {
        self.train_samples = train;
        self
    }
}

/// Aggregate metrics for a training run.
///
/// # Example
///
/// ```
/// use dex_training::{EpochMetrics, TrainingMetrics};
///
/// let mut metrics = TrainingMetrics::new();
/// metrics.add_epoch(EpochMetrics::new(1, 1.6, Some(0.25)));
/// metrics.add_epoch(EpochMetrics::new(2, 1.2, None));
///
/// assert_eq!(metrics.epochs_completed(), 2);
/// assert!((metrics.final_loss() - 1.2).abs() < 1e-6);
/// assert_eq!(metrics.best_epoch, Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Metrics for each epoch.
    pub epoch_metrics: Vec<EpochMetrics>,

    /// Best test accuracy seen.
    pub best_accuracy: Option<f32>,

    /// Epoch with the best test accuracy.
    pub best_epoch: Option<usize>,

    /// Accuracy over the whole test split after the last epoch.
    pub final_test_accuracy: Option<f32>,

    /// Total training time in seconds.
    pub total_time_secs: f32,
}

impl TrainingMetrics {
    /// Creates new empty training metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics for an epoch.
    pub fn add_epoch(&mut self, metrics: EpochMetrics) {
        if let Some(acc) = metrics.test_accuracy {
            if self.best_accuracy.is_none_or(|best| acc > best) {
                self.best_accuracy = Some(acc);
                self.best_epoch = Some(metrics.epoch);
            }
        }

        self.total_time_secs += metrics.train_time_secs;
        self.epoch_metrics.push(metrics);
    }

    /// Returns the number of completed epochs.
    #[must_use]
    pub fn epochs_completed(&self) -> usize {
        self.epoch_metrics.len()
    }

    /// Returns the final training loss (NaN before any epoch).
    #[must_use]
    pub fn final_loss(&self) -> f32 {
        self.epoch_metrics.last().map_or(f32::NAN, |m| m.train_loss)
    }

    /// Returns the initial training loss (NaN before any epoch).
    #[must_use]
    pub fn initial_loss(&self) -> f32 {
        self.epoch_metrics
            .first()
            .map_or(f32::NAN, |m| m.train_loss)
    }

    /// Fraction by which the loss dropped from the first to the last epoch.
    #[must_use]
    pub fn loss_improvement(&self) -> f32 {
        let initial = self.initial_loss();
        let final_loss = self.final_loss();
        if initial > 0.0 && !final_loss.is_nan() {
            1.0 - (final_loss / initial)
        } else {
            0.0
        }
    }

    /// Training losses, one per epoch.
    #[must_use]
    pub fn train_losses(&self) -> Vec<f32> {
        self.epoch_metrics.iter().map(|m| m.train_loss).collect()
    }

    /// `(epoch, accuracy)` for every epoch where accuracy was measured.
    #[must_use]
    pub fn accuracies(&self) -> Vec<(usize, f32)> {
        self.epoch_metrics
            .iter()
            .filter_map(|m| m.test_accuracy.map(|acc| (m.epoch, acc)))
            .collect()
    }

    /// Writes the metrics as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error if writing fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Training Summary");
        let _ = writeln!(s, "================");
        let _ = writeln!(s, "Epochs completed: {}", self.epochs_completed());
        let _ = writeln!(s, "Total time: {:.1}s", self.total_time_secs);
        let _ = writeln!(
            s,
            "Initial cost: {:.5} -> Final cost: {:.5}",
            self.initial_loss(),
            self.final_loss()
        );
        let _ = writeln!(s, "Improvement: {:.1}%", self.loss_improvement() * 100.0);

        if let (Some(best), Some(epoch)) = (self.best_accuracy, self.best_epoch) {
            let _ = writeln!(s, "Best test accuracy: {best:.5} (epoch {epoch})");
        }
        if let Some(acc) = self.final_test_accuracy {
            let _ = writeln!(s, "Final test accuracy: {acc:.5}");
        }

        s
    }
}
