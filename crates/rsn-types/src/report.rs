// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Training and Evaluation Reports
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{RsnError, RsnResult};

/// Log entry for one training epoch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpochLog {
    /// 1-based epoch index.
    pub epoch: usize,
    /// Mean squared coefficient error over the epoch's examples.
    pub loss: f64,
    /// L2 norm of the full gradient (Φ and Λ) before the optimizer step.
    pub grad_norm: f64,
    /// Mean number of depths per sampled window.
    pub mean_window_len: f64,
    /// Smallest |pivot| of the LU factorisation of Φ. Near zero means Φ
    /// is close to singular.
    pub min_pivot: f64,
}

/// Outcome of a full training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs: Vec<EpochLog>,
}

impl TrainReport {
    pub fn first_loss(&self) -> Option<f64> {
        self.epochs.first().map(|e| e.loss)
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|e| e.loss)
    }

    /// True when every recorded loss is finite.
    pub fn all_finite(&self) -> bool {
        self.epochs.iter().all(|e| e.loss.is_finite())
    }

    /// Lowest loss seen, with its epoch.
    pub fn best(&self) -> Option<&EpochLog> {
        self.epochs.iter().min_by(|a, b| {
            a.loss
                .partial_cmp(&b.loss)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// Classification results over a labelled dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalReport {
    pub predictions: Vec<usize>,
    /// `confusion[true][predicted]` counts, n×n.
    pub confusion: Vec<Vec<usize>>,
    /// Mean squared coefficient error over the classification window.
    pub mean_loss: f64,
}

impl EvalReport {
    /// Build an empty n×n report.
    pub fn with_classes(n_classes: usize) -> Self {
        Self {
            predictions: Vec::new(),
            confusion: vec![vec![0; n_classes]; n_classes],
            mean_loss: 0.0,
        }
    }

    /// Count one prediction. Both indices must lie in [0, n_classes).
    pub fn record(&mut self, label: usize, predicted: usize) -> RsnResult<()> {
        let n = self.confusion.len();
        if label >= n || predicted >= n {
            return Err(RsnError::Dataset(format!(
                "label {label} / prediction {predicted} outside {n} classes"
            )));
        }
        self.confusion[label][predicted] += 1;
        self.predictions.push(predicted);
        Ok(())
    }

    /// Fraction of correct predictions in [0, 1]; 0 for an empty report.
    pub fn accuracy(&self) -> f64 {
        let total: usize = self.confusion.iter().flatten().sum();
        if total == 0 {
            log::warn!("accuracy requested on an empty evaluation");
            return 0.0;
        }
        let correct: usize = (0..self.confusion.len()).map(|i| self.confusion[i][i]).sum();
        correct as f64 / total as f64
    }
}
