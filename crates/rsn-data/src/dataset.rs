// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Dataset Container
// ─────────────────────────────────────────────────────────────────────
//! Labelled rows of fixed-dimension vectors, row-major.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use rsn_types::{RsnError, RsnResult};

/// One-hot target of length `width` with a 1 at `label`.
///
/// Labels at or beyond `width` give an all-zero vector.
pub fn one_hot(label: usize, width: usize) -> Vec<f64> {
    let mut t = vec![0.0; width];
    if label < width {
        t[label] = 1.0;
    }
    t
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub dim: usize,
    pub n_classes: usize,
    /// len × dim, row-major.
    pub features: Vec<f64>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn new(
        dim: usize,
        n_classes: usize,
        features: Vec<f64>,
        labels: Vec<usize>,
    ) -> RsnResult<Self> {
        let ds = Self {
            dim,
            n_classes,
            features,
            labels,
        };
        ds.validate()?;
        Ok(ds)
    }

    /// Check shapes, label range, and finiteness.
    pub fn validate(&self) -> RsnResult<()> {
        if self.dim == 0 {
            return Err(RsnError::Dataset("dim must be >= 1".to_string()));
        }
        if self.n_classes == 0 {
            return Err(RsnError::Dataset("n_classes must be >= 1".to_string()));
        }
        if self.features.len() != self.labels.len() * self.dim {
            return Err(RsnError::Dataset(format!(
                "{} labels need {} feature values, got {}",
                self.labels.len(),
                self.labels.len() * self.dim,
                self.features.len()
            )));
        }
        if let Some(&bad) = self.labels.iter().find(|&&l| l >= self.n_classes) {
            return Err(RsnError::Dataset(format!(
                "label {bad} out of range for {} classes",
                self.n_classes
            )));
        }
        if let Some(pos) = self.features.iter().position(|v| !v.is_finite()) {
            return Err(RsnError::Dataset(format!(
                "non-finite feature in row {}",
                pos / self.dim
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.features[i * self.dim..(i + 1) * self.dim]
    }

    pub fn label(&self, i: usize) -> usize {
        self.labels[i]
    }

    /// Iterate `(row, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], usize)> + '_ {
        self.features
            .chunks_exact(self.dim)
            .zip(self.labels.iter().copied())
    }

    /// Number of examples per class.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }

    /// Zero-pad every row to `dim`. Shrinking is a shape error.
    pub fn embed(&self, dim: usize) -> RsnResult<Self> {
        if dim < self.dim {
            return Err(RsnError::Shape {
                expected: dim,
                got: self.dim,
            });
        }
        if dim == self.dim {
            return Ok(self.clone());
        }
        let mut features = vec![0.0; self.len() * dim];
        for (i, row) in self.features.chunks_exact(self.dim).enumerate() {
            features[i * dim..i * dim + self.dim].copy_from_slice(row);
        }
        Ok(Self {
            dim,
            n_classes: self.n_classes,
            features,
            labels: self.labels.clone(),
        })
    }

    /// Shuffle rows in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        *self = self.select(&order);
    }

    /// Split into (head, tail) with `round(len * fraction)` rows in head.
    pub fn split(&self, fraction: f64) -> RsnResult<(Self, Self)> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(RsnError::Dataset(format!(
                "split fraction must be in [0, 1], got {fraction}"
            )));
        }
        let cut = (self.len() as f64 * fraction).round() as usize;
        let head: Vec<usize> = (0..cut).collect();
        let tail: Vec<usize> = (cut..self.len()).collect();
        Ok((self.select(&head), self.select(&tail)))
    }

    fn select(&self, order: &[usize]) -> Self {
        let mut features = Vec::with_capacity(order.len() * self.dim);
        let mut labels = Vec::with_capacity(order.len());
        for &i in order {
            features.extend_from_slice(self.row(i));
            labels.push(self.labels[i]);
        }
        Self {
            dim: self.dim,
            n_classes: self.n_classes,
            features,
            labels,
        }
    }

    pub fn from_json(json: &str) -> RsnResult<Self> {
        let ds: Self = serde_json::from_str(json)
            .map_err(|e| RsnError::Dataset(format!("JSON parse error: {e}")))?;
        ds.validate()?;
        Ok(ds)
    }

    pub fn to_json(&self) -> RsnResult<String> {
        serde_json::to_string(self).map_err(|e| RsnError::Dataset(format!("JSON encode error: {e}")))
    }
}
