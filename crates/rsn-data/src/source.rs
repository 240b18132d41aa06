// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Dataset Providers
// ─────────────────────────────────────────────────────────────────────
//! Dataset provider trait plus the synthetic sets used by the
//! experiments:
//!   - `UniformSource`: features in [0, 1), random labels
//!   - `CircleSource`: unit-circle points vs. a surrounding square
//!   - `JsonFileSource`: a serialised `Dataset` on disk

use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rsn_types::{RsnError, RsnResult};

use crate::dataset::Dataset;

/// Trait for dataset backends.
pub trait DataSource {
    /// Produce a validated dataset.
    fn load(&self) -> RsnResult<Dataset>;
}

/// Uniform features in [0, 1)^dim with labels uniform in [0, n_classes).
#[derive(Debug, Clone)]
pub struct UniformSource {
    pub count: usize,
    pub dim: usize,
    pub n_classes: usize,
    pub seed: u64,
}

impl DataSource for UniformSource {
    fn load(&self) -> RsnResult<Dataset> {
        if self.n_classes == 0 {
            return Err(RsnError::Dataset("n_classes must be >= 1".to_string()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let features: Vec<f64> = (0..self.count * self.dim).map(|_| rng.gen::<f64>()).collect();
        let labels: Vec<usize> = (0..self.count)
            .map(|_| rng.gen_range(0..self.n_classes))
            .collect();
        Dataset::new(self.dim, self.n_classes, features, labels)
    }
}

/// Two-class 2D set.
///
/// Class 1: `per_class` points on the circle of radius `radius`.
/// Class 0: `per_class` points uniform in the square [-L, L]², L = √(2π).
/// Rows are shuffled.
#[derive(Debug, Clone)]
pub struct CircleSource {
    pub per_class: usize,
    pub radius: f64,
    pub seed: u64,
}

/// Half-width of the square that class 0 is drawn from.
pub fn circle_square_half_width() -> f64 {
    std::f64::consts::TAU.sqrt()
}

impl CircleSource {
    pub fn new(per_class: usize, seed: u64) -> Self {
        Self {
            per_class,
            radius: 1.0,
            seed,
        }
    }
}

impl DataSource for CircleSource {
    fn load(&self) -> RsnResult<Dataset> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(RsnError::Dataset(format!(
                "radius must be finite and > 0, got {}",
                self.radius
            )));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let half = circle_square_half_width();
        let mut features = Vec::with_capacity(self.per_class * 4);
        let mut labels = Vec::with_capacity(self.per_class * 2);

        for _ in 0..self.per_class {
            let theta = rng.gen::<f64>() * std::f64::consts::TAU;
            features.push(self.radius * theta.cos());
            features.push(self.radius * theta.sin());
            labels.push(1);
        }
        for _ in 0..self.per_class {
            features.push(half * (2.0 * rng.gen::<f64>() - 1.0));
            features.push(half * (2.0 * rng.gen::<f64>() - 1.0));
            labels.push(0);
        }

        let mut ds = Dataset::new(2, 2, features, labels)?;
        ds.shuffle(&mut rng);
        Ok(ds)
    }
}

/// Reads a JSON-serialised `Dataset`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for JsonFileSource {
    fn load(&self) -> RsnResult<Dataset> {
        let json = std::fs::read_to_string(&self.path)?;
        let ds = Dataset::from_json(&json)?;
        log::info!(
            "Loaded {} examples (dim {}, {} classes) from {}",
            ds.len(),
            ds.dim,
            ds.n_classes,
            self.path.display()
        );
        Ok(ds)
    }
}
