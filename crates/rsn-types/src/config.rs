// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{RsnError, RsnResult};
use crate::window::DepthWindow;

/// Elementwise nonlinearity g applied after the linear map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Softplus,
    Identity,
}

/// How the linear part A of one step is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// A = Φ. The Λ vector is carried but not consumed.
    #[default]
    Projection,
    /// A = Φ · diag(1…1, Λ) · Φ⁻¹. The first n eigen-directions are
    /// pinned at eigenvalue 1, the remaining N−n use Λ.
    Eigen,
}

/// Parameter update rule applied once per epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Sgd,
}

/// When training depth windows are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthSchedule {
    /// Fresh window per example, every epoch.
    #[default]
    PerEpoch,
    /// One window per example, drawn before the first epoch and reused.
    Frozen,
}

/// Runtime configuration for the spectral iteration model and trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsnConfig {
    /// State dimension N (rows and columns of Φ).
    /// Default: 10.
    pub n_nodes: usize,

    /// Number of classes n. Classification reads the first n coefficients.
    /// Default: 2.
    pub n_classes: usize,

    /// Exclusive upper bound for the sampled final depth k_F.
    /// Default: 100.
    pub k_max: usize,

    /// Training epochs (one optimizer step each).
    /// Default: 200.
    pub epochs: usize,

    /// Optimizer step size.
    /// Default: 0.01.
    pub learning_rate: f64,

    /// Divisor applied to g(A·x) in the step x' = 1 + g(A·x) / gain.
    /// Default: 1.5.
    pub gain: f64,

    pub activation: Activation,
    pub transition: TransitionMode,
    pub optimizer: OptimizerKind,
    pub depth_schedule: DepthSchedule,

    /// Depth window used by `classify`.
    /// Default: [60, 100].
    pub classify_window: DepthWindow,

    pub adam_beta1: f64,
    pub adam_beta2: f64,
    pub adam_eps: f64,

    /// Seed for parameter initialisation and depth sampling.
    pub seed: u64,
}

impl Default for RsnConfig {
    fn default() -> Self {
        Self {
            n_nodes: 10,
            n_classes: 2,
            k_max: 100,
            epochs: 200,
            learning_rate: 0.01,
            gain: 1.5,
            activation: Activation::Relu,
            transition: TransitionMode::Projection,
            optimizer: OptimizerKind::Adam,
            depth_schedule: DepthSchedule::PerEpoch,
            classify_window: DepthWindow {
                k_initial: 60,
                k_final: 100,
            },
            adam_beta1: 0.9,
            adam_beta2: 0.999,
            adam_eps: 1e-7,
            seed: 42,
        }
    }
}

impl RsnConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> RsnResult<()> {
        if self.n_nodes == 0 {
            return Err(RsnError::Config("n_nodes must be >= 1".to_string()));
        }
        if self.n_classes == 0 || self.n_classes > self.n_nodes {
            return Err(RsnError::Config(format!(
                "n_classes must be in [1, n_nodes={}], got {}",
                self.n_nodes, self.n_classes
            )));
        }
        if self.k_max < 2 {
            return Err(RsnError::Config(format!(
                "k_max must be >= 2, got {}",
                self.k_max
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RsnError::Config(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(RsnError::Config(format!(
                "gain must be finite and > 0, got {}",
                self.gain
            )));
        }
        if !(0.0..1.0).contains(&self.adam_beta1) || !(0.0..1.0).contains(&self.adam_beta2) {
            return Err(RsnError::Config(format!(
                "adam betas must be in [0, 1), got {} and {}",
                self.adam_beta1, self.adam_beta2
            )));
        }
        if !(self.adam_eps.is_finite() && self.adam_eps > 0.0) {
            return Err(RsnError::Config(format!(
                "adam_eps must be finite and > 0, got {}",
                self.adam_eps
            )));
        }
        self.classify_window.validate()?;
        Ok(())
    }

    /// Length of Λ (N − n).
    pub fn n_free(&self) -> usize {
        self.n_nodes.saturating_sub(self.n_classes)
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> RsnResult<Self> {
        serde_json::from_str(json).map_err(|e| RsnError::Config(format!("JSON parse error: {e}")))
    }
}
