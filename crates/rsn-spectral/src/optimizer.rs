// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Optimizers
// ─────────────────────────────────────────────────────────────────────
//! First-order updates of Φ and Λ. Adam keeps separate moment buffers
//! per parameter group.

use rsn_types::{OptimizerKind, RsnConfig};

use crate::gradient::Gradients;
use crate::model::SpectralParams;

/// Trait for parameter update rules.
pub trait Optimizer: Send {
    /// Apply one update in place.
    fn step(&mut self, params: &mut SpectralParams, grads: &Gradients);
    /// Updates applied so far.
    fn steps(&self) -> u64;
    fn name(&self) -> &'static str;
}

/// Plain gradient descent: θ ← θ − lr · g.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub learning_rate: f64,
    steps: u64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            steps: 0,
        }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut SpectralParams, grads: &Gradients) {
        for (p, g) in params.phi.iter_mut().zip(&grads.phi) {
            *p -= self.learning_rate * g;
        }
        for (p, g) in params.lambda.iter_mut().zip(&grads.lambda) {
            *p -= self.learning_rate * g;
        }
        self.steps += 1;
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn name(&self) -> &'static str {
        "sgd"
    }
}

#[derive(Debug, Clone, Default)]
struct Moments {
    m: Vec<f64>,
    v: Vec<f64>,
}

impl Moments {
    fn zeros(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }
}

/// Adam with bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    steps: u64,
    phi: Moments,
    lambda: Moments,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            eps,
            steps: 0,
            phi: Moments::default(),
            lambda: Moments::default(),
        }
    }

    fn update(&self, params: &mut [f64], grads: &[f64], moments: &mut Moments, t: i32) {
        if moments.m.len() != params.len() {
            *moments = Moments::zeros(params.len());
        }
        let bc1 = 1.0 - self.beta1.powi(t);
        let bc2 = 1.0 - self.beta2.powi(t);
        for i in 0..params.len() {
            let g = grads[i];
            moments.m[i] = self.beta1 * moments.m[i] + (1.0 - self.beta1) * g;
            moments.v[i] = self.beta2 * moments.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = moments.m[i] / bc1;
            let v_hat = moments.v[i] / bc2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut SpectralParams, grads: &Gradients) {
        self.steps += 1;
        let t = self.steps.min(i32::MAX as u64) as i32;
        let mut phi_m = std::mem::take(&mut self.phi);
        let mut lambda_m = std::mem::take(&mut self.lambda);
        self.update(&mut params.phi, &grads.phi, &mut phi_m, t);
        self.update(&mut params.lambda, &grads.lambda, &mut lambda_m, t);
        self.phi = phi_m;
        self.lambda = lambda_m;
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn name(&self) -> &'static str {
        "adam"
    }
}

/// Build the optimizer selected in `cfg`.
pub fn build_optimizer(cfg: &RsnConfig) -> Box<dyn Optimizer> {
    match cfg.optimizer {
        OptimizerKind::Adam => Box::new(Adam::new(
            cfg.learning_rate,
            cfg.adam_beta1,
            cfg.adam_beta2,
            cfg.adam_eps,
        )),
        OptimizerKind::Sgd => Box::new(Sgd::new(cfg.learning_rate)),
    }
}
