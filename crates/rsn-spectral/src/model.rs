// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Spectral Iteration Model
// ─────────────────────────────────────────────────────────────────────
//! Iterated map and window-averaged decoding:
//!
//!   x_{t+1} = 1 + g(A · x_t) / gain
//!   c       = mean_{k ∈ [k_I, k_F]} Φ⁻¹ x_k  =  Φ⁻¹ · mean_k x_k
//!
//! with A = Φ (`Projection`) or A = Φ · diag(1…1, Λ) · Φ⁻¹ (`Eigen`).
//!
//! `SpectralOperator` holds one LU factorisation of Φ and is reused for
//! every depth, example and decode until the parameters change.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rsn_data::{one_hot, Dataset};
use rsn_types::{DepthWindow, RsnConfig, RsnError, RsnResult, TransitionMode};

use crate::activation::Nonlinearity;
use crate::linalg::{matvec, LuFactor};

/// Trainable parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralParams {
    pub n_nodes: usize,
    pub n_classes: usize,
    /// Φ, n_nodes × n_nodes row-major.
    pub phi: Vec<f64>,
    /// Λ, length n_nodes − n_classes.
    pub lambda: Vec<f64>,
}

impl SpectralParams {
    /// Φ uniform in [-1, 1), Λ uniform in [0.5, 1).
    pub fn random(n_nodes: usize, n_classes: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let phi = (0..n_nodes * n_nodes)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        let lambda = (0..n_nodes.saturating_sub(n_classes))
            .map(|_| rng.gen_range(0.5..1.0))
            .collect();
        Self {
            n_nodes,
            n_classes,
            phi,
            lambda,
        }
    }

    pub fn from_parts(
        n_nodes: usize,
        n_classes: usize,
        phi: Vec<f64>,
        lambda: Vec<f64>,
    ) -> RsnResult<Self> {
        RsnError::check_len(n_nodes * n_nodes, phi.len())?;
        RsnError::check_len(n_nodes.saturating_sub(n_classes), lambda.len())?;
        Ok(Self {
            n_nodes,
            n_classes,
            phi,
            lambda,
        })
    }

    /// Diagonal of D = diag(1…1, Λ): n ones, then Λ.
    pub fn eigenvalues(&self) -> Vec<f64> {
        let mut d = vec![1.0; self.n_classes.min(self.n_nodes)];
        d.extend_from_slice(&self.lambda);
        d
    }

    /// Total number of scalars (Φ and Λ).
    pub fn len(&self) -> usize {
        self.phi.len() + self.lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat view: Φ entries followed by Λ entries.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = self.phi.clone();
        flat.extend_from_slice(&self.lambda);
        flat
    }

    /// Set scalar `i` of the flat view.
    pub fn set_flat(&mut self, i: usize, value: f64) {
        if i < self.phi.len() {
            self.phi[i] = value;
        } else {
            self.lambda[i - self.phi.len()] = value;
        }
    }
}

/// Squared error between coefficients and the one-hot target of
/// `label`, zero-padded to the coefficient length.
pub fn squared_error(c: &[f64], label: usize) -> f64 {
    c.iter()
        .zip(one_hot(label, c.len()))
        .map(|(&cj, t)| (cj - t) * (cj - t))
        .sum()
}

/// Index of the largest of the first `n_classes` coefficients; ties go
/// to the lowest index.
pub fn argmax_class(c: &[f64], n_classes: usize) -> RsnResult<usize> {
    let head = &c[..n_classes.min(c.len())];
    if head.is_empty() {
        return Err(RsnError::Config("no class coefficients to compare".to_string()));
    }
    if head.iter().any(|v| !v.is_finite()) {
        return Err(RsnError::Numerical(
            "non-finite class coefficient".to_string(),
        ));
    }
    let mut best = 0;
    for (j, &v) in head.iter().enumerate().skip(1) {
        if v > head[best] {
            best = j;
        }
    }
    Ok(best)
}

/// States and intermediates of one forward run, kept for backprop.
///
/// `states` holds x_0 … x_K ((K+1)·N), `pre` holds A·x_t for t < K
/// (K·N). In `Eigen` mode `coeffs` holds u_t = Φ⁻¹ x_t for t < K.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub n: usize,
    pub depth: usize,
    pub states: Vec<f64>,
    pub pre: Vec<f64>,
    pub coeffs: Vec<f64>,
}

impl Trajectory {
    pub fn state(&self, t: usize) -> &[f64] {
        &self.states[t * self.n..(t + 1) * self.n]
    }

    pub fn pre_activation(&self, t: usize) -> &[f64] {
        &self.pre[t * self.n..(t + 1) * self.n]
    }

    /// u_t; empty in `Projection` mode.
    pub fn coefficient(&self, t: usize) -> &[f64] {
        if self.coeffs.is_empty() {
            return &[];
        }
        &self.coeffs[t * self.n..(t + 1) * self.n]
    }

    /// mean of x_k over the window, which must end within the run.
    pub fn window_mean(&self, window: DepthWindow) -> RsnResult<Vec<f64>> {
        window.validate()?;
        if window.k_final > self.depth {
            return Err(RsnError::Config(format!(
                "window ends at depth {} but the trajectory stops at {}",
                window.k_final, self.depth
            )));
        }
        let mut mean = vec![0.0; self.n];
        for k in window.k_initial..=window.k_final {
            for (m, &x) in mean.iter_mut().zip(self.state(k)) {
                *m += x;
            }
        }
        let w = window.len() as f64;
        mean.iter_mut().for_each(|m| *m /= w);
        Ok(mean)
    }
}

/// Spectral iteration model: parameters, configuration, nonlinearity.
pub struct SpectralModel {
    cfg: RsnConfig,
    params: SpectralParams,
    nonlinearity: Arc<dyn Nonlinearity>,
}

impl SpectralModel {
    /// Validate `cfg` and draw parameters from `cfg.seed`.
    pub fn new(cfg: RsnConfig) -> RsnResult<Self> {
        cfg.validate()?;
        let params = SpectralParams::random(cfg.n_nodes, cfg.n_classes, cfg.seed);
        Ok(Self::assemble(cfg, params))
    }

    /// Use explicit parameters (shapes must match `cfg`).
    pub fn with_params(cfg: RsnConfig, params: SpectralParams) -> RsnResult<Self> {
        cfg.validate()?;
        RsnError::check_len(cfg.n_nodes, params.n_nodes)?;
        RsnError::check_len(cfg.n_classes, params.n_classes)?;
        let params = SpectralParams::from_parts(
            params.n_nodes,
            params.n_classes,
            params.phi,
            params.lambda,
        )?;
        Ok(Self::assemble(cfg, params))
    }

    fn assemble(cfg: RsnConfig, params: SpectralParams) -> Self {
        let nonlinearity: Arc<dyn Nonlinearity> = Arc::new(cfg.activation);
        Self {
            cfg,
            params,
            nonlinearity,
        }
    }

    /// Replace the configured activation with a custom nonlinearity.
    pub fn with_nonlinearity(mut self, nonlinearity: Arc<dyn Nonlinearity>) -> Self {
        self.nonlinearity = nonlinearity;
        self
    }

    pub fn config(&self) -> &RsnConfig {
        &self.cfg
    }

    pub fn params(&self) -> &SpectralParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut SpectralParams {
        &mut self.params
    }

    pub fn nonlinearity(&self) -> &dyn Nonlinearity {
        self.nonlinearity.as_ref()
    }

    /// Factorise Φ for the current parameters.
    pub fn operator(&self) -> RsnResult<SpectralOperator<'_>> {
        let lu = LuFactor::factor(&self.params.phi, self.params.n_nodes)?;
        Ok(SpectralOperator {
            model: self,
            lu,
            eigenvalues: self.params.eigenvalues(),
        })
    }

    /// x' = 1 + g(a) / gain.
    fn activate(&self, a: &[f64], out: &mut [f64]) {
        let g = self.nonlinearity.as_ref();
        let gain = self.cfg.gain;
        for (o, &ai) in out.iter_mut().zip(a.iter()) {
            *o = 1.0 + g.apply(ai) / gain;
        }
    }

    /// One forward step from `x`.
    pub fn step(&self, x: &[f64]) -> RsnResult<Vec<f64>> {
        self.iterate(x, 1)
    }

    /// x after `k` steps; `k = 0` returns `x0` unchanged.
    ///
    /// `Projection` mode multiplies by Φ directly and works for a
    /// singular Φ; only `Eigen` mode factorises it.
    pub fn iterate(&self, x0: &[f64], k: usize) -> RsnResult<Vec<f64>> {
        let n = self.params.n_nodes;
        RsnError::check_len(n, x0.len())?;
        if k == 0 {
            return Ok(x0.to_vec());
        }
        match self.cfg.transition {
            TransitionMode::Projection => {
                let mut x = x0.to_vec();
                let mut a = vec![0.0; n];
                for _ in 0..k {
                    matvec(&self.params.phi, n, n, &x, &mut a);
                    self.activate(&a, &mut x);
                }
                Ok(x)
            }
            TransitionMode::Eigen => self.operator()?.iterate(x0, k),
        }
    }

    /// Φ⁻¹ x.
    pub fn decode(&self, x: &[f64]) -> RsnResult<Vec<f64>> {
        self.operator()?.decode(x)
    }

    /// Window-averaged decoded states.
    pub fn coefficients(&self, x0: &[f64], window: DepthWindow) -> RsnResult<Vec<f64>> {
        self.operator()?.coefficients(x0, window)
    }

    /// Predicted class in [0, n_classes).
    pub fn classify(&self, x0: &[f64]) -> RsnResult<usize> {
        self.operator()?.classify(x0)
    }

    /// Classify every row; Φ is factorised once for the whole batch.
    pub fn classify_batch(&self, data: &Dataset) -> RsnResult<Vec<usize>> {
        let op = self.operator()?;
        data.iter().map(|(row, _)| op.classify(row)).collect()
    }
}

/// Φ factorised once, reused for all depths and examples.
pub struct SpectralOperator<'a> {
    model: &'a SpectralModel,
    lu: LuFactor,
    eigenvalues: Vec<f64>,
}

impl<'a> SpectralOperator<'a> {
    pub fn model(&self) -> &'a SpectralModel {
        self.model
    }

    pub fn lu(&self) -> &LuFactor {
        &self.lu
    }

    pub fn min_pivot(&self) -> f64 {
        self.lu.min_pivot()
    }

    /// diag(1…1, Λ).
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    fn n(&self) -> usize {
        self.model.params.n_nodes
    }

    fn check_input(&self, x: &[f64]) -> RsnResult<()> {
        RsnError::check_len(self.n(), x.len())
    }

    /// Linear part: a = A·x. In `Eigen` mode also writes u = Φ⁻¹ x.
    fn linear(&self, x: &[f64], u: &mut [f64], v: &mut [f64], a: &mut [f64]) {
        let n = self.n();
        let phi = &self.model.params.phi;
        match self.model.cfg.transition {
            TransitionMode::Projection => matvec(phi, n, n, x, a),
            TransitionMode::Eigen => {
                self.lu.solve(x, u);
                for ((vj, &uj), &dj) in v.iter_mut().zip(u.iter()).zip(&self.eigenvalues) {
                    *vj = dj * uj;
                }
                matvec(phi, n, n, v, a);
            }
        }
    }

    fn activate(&self, a: &[f64], out: &mut [f64]) {
        self.model.activate(a, out)
    }

    /// x after `k` steps.
    pub fn iterate(&self, x0: &[f64], k: usize) -> RsnResult<Vec<f64>> {
        self.check_input(x0)?;
        let n = self.n();
        let mut x = x0.to_vec();
        let (mut u, mut v, mut a) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
        for _ in 0..k {
            self.linear(&x, &mut u, &mut v, &mut a);
            self.activate(&a, &mut x);
        }
        Ok(x)
    }

    /// Run `depth` steps keeping every state and pre-activation.
    pub fn trajectory(&self, x0: &[f64], depth: usize) -> RsnResult<Trajectory> {
        self.check_input(x0)?;
        let n = self.n();
        let eigen = self.model.cfg.transition == TransitionMode::Eigen;
        let mut states = Vec::with_capacity((depth + 1) * n);
        states.extend_from_slice(x0);
        let mut pre = vec![0.0; depth * n];
        let mut coeffs = if eigen { vec![0.0; depth * n] } else { Vec::new() };
        let mut u = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut next = vec![0.0; n];

        for t in 0..depth {
            let a = &mut pre[t * n..(t + 1) * n];
            self.linear(&states[t * n..(t + 1) * n], &mut u, &mut v, a);
            if eigen {
                coeffs[t * n..(t + 1) * n].copy_from_slice(&u);
            }
            self.activate(a, &mut next);
            states.extend_from_slice(&next);
        }

        Ok(Trajectory {
            n,
            depth,
            states,
            pre,
            coeffs,
        })
    }

    /// Φ⁻¹ x.
    pub fn decode(&self, x: &[f64]) -> RsnResult<Vec<f64>> {
        self.check_input(x)?;
        let mut c = vec![0.0; self.n()];
        self.lu.solve(x, &mut c);
        Ok(c)
    }

    /// mean over k ∈ window of Φ⁻¹ x_k.
    pub fn coefficients(&self, x0: &[f64], window: DepthWindow) -> RsnResult<Vec<f64>> {
        window.validate()?;
        self.check_input(x0)?;
        let n = self.n();
        let mut x = x0.to_vec();
        let mut sum = vec![0.0; n];
        let (mut u, mut v, mut a) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
        for k in 0..=window.k_final {
            if k > 0 {
                self.linear(&x, &mut u, &mut v, &mut a);
                self.activate(&a, &mut x);
            }
            if k >= window.k_initial {
                for (s, &xi) in sum.iter_mut().zip(x.iter()) {
                    *s += xi;
                }
            }
        }
        let w = window.len() as f64;
        sum.iter_mut().for_each(|s| *s /= w);
        self.decode(&sum)
    }

    /// Predicted class over the configured classification window.
    pub fn classify(&self, x0: &[f64]) -> RsnResult<usize> {
        let c = self.coefficients(x0, self.model.cfg.classify_window)?;
        argmax_class(&c, self.model.cfg.n_classes)
    }
}
