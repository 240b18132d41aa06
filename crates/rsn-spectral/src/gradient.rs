// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Loss Gradients
// ─────────────────────────────────────────────────────────────────────
//! Reverse-mode gradient of the squared coefficient error with respect
//! to Φ and Λ, through the window-averaged decode and every iteration
//! step up to k_F.
//!
//! Per example, with x̄ the window mean, c = Φ⁻¹ x̄ and q = Φ⁻ᵀ ∂L/∂c:
//!   ∂L/∂Φ  += −q cᵀ                      (decode)
//!   λ_t     = Σ_{k ≥ t, k ∈ window} q / W  + back-propagated adjoint
//!   δ_t     = λ_t ⊙ g'(a_{t−1}) / gain
//! then per step, Projection: ∂Φ += δ x_{t−1}ᵀ, λ_{t−1} = Φᵀ δ;
//! Eigen (a = Φ D u, u = Φ⁻¹ x):
//!   ∂Φ += δ (D u)ᵀ,  dv = Φᵀ δ,  ∂Λ_j += dv_{n+j} u_{n+j},
//!   p = Φ⁻ᵀ (D dv),  ∂Φ += −p uᵀ,  λ_{t−1} = p.
//!
//! `gradient_fd` is the central finite-difference reference used to
//! validate the analytic path.

use rsn_data::{one_hot, Dataset};
use rsn_types::{DepthWindow, RsnError, RsnResult, TransitionMode};

use crate::linalg::{matvec_transposed, norm_sq, outer_add};
use crate::model::{squared_error, SpectralOperator, SpectralParams};

/// Gradient of the loss with the same layout as `SpectralParams`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub phi: Vec<f64>,
    pub lambda: Vec<f64>,
}

impl Gradients {
    pub fn zeros_like(params: &SpectralParams) -> Self {
        Self {
            phi: vec![0.0; params.phi.len()],
            lambda: vec![0.0; params.lambda.len()],
        }
    }

    /// L2 norm over Φ and Λ together.
    pub fn norm(&self) -> f64 {
        (norm_sq(&self.phi) + norm_sq(&self.lambda)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.phi.iter().chain(self.lambda.iter()).all(|g| g.is_finite())
    }

    /// Φ entries followed by Λ entries.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut flat = self.phi.clone();
        flat.extend_from_slice(&self.lambda);
        flat
    }
}

/// Accumulate `scale · ∂L/∂θ` of one example into `grads` and return its
/// unscaled loss.
pub fn accumulate_example(
    op: &SpectralOperator<'_>,
    x0: &[f64],
    label: usize,
    window: DepthWindow,
    scale: f64,
    grads: &mut Gradients,
) -> RsnResult<f64> {
    window.validate()?;
    let model = op.model();
    let cfg = model.config();
    let params = model.params();
    let n = params.n_nodes;
    let n_classes = params.n_classes;
    let phi = &params.phi;
    let g = model.nonlinearity();
    let d = op.eigenvalues();

    let traj = op.trajectory(x0, window.k_final)?;
    let c = op.decode(&traj.window_mean(window)?)?;
    let loss = squared_error(&c, label);

    let dc: Vec<f64> = c
        .iter()
        .zip(one_hot(label, n))
        .map(|(&cj, t)| 2.0 * (cj - t) * scale)
        .collect();
    let mut q = vec![0.0; n];
    op.lu().solve_transposed(&dc, &mut q);
    outer_add(&mut grads.phi, &q, &c, -1.0);

    let w = window.len() as f64;
    let q_mean: Vec<f64> = q.iter().map(|v| v / w).collect();
    let mut adj = vec![0.0; n];
    let mut delta = vec![0.0; n];
    let mut v = vec![0.0; n];
    let mut dv = vec![0.0; n];
    let mut du = vec![0.0; n];

    for t in (1..=window.k_final).rev() {
        if window.contains(t) {
            for (a, &qm) in adj.iter_mut().zip(&q_mean) {
                *a += qm;
            }
        }
        let pre = traj.pre_activation(t - 1);
        for i in 0..n {
            delta[i] = adj[i] * g.derivative(pre[i]) / cfg.gain;
        }

        match cfg.transition {
            TransitionMode::Projection => {
                outer_add(&mut grads.phi, &delta, traj.state(t - 1), 1.0);
                matvec_transposed(phi, n, n, &delta, &mut adj);
            }
            TransitionMode::Eigen => {
                let u = traj.coefficient(t - 1);
                for j in 0..n {
                    v[j] = d[j] * u[j];
                }
                outer_add(&mut grads.phi, &delta, &v, 1.0);
                matvec_transposed(phi, n, n, &delta, &mut dv);
                for j in n_classes..n {
                    grads.lambda[j - n_classes] += dv[j] * u[j];
                }
                for j in 0..n {
                    du[j] = d[j] * dv[j];
                }
                op.lu().solve_transposed(&du, &mut adj);
                outer_add(&mut grads.phi, &adj, u, -1.0);
            }
        }
    }

    Ok(loss)
}

/// Mean loss and its gradient over `data`, one window per example.
pub fn batch_gradient(
    op: &SpectralOperator<'_>,
    data: &Dataset,
    windows: &[DepthWindow],
) -> RsnResult<(f64, Gradients)> {
    RsnError::check_len(data.len(), windows.len())?;
    if data.is_empty() {
        return Err(RsnError::Dataset("cannot train on an empty dataset".to_string()));
    }
    let scale = 1.0 / data.len() as f64;
    let mut grads = Gradients::zeros_like(op.model().params());
    let mut loss = 0.0;
    for ((row, label), &window) in data.iter().zip(windows) {
        loss += scale * accumulate_example(op, row, label, window, scale, &mut grads)?;
    }
    Ok((loss, grads))
}

/// Mean loss over `data` without gradients.
pub fn batch_loss(
    op: &SpectralOperator<'_>,
    data: &Dataset,
    windows: &[DepthWindow],
) -> RsnResult<f64> {
    RsnError::check_len(data.len(), windows.len())?;
    if data.is_empty() {
        return Err(RsnError::Dataset("cannot score an empty dataset".to_string()));
    }
    let mut total = 0.0;
    for ((row, label), &window) in data.iter().zip(windows) {
        total += squared_error(&op.coefficients(row, window)?, label);
    }
    Ok(total / data.len() as f64)
}

/// Central finite-difference gradient of `loss_fn` at `params`.
pub fn gradient_fd<F>(params: &SpectralParams, mut loss_fn: F, eps: f64) -> RsnResult<Gradients>
where
    F: FnMut(&SpectralParams) -> RsnResult<f64>,
{
    let mut grads = Gradients::zeros_like(params);
    let n_phi = params.phi.len();
    let mut shifted = params.clone();
    for i in 0..params.len() {
        let orig = if i < n_phi {
            params.phi[i]
        } else {
            params.lambda[i - n_phi]
        };
        shifted.set_flat(i, orig + eps);
        let up = loss_fn(&shifted)?;
        shifted.set_flat(i, orig - eps);
        let down = loss_fn(&shifted)?;
        shifted.set_flat(i, orig);
        let g = (up - down) / (2.0 * eps);
        if i < n_phi {
            grads.phi[i] = g;
        } else {
            grads.lambda[i - n_phi] = g;
        }
    }
    Ok(grads)
}
