// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Spectral Iteration Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Recurrent Spectral Network (RSN).
//!
//! A state vector is pushed through x' = 1 + g(A·x) / gain for a variable
//! number of steps; states inside a depth window are decoded through Φ⁻¹
//! and averaged, and the first n coefficients act as class scores.
//!
//! Architecture:
//!   - linalg: dense helpers + LU factorisation (decode and adjoint solves)
//!   - activation: nonlinearity trait, built-ins, closure-backed adapter
//!   - model: parameters, prepared operator, iterate/decode/classify
//!   - gradient: reverse-mode gradient through the recurrence + FD check
//!   - optimizer: Adam and SGD
//!   - sampler: seeded depth-window sampling
//!   - trainer: epoch loop, epoch logs, evaluation

#![deny(unsafe_code)]

pub mod activation;
pub mod gradient;
pub mod linalg;
pub mod model;
pub mod optimizer;
pub mod sampler;
pub mod trainer;

pub use activation::{ExternalActivation, Nonlinearity};
pub use gradient::{batch_gradient, batch_loss, gradient_fd, Gradients};
pub use linalg::LuFactor;
pub use model::{SpectralModel, SpectralOperator, SpectralParams, Trajectory};
pub use optimizer::{build_optimizer, Adam, Optimizer, Sgd};
pub use sampler::{sample_window, DepthSampler};
pub use trainer::{evaluate, Trainer};
