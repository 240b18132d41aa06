// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Datasets
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Labelled vector datasets and the providers that produce them.

pub mod dataset;
pub mod source;

pub use dataset::{one_hot, Dataset};
pub use source::{CircleSource, DataSource, JsonFileSource, UniformSource};
