// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! RSN kernel: the spectral iteration model and its training driver.

pub mod config;
pub mod error;
pub mod report;
pub mod window;

pub use config::{Activation, DepthSchedule, OptimizerKind, RsnConfig, TransitionMode};
pub use error::{RsnError, RsnResult};
pub use report::{EpochLog, EvalReport, TrainReport};
pub use window::DepthWindow;
