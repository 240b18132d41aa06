// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Depth Window
// ─────────────────────────────────────────────────────────────────────
//! Inclusive range of iteration depths [k_I, k_F] averaged over when
//! computing coefficients.

use serde::{Deserialize, Serialize};

use crate::error::{RsnError, RsnResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthWindow {
    /// First depth included (k_I).
    pub k_initial: usize,
    /// Last depth included (k_F).
    pub k_final: usize,
}

impl DepthWindow {
    /// Build a window, rejecting k_I > k_F.
    pub fn new(k_initial: usize, k_final: usize) -> RsnResult<Self> {
        let window = Self { k_initial, k_final };
        window.validate()?;
        Ok(window)
    }

    /// Window containing the single depth `k`.
    pub fn single(k: usize) -> Self {
        Self {
            k_initial: k,
            k_final: k,
        }
    }

    pub fn validate(&self) -> RsnResult<()> {
        if self.k_initial > self.k_final {
            return Err(RsnError::Config(format!(
                "depth window requires k_initial <= k_final, got [{}, {}]",
                self.k_initial, self.k_final
            )));
        }
        Ok(())
    }

    /// Number of depths in the window; 0 when k_I > k_F.
    pub fn len(&self) -> usize {
        (self.k_final + 1).saturating_sub(self.k_initial)
    }

    /// True when k_I > k_F.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, k: usize) -> bool {
        (self.k_initial..=self.k_final).contains(&k)
    }
}
