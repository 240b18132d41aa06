// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Depth Window Sampling
// ─────────────────────────────────────────────────────────────────────
//! Random training windows: k_F uniform in [1, k_max), then k_I uniform
//! in [1, k_F). When k_F = 1 the second range is empty and the window
//! collapses to [1, 1].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rsn_types::{DepthWindow, RsnError, RsnResult};

/// Draw one training window from `rng`. Requires `k_max >= 2`.
pub fn sample_window<R: Rng + ?Sized>(rng: &mut R, k_max: usize) -> RsnResult<DepthWindow> {
    if k_max < 2 {
        return Err(RsnError::Config(format!(
            "k_max must be >= 2 to sample a window, got {k_max}"
        )));
    }
    Ok(draw(rng, k_max))
}

fn draw<R: Rng + ?Sized>(rng: &mut R, k_max: usize) -> DepthWindow {
    let k_final = rng.gen_range(1..k_max);
    let k_initial = if k_final > 1 {
        rng.gen_range(1..k_final)
    } else {
        1
    };
    DepthWindow { k_initial, k_final }
}

/// Seeded window sampler owned by the trainer.
pub struct DepthSampler {
    k_max: usize,
    rng: ChaCha8Rng,
}

impl DepthSampler {
    pub fn new(k_max: usize, seed: u64) -> RsnResult<Self> {
        if k_max < 2 {
            return Err(RsnError::Config(format!(
                "k_max must be >= 2, got {k_max}"
            )));
        }
        Ok(Self {
            k_max,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn k_max(&self) -> usize {
        self.k_max
    }

    pub fn sample(&mut self) -> DepthWindow {
        // k_max validated in `new`
        draw(&mut self.rng, self.k_max)
    }

    /// One window per example.
    pub fn sample_many(&mut self, count: usize) -> Vec<DepthWindow> {
        (0..count).map(|_| self.sample()).collect()
    }
}
