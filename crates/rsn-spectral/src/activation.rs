// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Nonlinearities
// ─────────────────────────────────────────────────────────────────────
//! The nonlinearity g in x' = 1 + g(A·x) / gain.
//!
//! Configured through `Activation`; any other function can be plugged in
//! through `ExternalActivation` as long as it supplies its derivative.

use rsn_types::Activation;

/// Trait for elementwise nonlinearities with a known derivative.
pub trait Nonlinearity: Send + Sync {
    fn apply(&self, x: f64) -> f64;
    /// dg/dx at `x`.
    fn derivative(&self, x: f64) -> f64;
}

/// Stable softplus: log(1 + exp(x)) with overflow protection.
#[inline]
pub fn softplus(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else if x < -20.0 {
        0.0
    } else {
        (1.0 + x.exp()).ln()
    }
}

/// Derivative of softplus: sigmoid(x) = 1/(1+exp(-x)).
#[inline]
pub fn softplus_deriv(x: f64) -> f64 {
    if x > 20.0 {
        1.0
    } else if x < -20.0 {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

impl Nonlinearity for Activation {
    #[inline]
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Softplus => softplus(x),
            Activation::Identity => x,
        }
    }

    #[inline]
    fn derivative(&self, x: f64) -> f64 {
        match self {
            // Subgradient 0 at the kink
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Activation::Softplus => softplus_deriv(x),
            Activation::Identity => 1.0,
        }
    }
}

type ScalarFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Nonlinearity backed by caller-supplied closures.
pub struct ExternalActivation {
    apply_fn: ScalarFn,
    derivative_fn: ScalarFn,
}

impl ExternalActivation {
    pub fn new(
        apply_fn: impl Fn(f64) -> f64 + Send + Sync + 'static,
        derivative_fn: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            apply_fn: Box::new(apply_fn),
            derivative_fn: Box::new(derivative_fn),
        }
    }
}

impl Nonlinearity for ExternalActivation {
    fn apply(&self, x: f64) -> f64 {
        (self.apply_fn)(x)
    }

    fn derivative(&self, x: f64) -> f64 {
        (self.derivative_fn)(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Activation; 4] = [
        Activation::Relu,
        Activation::Tanh,
        Activation::Softplus,
        Activation::Identity,
    ];

    #[test]
    fn test_relu() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(3.0), 3.0);
        assert_eq!(Activation::Relu.derivative(0.0), 0.0);
        assert_eq!(Activation::Relu.derivative(0.1), 1.0);
    }

    #[test]
    fn test_softplus_values() {
        assert!((softplus(0.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!((softplus(100.0) - 100.0).abs() < 1e-10);
        assert_eq!(softplus(-100.0), 0.0);
    }

    #[test]
    fn test_derivatives_match_finite_difference() {
        // Avoid the ReLU kink at 0
        for act in ALL {
            for &x in &[-2.5, -0.7, 0.3, 1.9] {
                let h = 1e-6;
                let fd = (act.apply(x + h) - act.apply(x - h)) / (2.0 * h);
                assert!(
                    (fd - act.derivative(x)).abs() < 1e-6,
                    "{act:?}'({x}) = {} but FD = {fd}",
                    act.derivative(x)
                );
            }
        }
    }

    #[test]
    fn test_external_activation() {
        let g = ExternalActivation::new(|x| x * x, |x| 2.0 * x);
        assert_eq!(g.apply(3.0), 9.0);
        assert_eq!(g.derivative(3.0), 6.0);
    }
}
