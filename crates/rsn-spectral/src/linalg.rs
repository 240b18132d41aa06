// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Dense Linear Algebra
// ─────────────────────────────────────────────────────────────────────
//! Row-major dense helpers and an LU factorisation with partial
//! pivoting.
//!
//! Φ is factorised once per parameter state; every decode (Φ⁻¹ x) and
//! every adjoint solve (Φ⁻ᵀ y) reuses the factors. Pure Rust: for the
//! N ≤ a few hundred used here, O(N³) once plus O(N²) per solve is fine.

use rsn_types::{RsnError, RsnResult};

/// out = A · x, A is rows×cols row-major.
pub fn matvec(a: &[f64], rows: usize, cols: usize, x: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.len(), rows * cols);
    debug_assert_eq!(x.len(), cols);
    debug_assert_eq!(out.len(), rows);
    for i in 0..rows {
        let row = &a[i * cols..(i + 1) * cols];
        out[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
    }
}

/// out = Aᵀ · y, A is rows×cols row-major.
pub fn matvec_transposed(a: &[f64], rows: usize, cols: usize, y: &[f64], out: &mut [f64]) {
    debug_assert_eq!(a.len(), rows * cols);
    debug_assert_eq!(y.len(), rows);
    debug_assert_eq!(out.len(), cols);
    out.iter_mut().for_each(|v| *v = 0.0);
    for i in 0..rows {
        let yi = y[i];
        if yi == 0.0 {
            continue;
        }
        let row = &a[i * cols..(i + 1) * cols];
        for (o, &aij) in out.iter_mut().zip(row.iter()) {
            *o += aij * yi;
        }
    }
}

/// g += scale · u vᵀ, g is u.len()×v.len() row-major.
pub fn outer_add(g: &mut [f64], u: &[f64], v: &[f64], scale: f64) {
    let cols = v.len();
    debug_assert_eq!(g.len(), u.len() * cols);
    for (i, &ui) in u.iter().enumerate() {
        let s = scale * ui;
        if s == 0.0 {
            continue;
        }
        for (gij, &vj) in g[i * cols..(i + 1) * cols].iter_mut().zip(v.iter()) {
            *gij += s * vj;
        }
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn norm_sq(a: &[f64]) -> f64 {
    dot(a, a)
}

/// LU factorisation PA = LU with partial pivoting.
///
/// `lu` holds L below the diagonal (unit diagonal implied) and U on and
/// above it. Row i of PA is row `perm[i]` of A.
#[derive(Debug, Clone)]
pub struct LuFactor {
    n: usize,
    lu: Vec<f64>,
    perm: Vec<usize>,
    min_pivot: f64,
}

impl LuFactor {
    /// Factorise the n×n matrix `a`.
    ///
    /// Fails with `SingularMatrix` when the best available pivot in a
    /// column is below `n · ε · max|a_ij|`, and with `Numerical` when `a`
    /// contains NaN or Inf.
    pub fn factor(a: &[f64], n: usize) -> RsnResult<Self> {
        RsnError::check_len(n * n, a.len())?;
        if a.iter().any(|v| !v.is_finite()) {
            return Err(RsnError::Numerical(
                "matrix contains NaN or Inf".to_string(),
            ));
        }

        let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let tol = n as f64 * f64::EPSILON * scale;
        let mut lu = a.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut min_pivot = f64::INFINITY;

        for k in 0..n {
            // Partial pivot: largest |value| in column k at or below row k
            let mut p = k;
            let mut best = lu[k * n + k].abs();
            for i in (k + 1)..n {
                let v = lu[i * n + k].abs();
                if v > best {
                    best = v;
                    p = i;
                }
            }
            if best <= tol || scale == 0.0 {
                log::debug!("LU: pivot {best:.3e} <= tol {tol:.3e} in column {k}");
                return Err(RsnError::SingularMatrix { column: k });
            }
            min_pivot = min_pivot.min(best);

            if p != k {
                for j in 0..n {
                    lu.swap(k * n + j, p * n + j);
                }
                perm.swap(k, p);
            }

            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }

        Ok(Self {
            n,
            lu,
            perm,
            min_pivot,
        })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Smallest |pivot| encountered; a cheap conditioning indicator.
    pub fn min_pivot(&self) -> f64 {
        self.min_pivot
    }

    /// Solve A x = b.
    pub fn solve(&self, b: &[f64], x: &mut [f64]) {
        let n = self.n;
        debug_assert_eq!(b.len(), n);
        debug_assert_eq!(x.len(), n);

        // Forward: L y = P b
        for i in 0..n {
            let mut s = b[self.perm[i]];
            for j in 0..i {
                s -= self.lu[i * n + j] * x[j];
            }
            x[i] = s;
        }
        // Backward: U x = y
        for i in (0..n).rev() {
            let mut s = x[i];
            for j in (i + 1)..n {
                s -= self.lu[i * n + j] * x[j];
            }
            x[i] = s / self.lu[i * n + i];
        }
    }

    /// Solve Aᵀ x = b.
    ///
    /// Aᵀ = Uᵀ Lᵀ P, so solve Uᵀ y = b, then Lᵀ w = y, then x = Pᵀ w.
    pub fn solve_transposed(&self, b: &[f64], x: &mut [f64]) {
        let n = self.n;
        debug_assert_eq!(b.len(), n);
        debug_assert_eq!(x.len(), n);

        let mut w = vec![0.0; n];
        // Uᵀ is lower triangular with U's diagonal
        for i in 0..n {
            let mut s = b[i];
            for j in 0..i {
                s -= self.lu[j * n + i] * w[j];
            }
            w[i] = s / self.lu[i * n + i];
        }
        // Lᵀ is upper triangular with unit diagonal
        for i in (0..n).rev() {
            let mut s = w[i];
            for j in (i + 1)..n {
                s -= self.lu[j * n + i] * w[j];
            }
            w[i] = s;
        }
        for i in 0..n {
            x[self.perm[i]] = w[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matmul(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
        let mut c = vec![0.0; n * n];
        for i in 0..n {
            for k in 0..n {
                for j in 0..n {
                    c[i * n + j] += a[i * n + k] * b[k * n + j];
                }
            }
        }
        c
    }

    fn test_matrix() -> Vec<f64> {
        // Needs pivoting: a[0][0] = 0
        vec![
            0.0, 2.0, 1.0, //
            1.0, 1.0, 0.0, //
            3.0, 0.5, 4.0,
        ]
    }

    #[test]
    fn test_matvec_and_transposed() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 2×3
        let mut out = vec![0.0; 2];
        matvec(&a, 2, 3, &[1.0, 0.0, -1.0], &mut out);
        assert_eq!(out, vec![-2.0, -2.0]);

        let mut out_t = vec![0.0; 3];
        matvec_transposed(&a, 2, 3, &[1.0, 1.0], &mut out_t);
        assert_eq!(out_t, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_outer_add() {
        let mut g = vec![1.0; 4];
        outer_add(&mut g, &[1.0, 2.0], &[3.0, 4.0], 0.5);
        assert_eq!(g, vec![2.5, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_solve_residual() {
        let a = test_matrix();
        let lu = LuFactor::factor(&a, 3).unwrap();
        let b = [1.0, -2.0, 0.5];
        let mut x = vec![0.0; 3];
        lu.solve(&b, &mut x);
        let mut ax = vec![0.0; 3];
        matvec(&a, 3, 3, &x, &mut ax);
        for i in 0..3 {
            assert!((ax[i] - b[i]).abs() < 1e-12, "row {i}: {} vs {}", ax[i], b[i]);
        }
    }

    #[test]
    fn test_solve_transposed_residual() {
        let a = test_matrix();
        let lu = LuFactor::factor(&a, 3).unwrap();
        let b = [0.3, 1.0, -1.0];
        let mut x = vec![0.0; 3];
        lu.solve_transposed(&b, &mut x);
        let mut atx = vec![0.0; 3];
        matvec_transposed(&a, 3, 3, &x, &mut atx);
        for i in 0..3 {
            assert!((atx[i] - b[i]).abs() < 1e-12, "row {i}: {} vs {}", atx[i], b[i]);
        }
    }

    /// Φ⁻¹ assembled one unit column at a time.
    fn inverse_by_columns(lu: &LuFactor) -> Vec<f64> {
        let n = lu.dim();
        let mut inv = vec![0.0; n * n];
        let mut col = vec![0.0; n];
        for j in 0..n {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            lu.solve(&e, &mut col);
            for i in 0..n {
                inv[i * n + j] = col[i];
            }
        }
        inv
    }

    #[test]
    fn test_inverse_is_identity() {
        let a = test_matrix();
        let inv = inverse_by_columns(&LuFactor::factor(&a, 3).unwrap());
        let prod = matmul(&a, &inv, 3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((prod[i * 3 + j] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_inverse_2x2_closed_form() {
        let a = vec![2.0, 1.0, 1.0, 3.0];
        let inv = inverse_by_columns(&LuFactor::factor(&a, 2).unwrap());
        let expected = [0.6, -0.2, -0.2, 0.4];
        for (got, want) in inv.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-14);
        }
    }

    #[test]
    fn test_singular_detected() {
        let a = vec![1.0, 2.0, 2.0, 4.0];
        assert!(matches!(
            LuFactor::factor(&a, 2),
            Err(RsnError::SingularMatrix { column: 1 })
        ));
    }

    #[test]
    fn test_zero_matrix_singular() {
        assert!(matches!(
            LuFactor::factor(&[0.0; 4], 2),
            Err(RsnError::SingularMatrix { column: 0 })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(matches!(
            LuFactor::factor(&[1.0, f64::NAN, 0.0, 1.0], 2),
            Err(RsnError::Numerical(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(
            LuFactor::factor(&[1.0; 5], 2),
            Err(RsnError::Shape { .. })
        ));
    }

    #[test]
    fn test_min_pivot_positive() {
        let lu = LuFactor::factor(&test_matrix(), 3).unwrap();
        assert!(lu.min_pivot() > 0.0);
        assert_eq!(lu.dim(), 3);
    }
}
