//! Linear algebra operations
//!
//! Thin wrapper over nalgebra. All ndarray <-> nalgebra conversions are
//! contained here so callers only ever see ndarray types.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

// ============================================================================
// Conversion helpers (internal)
// ============================================================================

/// Convert ndarray Array2<Complex64> to nalgebra DMatrix<Complex<f64>>
#[inline]
fn to_na_complex(a: &Array2<Complex64>) -> DMatrix<nalgebra::Complex<f64>> {
    let (m, n) = a.dim();
    DMatrix::from_fn(m, n, |i, j| nalgebra::Complex::new(a[[i, j]].re, a[[i, j]].im))
}

/// Convert nalgebra DMatrix<Complex<f64>> to ndarray Array2<Complex64>
#[inline]
fn from_na_complex(m: &DMatrix<nalgebra::Complex<f64>>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| {
        Complex64::new(m[(i, j)].re, m[(i, j)].im)
    })
}

// ============================================================================
// Matrix inversion and solves
// ============================================================================

/// Invert a complex matrix
///
/// Returns None if matrix is singular or non-square.
pub fn inv_complex(a: &Array2<Complex64>) -> Option<Array2<Complex64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 {
        return None;
    }

    let mat = to_na_complex(a);
    mat.try_inverse().map(|inv| from_na_complex(&inv))
}

/// Solve the dense complex system `a * x = b` by LU decomposition
///
/// Returns None if `a` is singular or the shapes do not agree.
pub fn solve_complex(a: &Array2<Complex64>, b: &Array1<Complex64>) -> Option<Array1<Complex64>> {
    let (m, n) = a.dim();
    if m != n || m == 0 || b.len() != m {
        return None;
    }

    let rhs = DVector::from_fn(m, |i, _| nalgebra::Complex::new(b[i].re, b[i].im));
    let x = to_na_complex(a).lu().solve(&rhs)?;

    let out: Array1<Complex64> = x.iter().map(|v| Complex64::new(v.re, v.im)).collect();
    if out.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inv_complex() {
        let mut a = Array2::<Complex64>::zeros((2, 2));
        a[[0, 0]] = Complex64::new(1.0, 0.0);
        a[[0, 1]] = Complex64::new(2.0, 0.0);
        a[[1, 0]] = Complex64::new(3.0, 0.0);
        a[[1, 1]] = Complex64::new(4.0, 0.0);

        let inv = inv_complex(&a).unwrap();

        // A * A^(-1) should be identity
        let product = a.dot(&inv);
        assert_relative_eq!(product[[0, 0]].re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(product[[1, 1]].re, 1.0, epsilon = 1e-10);
        assert_relative_eq!(product[[0, 1]].re, 0.0, epsilon = 1e-10);
        assert_relative_eq!(product[[1, 0]].re, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_inv_complex_singular() {
        let a = Array2::<Complex64>::zeros((2, 2));
        assert!(inv_complex(&a).is_none());
    }

    #[test]
    fn test_solve_complex() {
        // [2 j; -j 3] x = [1; 1+j]
        let a = Array2::from_shape_vec(
            (2, 2),
            vec![
                Complex64::new(2.0, 0.0),
                Complex64::new(0.0, 1.0),
                Complex64::new(0.0, -1.0),
                Complex64::new(3.0, 0.0),
            ],
        )
        .unwrap();
        let b = Array1::from_vec(vec![Complex64::new(1.0, 0.0), Complex64::new(1.0, 1.0)]);

        let x = solve_complex(&a, &b).unwrap();
        let residual = a.dot(&x) - &b;
        for r in residual.iter() {
            assert_relative_eq!(r.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve_complex_shape_mismatch() {
        let a = Array2::<Complex64>::eye(3);
        let b = Array1::from_elem(2, Complex64::new(1.0, 0.0));
        assert!(solve_complex(&a, &b).is_none());
    }
}
