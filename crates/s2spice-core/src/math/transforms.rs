//! Network-parameter transformation functions
//!
//! Conversions from impedance (Z) and admittance (Y) data to S-parameters,
//! used when a Touchstone file stores something other than S.

use ndarray::{s, Array1, Array2, Array3};
use num_complex::Complex64;

use super::linalg::inv_complex;

/// Convert Z-parameters to S-parameters
///
/// S = F^-1 (Z - Z0) (Z + Z0)^-1 F, where F = diag(sqrt(z0)) and Z0 = diag(z0).
///
/// Returns None if `Z + Z0` is singular at any frequency.
pub fn z2s(z: &Array3<Complex64>, z0: &Array1<Complex64>) -> Option<Array3<Complex64>> {
    let (nfreq, nports, _) = z.dim();
    assert_eq!(nports, z0.len(), "z0 length must match number of ports");

    let sqrt_z0 = z0.mapv(|x| x.sqrt());
    let f_mat = Array2::from_diag(&sqrt_z0);
    let inv_f_mat = Array2::from_diag(&sqrt_z0.mapv(|x| Complex64::new(1.0, 0.0) / x));
    let z0_diag = Array2::from_diag(z0);

    let mut s = Array3::<Complex64>::zeros((nfreq, nports, nports));
    for f in 0..nfreq {
        let z_f = z.slice(s![f, .., ..]);
        let z_minus_z0 = &z_f - &z0_diag;
        let z_plus_z0 = &z_f + &z0_diag;

        let inv_term = inv_complex(&z_plus_z0)?;
        let s_f = inv_f_mat.dot(&z_minus_z0.dot(&inv_term)).dot(&f_mat);
        s.slice_mut(s![f, .., ..]).assign(&s_f);
    }

    Some(s)
}

/// Convert Y-parameters to S-parameters
///
/// S = (I - Y') (I + Y')^-1 with the normalised admittance Y' = F Y F.
///
/// Returns None if `I + Y'` is singular at any frequency.
pub fn y2s(y: &Array3<Complex64>, z0: &Array1<Complex64>) -> Option<Array3<Complex64>> {
    let (nfreq, nports, _) = y.dim();
    assert_eq!(nports, z0.len(), "z0 length must match number of ports");

    let identity = Array2::<Complex64>::eye(nports);
    let f_mat = Array2::from_diag(&z0.mapv(|x| x.sqrt()));

    let mut s = Array3::<Complex64>::zeros((nfreq, nports, nports));
    for f in 0..nfreq {
        let y_prime = f_mat.dot(&y.slice(s![f, .., ..])).dot(&f_mat);
        let i_minus_y = &identity - &y_prime;
        let i_plus_y = &identity + &y_prime;

        let inv_term = inv_complex(&i_plus_y)?;
        s.slice_mut(s![f, .., ..]).assign(&i_minus_y.dot(&inv_term));
    }

    Some(s)
}
