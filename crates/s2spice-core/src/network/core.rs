//! Core Network struct and constructors

use std::path::Path;

use ndarray::{Array1, Array2, Array3, ArrayView3};
use num_complex::Complex64;

use super::reference::ReferenceImpedance;
use crate::error::NetworkError;
use crate::frequency::Frequency;
use crate::math::transforms::{y2s, z2s};
use crate::touchstone::parser::{ParameterType, Touchstone, TouchstoneError};

/// An N-port network described by sampled S-parameters
#[derive(Debug, Clone)]
pub struct Network {
    /// Frequency data
    pub frequency: Frequency,
    /// S-parameter data [nfreq, nports, nports]
    pub s: Array3<Complex64>,
    /// Reference impedance (per port)
    pub z0: Array1<Complex64>,
    /// Network name, the file stem when loaded from disk
    pub name: Option<String>,
    /// Comment lines from the source file, without the leading `!`
    pub comments: Vec<String>,
}

impl Network {
    /// Create a new Network from S-parameters
    ///
    /// Fails if the data is not a non-empty `[nfreq, n, n]` block matching the
    /// frequency grid and `z0`.
    pub fn new(
        frequency: Frequency,
        s: Array3<Complex64>,
        z0: Array1<Complex64>,
    ) -> Result<Self, NetworkError> {
        validate_dataset(
            frequency.f(),
            s.view(),
            &ReferenceImpedance::PerPort(z0.to_vec()),
        )?;
        Ok(Self {
            frequency,
            s,
            z0,
            name: None,
            comments: Vec::new(),
        })
    }

    /// Set the network name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Create from a Touchstone file; the name is taken from the file stem
    pub fn from_touchstone<P: AsRef<Path>>(path: P) -> Result<Self, TouchstoneError> {
        let path = path.as_ref();
        let ts = Touchstone::from_file(path)?;
        let mut ntwk = Self::from_touchstone_data(ts)?;
        ntwk.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());
        Ok(ntwk)
    }

    /// Create from Touchstone content string
    ///
    /// `nports` is the count the file extension would imply (0 for v2 content).
    pub fn from_touchstone_content(content: &str, nports: usize) -> Result<Self, TouchstoneError> {
        let ts = Touchstone::from_str(content, nports)?;
        Self::from_touchstone_data(ts)
    }

    fn from_touchstone_data(ts: Touchstone) -> Result<Self, TouchstoneError> {
        let nfreq = ts.nfreq();
        let nports = ts.nports;

        let params = Array3::from_shape_fn((nfreq, nports, nports), |(f, i, j)| ts.s[f][i][j]);
        let z0 = Array1::from_vec(ts.z0.iter().map(|&x| Complex64::new(x, 0.0)).collect());

        let s = Self::convert_params_to_s(params, &ts, &z0)?;

        let mut ntwk = Self::new(ts.frequency, s, z0)?;
        ntwk.comments = ts.comments;
        Ok(ntwk)
    }

    /// Bring Y or Z data to S; v1 files store them normalised to z0
    fn convert_params_to_s(
        params: Array3<Complex64>,
        ts: &Touchstone,
        z0: &Array1<Complex64>,
    ) -> Result<Array3<Complex64>, TouchstoneError> {
        let singular = || TouchstoneError::Parse {
            line: 0,
            message: format!("{:?}-parameters cannot be converted to S", ts.param_type),
        };

        match ts.param_type {
            ParameterType::S => Ok(params),
            ParameterType::Z => {
                let z = Self::denormalize_v1_params(params, ts, true);
                z2s(&z, z0).ok_or_else(singular)
            }
            ParameterType::Y => {
                let y = Self::denormalize_v1_params(params, ts, false);
                y2s(&y, z0).ok_or_else(singular)
            }
            other => Err(TouchstoneError::UnsupportedParameter(other)),
        }
    }

    /// Z-params scale by sqrt(z0_i * z0_j), Y-params by its inverse
    fn denormalize_v1_params(
        params: Array3<Complex64>,
        ts: &Touchstone,
        is_z_params: bool,
    ) -> Array3<Complex64> {
        if ts.is_v2 {
            return params;
        }

        let nports = params.shape()[1];
        let scaling = Array2::from_shape_fn((nports, nports), |(i, j)| {
            Complex64::new((ts.z0[i] * ts.z0[j]).sqrt(), 0.0)
        });

        if is_z_params {
            params * &scaling
        } else {
            params / &scaling
        }
    }

    /// Get the number of ports
    #[inline]
    pub fn nports(&self) -> usize {
        self.s.shape()[1]
    }

    /// Get the number of frequency points
    #[inline]
    pub fn nfreq(&self) -> usize {
        self.s.shape()[0]
    }

    /// Per-port reference impedance of this network
    pub fn reference_impedance(&self) -> ReferenceImpedance {
        ReferenceImpedance::PerPort(self.z0.to_vec())
    }
}

/// Check that `f`, `s` and `z0` form a usable dataset
///
/// Requires at least one port and one frequency, square slices, one slice per
/// frequency, finite strictly ascending frequencies, finite S values and a
/// positive resistance on every port.
pub fn validate_dataset(
    f: &[f64],
    s: ArrayView3<Complex64>,
    z0: &ReferenceImpedance,
) -> Result<(), NetworkError> {
    let (nslices, rows, cols) = s.dim();

    if rows != cols {
        return Err(NetworkError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(NetworkError::NoPorts);
    }
    if f.is_empty() {
        return Err(NetworkError::NoFrequencies);
    }
    if f.len() != nslices {
        return Err(NetworkError::LengthMismatch {
            freqs: f.len(),
            slices: nslices,
        });
    }
    if !Frequency::from_hz(f.to_vec()).is_strictly_increasing() {
        return Err(NetworkError::FrequencyOrder);
    }
    if let Some(((k, i, j), _)) = s
        .indexed_iter()
        .find(|(_, v)| !(v.re.is_finite() && v.im.is_finite()))
    {
        return Err(NetworkError::NonFinite {
            frequency: f[k],
            row: i + 1,
            col: j + 1,
        });
    }
    z0.resistances(rows)?;

    Ok(())
}
