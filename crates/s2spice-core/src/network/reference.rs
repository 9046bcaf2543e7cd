//! Port reference impedances

use num_complex::Complex64;

use crate::error::NetworkError;

/// Reference impedance of a dataset: one value for every port, or one per port
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceImpedance {
    /// The same impedance on every port
    Uniform(Complex64),
    /// One impedance per port, in port order
    PerPort(Vec<Complex64>),
}

impl ReferenceImpedance {
    /// Uniform real reference impedance, e.g. `ReferenceImpedance::ohms(50.0)`
    pub fn ohms(r: f64) -> Self {
        ReferenceImpedance::Uniform(Complex64::new(r, 0.0))
    }

    /// Per-port real reference impedances
    pub fn per_port_ohms(r: &[f64]) -> Self {
        ReferenceImpedance::PerPort(r.iter().map(|&x| Complex64::new(x, 0.0)).collect())
    }

    /// Expand to exactly `nports` values, broadcasting a uniform impedance
    pub fn resolve(&self, nports: usize) -> Result<Vec<Complex64>, NetworkError> {
        match self {
            ReferenceImpedance::Uniform(z) => Ok(vec![*z; nports]),
            ReferenceImpedance::PerPort(z) if z.len() == nports => Ok(z.clone()),
            ReferenceImpedance::PerPort(z) => Err(NetworkError::ReferenceCount {
                expected: nports,
                got: z.len(),
            }),
        }
    }

    /// Termination resistances (real parts) of `nports` ports
    ///
    /// Every resistance must be finite and positive.
    pub fn resistances(&self, nports: usize) -> Result<Vec<f64>, NetworkError> {
        self.resolve(nports)?
            .iter()
            .enumerate()
            .map(|(i, z)| {
                if z.re.is_finite() && z.re > 0.0 {
                    Ok(z.re)
                } else {
                    Err(NetworkError::ReferenceResistance {
                        port: i + 1,
                        value: z.re,
                    })
                }
            })
            .collect()
    }
}

impl From<f64> for ReferenceImpedance {
    fn from(r: f64) -> Self {
        ReferenceImpedance::ohms(r)
    }
}

impl From<Complex64> for ReferenceImpedance {
    fn from(z: Complex64) -> Self {
        ReferenceImpedance::Uniform(z)
    }
}

impl From<Vec<Complex64>> for ReferenceImpedance {
    fn from(z: Vec<Complex64>) -> Self {
        ReferenceImpedance::PerPort(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_broadcast() {
        let z0 = ReferenceImpedance::ohms(50.0);
        assert_eq!(z0.resolve(3).unwrap(), vec![Complex64::new(50.0, 0.0); 3]);
        assert_eq!(
            z0.resistances(3).unwrap(),
            ReferenceImpedance::per_port_ohms(&[50.0; 3]).resistances(3).unwrap()
        );
    }

    #[test]
    fn test_per_port_count_mismatch() {
        let z0 = ReferenceImpedance::per_port_ohms(&[50.0, 75.0]);
        assert_eq!(
            z0.resolve(3).unwrap_err(),
            NetworkError::ReferenceCount {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn test_non_positive_resistance() {
        let z0 = ReferenceImpedance::per_port_ohms(&[50.0, 0.0]);
        assert_eq!(
            z0.resistances(2).unwrap_err(),
            NetworkError::ReferenceResistance {
                port: 2,
                value: 0.0
            }
        );
    }

    #[test]
    fn test_reactive_part_is_ignored() {
        let z0 = ReferenceImpedance::Uniform(Complex64::new(50.0, 10.0));
        assert_eq!(z0.resistances(1).unwrap(), vec![50.0]);
    }
}
