//! Sampled frequency grids
//!
//! Holds the frequency vector shared by every S-matrix entry together with
//! the unit it was given in.

/// Frequency unit enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    #[default]
    Hz,
    KHz,
    MHz,
    GHz,
    THz,
}

impl FrequencyUnit {
    /// Get the multiplier to convert to Hz
    pub fn multiplier(&self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
            FrequencyUnit::THz => 1e12,
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hz" => Some(FrequencyUnit::Hz),
            "khz" => Some(FrequencyUnit::KHz),
            "mhz" => Some(FrequencyUnit::MHz),
            "ghz" => Some(FrequencyUnit::GHz),
            "thz" => Some(FrequencyUnit::THz),
            _ => None,
        }
    }
}

/// Sweep type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepType {
    #[default]
    Linear,
    Log,
}

/// A sampled frequency grid, stored in Hz
#[derive(Debug, Clone, PartialEq)]
pub struct Frequency {
    /// Frequency vector in Hz
    f: Vec<f64>,
    /// Display unit
    unit: FrequencyUnit,
}

impl Frequency {
    /// Create a new Frequency with start/stop/npoints
    ///
    /// # Example
    /// ```
    /// use s2spice_core::frequency::{Frequency, FrequencyUnit, SweepType};
    /// let freq = Frequency::new(1.0, 100.0, 4, FrequencyUnit::MHz, SweepType::Linear);
    /// assert_eq!(freq.f(), &[1e6, 34e6, 67e6, 100e6]);
    /// ```
    pub fn new(
        start: f64,
        stop: f64,
        npoints: usize,
        unit: FrequencyUnit,
        sweep_type: SweepType,
    ) -> Self {
        let mult = unit.multiplier();
        let start_hz = start * mult;
        let stop_hz = stop * mult;

        let f = match sweep_type {
            SweepType::Linear => {
                if npoints == 1 {
                    vec![start_hz]
                } else {
                    let step = (stop_hz - start_hz) / (npoints - 1) as f64;
                    (0..npoints).map(|i| start_hz + i as f64 * step).collect()
                }
            }
            SweepType::Log => {
                if npoints == 1 {
                    vec![start_hz]
                } else {
                    let log_start = start_hz.ln();
                    let log_step = (stop_hz.ln() - log_start) / (npoints - 1) as f64;
                    (0..npoints)
                        .map(|i| (log_start + i as f64 * log_step).exp())
                        .collect()
                }
            }
        };

        Self { f, unit }
    }

    /// Create from a frequency vector given in `unit`
    pub fn from_f(f: Vec<f64>, unit: FrequencyUnit) -> Self {
        let mult = unit.multiplier();
        Self {
            f: f.iter().map(|&x| x * mult).collect(),
            unit,
        }
    }

    /// Create from a frequency vector already in Hz
    pub fn from_hz(f: Vec<f64>) -> Self {
        Self {
            f,
            unit: FrequencyUnit::Hz,
        }
    }

    /// Get frequency vector in Hz
    #[inline]
    pub fn f(&self) -> &[f64] {
        &self.f
    }

    /// Number of frequency points
    #[inline]
    pub fn len(&self) -> usize {
        self.f.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.f.is_empty()
    }

    /// Unit the grid was given in
    #[inline]
    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// True when every point is finite and strictly greater than the previous one
    pub fn is_strictly_increasing(&self) -> bool {
        self.f.iter().all(|x| x.is_finite()) && self.f.windows(2).all(|w| w[1] > w[0])
    }
}

/// True when `f` is an evenly spaced grid, within `rel_tol` of the mean step.
///
/// A grid with fewer than three points is always uniform.
pub fn is_uniform(f: &[f64], rel_tol: f64) -> bool {
    if f.len() < 3 {
        return true;
    }
    let step = (f[f.len() - 1] - f[0]) / (f.len() - 1) as f64;
    f.iter()
        .enumerate()
        .all(|(i, &x)| (x - (f[0] + i as f64 * step)).abs() <= rel_tol * step.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_grid() {
        let freq = Frequency::new(1.0, 10.0, 10, FrequencyUnit::GHz, SweepType::Linear);

        assert_eq!(freq.len(), 10);
        assert_eq!(freq.unit(), FrequencyUnit::GHz);
        assert_relative_eq!(freq.f()[0], 1e9, epsilon = 1.0);
        assert_relative_eq!(freq.f()[9], 10e9, epsilon = 1.0);
        assert!(is_uniform(freq.f(), 1e-9));
    }

    #[test]
    fn test_log_grid_is_not_uniform() {
        let freq = Frequency::new(0.1, 10.0, 3, FrequencyUnit::GHz, SweepType::Log);

        assert_relative_eq!(freq.f()[1], 1e9, max_relative = 1e-12);
        assert!(!is_uniform(freq.f(), 1e-9));
    }

    #[test]
    fn test_single_point() {
        let freq = Frequency::new(5.0, 5.0, 1, FrequencyUnit::MHz, SweepType::Log);
        assert_eq!(freq.f(), &[5e6]);
        assert!(freq.is_strictly_increasing());
    }

    #[test]
    fn test_from_f_scales_to_hz() {
        let freq = Frequency::from_f(vec![1.0, 5.0, 200.0], FrequencyUnit::KHz);
        assert_eq!(freq.f(), &[1e3, 5e3, 200e3]);
    }

    #[test]
    fn test_frequency_unit_from_str() {
        assert_eq!(FrequencyUnit::from_str("ghz"), Some(FrequencyUnit::GHz));
        assert_eq!(FrequencyUnit::from_str("GHZ"), Some(FrequencyUnit::GHz));
        assert_eq!(FrequencyUnit::from_str("MHz"), Some(FrequencyUnit::MHz));
        assert_eq!(FrequencyUnit::from_str("invalid"), None);
    }

    #[test]
    fn test_strictly_increasing() {
        assert!(Frequency::from_hz(vec![1.0, 2.0, 3.0]).is_strictly_increasing());
        assert!(!Frequency::from_hz(vec![1.0, 1.0, 3.0]).is_strictly_increasing());
        assert!(!Frequency::from_hz(vec![1.0, f64::NAN]).is_strictly_increasing());
    }

    #[test]
    fn test_is_uniform() {
        assert!(is_uniform(&[1e6, 34e6, 67e6, 100e6], 1e-9));
        assert!(!is_uniform(&[1e6, 2e6, 4e6], 1e-9));
        assert!(is_uniform(&[5.0], 1e-9));
    }
}
