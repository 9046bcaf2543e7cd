//! Round-trip re-measurement of a synthesized subcircuit
//!
//! Each port is driven in turn through its reference resistance. The port
//! voltages, scaled so the incident wave is 1, give column `n` of S directly,
//! except at the driven port where the incident wave itself is subtracted.

use std::fmt;
use std::fs;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView3, Axis};
use num_complex::Complex64;
use tracing::{info, info_span, warn};

use super::deck::scan_subcircuits;
use super::testbench::{AcSweep, Testbench};
use super::SimulatorBackend;
use crate::constants::{IS_CLOSE_ATOL, IS_CLOSE_RTOL, STIMULUS_AMPLITUDE, UNIFORM_GRID_TOL};
use crate::error::{NetworkError, VerifyError};
use crate::frequency::{is_uniform, Frequency};
use crate::network::{validate_dataset, ReferenceImpedance};

/// How the frequency grid is swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// One linear sweep per driven port; needs an evenly spaced grid and
    /// falls back to [`SweepMode::PerPoint`] otherwise
    #[default]
    Batched,
    /// One simulator run per frequency point and driven port
    PerPoint,
}

/// Round-trip settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifyOptions {
    /// AC amplitude of the driving source, in volts
    pub stimulus: f64,
    /// Relative tolerance of the element-wise comparison
    pub rtol: f64,
    /// Absolute tolerance of the element-wise comparison
    pub atol: f64,
    pub sweep: SweepMode,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            stimulus: STIMULUS_AMPLITUDE,
            rtol: IS_CLOSE_RTOL,
            atol: IS_CLOSE_ATOL,
            sweep: SweepMode::Batched,
        }
    }
}

impl VerifyOptions {
    pub fn with_sweep(mut self, sweep: SweepMode) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_tolerance(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }
}

/// `|a - b| <= atol + rtol * |b|`
#[inline]
pub fn is_close(a: Complex64, b: Complex64, rtol: f64, atol: f64) -> bool {
    (a - b).norm() <= atol + rtol * b.norm()
}

/// `measured - original` wherever the two are not close, zero elsewhere
pub fn error_matrix(
    measured: ArrayView3<Complex64>,
    original: ArrayView3<Complex64>,
    rtol: f64,
    atol: f64,
) -> Array3<Complex64> {
    let mut error = Array3::zeros(original.dim());
    ndarray::Zip::from(&mut error)
        .and(&measured)
        .and(&original)
        .for_each(|e, &m, &o| {
            if !is_close(m, o, rtol, atol) {
                *e = m - o;
            }
        });
    error
}

/// Re-measures subcircuits through a [`SimulatorBackend`]
pub struct RoundTrip<'b, B: SimulatorBackend + ?Sized> {
    backend: &'b B,
    options: VerifyOptions,
}

impl<'b, B: SimulatorBackend + ?Sized> RoundTrip<'b, B> {
    pub fn new(backend: &'b B) -> Self {
        Self {
            backend,
            options: VerifyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Measure the S-matrix of subcircuit `subckt` defined in `library`
    ///
    /// The port count is taken from the `.SUBCKT` line. Returns an array
    /// indexed `[frequency, output port, input port]`.
    pub fn measure(
        &self,
        library: &str,
        subckt: &str,
        f: &[f64],
        z0: &ReferenceImpedance,
    ) -> Result<Array3<Complex64>, VerifyError> {
        let nports = scan_subcircuits(library)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(subckt))
            .map(|(_, pins)| pins - 1)
            .ok_or_else(|| VerifyError::SubcircuitNotFound(subckt.to_string()))?;

        let _span = info_span!(
            "round_trip",
            backend = self.backend.name(),
            subckt,
            nports,
            points = f.len()
        )
        .entered();

        if f.is_empty() {
            return Err(NetworkError::NoFrequencies.into());
        }
        if !Frequency::from_hz(f.to_vec()).is_strictly_increasing() {
            return Err(NetworkError::FrequencyOrder.into());
        }
        if let ReferenceImpedance::PerPort(z) = z0 {
            if z.len() != nports {
                return Err(VerifyError::PortCountMismatch {
                    expected: z.len(),
                    found: nports,
                });
            }
        }
        let resistances = z0.resistances(nports)?;

        let mut mode = self.options.sweep;
        if mode == SweepMode::Batched && !is_uniform(f, UNIFORM_GRID_TOL) {
            warn!("frequency grid is not evenly spaced, sweeping point by point");
            mode = SweepMode::PerPoint;
        }

        let benches: Vec<Testbench> = (1..=nports)
            .map(|n| Testbench::new(subckt, &resistances, n, self.options.stimulus))
            .collect();
        let scale = Complex64::new(2.0 / self.options.stimulus, 0.0);
        let mut s = Array3::<Complex64>::zeros((f.len(), nports, nports));

        match mode {
            SweepMode::Batched => {
                let sweep = AcSweep::linear(f);
                for bench in &benches {
                    let v = self.run(library, bench, &sweep)?;
                    self.store_column(&mut s, bench.driven(), 0, &v, scale);
                }
            }
            SweepMode::PerPoint => {
                for (k, &fk) in f.iter().enumerate() {
                    info!("sweeping point {} / {} at {:.3} MHz", k + 1, f.len(), fk / 1e6);
                    let sweep = AcSweep::point(fk);
                    for bench in &benches {
                        let v = self.run(library, bench, &sweep)?;
                        self.store_column(&mut s, bench.driven(), k, &v, scale);
                    }
                }
            }
        }

        Ok(s)
    }

    fn run(
        &self,
        library: &str,
        bench: &Testbench,
        sweep: &AcSweep,
    ) -> Result<Array2<Complex64>, VerifyError> {
        let v = self.backend.run_ac(library, bench, sweep)?;
        if v.dim() != (sweep.len(), bench.nports()) {
            return Err(VerifyError::MalformedOutput(format!(
                "expected {}x{} node voltages, got {}x{}",
                sweep.len(),
                bench.nports(),
                v.nrows(),
                v.ncols()
            )));
        }
        Ok(v)
    }

    /// Write the measured column of driven port `n` starting at frequency `k0`
    fn store_column(
        &self,
        s: &mut Array3<Complex64>,
        n: usize,
        k0: usize,
        v: &Array2<Complex64>,
        scale: Complex64,
    ) {
        for (dk, row) in v.axis_iter(Axis(0)).enumerate() {
            for (m, &vm) in row.iter().enumerate() {
                let mut value = vm * scale;
                if m + 1 == n {
                    value -= 1.0;
                }
                s[[k0 + dk, m, n - 1]] = value;
            }
        }
    }

    /// Measure `subckt` and compare against the S data it was built from
    pub fn verify(
        &self,
        library: &str,
        subckt: &str,
        f: &[f64],
        s: ArrayView3<Complex64>,
        z0: &ReferenceImpedance,
    ) -> Result<RoundTripReport, VerifyError> {
        validate_dataset(f, s, z0)?;
        let measured = self.measure(library, subckt, f, z0)?;
        if measured.dim() != s.dim() {
            return Err(VerifyError::PortCountMismatch {
                expected: s.dim().1,
                found: measured.dim().1,
            });
        }

        let report = RoundTripReport::new(
            f.to_vec(),
            s.to_owned(),
            measured,
            self.options.rtol,
            self.options.atol,
        );
        if report.passed() {
            info!(max_error = report.max_error(), "round trip reproduced every entry");
        } else {
            warn!(
                mismatches = report.mismatches().len(),
                max_error = report.max_error(),
                "round trip mismatch"
            );
        }
        Ok(report)
    }

    /// [`RoundTrip::verify`] on an include file
    pub fn verify_file<P: AsRef<Path>>(
        &self,
        path: P,
        subckt: &str,
        f: &[f64],
        s: ArrayView3<Complex64>,
        z0: &ReferenceImpedance,
    ) -> Result<RoundTripReport, VerifyError> {
        let library = fs::read_to_string(path)?;
        self.verify(&library, subckt, f, s, z0)
    }
}

/// One entry that did not round-trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub frequency: f64,
    /// 1-based output port
    pub row: usize,
    /// 1-based input port
    pub col: usize,
    pub expected: Complex64,
    pub measured: Complex64,
}

/// Outcome of a round trip
#[derive(Debug, Clone)]
pub struct RoundTripReport {
    pub frequencies: Vec<f64>,
    pub original: Array3<Complex64>,
    pub measured: Array3<Complex64>,
    /// `measured - original` where not close, zero elsewhere
    pub error: Array3<Complex64>,
}

impl RoundTripReport {
    pub fn new(
        frequencies: Vec<f64>,
        original: Array3<Complex64>,
        measured: Array3<Complex64>,
        rtol: f64,
        atol: f64,
    ) -> Self {
        let error = error_matrix(measured.view(), original.view(), rtol, atol);
        Self {
            frequencies,
            original,
            measured,
            error,
        }
    }

    /// True when the error matrix is all zero
    pub fn passed(&self) -> bool {
        self.error.iter().all(|e| e.re == 0.0 && e.im == 0.0)
    }

    pub fn mismatches(&self) -> Vec<Mismatch> {
        self.error
            .indexed_iter()
            .filter(|(_, e)| e.re != 0.0 || e.im != 0.0)
            .map(|((k, i, j), _)| Mismatch {
                frequency: self.frequencies[k],
                row: i + 1,
                col: j + 1,
                expected: self.original[[k, i, j]],
                measured: self.measured[[k, i, j]],
            })
            .collect()
    }

    /// Largest `|measured - original|` over every entry, close or not
    pub fn max_error(&self) -> f64 {
        self.measured
            .iter()
            .zip(self.original.iter())
            .map(|(m, o)| (m - o).norm())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for RoundTripReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nfreq, nports, _) = self.original.dim();
        let mismatches = self.mismatches();
        if mismatches.is_empty() {
            return write!(
                f,
                "round trip passed: {} points, {}x{} S-matrix, max error {:.3e}",
                nfreq,
                nports,
                nports,
                self.max_error()
            );
        }

        writeln!(
            f,
            "round trip failed: {} of {} entries differ",
            mismatches.len(),
            self.original.len()
        )?;
        for m in &mismatches {
            writeln!(
                f,
                "  S{}{} at {} Hz: expected {}, measured {}",
                m.row, m.col, m.frequency, m.expected, m.measured
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_close() {
        let a = Complex64::new(1.0, 0.0);
        assert!(is_close(a, a, 0.0, 0.0));
        assert!(is_close(Complex64::new(1.000001, 0.0), a, 1e-5, 1e-8));
        assert!(!is_close(Complex64::new(1.001, 0.0), a, 1e-5, 1e-8));
        assert!(is_close(Complex64::new(1e-9, 0.0), Complex64::new(0.0, 0.0), 1e-5, 1e-8));
    }

    #[test]
    fn test_error_matrix() {
        let original = Array3::from_elem((2, 1, 1), Complex64::new(0.5, 0.5));
        let mut measured = original.clone();
        measured[[1, 0, 0]] = Complex64::new(0.6, 0.5);

        let error = error_matrix(measured.view(), original.view(), 1e-5, 1e-8);
        assert_eq!(error[[0, 0, 0]], Complex64::new(0.0, 0.0));
        assert!((error[[1, 0, 0]] - Complex64::new(0.1, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_report() {
        let original = Array3::from_elem((2, 2, 2), Complex64::new(0.1, 0.0));
        let mut measured = original.clone();
        measured[[1, 0, 1]] = Complex64::new(0.2, 0.0);

        let report = RoundTripReport::new(vec![1e6, 2e6], original.clone(), measured, 1e-5, 1e-8);
        assert!(!report.passed());
        let mismatches = report.mismatches();
        assert_eq!(mismatches.len(), 1);
        assert_eq!((mismatches[0].frequency, mismatches[0].row, mismatches[0].col), (2e6, 1, 2));
        assert!(report.to_string().contains("S12 at 2000000 Hz"));

        let clean = RoundTripReport::new(vec![1e6, 2e6], original.clone(), original, 1e-5, 1e-8);
        assert!(clean.passed());
        assert_eq!(clean.max_error(), 0.0);
    }
}
