//! Round-trip verification
//!
//! Re-measures a synthesized subcircuit by driving each port through its
//! reference resistance and compares the recovered S-matrix with the data
//! it was built from. Two backends are provided:
//! - [`MnaBackend`]: in-memory nodal solver, no external dependencies
//! - [`NgspiceBatch`]: ngspice in batch mode

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::VerifyError;

pub mod deck;
pub mod mna;
pub mod ngspice;
pub mod roundtrip;
pub mod testbench;

pub use deck::{scan_subcircuits, Deck};
pub use mna::MnaBackend;
pub use ngspice::NgspiceBatch;
pub use roundtrip::{
    error_matrix, is_close, Mismatch, RoundTrip, RoundTripReport, SweepMode, VerifyOptions,
};
pub use testbench::{AcSweep, Testbench};

/// A circuit simulator able to run small-signal sweeps
pub trait SimulatorBackend {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run `bench` against the subcircuits in `library` over `sweep`
    ///
    /// Returns the complex voltages of the bench probes `v1 .. vN`, one row
    /// per sweep frequency.
    fn run_ac(
        &self,
        library: &str,
        bench: &Testbench,
        sweep: &AcSweep,
    ) -> Result<Array2<Complex64>, VerifyError>;
}
