//! s2spice-core: S-parameter to SPICE subcircuit synthesis
//!
//! Rebuilds a sampled N-port S-parameter dataset as a SPICE subcircuit made
//! of resistive port terminations and tabulated `xfer` sources, and
//! re-measures the result to confirm the subcircuit reproduces the data.
//!
//! ## Modules
//!
//! - `frequency` - Frequency grid representation
//! - `math` - Dense linear algebra and Z/Y to S conversions
//! - `touchstone` - Touchstone file parsing
//! - `network` - N-port network representation and SPICE export
//! - `spice` - Subcircuit synthesis
//! - `verify` - Round-trip verification against a circuit simulator

pub mod constants;
pub mod error;
pub mod frequency;
pub mod math;
pub mod network;
pub mod spice;
pub mod touchstone;
pub mod verify;

pub use error::{NetworkError, SynthesisError, VerifyError};
pub use frequency::Frequency;
pub use network::{Network, ReferenceImpedance};
pub use spice::{synthesize, Subcircuit, SynthesisOptions};
pub use verify::{RoundTrip, RoundTripReport, SweepMode, VerifyOptions};
