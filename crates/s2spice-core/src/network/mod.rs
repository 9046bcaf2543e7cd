//! Network module - N-port S-parameter dataset
//!
//! Provides the Network struct loaded from Touchstone data, the reference
//! impedance description, and the SPICE export entry points.

mod core;
mod io;
mod reference;

pub use self::core::{validate_dataset, Network};
pub use reference::ReferenceImpedance;
