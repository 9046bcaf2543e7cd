//! Mathematical functions module
//!
//! Dense linear algebra and the network-parameter conversions needed to
//! bring Touchstone Z/Y data into scattering form.

pub mod linalg;
pub mod transforms;

pub use transforms::*;
