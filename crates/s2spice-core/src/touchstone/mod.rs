//! Touchstone file input module
//!
//! Provides reading of Touchstone (.snp / .ts) files.

pub mod parser;

pub use parser::{Touchstone, TouchstoneError};
