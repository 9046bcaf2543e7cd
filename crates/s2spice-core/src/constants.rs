//! Numerical and netlist constants
//!
//! Node-numbering defaults, comparison tolerances and the stimulus
//! convention used by the round-trip testbench.

/// Default spacing between the internal node blocks of consecutive ports.
/// Port `i` owns internal node ids `NODE_BASE * i ..= NODE_BASE * i + N`.
pub const DEFAULT_NODE_BASE: usize = 100;

/// Relative tolerance of the element-wise S-matrix comparison.
pub const IS_CLOSE_RTOL: f64 = 1e-5;

/// Absolute tolerance of the element-wise S-matrix comparison.
pub const IS_CLOSE_ATOL: f64 = 1e-8;

/// AC amplitude of the testbench source, in volts.
/// A matched source of amplitude 2 delivers an incident wave of 1.
pub const STIMULUS_AMPLITUDE: f64 = 2.0;

/// Relative step deviation under which a frequency grid counts as linear.
pub const UNIFORM_GRID_TOL: f64 = 1e-9;
