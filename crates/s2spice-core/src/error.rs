//! Error types for synthesis and verification
//!
//! Touchstone parsing errors live next to the parser in
//! [`crate::touchstone::parser`].

use std::path::PathBuf;

use thiserror::Error;

/// Shape and value problems in an S-parameter dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("S-parameter data must describe at least one port")]
    NoPorts,

    #[error("S-parameter data must contain at least one frequency point")]
    NoFrequencies,

    #[error("S-matrix slices must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("frequency vector has {freqs} points but S-parameter data has {slices}")]
    LengthMismatch { freqs: usize, slices: usize },

    #[error("frequencies must be finite and strictly ascending")]
    FrequencyOrder,

    #[error("expected {expected} reference impedances, got {got}")]
    ReferenceCount { expected: usize, got: usize },

    #[error("reference impedance of port {port} must have a positive finite resistance, got {value}")]
    ReferenceResistance { port: usize, value: f64 },

    #[error("S{row}{col} at {frequency} Hz is not finite")]
    NonFinite {
        frequency: f64,
        row: usize,
        col: usize,
    },
}

/// Errors raised while building or writing a subcircuit
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("too many ports: {nports} exceeds the maximum of {max} for node base {base}")]
    TooManyPorts {
        nports: usize,
        max: usize,
        base: usize,
    },

    #[error("invalid input data: {0}")]
    Input(#[from] NetworkError),

    #[error("invalid subcircuit name {0:?}: must be non-empty and free of whitespace")]
    InvalidName(String),

    #[error("output file {} exists, use overwrite to replace it", .0.display())]
    OutputExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while re-measuring a subcircuit
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("subcircuit {0:?} not found in netlist")]
    SubcircuitNotFound(String),

    #[error("subcircuit has {found} ports but {expected} reference impedances were given")]
    PortCountMismatch { expected: usize, found: usize },

    #[error("netlist error at line {line}: {message}")]
    Deck { line: usize, message: String },

    #[error("circuit matrix is singular at {frequency} Hz")]
    Singular { frequency: f64 },

    #[error("simulator {command:?} could not be started: {source}")]
    SimulatorNotFound {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("simulator exited with {status}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Simulator {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("malformed simulator output: {0}")]
    MalformedOutput(String),

    #[error("invalid input data: {0}")]
    Input(#[from] NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    /// Create a netlist error at a 1-based line number.
    pub fn deck(line: usize, message: impl Into<String>) -> Self {
        Self::Deck {
            line,
            message: message.into(),
        }
    }
}
