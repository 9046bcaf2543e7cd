//! SPICE subcircuit synthesis
//!
//! An N-port is rebuilt from resistive port terminations and one tabulated
//! `xfer` source per S-parameter entry:
//! - [`termination`]: the `-R`/`2R` resistor pair of every port
//! - [`transfer`]: the `(i, j)` transfer blocks and their model tables
//! - [`subcircuit`]: assembly into a complete `.SUBCKT` definition

pub mod comments;
pub mod element;
pub mod nodes;
pub mod subcircuit;
pub mod termination;
pub mod transfer;

pub use comments::spice_comments;
pub use element::{format_number, Element};
pub use nodes::{Node, NodeMap, GROUND_PIN};
pub use subcircuit::{synthesize, Subcircuit, SynthesisOptions};
pub use termination::PortTermination;
pub use transfer::{TransferBlock, TransferModel};
