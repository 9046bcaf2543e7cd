//! Node and model addressing for the synthesized subcircuit
//!
//! Every node the synthesizer emits is named by a [`Node`] and turned into a
//! numeric id by [`NodeMap::id`]. Port `i` owns the block of ids starting at
//! `base * i`; the external pins `1..=N` and the reference node `N + 1` sit
//! below the first block. The capacity check in [`NodeMap::new`] is the only
//! place the layout is validated.

use std::fmt;

use crate::constants::DEFAULT_NODE_BASE;
use crate::error::SynthesisError;

/// Name of the subcircuit pin tied to the internal reference node
pub const GROUND_PIN: &str = "gnd_node";

/// A node of the synthesized subcircuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    /// External pin of port `i` (1-based)
    Port(usize),
    /// Shared reference node, `N + 1`
    Reference,
    /// Junction of the two termination resistors of port `i`; carries the
    /// incident-wave voltage that controls every transfer block reading port `i`
    Incident(usize),
    /// Positive output terminal of transfer block `(i, j)`. `Chain(i, 1)` is the
    /// reflected-wave node at the end of port `i`'s termination.
    Chain(usize, usize),
}

/// Numeric addressing of nodes, transfer blocks and models for an N-port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMap {
    nports: usize,
    base: usize,
}

impl NodeMap {
    /// Layout for `nports` ports with internal blocks spaced `base` apart
    ///
    /// Fails with [`SynthesisError::TooManyPorts`] when `nports > base - 2`.
    pub fn new(nports: usize, base: usize) -> Result<Self, SynthesisError> {
        let max = Self::max_ports(base);
        if nports > max {
            return Err(SynthesisError::TooManyPorts { nports, max, base });
        }
        Ok(Self { nports, base })
    }

    /// Largest port count `base` can address without id collisions
    pub fn max_ports(base: usize) -> usize {
        base.saturating_sub(2)
    }

    #[inline]
    pub fn nports(&self) -> usize {
        self.nports
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Numeric id of `node`
    pub fn id(&self, node: Node) -> usize {
        match node {
            Node::Port(i) => i,
            Node::Reference => self.nports + 1,
            Node::Incident(i) => self.base * i,
            Node::Chain(i, j) => self.base * i + j,
        }
    }

    /// Node the negative output terminal of block `(i, j)` connects to;
    /// the last block of a chain closes on the reference node
    pub fn block_output(&self, i: usize, j: usize) -> Node {
        if j == self.nports {
            Node::Reference
        } else {
            Node::Chain(i, j + 1)
        }
    }

    /// 1-based index of the model of block `(i, j)`
    pub fn model_index(&self, i: usize, j: usize) -> usize {
        (i - 1) * self.nports + j
    }

    /// Subcircuit pin list: `1 .. N gnd_node`
    pub fn pins(&self) -> Vec<String> {
        (1..=self.nports)
            .map(|p| p.to_string())
            .chain(std::iter::once(GROUND_PIN.to_string()))
            .collect()
    }

    /// Every node of the layout, in emission order
    pub fn nodes(&self) -> Vec<Node> {
        let n = self.nports;
        let mut nodes: Vec<Node> = (1..=n).map(Node::Port).collect();
        nodes.push(Node::Reference);
        for i in 1..=n {
            nodes.push(Node::Incident(i));
            nodes.extend((1..=n).map(|j| Node::Chain(i, j)));
        }
        nodes
    }
}

impl Default for NodeMap {
    fn default() -> Self {
        Self {
            nports: 1,
            base: DEFAULT_NODE_BASE,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Port(i) => write!(f, "port {}", i),
            Node::Reference => write!(f, "reference"),
            Node::Incident(i) => write!(f, "incident {}", i),
            Node::Chain(i, j) => write!(f, "chain {}.{}", i, j),
        }
    }
}
