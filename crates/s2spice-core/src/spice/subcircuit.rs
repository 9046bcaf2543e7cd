//! Subcircuit assembly and serialization

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use ndarray::ArrayView3;
use num_complex::Complex64;
use tracing::{debug, info, info_span, warn};

use super::element::Element;
use super::nodes::{Node, NodeMap, GROUND_PIN};
use super::termination::terminations;
use super::transfer::{transfer_blocks, TransferBlock};
use crate::constants::DEFAULT_NODE_BASE;
use crate::error::SynthesisError;
use crate::network::{validate_dataset, ReferenceImpedance};

/// Synthesis settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Spacing of the per-port internal node blocks; at most `node_base - 2`
    /// ports can be synthesized
    pub node_base: usize,
    /// Emit the commented `X<inst>` usage example in the header
    pub usage_example: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            node_base: DEFAULT_NODE_BASE,
            usage_example: true,
        }
    }
}

impl SynthesisOptions {
    pub fn with_node_base(mut self, node_base: usize) -> Self {
        self.node_base = node_base;
        self
    }

    pub fn with_usage_example(mut self, usage_example: bool) -> Self {
        self.usage_example = usage_example;
        self
    }

    /// Largest port count these options can synthesize
    pub fn max_ports(&self) -> usize {
        NodeMap::max_ports(self.node_base)
    }
}

/// A fully assembled subcircuit, borrowing its tables from the S data
///
/// The [`Display`](fmt::Display) output is the complete include file and is
/// byte-identical for identical inputs.
#[derive(Debug, Clone)]
pub struct Subcircuit<'a> {
    name: String,
    map: NodeMap,
    comments: Vec<String>,
    usage_example: bool,
    ground: Element,
    terminations: Vec<Element>,
    blocks: Vec<TransferBlock<'a>>,
}

/// Build the subcircuit reproducing `s` on the frequency grid `f`
///
/// `s` is indexed `[frequency, output port, input port]`. `z0` may be one
/// impedance for every port or one per port; only its real part is
/// synthesized and a reactive part is reported with a warning. `comments` are
/// emitted verbatim, one header line each.
///
/// The port count is checked against `options.node_base` before anything else.
pub fn synthesize<'a>(
    name: &str,
    f: &'a [f64],
    s: ArrayView3<'a, Complex64>,
    z0: &ReferenceImpedance,
    comments: Option<&[String]>,
    options: &SynthesisOptions,
) -> Result<Subcircuit<'a>, SynthesisError> {
    let (nfreq, nports, _) = s.dim();
    let _span = info_span!("synthesize", subckt = name, nports, nfreq).entered();

    let map = NodeMap::new(nports, options.node_base)?;
    validate_name(name)?;
    validate_dataset(f, s, z0)?;

    for (k, z) in z0.resolve(nports)?.iter().enumerate() {
        if z.im != 0.0 {
            warn!(
                port = k + 1,
                reactance = z.im,
                "reference impedance is complex, only its real part {} is synthesized",
                z.re
            );
        }
    }
    let resistances = z0.resistances(nports)?;

    let ground = Element::VoltageSource {
        name: format!("{}_{}", GROUND_PIN, map.id(Node::Reference)),
        pos: map.id(Node::Reference).to_string(),
        neg: GROUND_PIN.to_string(),
        dc: 0.0,
        ac: None,
    };
    let terminations = terminations(&resistances)
        .iter()
        .flat_map(|t| t.elements(&map))
        .collect();
    let blocks = transfer_blocks(&map, f, s);

    debug!(models = blocks.len(), "assembled transfer blocks");

    Ok(Subcircuit {
        name: name.to_string(),
        map,
        comments: comments.map(|c| c.to_vec()).unwrap_or_default(),
        usage_example: options.usage_example,
        ground,
        terminations,
        blocks,
    })
}

fn validate_name(name: &str) -> Result<(), SynthesisError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(SynthesisError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl<'a> Subcircuit<'a> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn nports(&self) -> usize {
        self.map.nports()
    }

    /// External pins: `1 .. N gnd_node`
    pub fn pins(&self) -> Vec<String> {
        self.map.pins()
    }

    /// Number of transfer models, `N^2`
    pub fn model_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn terminations(&self) -> &[Element] {
        &self.terminations
    }

    /// Numeric ids of every node the body uses, the external pins included
    pub fn node_ids(&self) -> BTreeSet<usize> {
        self.map.nodes().into_iter().map(|n| self.map.id(n)).collect()
    }

    /// Write the include file
    ///
    /// An existing file is only replaced when `overwrite` is set; otherwise
    /// [`SynthesisError::OutputExists`] is returned and the file is untouched.
    pub fn write<P: AsRef<Path>>(&self, path: P, overwrite: bool) -> Result<(), SynthesisError> {
        let path = path.as_ref();
        let text = self.to_string();

        let mut file = if overwrite {
            File::create(path)?
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => SynthesisError::OutputExists(path.to_path_buf()),
                    _ => SynthesisError::Io(e),
                })?
        };
        file.write_all(text.as_bytes())?;

        info!(
            path = %path.display(),
            subckt = %self.name,
            bytes = text.len(),
            "wrote SPICE subcircuit"
        );
        Ok(())
    }
}

impl fmt::Display for Subcircuit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.comments {
            writeln!(f, "{}", line)?;
        }

        if self.usage_example {
            let ports: Vec<String> = (1..=self.nports()).map(|p| format!("Port{}", p)).collect();
            writeln!(f, "*")?;
            writeln!(f, "*** Example use in SPICE:")?;
            writeln!(f, "**  X<inst> {} {} GND", self.name, ports.join(" "))?;
            writeln!(f)?;
        }

        writeln!(f, ".SUBCKT {} {}", self.name, self.pins().join(" "))?;
        writeln!(f, "{}", self.ground)?;
        for element in &self.terminations {
            writeln!(f, "{}", element)?;
        }
        writeln!(f)?;

        for block in &self.blocks {
            writeln!(f, "{}", block)?;
        }
        writeln!(f, ".ENDS")
    }
}
