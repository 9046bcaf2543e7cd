//! In-memory AC solver for round-trip checks
//!
//! Flattens the testbench and the subcircuit library into one circuit and
//! solves its modified nodal equations at every sweep frequency:
//!   1. Stamp resistors into the real conductance part of A
//!   2. Give every voltage source and `xfer` output a branch current row
//!   3. Per frequency, add `-H(f)` couplings of the `xfer` controls and solve
//!      `A x = b`
//!
//! Only the element kinds the synthesizer emits are understood.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use tracing::{debug, debug_span};

use super::deck::{Deck, XferTable};
use super::testbench::{AcSweep, Testbench};
use super::SimulatorBackend;
use crate::error::VerifyError;
use crate::math::linalg::solve_complex;
use crate::spice::element::Element;

/// Deepest subcircuit nesting the flattener follows
const MAX_DEPTH: usize = 16;

/// Pure in-memory backend, no external process
#[derive(Debug, Clone, Copy, Default)]
pub struct MnaBackend;

impl MnaBackend {
    pub fn new() -> Self {
        MnaBackend
    }
}

impl SimulatorBackend for MnaBackend {
    fn name(&self) -> &str {
        "mna"
    }

    fn run_ac(
        &self,
        library: &str,
        bench: &Testbench,
        sweep: &AcSweep,
    ) -> Result<Array2<Complex64>, VerifyError> {
        let _span = debug_span!("mna", driven = bench.driven(), points = sweep.len()).entered();

        let deck = Deck::parse(library)?;
        let circuit = FlatCircuit::build(&bench.elements(), &deck)?;
        let probes = bench
            .probes()
            .iter()
            .map(|p| {
                circuit
                    .node_index(p)
                    .ok_or_else(|| VerifyError::deck(0, format!("probe node {} is not connected", p)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            nodes = circuit.node_names.len(),
            branches = circuit.branches(),
            "flattened circuit"
        );

        let mut out = Array2::zeros((sweep.len(), probes.len()));
        for (k, &f) in sweep.frequencies().iter().enumerate() {
            let x = circuit.solve(f)?;
            for (col, &node) in probes.iter().enumerate() {
                out[[k, col]] = x[node];
            }
        }
        Ok(out)
    }
}

/// A voltage-defined branch: `V(p) - V(n) = value` for sources,
/// `V(p) - V(n) = H(f) (V(cp) - V(cn))` for `xfer` outputs
#[derive(Debug, Clone)]
struct Branch {
    pos: Option<usize>,
    neg: Option<usize>,
    kind: BranchKind,
}

#[derive(Debug, Clone)]
enum BranchKind {
    Source(Complex64),
    Xfer {
        ctrl: (Option<usize>, Option<usize>),
        table: XferTable,
    },
}

/// Flattened circuit with ground excluded from the node list
#[derive(Debug, Default)]
struct FlatCircuit {
    node_map: HashMap<String, usize>,
    node_names: Vec<String>,
    resistors: Vec<(Option<usize>, Option<usize>, f64)>,
    branches: Vec<Branch>,
}

/// Name scope of one subcircuit instance
struct Scope<'a> {
    prefix: String,
    pins: HashMap<&'a str, String>,
    /// Models local to the definition being flattened
    models: Option<&'a HashMap<String, XferTable>>,
}

impl Scope<'_> {
    fn top() -> Self {
        Scope {
            prefix: String::new(),
            pins: HashMap::new(),
            models: None,
        }
    }

    /// Local models shadow the top-level ones
    fn model<'d>(&'d self, deck: &'d Deck, name: &str) -> Option<&'d XferTable> {
        self.models
            .and_then(|models| models.get(&name.to_lowercase()))
            .or_else(|| deck.model(name))
    }
}

fn is_ground(node: &str) -> bool {
    node == "0" || node.eq_ignore_ascii_case("gnd")
}

impl FlatCircuit {
    fn build(top: &[Element], deck: &Deck) -> Result<Self, VerifyError> {
        let mut circuit = FlatCircuit::default();
        let scope = Scope::top();
        let mut all = top.to_vec();
        all.extend(deck.elements.iter().cloned());
        circuit.add_elements(&all, deck, &scope, 0)?;
        Ok(circuit)
    }

    fn node_index(&self, name: &str) -> Option<usize> {
        self.node_map.get(name).copied()
    }

    fn branches(&self) -> usize {
        self.branches.len()
    }

    /// Index of `node` as seen from `scope`, registering it on first use
    fn node(&mut self, node: &str, scope: &Scope) -> Option<usize> {
        if is_ground(node) {
            return None;
        }
        let name = match scope.pins.get(node) {
            Some(outer) => outer.clone(),
            None => format!("{}{}", scope.prefix, node),
        };
        if is_ground(&name) {
            return None;
        }
        let next = self.node_names.len();
        let idx = *self.node_map.entry(name.clone()).or_insert(next);
        if idx == next {
            self.node_names.push(name);
        }
        Some(idx)
    }

    fn add_elements(
        &mut self,
        elements: &[Element],
        deck: &Deck,
        scope: &Scope,
        depth: usize,
    ) -> Result<(), VerifyError> {
        for element in elements {
            match element {
                Element::Resistor { pos, neg, value, .. } => {
                    let p = self.node(pos, scope);
                    let n = self.node(neg, scope);
                    self.resistors.push((p, n, *value));
                }
                Element::VoltageSource { pos, neg, ac, .. } => {
                    // small-signal analysis: the dc value is a short
                    let value = Complex64::new(ac.unwrap_or(0.0), 0.0);
                    let pos = self.node(pos, scope);
                    let neg = self.node(neg, scope);
                    self.branches.push(Branch {
                        pos,
                        neg,
                        kind: BranchKind::Source(value),
                    });
                }
                Element::Xfer {
                    name,
                    ctrl,
                    out,
                    model,
                } => {
                    let table = scope.model(deck, model).cloned().ok_or_else(|| {
                        VerifyError::deck(0, format!("A{}: model {} is not defined", name, model))
                    })?;
                    let ctrl = (self.node(&ctrl.0, scope), self.node(&ctrl.1, scope));
                    let pos = self.node(&out.0, scope);
                    let neg = self.node(&out.1, scope);
                    self.branches.push(Branch {
                        pos,
                        neg,
                        kind: BranchKind::Xfer { ctrl, table },
                    });
                }
                Element::Instance {
                    name,
                    nodes,
                    subckt,
                } => {
                    if depth >= MAX_DEPTH {
                        return Err(VerifyError::deck(
                            0,
                            format!("X{}: subcircuits nested deeper than {}", name, MAX_DEPTH),
                        ));
                    }
                    let def = deck
                        .subckt(subckt)
                        .ok_or_else(|| VerifyError::SubcircuitNotFound(subckt.clone()))?;
                    if def.pins.len() != nodes.len() {
                        return Err(VerifyError::deck(
                            0,
                            format!(
                                "X{}: {} has {} pins but {} nodes are connected",
                                name,
                                def.name,
                                def.pins.len(),
                                nodes.len()
                            ),
                        ));
                    }

                    let prefix = format!("{}x{}.", scope.prefix, name.to_lowercase());
                    let pins = def
                        .pins
                        .iter()
                        .zip(nodes)
                        .map(|(pin, node)| {
                            let outer = if is_ground(node) {
                                "0".to_string()
                            } else {
                                match scope.pins.get(node.as_str()) {
                                    Some(outer) => outer.clone(),
                                    None => format!("{}{}", scope.prefix, node),
                                }
                            };
                            (pin.as_str(), outer)
                        })
                        .collect();
                    let inner = Scope {
                        prefix,
                        pins,
                        models: Some(&def.models),
                    };
                    self.add_elements(&def.elements, deck, &inner, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Solve the node voltages and branch currents at `f`
    fn solve(&self, f: f64) -> Result<Array1<Complex64>, VerifyError> {
        let n_nodes = self.node_names.len();
        let size = n_nodes + self.branches.len();
        let one = Complex64::new(1.0, 0.0);

        let mut a = Array2::<Complex64>::zeros((size, size));
        let mut b = Array1::<Complex64>::zeros(size);

        for &(ni, nj, value) in &self.resistors {
            let g = Complex64::new(1.0 / value, 0.0);
            if let Some(i) = ni {
                a[[i, i]] += g;
            }
            if let Some(j) = nj {
                a[[j, j]] += g;
            }
            if let (Some(i), Some(j)) = (ni, nj) {
                a[[i, j]] -= g;
                a[[j, i]] -= g;
            }
        }

        for (k, branch) in self.branches.iter().enumerate() {
            let bk = n_nodes + k;
            if let Some(i) = branch.pos {
                a[[i, bk]] += one;
                a[[bk, i]] += one;
            }
            if let Some(j) = branch.neg {
                a[[j, bk]] -= one;
                a[[bk, j]] -= one;
            }
            match &branch.kind {
                BranchKind::Source(value) => b[bk] = *value,
                BranchKind::Xfer { ctrl, table } => {
                    let h = table.eval(f);
                    if let Some(c) = ctrl.0 {
                        a[[bk, c]] -= h;
                    }
                    if let Some(c) = ctrl.1 {
                        a[[bk, c]] += h;
                    }
                }
            }
        }

        solve_complex(&a, &b).ok_or(VerifyError::Singular { frequency: f })
    }
}
