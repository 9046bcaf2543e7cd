//! Netlist elements and their SPICE text form

use std::fmt;

/// Format a number so that it parses back to the same `f64`
///
/// Uses the shortest round-trip representation (`50.0`, `-0.25`, `1e16`),
/// which every SPICE number parser accepts.
pub fn format_number(x: f64) -> String {
    format!("{:?}", x)
}

/// One element line of a netlist
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// `R<name> <pos> <neg> <value>`
    Resistor {
        name: String,
        pos: String,
        neg: String,
        value: f64,
    },
    /// `V<name> <pos> <neg> <dc>` with an optional `ac <mag>` stimulus
    VoltageSource {
        name: String,
        pos: String,
        neg: String,
        dc: f64,
        ac: Option<f64>,
    },
    /// Code-model source `A<name> %vd(<c+> <c->) %vd(<o+>, <o->) <model>`
    Xfer {
        name: String,
        ctrl: (String, String),
        out: (String, String),
        model: String,
    },
    /// Subcircuit instance `X<name> <nodes..> <subckt>`
    Instance {
        name: String,
        nodes: Vec<String>,
        subckt: String,
    },
}

impl Element {
    pub fn resistor(
        name: impl Into<String>,
        pos: impl ToString,
        neg: impl ToString,
        value: f64,
    ) -> Self {
        Element::Resistor {
            name: name.into(),
            pos: pos.to_string(),
            neg: neg.to_string(),
            value,
        }
    }

    /// Name including the element prefix letter
    pub fn name(&self) -> String {
        match self {
            Element::Resistor { name, .. } => format!("R{}", name),
            Element::VoltageSource { name, .. } => format!("V{}", name),
            Element::Xfer { name, .. } => format!("A{}", name),
            Element::Instance { name, .. } => format!("X{}", name),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Resistor {
                name,
                pos,
                neg,
                value,
            } => write!(f, "R{} {} {} {}", name, pos, neg, format_number(*value)),
            Element::VoltageSource {
                name,
                pos,
                neg,
                dc,
                ac,
            } => {
                // the ground tie is written as a bare value, stimuli as dc/ac pairs
                match ac {
                    Some(mag) => write!(
                        f,
                        "V{} {} {} dc {} ac {}",
                        name,
                        pos,
                        neg,
                        format_number(*dc),
                        format_number(*mag)
                    ),
                    None if *dc == 0.0 => write!(f, "V{} {} {} 0", name, pos, neg),
                    None => write!(f, "V{} {} {} {}", name, pos, neg, format_number(*dc)),
                }
            }
            Element::Xfer {
                name,
                ctrl,
                out,
                model,
            } => write!(
                f,
                "A{} %vd({} {}) %vd({}, {}) {}",
                name, ctrl.0, ctrl.1, out.0, out.1, model
            ),
            Element::Instance {
                name,
                nodes,
                subckt,
            } => write!(f, "X{} {} {}", name, nodes.join(" "), subckt),
        }
    }
}
