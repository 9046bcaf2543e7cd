//! Port termination resistor pairs
//!
//! Port `i` with reference resistance `R` is terminated by
//!
//! ```text
//! R<i>N  <i>        <base*i>    -R
//! R<i>P  <base*i>   <base*i+1>  2R
//! ```
//!
//! The junction `base*i` then carries `V + R*I`, twice the incident wave,
//! and `base*i+1` is where the reflected wave is built up by the transfer
//! chain of port `i`.

use super::element::Element;
use super::nodes::{Node, NodeMap};

/// Termination of one port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortTermination {
    /// 1-based port index
    pub port: usize,
    /// Reference resistance in ohms
    pub resistance: f64,
}

impl PortTermination {
    pub fn new(port: usize, resistance: f64) -> Self {
        Self { port, resistance }
    }

    /// The negative and positive resistors of this port
    pub fn elements(&self, map: &NodeMap) -> [Element; 2] {
        let i = self.port;
        let pin = map.id(Node::Port(i));
        let incident = map.id(Node::Incident(i));
        let reflected = map.id(Node::Chain(i, 1));

        [
            Element::resistor(format!("{}N", i), pin, incident, -self.resistance),
            Element::resistor(format!("{}P", i), incident, reflected, 2.0 * self.resistance),
        ]
    }
}

/// Terminations of every port, in port order
pub fn terminations(resistances: &[f64]) -> Vec<PortTermination> {
    resistances
        .iter()
        .enumerate()
        .map(|(k, &r)| PortTermination::new(k + 1, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_lines() {
        let map = NodeMap::new(2, 100).unwrap();
        let [neg, pos] = PortTermination::new(2, 75.0).elements(&map);

        assert_eq!(neg.to_string(), "R2N 2 200 -75.0");
        assert_eq!(pos.to_string(), "R2P 200 201 150.0");
    }

    #[test]
    fn test_terminations_follow_port_order() {
        let terms = terminations(&[50.0, 25.0, 10.0]);
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[2], PortTermination::new(3, 10.0));
    }
}
