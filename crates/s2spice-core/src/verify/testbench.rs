//! Driving circuits for re-measuring a subcircuit
//!
//! With port `n` driven, the bench is
//!
//! ```text
//! V<n> vin 0 dc 0 ac <A>
//! R<n> vin v<n> <R_n>
//! R<m> v<m> 0 <R_m>        for every m != n
//! X1 v1 .. vN 0 <subckt>
//! ```
//!
//! A matched source of amplitude `A` launches an incident wave of `A / 2`
//! into port `n`, so the port voltages read `(A / 2) (1 + S_nn)` at the
//! driven port and `(A / 2) S_mn` everywhere else.

use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::spice::element::Element;

/// One small-signal sweep over a frequency grid, in Hz
#[derive(Debug, Clone, PartialEq)]
pub struct AcSweep {
    frequencies: Vec<f64>,
}

impl AcSweep {
    /// Linear sweep from the first to the last of `f`; the grid is assumed
    /// evenly spaced
    pub fn linear(f: &[f64]) -> Self {
        Self {
            frequencies: f.to_vec(),
        }
    }

    /// Sweep of the single frequency `f`
    pub fn point(f: f64) -> Self {
        Self {
            frequencies: vec![f],
        }
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// ngspice analysis command, `ac lin <points> <start> <stop>`
    pub fn command(&self) -> String {
        let start = self.frequencies.first().copied().unwrap_or(0.0);
        let stop = self.frequencies.last().copied().unwrap_or(start);
        format!("ac lin {} {:e} {:e}", self.len(), start, stop)
    }
}

/// Driving circuit for one source port
#[derive(Debug, Clone, PartialEq)]
pub struct Testbench {
    subckt: String,
    resistances: Vec<f64>,
    driven: usize,
    stimulus: f64,
}

impl Testbench {
    /// Drive 1-based port `driven` of `subckt` through its reference
    /// resistance with a source of AC amplitude `stimulus`
    pub fn new(subckt: impl Into<String>, resistances: &[f64], driven: usize, stimulus: f64) -> Self {
        Self {
            subckt: subckt.into(),
            resistances: resistances.to_vec(),
            driven,
            stimulus,
        }
    }

    #[inline]
    pub fn subckt(&self) -> &str {
        &self.subckt
    }

    #[inline]
    pub fn nports(&self) -> usize {
        self.resistances.len()
    }

    #[inline]
    pub fn driven(&self) -> usize {
        self.driven
    }

    #[inline]
    pub fn stimulus(&self) -> f64 {
        self.stimulus
    }

    /// Port nodes in column order, `v1 .. vN`
    pub fn probes(&self) -> Vec<String> {
        (1..=self.nports()).map(|p| format!("v{}", p)).collect()
    }

    /// Top-level elements of the bench
    pub fn elements(&self) -> Vec<Element> {
        let n = self.driven;
        let mut elements = Vec::with_capacity(self.nports() + 2);

        elements.push(Element::VoltageSource {
            name: n.to_string(),
            pos: "vin".to_string(),
            neg: "0".to_string(),
            dc: 0.0,
            ac: Some(self.stimulus),
        });
        for (k, &r) in self.resistances.iter().enumerate() {
            let m = k + 1;
            if m == n {
                elements.push(Element::resistor(m.to_string(), "vin", format!("v{}", m), r));
            } else {
                elements.push(Element::resistor(m.to_string(), format!("v{}", m), "0", r));
            }
        }

        let mut nodes = self.probes();
        nodes.push("0".to_string());
        elements.push(Element::Instance {
            name: "1".to_string(),
            nodes,
            subckt: self.subckt.clone(),
        });
        elements
    }

    /// ngspice batch deck that sweeps the bench and dumps the port voltages
    /// to `output` with `wrdata`
    pub fn deck(&self, library: &Path, sweep: &AcSweep, output: &Path) -> String {
        let mut deck = String::new();
        // first line is the title
        let _ = writeln!(deck, "* s2spice round trip, port {} driven", self.driven);
        for element in self.elements() {
            let _ = writeln!(deck, "{}", element);
        }
        let _ = writeln!(deck, ".control");
        let _ = writeln!(deck, "set wr_singlescale");
        let _ = writeln!(deck, "set numdgt=16");
        let _ = writeln!(deck, "{}", sweep.command());
        let _ = writeln!(deck, "wrdata {} {}", output.display(), self.probes().join(" "));
        let _ = writeln!(deck, ".endc");
        let _ = writeln!(deck, ".include {}", library.display());
        let _ = writeln!(deck, ".end");
        deck
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bench_elements() {
        let bench = Testbench::new("dut", &[50.0, 75.0, 25.0], 2, 2.0);
        let lines: Vec<String> = bench.elements().iter().map(|e| e.to_string()).collect();

        assert_eq!(
            lines,
            vec![
                "V2 vin 0 dc 0.0 ac 2.0",
                "R1 v1 0 50.0",
                "R2 vin v2 75.0",
                "R3 v3 0 25.0",
                "X1 v1 v2 v3 0 dut",
            ]
        );
    }

    #[test]
    fn test_sweep_command() {
        let sweep = AcSweep::linear(&[1e6, 34e6, 67e6, 100e6]);
        assert_eq!(sweep.command(), "ac lin 4 1e6 1e8");
        assert_eq!(AcSweep::point(2.5e9).command(), "ac lin 1 2.5e9 2.5e9");
    }

    #[test]
    fn test_deck_layout() {
        let bench = Testbench::new("dut", &[50.0], 1, 2.0);
        let deck = bench.deck(
            Path::new("/tmp/dut.inc"),
            &AcSweep::point(1e6),
            Path::new("/tmp/out.txt"),
        );

        assert!(deck.starts_with("* s2spice round trip"));
        assert!(deck.contains("wrdata /tmp/out.txt v1\n"));
        assert!(deck.ends_with(".include /tmp/dut.inc\n.end\n"));
    }
}
