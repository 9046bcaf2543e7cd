//! ngspice batch-mode backend
//!
//! Every run gets its own temporary directory holding the library, the deck
//! and the `wrdata` output; the directory is removed when the run returns,
//! whether it succeeded or not.

use std::fs;
use std::io::ErrorKind;
use std::process::Command;

use ndarray::Array2;
use num_complex::Complex64;
use tempfile::{Builder, TempDir};
use tracing::{debug, debug_span};

use super::testbench::{AcSweep, Testbench};
use super::SimulatorBackend;
use crate::error::VerifyError;

/// Runs `ngspice -b` on a generated deck and reads back its `wrdata` table
#[derive(Debug, Clone)]
pub struct NgspiceBatch {
    command: String,
}

impl NgspiceBatch {
    /// Environment variable overriding the ngspice executable
    pub const COMMAND_ENV: &'static str = "S2SPICE_NGSPICE";

    /// Use `ngspice` from `PATH`
    pub fn new() -> Self {
        Self::with_command("ngspice")
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Use the executable named by `S2SPICE_NGSPICE`, falling back to `ngspice`
    pub fn from_env() -> Self {
        match std::env::var(Self::COMMAND_ENV) {
            Ok(cmd) if !cmd.trim().is_empty() => Self::with_command(cmd),
            _ => Self::new(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// First line of `ngspice --version`
    pub fn version(&self) -> Result<String, VerifyError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("unknown")
            .trim()
            .to_string())
    }

    fn spawn_error(&self, source: std::io::Error) -> VerifyError {
        if source.kind() == ErrorKind::NotFound {
            VerifyError::SimulatorNotFound {
                command: self.command.clone(),
                source,
            }
        } else {
            VerifyError::Io(source)
        }
    }
}

impl Default for NgspiceBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorBackend for NgspiceBatch {
    fn name(&self) -> &str {
        "ngspice"
    }

    fn run_ac(
        &self,
        library: &str,
        bench: &Testbench,
        sweep: &AcSweep,
    ) -> Result<Array2<Complex64>, VerifyError> {
        let _span = debug_span!("ngspice", driven = bench.driven(), points = sweep.len()).entered();

        let tmpdir: TempDir = Builder::new().prefix("s2spice").tempdir()?;
        let library_path = tmpdir.path().join("library.inc");
        let deck_path = tmpdir.path().join("bench.cir");
        let output_path = tmpdir.path().join("ac.txt");

        fs::write(&library_path, library)?;
        fs::write(&deck_path, bench.deck(&library_path, sweep, &output_path))?;

        let result = Command::new(&self.command)
            .arg("-b")
            .arg(&deck_path)
            .current_dir(tmpdir.path())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&result.stderr).into_owned();
        debug!(status = %result.status, "ngspice finished");

        // ngspice -b exits 0 on many deck errors, so a missing table is a failure too
        if !result.status.success() || !output_path.exists() {
            return Err(VerifyError::Simulator {
                status: result.status.to_string(),
                stdout,
                stderr,
            });
        }

        let text = fs::read_to_string(&output_path)?;
        let (freqs, values) = parse_wrdata(&text, bench.nports())?;
        if freqs.len() != sweep.len() {
            return Err(VerifyError::MalformedOutput(format!(
                "expected {} frequency points, got {}",
                sweep.len(),
                freqs.len()
            )));
        }
        Ok(values)
    }
}

/// Parse a single-scale complex `wrdata` table
///
/// Each row is `freq re(v1) im(v1) .. re(vN) im(vN)`. Returns the frequency
/// column and a `[points, nports]` array of node voltages.
pub fn parse_wrdata(
    text: &str,
    nports: usize,
) -> Result<(Vec<f64>, Array2<Complex64>), VerifyError> {
    let ncols = 1 + 2 * nports;
    let mut freqs = Vec::new();
    let mut values = Vec::new();

    for (k, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('*') || line.starts_with('#') {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| VerifyError::MalformedOutput(format!("line {}: {}", k + 1, e)))?;
        if row.len() != ncols {
            return Err(VerifyError::MalformedOutput(format!(
                "line {}: expected {} columns, got {}",
                k + 1,
                ncols,
                row.len()
            )));
        }

        freqs.push(row[0]);
        values.extend(row[1..].chunks_exact(2).map(|c| Complex64::new(c[0], c[1])));
    }

    if freqs.is_empty() {
        return Err(VerifyError::MalformedOutput("no data rows".to_string()));
    }

    let values = Array2::from_shape_vec((freqs.len(), nports), values)
        .map_err(|e| VerifyError::MalformedOutput(e.to_string()))?;
    Ok((freqs, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrdata() {
        let text = " 1.000000000000000e+06  1.1 0.05  0.9 -0.02\n\
                     3.400000000000000e+07  1.2 0.06  0.8 -0.03\n";
        let (freqs, values) = parse_wrdata(text, 2).unwrap();

        assert_eq!(freqs, vec![1e6, 34e6]);
        assert_eq!(values.dim(), (2, 2));
        assert_eq!(values[[0, 1]], Complex64::new(0.9, -0.02));
        assert_eq!(values[[1, 0]], Complex64::new(1.2, 0.06));
    }

    #[test]
    fn test_parse_wrdata_rejects_bad_rows() {
        assert!(matches!(
            parse_wrdata("1 2 3\n", 2),
            Err(VerifyError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_wrdata("1 2 x\n", 1),
            Err(VerifyError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_wrdata("\n\n", 1),
            Err(VerifyError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_missing_executable() {
        let sim = NgspiceBatch::with_command("s2spice-no-such-simulator");
        let bench = Testbench::new("dut", &[50.0], 1, 2.0);
        let err = sim
            .run_ac(".subckt dut 1 gnd_node\n.ends\n", &bench, &AcSweep::point(1e6))
            .unwrap_err();
        assert!(matches!(err, VerifyError::SimulatorNotFound { .. }));
    }
}
