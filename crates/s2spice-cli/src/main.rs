//! s2spice: convert Touchstone S-parameter files into SPICE subcircuits
//!
//! Writes `<input>.inc` next to the input file and optionally re-measures the
//! result to confirm it reproduces the data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use s2spice_core::spice::SynthesisOptions;
use s2spice_core::verify::{
    MnaBackend, NgspiceBatch, RoundTrip, SimulatorBackend, SweepMode, VerifyOptions,
};
use s2spice_core::Network;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "s2spice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// S-parameter file to convert (.s1p, .s2p, .. or .ts)
    file: PathBuf,

    /// Overwrite an existing output file
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Subcircuit name, defaults to the input file stem
    #[arg(long)]
    name: Option<String>,

    /// Spacing of internal node numbers; at most NODE_BASE - 2 ports fit
    #[arg(long, default_value_t = s2spice_core::constants::DEFAULT_NODE_BASE)]
    node_base: usize,

    /// Leave the commented usage example out of the header
    #[arg(long)]
    no_example: bool,

    /// Re-measure the written subcircuit and compare it with the input data
    #[arg(long, value_enum)]
    verify: Option<Verifier>,

    /// Sweep one frequency point per simulator run while verifying
    #[arg(long, requires = "verify")]
    per_point: bool,

    /// ngspice executable used by `--verify ngspice`
    #[arg(long, env = "S2SPICE_NGSPICE", default_value = "ngspice")]
    ngspice: String,

    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Verifier {
    /// In-memory nodal solver
    Builtin,
    /// ngspice in batch mode
    Ngspice,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let outcome = run(&cli)?;
    info!(
        subckt = %outcome.name,
        output = %outcome.output.display(),
        passed = outcome.passed,
        "done"
    );
    if outcome.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

/// Result of one invocation
#[derive(Debug)]
struct Outcome {
    output: PathBuf,
    name: String,
    /// False only when verification found a mismatch
    passed: bool,
}

fn run(cli: &Cli) -> Result<Outcome> {
    let output = output_path(&cli.file);
    if output.exists() && !cli.overwrite {
        bail!(
            "output file {} exists, use -o to overwrite",
            output.display()
        );
    }

    let name = convert(cli, &output)?;
    println!("{}", summary(&cli.file, &output, &name));

    let passed = match cli.verify {
        Some(verifier) => verify(cli, verifier, &output, &name)?,
        None => true,
    };
    Ok(Outcome {
        output,
        name,
        passed,
    })
}

fn output_path(input: &Path) -> PathBuf {
    input.with_extension("inc")
}

fn summary(input: &Path, output: &Path, name: &str) -> String {
    format!(
        "Converted {} to {} and created SPICE sub-circuit {}",
        input.display(),
        output.display(),
        name
    )
}

/// Synthesize and write the include file, returning the subcircuit name
fn convert(cli: &Cli, output: &Path) -> Result<String> {
    let ntwk = Network::from_touchstone(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let comments = ntwk.header_comments();

    let options = SynthesisOptions::default()
        .with_node_base(cli.node_base)
        .with_usage_example(!cli.no_example);
    let sub = ntwk
        .to_subcircuit(cli.name.as_deref(), Some(comments.as_slice()), &options)
        .with_context(|| format!("failed to synthesize {}", cli.file.display()))?;

    info!(
        ports = sub.nports(),
        models = sub.model_count(),
        points = ntwk.nfreq(),
        "synthesized subcircuit"
    );

    sub.write(output, cli.overwrite)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(sub.name().to_string())
}

/// Re-measure the written file, returning whether it matches the input
fn verify(cli: &Cli, verifier: Verifier, output: &Path, name: &str) -> Result<bool> {
    let ntwk = Network::from_touchstone(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let backend: Box<dyn SimulatorBackend> = match verifier {
        Verifier::Builtin => Box::new(MnaBackend::new()),
        Verifier::Ngspice => Box::new(NgspiceBatch::with_command(&cli.ngspice)),
    };
    let sweep = if cli.per_point {
        SweepMode::PerPoint
    } else {
        SweepMode::Batched
    };

    let report = RoundTrip::new(backend.as_ref())
        .with_options(VerifyOptions::default().with_sweep(sweep))
        .verify_file(
            output,
            name,
            ntwk.frequency.f(),
            ntwk.s.view(),
            &ntwk.reference_impedance(),
        )
        .with_context(|| format!("round trip of {} failed to run", output.display()))?;

    println!("{}", report);
    Ok(report.passed())
}
