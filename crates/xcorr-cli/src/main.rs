//! `xcorr-verify`: run the accelerator verification session.
//!
//! ```text
//! USAGE:
//!   xcorr-verify [--final-only] [--single] [--read-time-only] [--quiet]
//!                [--strict] [--check-vacancy] [--sim]
//!                [--sum-file F] [--dat-file F]
//!                [--out-int-bits N] [--out-frac-bits N] [--poll-budget N]
//! ```
//!
//! Exit status: 0 when the session stays within the 10% error budget,
//! 1 when it does not, 2 on setup/reference failures.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use xcorr_harness::prelude::*;

#[derive(Parser)]
#[command(name = "xcorr-verify", about = "AXI-Stream xcorr accelerator verification", version)]
struct Cli {
    /// Request only the cumulative final result instead of per-run outputs.
    #[arg(long)]
    final_only: bool,

    /// Stop after the first correlation run.
    #[arg(long)]
    single: bool,

    /// Parse the reference files but never touch the device.
    #[arg(long)]
    read_time_only: bool,

    /// Suppress per-run progress output.
    #[arg(long, short)]
    quiet: bool,

    /// Abort on the first poll timeout or desync instead of continuing.
    #[arg(long)]
    strict: bool,

    /// Pre-check transmit vacancy before pushing each frame (advisory).
    #[arg(long)]
    check_vacancy: bool,

    /// Run against the software device model instead of hardware.
    #[arg(long)]
    sim: bool,

    /// Cumulative final reference (one CSV line of floats).
    #[arg(long, default_value = "xcorr-emat-sum.txt")]
    sum_file: PathBuf,

    /// Per-run reference records (binary, .gz sibling auto-decompressed).
    #[arg(long, default_value = "xcorr-emat.dat")]
    dat_file: PathBuf,

    /// Integer bits of the core's output format.
    #[arg(long, default_value_t = 8)]
    out_int_bits: u32,

    /// Fractional bits of the core's output format.
    #[arg(long, default_value_t = 32)]
    out_frac_bits: u32,

    /// Polling attempt budget per condition.
    #[arg(long, default_value_t = xcorr_harness::DEFAULT_POLL_BUDGET)]
    poll_budget: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    match run(&cli) {
        Ok(passed) => {
            if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("xcorr-verify: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let config = VerifyConfig {
        mode: if cli.final_only {
            ResultMode::FinalOnly
        } else {
            ResultMode::PerRun
        },
        single: cli.single,
        read_time_only: cli.read_time_only,
        fault_policy: if cli.strict {
            FaultPolicy::Strict
        } else {
            FaultPolicy::Lenient
        },
        check_vacancy: cli.check_vacancy,
        format: FixedFormat::new(cli.out_int_bits, cli.out_frac_bits),
        poll_budget: cli.poll_budget,
        ..VerifyConfig::default()
    };

    let final_ref = load_final_reference(&cli.sum_file)
        .with_context(|| format!("loading {}", cli.sum_file.display()))?;
    tracing::info!("final reference: {} values", final_ref.len());

    let cases = CaseReader::open(&cli.dat_file)
        .with_context(|| format!("opening {}", cli.dat_file.display()))?;

    let verifier = Verifier::new(config);

    let outcome = if cli.sim {
        tracing::info!("running against the software device model");
        let fifo = SimFifo::new(FixedFormat::new(cli.out_int_bits, cli.out_frac_bits));
        verifier.run(fifo, cases, &final_ref)?
    } else {
        let mut bring_up = BringUp::map().context("mapping SLCR for bring-up")?;
        bring_up.run();
        let fifo = AxiFifo::map().context("mapping stream FIFO")?;
        verifier.run(fifo, cases, &final_ref)?
    };

    if let Some(final_result) = &outcome.final_result {
        // The final sum in a form pasteable into the export pipeline.
        let rendered: Vec<String> = final_result
            .output
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        println!(
            "{},{},{}",
            cli.out_int_bits,
            cli.out_frac_bits,
            rendered.join(",")
        );
    }

    let s = &outcome.summary;
    println!(
        "Summary: {} runs, {} values tested, {} errors, {} faults -> {}",
        s.runs,
        s.tested,
        s.errors,
        s.faults,
        if s.passed() { "PASS" } else { "FAIL" }
    );

    Ok(s.passed())
}
