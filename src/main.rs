use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ber_sim::{
    BerReport, BerSimulator, DemodType, Modulation, Result,
    common::DEFAULT_SEED,
    layers::link::{CodedLink, Link, UncodedLink},
};

/// Monte-Carlo bit-error-rate estimator for AWGN links.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rate-1/2 convolutionally coded QPSK with soft Viterbi decoding
    Coded(Budget),
    /// Uncoded scrambled link
    Uncoded {
        #[command(flatten)]
        budget: Budget,
        /// Constellation
        #[arg(long, value_enum)]
        modulation: Modulation,
        /// Demodulation type
        #[arg(long, value_enum, default_value_t = DemodType::Hard)]
        demod: DemodType,
    },
}

#[derive(Args, Debug)]
struct Budget {
    /// Eb/No points in dB, simulated in order
    #[arg(long, num_args = 1.., required = true, allow_negative_numbers = true)]
    ebno: Vec<f64>,
    /// Bit errors after which a point stops
    #[arg(long, default_value_t = 100)]
    max_errs: u64,
    /// Transmitted bits after which a point stops
    #[arg(long, default_value_t = 1_000_000)]
    max_bits: u64,
    /// Seed of the first trial, later trials use the following seeds
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Independent trials run in parallel and pooled per point
    #[arg(long, default_value_t = 1)]
    trials: u64,
}

/// Runs `budget.trials` independent sweeps and pools them point by point.
fn run_trials<L, F>(budget: &Budget, make: F) -> Result<Vec<BerReport>>
where
    L: Link,
    F: Fn(u64) -> Result<BerSimulator<L>> + Sync,
{
    let progress = ProgressBar::new(budget.trials * budget.ebno.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} points {msg}") {
        progress.set_style(style);
    }

    let trials = (0..budget.trials)
        .into_par_iter()
        .map(|trial| {
            let mut sim = make(budget.seed.wrapping_add(trial))?;
            sim.sweep(&budget.ebno, budget.max_errs, budget.max_bits, |report| {
                progress.set_message(format!("{} dB", report.ebno_db));
                progress.inc(1);
            })
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish_and_clear();

    Ok((0..budget.ebno.len())
        .filter_map(|point| {
            let reports: Vec<BerReport> = trials.iter().map(|t| t[point]).collect();
            BerReport::pooled(&reports, budget.max_errs)
        })
        .collect())
}

fn print_reports(reports: &[BerReport]) {
    println!("{:>10} {:>14} {:>12} {:>14}  stop", "Eb/No dB", "BER", "errors", "bits");
    for r in reports {
        println!(
            "{:>10.2} {:>14.6e} {:>12} {:>14}  {:?}",
            r.ebno_db, r.ber, r.errors, r.bits, r.stop
        );
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=error", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let reports = match &cli.command {
        Command::Coded(budget) => run_trials(budget, BerSimulator::<CodedLink>::coded)?,
        Command::Uncoded {
            budget,
            modulation,
            demod,
        } => run_trials(budget, |seed| {
            let link = UncodedLink::new(*modulation, *demod)?;
            Ok(BerSimulator::new(link, seed))
        })?,
    };

    print_reports(&reports);
    Ok(())
}
