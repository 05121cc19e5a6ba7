mod replay;
mod transcript;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use keyscan::{Debouncer, EagerLockout, FreezeAfterChange, ScanConfig, ScanInterval};
use log::LevelFilter;
use std::fs;

use replay::{Event, Options};

/// CPU clock of the Teensy 2.0 the ErgoDox firmware runs on.
const TEENSY_F_CPU: u32 = 16_000_000;

#[derive(Parser)]
#[command(name = "keyscan-cli")]
#[command(about = "Key scanner simulator and timing calculator")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scan transcript and print the keyswitch events it produces
    Replay {
        /// Path to the transcript file
        transcript: String,
        /// Matrix shape to replay on
        #[arg(long, value_enum, default_value_t = Shape::Ergodox)]
        shape: Shape,
        /// Debouncing policy
        #[arg(long, value_enum, default_value_t = Policy::Freeze)]
        policy: Policy,
        /// Scans a key stays frozen after a change (freeze policy only)
        #[arg(long, default_value_t = ScanConfig::DEFAULT.debounce_window())]
        debounce: u8,
        /// Main loop iterations between two timer ticks
        #[arg(long, default_value_t = 1)]
        passes_per_scan: usize,
        /// Only print presses and releases
        #[arg(long)]
        changes_only: bool,
    },
    /// Compute the Timer1 reload value for a scan interval
    Timer {
        /// Scan interval in microseconds
        #[arg(long, default_value_t = ScanInterval::MATRIX.as_micros())]
        interval_us: u16,
        /// CPU clock in Hz
        #[arg(long, default_value_t = TEENSY_F_CPU)]
        f_cpu: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shape {
    /// 14 rows x 6 columns: both halves of an ErgoDox
    Ergodox,
    /// 4 x 12 single board matrix
    Atreus,
    /// 4 x 16: two satellite halves
    Model100,
    /// One row of 8 direct pins
    Direct,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Freeze,
    Eager,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Command::Replay {
            transcript,
            shape,
            policy,
            debounce,
            passes_per_scan,
            changes_only,
        } => {
            let contents = fs::read_to_string(&transcript)
                .with_context(|| format!("reading {}", transcript))?;
            let scans = transcript::parse_transcript(&contents).context("parsing transcript")?;

            let options = Options {
                passes_per_scan: passes_per_scan.max(1),
                changes_only,
            };
            let events = match policy {
                Policy::Freeze => {
                    let config = ScanConfig::new(debounce, ScanInterval::MATRIX.as_micros())
                        .context("invalid debounce window")?;
                    run(shape, &scans, FreezeAfterChange::from_config(&config), options)?
                }
                Policy::Eager => run(shape, &scans, EagerLockout::new(), options)?,
            };

            for event in &events {
                print_event(event);
            }
            println!("{} scans, {} events", scans.len(), events.len());
        }
        Command::Timer { interval_us, f_cpu } => {
            let interval = ScanInterval::from_micros(interval_us).context("invalid scan interval")?;
            let ticks = interval
                .timer_ticks(f_cpu)
                .context("interval does not fit Timer1")?;
            println!(
                "{} us at {} Hz: ICR1 = {} (0x{:04X})",
                interval.as_micros(),
                f_cpu,
                ticks,
                ticks
            );
        }
    }

    Ok(())
}

fn run<D: Debouncer>(
    shape: Shape,
    scans: &[transcript::Scan],
    debouncer: D,
    options: Options,
) -> Result<Vec<Event>> {
    match shape {
        Shape::Ergodox => replay::replay::<D, 14, 6>(scans, debouncer, options),
        Shape::Atreus => replay::replay::<D, 4, 12>(scans, debouncer, options),
        Shape::Model100 => replay::replay::<D, 4, 16>(scans, debouncer, options),
        Shape::Direct => replay::replay::<D, 1, 8>(scans, debouncer, options),
    }
}

fn print_event(event: &Event) {
    println!(
        "scan {:>4} pass {:>2}  ({:>2},{:>2})  {:02b} {}",
        event.scan,
        event.pass,
        event.row,
        event.col,
        event.state.bits(),
        event.describe()
    );
}
