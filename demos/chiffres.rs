use std::time::Duration;

use clap::Parser;
use log::info;

use smt_puzzles::bmc::SearchMode;
use smt_puzzles::diagnostics::Diagnostics;
use smt_puzzles::oracle::Status;
use smt_puzzles::stack_machine::{StackMachine, StackMachineConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Numbers to combine, each usable at most once.
    #[arg(value_name = "INT", required = true, allow_negative_numbers = true)]
    nums: Vec<i64>,

    /// Value to reach.
    #[clap(long, value_name = "INT", allow_negative_numbers = true)]
    target: i64,

    /// Width of the stack values, in bits.
    #[clap(long, value_name = "INT", default_value = "32")]
    bits: u32,

    /// Forbid signed overflow.
    #[clap(long)]
    no_overflows: bool,

    /// Timeout per solver call, in milliseconds.
    #[clap(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Log every search step.
    #[clap(long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let machine = StackMachine::new(StackMachineConfig {
        nums: args.nums.clone(),
        target: args.target,
        bv_bits: args.bits,
        no_overflows: args.no_overflows,
    })?
    .with_diagnostics(Diagnostics::new("chiffres", args.verbose));

    let outcome = machine.solve(args.timeout.map(Duration::from_millis));
    match (outcome.status, &outcome.model) {
        (Status::Satisfiable, Some(model)) => {
            match outcome.mode {
                SearchMode::Exact => println!("Reached {} in {} steps", args.target, outcome.steps),
                SearchMode::Approximate => println!(
                    "Closest result {} (distance {}) in {} steps",
                    machine.result(model, outcome.steps)?,
                    outcome.distance.unwrap_or_default(),
                    outcome.steps
                ),
            }
            for line in machine.trace(model, outcome.steps)? {
                println!("{}", line);
            }
        }
        (status, _) => println!("{} ({} search, {} steps)", status, outcome.mode, outcome.steps),
    }

    info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
