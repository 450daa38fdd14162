use clap::Parser;
use log::info;

use smt_puzzles::oracle::Status;
use smt_puzzles::swaps::{SwapStrategy, Swaps, SwapsConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Array to sort.
    #[arg(value_name = "INT", allow_negative_numbers = true, default_values_t = [1, 4, 2, 3, 5])]
    values: Vec<i64>,

    /// State every swap position by position instead of with array stores.
    #[clap(long)]
    pointwise: bool,

    /// Width of the array elements, in bits.
    #[clap(long, value_name = "INT", default_value = "16")]
    bits: u32,

    /// Trace every constraint.
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

    let items: Vec<String> = args.values.iter().map(|v| v.to_string()).collect();
    println!("* User input: [ {} ]", items.join(", "));

    let config = SwapsConfig {
        strategy: if args.pointwise {
            SwapStrategy::Pointwise
        } else {
            SwapStrategy::Store
        },
        element_width: args.bits,
        verbose: args.verbose,
    };
    let mut swaps = Swaps::new(&args.values, config)?;

    println!("* Solving problem");
    match swaps.solve() {
        Status::Satisfiable => {
            println!("  Problem is SAT!");
            // a violated exactly-one propagates as an error and exits non-zero
            let solution = swaps.solution()?;
            for line in solution.to_string().lines() {
                println!("  {}", line);
            }
        }
        status => println!("  Problem is {}", status),
    }

    info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
