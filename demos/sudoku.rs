use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::info;

use smt_puzzles::oracle::Status;
use smt_puzzles::parse::Puzzle;
use smt_puzzles::sudoku::{GridEncoding, Sudoku, SudokuConfig};

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Encoding {
    /// One boolean per cell and value.
    Bool,
    /// One integer per cell.
    Int,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Puzzle file: block size on the first line, then comma-separated rows.
    #[arg(value_name = "FILE")]
    path: PathBuf,

    /// Cell encoding.
    #[clap(long, value_enum, default_value = "bool")]
    encoding: Encoding,

    /// Enumerate all solutions.
    #[clap(long)]
    all: bool,

    /// Stop enumerating after this many solutions.
    #[clap(long, value_name = "INT")]
    limit: Option<usize>,

    /// Timeout per solver call, in milliseconds.
    #[clap(long, value_name = "MS")]
    timeout: Option<u64>,

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
    println!("args = {:?}", args);

    let puzzle = Puzzle::load(&args.path)?;
    println!("block size = {}, givens = {}", puzzle.block, puzzle.givens.len());

    let config = SudokuConfig {
        encoding: match args.encoding {
            Encoding::Bool => GridEncoding::Boolean,
            Encoding::Int => GridEncoding::Integer,
        },
        timeout: args.timeout.map(Duration::from_millis),
        verbose: args.verbose,
    };
    let mut sudoku = Sudoku::from_puzzle(&puzzle, config)?;

    if args.all || args.limit.is_some() {
        let (grids, status) = sudoku.enumerate(args.limit)?;
        for (k, grid) in grids.iter().enumerate() {
            println!("Solution #{}:", k + 1);
            print!("{}", grid);
            assert!(grid.is_valid(puzzle.block));
        }
        println!("Found {} solutions, last status: {}", grids.len(), status);
    } else {
        match sudoku.solve() {
            Status::Satisfiable => {
                let grid = sudoku.grid()?;
                print!("{}", grid);
                assert!(grid.is_valid(puzzle.block));
            }
            status => println!("{}", status),
        }
    }

    info!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
