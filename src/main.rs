// File: src/main.rs
//
// Command-line entry point for pushvm.
// Dispatches to the subcommands: run a serialized interpreter state, or
// evolve random programs against a demo fitness function.

use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use colored::Colorize;
use pushvm::gp::{FitnessCallback, GpCallbacks, GpParams, Population, Selection};
use pushvm::interpreter::{Interpreter, StackId};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(
    name = "pushvm",
    about = "pushvm: a Push3 interpreter and genetic-programming runtime",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Load a serialized interpreter state, run it and print the stacks
    Run {
        /// Path to the XML state file
        file: PathBuf,

        /// Maximum number of steps (0 = run until the exec stack is empty)
        #[arg(long, default_value_t = 0)]
        steps: u64,

        /// Re-serialize the final state to stdout
        #[arg(long)]
        dump: bool,
    },

    /// Evolve random programs whose integer-stack top approaches a target
    Evolve {
        /// Number of programs in the population
        #[arg(long, default_value_t = 20)]
        population: usize,

        /// Point budget for each initial random program
        #[arg(long, default_value_t = 30)]
        size: i64,

        /// Number of generations to run
        #[arg(long, default_value_t = 10)]
        generations: usize,

        /// The integer the programs should compute
        #[arg(long, default_value_t = 42)]
        target: i64,

        /// Worker threads for parallel evaluation
        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Step budget per program evaluation
        #[arg(long, default_value_t = 2000)]
        steps: u64,

        /// Random seed (0 = from entropy)
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Selection strategy
        #[arg(long, value_enum, default_value_t = SelectionArg::Linear)]
        selection: SelectionArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SelectionArg {
    Linear,
    Ranked,
}

impl From<SelectionArg> for Selection {
    fn from(arg: SelectionArg) -> Selection {
        match arg {
            SelectionArg::Linear => Selection::RouletteLinear,
            SelectionArg::Ranked => Selection::RouletteRanked,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, steps, dump } => cmd_run(&file, steps, dump),
        Commands::Evolve {
            population,
            size,
            generations,
            target,
            threads,
            steps,
            seed,
            selection,
        } => cmd_evolve(population, size, generations, target, threads, steps, seed, selection),
    }
}

fn cmd_run(file: &PathBuf, steps: u64, dump: bool) -> ExitCode {
    let xml = match fs::read_to_string(file) {
        Ok(xml) => xml,
        Err(err) => {
            eprintln!("{} cannot read {}: {}", "Error:".bright_red(), file.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new();
    if let Err(err) = interp.load_state(&xml) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let performed = interp.run(steps);
    println!("{} {} steps", "Performed".bold(), performed);
    for id in StackId::ALL {
        let stack = interp.stacks.get(id);
        let items: Vec<String> =
            stack.iter_top_down().map(|&v| interp.display_value(v)).collect();
        println!("{:>8}: [{}]", id.title(), items.join(", "));
    }

    if dump {
        match interp.dump_state() {
            Ok(xml) => println!("{}", xml),
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

#[allow(clippy::too_many_arguments)]
fn cmd_evolve(
    population: usize,
    size: i64,
    generations: usize,
    target: i64,
    threads: usize,
    steps: u64,
    seed: u64,
    selection: SelectionArg,
) -> ExitCode {
    let params = GpParams {
        population_size: population,
        program_size: size,
        threads,
        max_steps: steps,
        seed,
        selection: selection.into(),
    };

    // closer integer-stack tops score higher; an empty stack scores zero
    let fitness: FitnessCallback = Box::new(move |interp, _code| match interp.int_at(0) {
        Some(top) => 1.0 / (1.0 + top.wrapping_sub(target).unsigned_abs() as f64),
        None => 0.0,
    });

    let mut pop = Population::new(params, GpCallbacks::with_fitness(fitness));

    for gen in 1..=generations {
        pop.evaluate();
        if let Some(best) = pop.best_program() {
            let interp = best.interp.lock().unwrap();
            println!(
                "{} {:>3}  best fitness {:.4}  {}",
                "generation".bold(),
                gen,
                best.fitness,
                interp.display_value(best.code)
            );
        }
        pop.generation();
    }

    pop.evaluate();
    if let Some(best) = pop.best_program() {
        let interp = best.interp.lock().unwrap();
        println!(
            "{} fitness {:.4}  {}",
            "best:".bright_green().bold(),
            best.fitness,
            interp.display_value(best.code)
        );
    }
    ExitCode::SUCCESS
}
