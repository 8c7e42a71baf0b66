use std::{fs, io, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use quill::{lex, parse_with, Config, Interpreter};
use tracing_subscriber::EnvFilter;

/// Runs a quill program against standard input and output.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about, long_about = None)]
struct Args {
    /// Path to the program source
    path: PathBuf,

    /// Deepest statement and expression nesting allowed
    #[arg(long, default_value_t = Config::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Print the tokens as JSON instead of running the program
    #[arg(long, conflicts_with = "dump_ast")]
    dump_tokens: bool,

    /// Print the tree of every procedure instead of running the program
    #[arg(long)]
    dump_ast: bool,

    /// Log more (repeat for trace output); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Program output owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(args: &Args) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let config = Config::default().with_max_depth(args.max_depth);

    if args.dump_tokens {
        let tokens = lex(&source)?;
        println!("{}", serde_json::to_string_pretty(&tokens)?);
        return Ok(());
    }

    let program = parse_with(&source, &config)?;
    if args.dump_ast {
        println!("{}", program);
        return Ok(());
    }

    let mut interpreter = Interpreter::new(io::stdin().lock(), io::stdout().lock()).with_config(config);
    interpreter.run_program(&program)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}
