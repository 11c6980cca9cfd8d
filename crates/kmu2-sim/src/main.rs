use std::error::Error;
use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use commands::{
    config::{self, ConfigArgs},
    select::{self, SelectArgs},
    validate::{self, ValidateArgs},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "kmu2-sim", about = "Single-track K+ decay selection CLI")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the selection over a JSON-lines event file.
    Select(SelectArgs),
    /// Print a preset configuration as YAML.
    Config(ConfigArgs),
    /// Check a YAML configuration and print its stage list and hash.
    Validate(ValidateArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Select(args) => select::run(&args),
        Command::Config(args) => config::run(&args),
        Command::Validate(args) => validate::run(&args),
    }
}

pub(crate) fn write_json<P: AsRef<Path>, T: serde::Serialize>(
    path: P,
    value: &T,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}
