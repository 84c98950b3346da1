use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sievekit::model::RuleSet;
use sievekit::store::{model_store, script_io};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")");

/// Convert between Sieve filter scripts and a structured rule model.
#[derive(Parser)]
#[command(
    name = "sievekit",
    version = VERSION,
    about = "Generate, parse and validate Sieve mail filters"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the Sieve script for a rule model.
    Generate {
        /// Model JSON file, `-` for stdin (default: the stored model).
        model: Option<PathBuf>,
        /// Write the script to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recover a rule model from a Sieve script and print it as JSON.
    Parse {
        /// Script file, `-` for stdin.
        #[arg(default_value = script_io::STDIN)]
        script: PathBuf,
        /// Replace the stored model's rules with the parsed ones.
        #[arg(long)]
        save: bool,
    },
    /// Print advisory warnings for a rule model, one per line.
    Validate {
        /// Model JSON file, `-` for stdin (default: the stored model).
        model: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sievekit=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Generate { model, output } => {
            let rule_set = load_model(model.as_deref())?;
            let script = sievekit::generate(&rule_set);
            match output {
                Some(path) => {
                    script_io::save_script(&path, &script)
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    info!(path = %path.display(), "wrote script");
                }
                None => print!("{script}"),
            }
        }
        Command::Parse { script, save } => {
            let text = script_io::load_script(&script)
                .with_context(|| format!("Cannot read {}", script.display()))?;
            let parsed = sievekit::parse(&text)
                .with_context(|| format!("Cannot convert {} to rules", script.display()))?;
            println!("{}", model_store::encode_model(&parsed)?);

            if save {
                let mut stored = model_store::load_model()?;
                stored.adopt(parsed);
                let path = model_store::save_model(&stored)?;
                info!(path = %path.display(), rules = stored.rules.len(), "saved parsed rules");
            }
        }
        Command::Validate { model } => {
            let rule_set = load_model(model.as_deref())?;
            for warning in sievekit::validate(&rule_set) {
                println!("{warning}");
            }
        }
    }

    Ok(())
}

fn load_model(path: Option<&Path>) -> Result<RuleSet> {
    match path {
        Some(path) => {
            let data = script_io::load_script(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            Ok(model_store::decode_model(&data))
        }
        None => Ok(model_store::load_model()?),
    }
}
