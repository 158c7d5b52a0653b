//! Registry Validator CLI
//!
//! Runs the full check sequence and prints a single JSON verdict on stdout.
//! Exit code 0 on VALID, 1 on INVALID or any fatal error.

use std::path::PathBuf;

use clap::Parser;
use helixgate::{GateConfig, GitChangeSetProvider, RegistryGate, ValidationReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "helixgate-validate")]
#[command(about = "Validate the canonical registry against its version manifest")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Repository root (overrides config)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Freeze-mode reference baseline (overrides config)
    #[arg(long)]
    reference: Option<String>,

    /// Pretty-print the verdict
    #[arg(long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = run(&cli);

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    if !report.is_valid() {
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> ValidationReport {
    let mut config = match GateConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return ValidationReport::from_error(&e),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(reference) = &cli.reference {
        config.freeze.reference = reference.clone();
    }

    let provider = GitChangeSetProvider::new(&config.root);
    RegistryGate::new(config, &provider).validate()
}
