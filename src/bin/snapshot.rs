//! Registry Snapshot CLI
//!
//! Verifies the registry and publishes the rolling and archival snapshots.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use helixgate::{GateConfig, GitChangeSetProvider, RegistryGate};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "helixgate-snapshot")]
#[command(about = "Publish a verified, write-once registry snapshot")]
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

    /// List published versions instead of publishing
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = GateConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(reference) = cli.reference {
        config.freeze.reference = reference;
    }

    let provider = GitChangeSetProvider::new(&config.root);
    let gate = RegistryGate::new(config, &provider);

    if cli.list {
        let manager = gate.snapshot_manager();
        let versions = manager.published_versions()?;
        if versions.is_empty() {
            println!("No versions published");
        }
        for version in versions {
            println!("{}", version);
        }
        return Ok(());
    }

    let outcome = gate.publish()?;
    println!("✅ Snapshot published.");
    println!("SHA256: {}", outcome.registry_hash);
    println!("Rolling: {}", outcome.rolling_path.display());
    println!("Archive: {}", outcome.archive_path.display());
    Ok(())
}
