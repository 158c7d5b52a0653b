//! Gate Config CLI
//!
//! View and manage registry gate configuration.

use clap::{Parser, Subcommand};
use helixgate::GateConfig;

#[derive(Parser)]
#[command(name = "helixgate-config")]
#[command(about = "View and manage registry gate configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "helixgate.toml")]
        output: String,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = GateConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Registry Gate Configuration\n");
                println!("Root: {:?}", cfg.root);

                println!("\nArtifacts:");
                println!("  Registry: {:?}", cfg.registry_path());
                println!("  Index: {:?}", cfg.index_path());
                println!("  Graph: {:?}", cfg.graph_path());
                println!("  Manifest: {:?}", cfg.manifest_path());

                println!("\nFreeze:");
                println!("  Reference: {}", cfg.freeze.reference);
                println!("  Protected:");
                for path in cfg.protected_paths() {
                    println!("    - {}", path.display());
                }

                println!("\nSnapshots:");
                println!("  Directory: {:?}", cfg.snapshot_dir());
                println!("  Rolling: {}", cfg.snapshot.rolling_file);
                println!("  Archive: {}", cfg.snapshot.archive_dir);

                println!("\nValidation:");
                println!("  Allowed modes: {}", cfg.validation.allowed_modes.join(", "));
            }
        }

        Commands::Init { output } => {
            let cfg = GateConfig::default();
            cfg.save(&output)?;
            println!("✅ Created config file: {}", output);
        }

        Commands::Validate { config } => match GateConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                println!("✅ Configuration is valid");
                println!("   Root: {:?}", cfg.root);
                println!("   Snapshots: {:?}", cfg.snapshot_dir());
                if cfg.validation.allowed_modes.is_empty() {
                    println!("   ⚠️  No operating modes allowed; every registry will be rejected");
                }
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
