// Main entry point for testwire

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use testwire::cli::{Cli, Commands};
use testwire::commands::{handle_listen, handle_replay};
use testwire::config::{self, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();
    testwire::logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting testwire v{}", env!("CARGO_PKG_VERSION"));
    }

    // Load configuration from file (if exists)
    let loaded = Config::load();

    if let Some(config_file) = cli.init_config {
        let toml_content = Config::default().to_toml();
        std::fs::write(&config_file, toml_content)?;
        println!("Configuration file created: {}", config_file.display());
        return Ok(());
    }

    if cli.config {
        print_config(loaded.as_ref());
        return Ok(());
    }

    let config = loaded.unwrap_or_default();

    match &cli.command {
        Some(Commands::Replay(args)) => handle_replay(args, &config),
        Some(Commands::Listen(args)) => handle_listen(args),
        None => {
            warn!("No command given. Use 'testwire --help' for usage.");
            Ok(())
        }
    }
}

fn print_config(loaded: Option<&Config>) {
    println!("Current configuration:");
    match loaded {
        Some(cfg) => {
            println!("\n  Configuration file loaded:");
            if let Some(ref spec) = cfg.reporter.spec {
                println!("    Reporter: {}", spec);
            }
            println!(
                "    Connect: {} attempt(s), {}ms backoff step",
                cfg.connect.attempts, cfg.connect.backoff_ms
            );
            println!("    Parallel: {}", cfg.run.parallel);
        }
        None => {
            println!("\n  No configuration file loaded");
            println!("  Create one with: testwire --init-config .testwirerc.toml");
        }
    }

    println!("\n  Environment variables:");
    match std::env::var(config::ENV_TESTWIRE_REPORTER) {
        Ok(spec) => println!("    {}: {}", config::ENV_TESTWIRE_REPORTER, spec),
        Err(_) => println!("    {}: not set", config::ENV_TESTWIRE_REPORTER),
    }

    println!("\nConfiguration precedence:");
    println!("  1. Command-line arguments (highest)");
    println!("  2. Environment variables");
    println!("  3. Configuration file");
    println!("  4. Built-in defaults (lowest)");
}
