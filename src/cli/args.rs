// CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Streams test run progress to IDE listeners and XML reports
#[derive(Parser, Debug)]
#[command(name = "testwire")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay test sessions into reporters and listen to reporting sockets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive a reporter from a recorded session script
    Replay(ReplayArgs),

    /// Accept one reporter connection and print the decoded frames
    Listen(ListenArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Session script (JSON: bundles, nodes, events)
    #[arg(required = true)]
    pub script: PathBuf,

    /// Reporter: port:<number> or file:<path>
    #[arg(short = 'r', long, value_name = "SPEC")]
    pub reporter: Option<String>,

    /// Dispatch leaf tests from N worker threads
    #[arg(short = 'p', long)]
    pub parallel: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Loopback port to listen on
    #[arg(long)]
    pub port: u16,

    /// Print frames as JSON lines
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl ReplayArgs {
    /// Worker count: explicit flag, then config, "auto" meaning CPU count
    pub fn parallel_jobs(&self, configured: &str) -> usize {
        let parallel = self.parallel.as_deref().unwrap_or(configured);

        if parallel == "auto" {
            std::thread::available_parallelism()
                .ok()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            parallel.parse().unwrap_or(1).max(1)
        }
    }
}
