// Configuration file handling

use crate::report::ConnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub reporter: ReporterConfig,

    #[serde(default)]
    pub connect: ConnectConfig,

    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReporterConfig {
    /// Reporter to use: `port:<number>` or `file:<path>`
    #[serde(default)]
    pub spec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Number of connection attempts before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Backoff step in milliseconds; attempt n waits n * step
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl ConnectConfig {
    pub fn policy(&self) -> ConnectPolicy {
        ConnectPolicy {
            attempts: self.attempts,
            backoff_step: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Worker threads used when replaying a session
    #[serde(default = "default_parallel")]
    pub parallel: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

// Default values
pub const ENV_TESTWIRE_REPORTER: &str = "TESTWIRE_REPORTER";

fn default_attempts() -> u32 {
    crate::report::connect::DEFAULT_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    crate::report::connect::DEFAULT_BACKOFF_STEP.as_millis() as u64
}

pub fn default_parallel() -> String {
    String::from("1")
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. .testwirerc (current directory)
        // 2. ~/.testwirerc (home directory)
        // 3. .testwirerc.toml (current directory)
        // 4. ~/.testwirerc.toml (home directory)

        let cwd = std::env::current_dir().ok()?;
        let home = dirs::home_dir()?;

        let paths = [
            cwd.join(".testwirerc"),
            home.join(".testwirerc"),
            cwd.join(".testwirerc.toml"),
            home.join(".testwirerc.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        None
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Option<Self> {
        toml::from_str(content).ok()
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    /// Reporter spec by precedence: explicit value, environment, config file
    pub fn resolve_reporter(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(ENV_TESTWIRE_REPORTER).ok())
            .or_else(|| self.reporter.spec.clone())
    }
}
