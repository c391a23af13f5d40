//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for mcp-conductor
#[derive(Parser, Debug)]
#[command(name = "mcp-conductor")]
#[command(author, version, about = "Plan and run tasks across MCP tool providers")]
#[command(long_about = r#"
mcp-conductor connects to MCP tool providers over stdio and answers requests
with two language-model roles.

Each request goes through:
1. Advising: the advisory role reads the tool catalogue and may propose a plan
2. Plan check: a JSON execution plan is extracted from the advisory text
3. Executing: the execution role runs the plan, calling tools as needed

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables
2. --config <path>     Explicit config file (TOML, or JSON with mcpServers)
3. ./conductor.toml    Project-level config
4. ~/.config/mcp-conductor/config.toml   Global config

Example:
  mcp-conductor "List the files in my project directory"
  mcp-conductor --stream --config servers.json "Show the latest git commits"
  mcp-conductor                     # interactive chat
"#)]
pub struct Cli {
    /// Request to process (starts the interactive chat when omitted)
    pub prompt: Option<String>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, conflicts_with = "config")]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Stream the response as it is produced
    #[arg(long)]
    pub stream: bool,

    /// Store extracted plans instead of running them
    #[arg(long)]
    pub no_auto_execute: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write diagnostic logs to a daily file in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Default log filter for the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt_and_flags() {
        let cli = Cli::parse_from([
            "mcp-conductor",
            "--stream",
            "--no-auto-execute",
            "-vv",
            "list files",
        ]);
        assert_eq!(cli.prompt.as_deref(), Some("list files"));
        assert!(cli.stream);
        assert!(cli.no_auto_execute);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_parse_without_prompt() {
        let cli = Cli::parse_from(["mcp-conductor", "--config", "servers.json", "-q"]);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("servers.json")));
        assert!(cli.quiet);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_config_conflicts_with_no_config() {
        let result = Cli::try_parse_from(["mcp-conductor", "--config", "a.toml", "--no-config"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_saturates_at_trace() {
        let cli = Cli::parse_from(["mcp-conductor", "-vvvvv"]);
        assert_eq!(cli.log_level(), "trace");
    }
}
