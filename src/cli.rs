//! Command-line interface for meditone
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Guided meditation audio from timestamped scripts
#[derive(Parser, Debug)]
#[command(
    name = "meditone",
    version,
    about = "Guided meditation audio from timestamped scripts"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage logs, -vv: per-request diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a pacing interval.
///
/// Accepts bare numbers (seconds) and anything `humantime` understands:
/// `22s`, `1m`, `1m30s`.
fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize a script into one meditation recording
    Render {
        /// Script file with `[MM:SS] text` lines
        script: PathBuf,

        /// Identifier for this run; names the scratch directory and the output file
        #[arg(long, value_name = "ID")]
        run_id: String,

        /// Voice name (default: from config)
        #[arg(long, value_name = "NAME")]
        voice: Option<String>,

        /// Delay between TTS requests (default: from config). Examples: 22s, 1m
        #[arg(long, value_name = "DURATION", value_parser = parse_interval)]
        interval: Option<Duration>,
    },

    /// Parse a script and print its segments without synthesizing
    Parse {
        /// Script file with `[MM:SS] text` lines
        script: PathBuf,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render_minimal() {
        let cli =
            Cli::try_parse_from(["meditone", "render", "script.txt", "--run-id", "r1"]).unwrap();
        match cli.command {
            Commands::Render {
                script,
                run_id,
                voice,
                interval,
            } => {
                assert_eq!(script, PathBuf::from("script.txt"));
                assert_eq!(run_id, "r1");
                assert!(voice.is_none());
                assert!(interval.is_none());
            }
            other => panic!("Expected Render command, got {:?}", other),
        }
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_render_with_options() {
        let cli = Cli::try_parse_from([
            "meditone",
            "render",
            "s.txt",
            "--run-id",
            "r1",
            "--voice",
            "Puck",
            "--interval",
            "1m30s",
        ])
        .unwrap();
        match cli.command {
            Commands::Render {
                voice, interval, ..
            } => {
                assert_eq!(voice.as_deref(), Some("Puck"));
                assert_eq!(interval, Some(Duration::from_secs(90)));
            }
            other => panic!("Expected Render command, got {:?}", other),
        }
    }

    #[test]
    fn test_render_requires_run_id() {
        let result = Cli::try_parse_from(["meditone", "render", "s.txt"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parse_interval_formats() {
        assert_eq!(parse_interval("22"), Ok(Duration::from_secs(22)));
        assert_eq!(parse_interval("22s"), Ok(Duration::from_secs(22)));
        assert_eq!(parse_interval(" 2m "), Ok(Duration::from_secs(120)));
        assert_eq!(parse_interval("0"), Ok(Duration::ZERO));
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_parse_parse_command() {
        let cli = Cli::try_parse_from(["meditone", "parse", "s.txt", "--json"]).unwrap();
        match cli.command {
            Commands::Parse { script, json } => {
                assert_eq!(script, PathBuf::from("s.txt"));
                assert!(json);
            }
            other => panic!("Expected Parse command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["meditone", "-vv", "parse", "s.txt"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_global_options_after_command() {
        let cli = Cli::try_parse_from([
            "meditone",
            "config",
            "show",
            "--config",
            "/tmp/config.toml",
            "-q",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.toml")));
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_config_requires_subcommand() {
        let result = Cli::try_parse_from(["meditone", "config"]);
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn test_missing_command_is_an_error() {
        assert!(Cli::try_parse_from(["meditone"]).is_err());
    }

    #[test]
    fn test_invalid_command_returns_error() {
        let result = Cli::try_parse_from(["meditone", "invalid"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["meditone", "--version"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["meditone", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }
}
