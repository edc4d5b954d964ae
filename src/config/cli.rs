//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! experimento validate config.yaml
//! experimento validate config.yaml -o trainer.epochs=10 --detailed
//! experimento info config.yaml --format json
//! experimento resolve config.yaml
//! ```

use super::overrides::Override;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Experimento: declarative experiment configuration
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "experimento")]
#[command(version)]
#[command(about = "Validate and inspect declarative ML experiment configurations")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Default tracing filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate a configuration file and report every problem
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),

    /// Print the document with anchors resolved and overrides applied
    Resolve(ResolveArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override a value, e.g. `-o trainer.epochs=10` (repeatable)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override a value, e.g. `-o trainer.epochs=10` (repeatable)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the resolve command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ResolveArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override a value, e.g. `-o trainer.epochs=10` (repeatable)
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,

    /// Output format (yaml or json)
    #[arg(short, long, default_value = "yaml")]
    pub format: OutputFormat,
}

/// Output format for info and resolve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {}. Valid formats: text, json, yaml",
                s
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn test_parse_validate_command() {
        let cli = parse_args(["experimento", "validate", "config.yaml"]).unwrap();
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert!(args.overrides.is_empty());
                assert!(!args.detailed);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_validate_with_overrides() {
        let cli = parse_args([
            "experimento",
            "validate",
            "config.yaml",
            "-o",
            "trainer.epochs=10",
            "--override",
            "trainer.optimizer.name=SGD",
            "--detailed",
        ])
        .unwrap();

        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.overrides.len(), 2);
                assert_eq!(args.overrides[0].key(), "trainer.epochs");
                assert_eq!(args.overrides[0].value, Value::from(10));
                assert_eq!(args.overrides[1].value, Value::String("SGD".into()));
                assert!(args.detailed);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_malformed_override() {
        let result = parse_args(["experimento", "validate", "config.yaml", "-o", "epochs"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_info_command() {
        let cli = parse_args(["experimento", "info", "config.yaml", "--format", "json"]).unwrap();
        match cli.command {
            Command::Info(args) => {
                assert_eq!(args.config, PathBuf::from("config.yaml"));
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("Expected Info command"),
        }
    }

    #[test]
    fn test_parse_info_default_format() {
        let cli = parse_args(["experimento", "info", "config.yaml"]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.format, OutputFormat::Text),
            _ => panic!("Expected Info command"),
        }
    }

    #[test]
    fn test_parse_resolve_command() {
        let cli = parse_args(["experimento", "resolve", "config.yaml"]).unwrap();
        match cli.command {
            Command::Resolve(args) => assert_eq!(args.format, OutputFormat::Yaml),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = parse_args(["experimento", "validate", "c.yaml"]).unwrap();
        assert_eq!(cli.log_filter(), "warn");

        let cli = parse_args(["experimento", "-vv", "validate", "c.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_filter(), "debug");

        let cli = parse_args(["experimento", "validate", "c.yaml", "-q", "-v"]).unwrap();
        assert_eq!(cli.log_filter(), "error");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_missing_config_argument() {
        assert!(parse_args(["experimento", "validate"]).is_err());
    }
}
