//! Experimento CLI
//!
//! # Usage
//!
//! ```bash
//! # Validate a config, reporting every problem
//! experimento validate config.yaml
//!
//! # Validate with overrides
//! experimento validate config.yaml -o trainer.epochs=10 -o trainer.batch_size=8
//!
//! # Show config info
//! experimento info config.yaml --format json
//!
//! # Print the resolved document
//! experimento resolve config.yaml
//! ```

use clap::Parser;
use experimento::config::{Cli, Command, InfoArgs, Loader, OutputFormat, ResolveArgs, ValidateArgs};
use experimento::{Error, Result};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v/-q
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let quiet = cli.quiet;
    let result = match cli.command {
        Command::Validate(args) => run_validate(args, quiet),
        Command::Info(args) => run_info(args),
        Command::Resolve(args) => run_resolve(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_validate(args: ValidateArgs, quiet: bool) -> Result<()> {
    tracing::info!(config = %args.config.display(), "validating");
    let config = Loader::new()
        .with_overrides(args.overrides)
        .load(&args.config)?;

    if !quiet {
        println!("Configuration is valid: {}", args.config.display());
    }

    if args.detailed {
        println!();
        print!("{}", config.summary());

        let frozen: Vec<_> = config
            .model
            .nodes
            .iter()
            .filter_map(|node| {
                node.freezing
                    .unfreeze_epoch(config.trainer.epochs)
                    .map(|epoch| (node.effective_name(), epoch))
            })
            .collect();
        if !frozen.is_empty() {
            println!("  Freezing:");
            for (node, epoch) in frozen {
                println!("    - {node} until epoch {epoch}");
            }
        }

        let pipeline = config.trainer.preprocessing.augmentation_pipeline();
        let names: Vec<&str> = pipeline.iter().map(|a| a.name.as_str()).collect();
        println!("  Augmentations: [{}]", names.join(", "));
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let config = Loader::new()
        .with_overrides(args.overrides)
        .load(&args.config)?;

    match args.format {
        OutputFormat::Text => print!("{}", config.summary()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| Error::Serialization(format!("JSON serialization error: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| Error::Serialization(format!("YAML serialization error: {e}")))?;
            print!("{yaml}");
        }
    }

    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<()> {
    let value = Loader::new()
        .with_overrides(args.overrides)
        .resolve(&args.config)?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&value)
                .map_err(|e| Error::Serialization(format!("JSON serialization error: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Text | OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&value)
                .map_err(|e| Error::Serialization(format!("YAML serialization error: {e}")))?;
            print!("{yaml}");
        }
    }

    Ok(())
}
