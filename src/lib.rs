//! # Experimento: Declarative Experiment Configuration
//!
//! Experimento loads the YAML document that describes a single supervised
//! learning experiment (model graph, losses, metrics, visualizers, dataset
//! and trainer hyperparameters) into an immutable, fully typed
//! [`ExperimentConfig`].
//!
//! ## Architecture
//!
//! - **config::anchors**: anchor/alias resolution (`&epochs` / `*epochs`)
//! - **config::overrides**: dotted-path `key=value` overrides
//! - **config::registry**: allow-lists of known node, loss, metric, visualizer
//!   and callback names; closed optimizer and scheduler vocabularies
//! - **config::validate**: schema validation reporting every violation at once
//! - **config::loader**: read → resolve → override → validate
//!
//! ```no_run
//! let config = experimento::load_config("configs/resnet_classification.yaml")?;
//! assert_eq!(config.model.main_metric().map(|m| m.name.as_str()), Some("Accuracy"));
//! # Ok::<(), experimento::Error>(())
//! ```

pub mod config;

pub mod error;

// Re-export commonly used types
pub use config::{load_config, load_config_str, ExperimentConfig, Loader};
pub use error::{Error, Result};
