//! Loading experiment configuration from YAML
//!
//! Every document goes through the same fixed pipeline:
//! 1. Read the file
//! 2. Resolve anchors and aliases
//! 3. Apply overrides
//! 4. Validate against the schema and the registry

use super::anchors::resolve_anchors;
use super::overrides::{apply_overrides, Override};
use super::registry::Registry;
use super::schema::ExperimentConfig;
use super::validate::validate_document;
use crate::error::{Error, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// Configurable entry point for loading documents
///
/// # Example
///
/// ```no_run
/// use experimento::config::{Category, Loader, Registry};
///
/// let registry = Registry::builtin().with(Category::Node, "MyBackbone");
/// let config = Loader::new()
///     .with_registry(registry)
///     .with_override("trainer.epochs=5".parse()?)
///     .load("configs/resnet_classification.yaml")?;
/// assert_eq!(config.trainer.epochs, 5);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Loader {
    registry: Registry,
    overrides: Vec<Override>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_override(mut self, item: Override) -> Self {
        self.overrides.push(item);
        self
    }

    pub fn with_overrides(mut self, items: impl IntoIterator<Item = Override>) -> Self {
        self.overrides.extend(items);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ExperimentConfig> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading configuration");
        let text = read(path)?;
        self.load_str(&text)
    }

    /// Load and validate a configuration document held in memory
    pub fn load_str(&self, text: &str) -> Result<ExperimentConfig> {
        let value = self.resolve_str(text)?;
        Ok(validate_document(&value, &self.registry)?)
    }

    /// Resolved document tree (anchors substituted, overrides applied)
    /// without schema validation
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let text = read(path.as_ref())?;
        self.resolve_str(&text)
    }

    pub fn resolve_str(&self, text: &str) -> Result<Value> {
        let mut value = resolve_anchors(text)?;
        if !self.overrides.is_empty() {
            apply_overrides(&mut value, &self.overrides)?;
            tracing::debug!(count = self.overrides.len(), "overrides applied");
        }
        Ok(value)
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ReadConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a configuration file with the builtin registry and no overrides
///
/// # Example
///
/// ```no_run
/// use experimento::config::load_config;
///
/// let config = load_config("configs/resnet_classification.yaml")?;
/// println!("{}", config.summary());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
    Loader::new().load(path)
}

/// Load a configuration document from a string with the builtin registry
pub fn load_config_str(text: &str) -> Result<ExperimentConfig> {
    Loader::new().load_str(text)
}
