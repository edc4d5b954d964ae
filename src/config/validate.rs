//! Schema validation
//!
//! Walks a resolved YAML tree and builds the typed [`ExperimentConfig`].
//! Unlike a plain `serde` deserialization, validation does not stop at the
//! first problem: every violation in the document is collected so the author
//! can fix them all in one pass.

use super::registry::{Category, OptimizerKind, Registry, SchedulerKind};
use super::schema::*;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single configuration violation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{entity}: missing required field `{field}`")]
    MissingField { entity: String, field: String },

    #[error("{entity}: field `{field}` has wrong type (expected {expected}, got {actual})")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("unknown {category} `{name}`")]
    UnknownIdentifier { category: Category, name: String },

    #[error("`{referrer}` references undeclared node `{target}`")]
    DanglingReference { referrer: String, target: String },

    #[error("exactly one metric must set `is_main_metric: true`, found {count}")]
    MainMetricCardinality { count: usize },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: String, value: String },

    #[error("alias `*{alias}` is used but never defined")]
    UnresolvedAlias { alias: String },

    #[error("anchor `&{anchor}` is defined more than once")]
    DuplicateAnchor { anchor: String },

    #[error("duplicate name `{name}` in `{section}`")]
    DuplicateName { section: String, name: String },

    #[error("{entity}: unknown field `{field}`")]
    UnknownField { entity: String, field: String },

    #[error("{owner} does not accept parameter `{param}`")]
    UnknownParameter { owner: String, param: String },

    #[error("{entity}: `{field}` is given both directly and in `params`")]
    ConflictingField { entity: String, field: String },

    #[error("`{section}` must not be empty")]
    EmptySection { section: String },

    #[error("{field} must have exactly {expected} elements, got {actual}")]
    InvalidLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{field}: invalid value `{value}` (expected one of: {expected})")]
    InvalidChoice {
        field: String,
        value: String,
        expected: String,
    },
}

/// Every violation found in one document, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ConfigError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ConfigError> {
        self.0
    }
}

impl From<Vec<ConfigError>> for ValidationErrors {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ConfigError;
    type IntoIter = std::vec::IntoIter<ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ConfigError;
    type IntoIter = std::slice::Iter<'a, ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a resolved document against the schema and the given registry
pub fn validate_document(
    root: &Value,
    registry: &Registry,
) -> Result<ExperimentConfig, ValidationErrors> {
    let mut v = Validator::new(registry);
    let config = v.document(root);
    if v.errors.is_empty() {
        tracing::debug!(
            model = %config.model.name,
            nodes = config.model.nodes.len(),
            "configuration validated"
        );
        Ok(config)
    } else {
        tracing::debug!(errors = v.errors.len(), "configuration rejected");
        Err(ValidationErrors(v.errors))
    }
}

/// Kind name of a YAML value, for type mismatch messages
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Fields of one mapping, tracking which keys have been consumed
struct Fields<'a> {
    entity: String,
    map: Option<&'a Mapping>,
    taken: BTreeSet<&'static str>,
}

impl<'a> Fields<'a> {
    fn get(&mut self, key: &'static str) -> Option<&'a Value> {
        self.taken.insert(key);
        match self.map?.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn path(&self, key: &str) -> String {
        format!("{}.{key}", self.entity)
    }

    /// Entries whose keys were never consumed
    fn leftover(&self) -> Vec<(&'a Value, &'a Value)> {
        let Some(map) = self.map else {
            return Vec::new();
        };
        map.iter()
            .filter(|(key, _)| !key.as_str().is_some_and(|k| self.taken.contains(k)))
            .collect()
    }
}

struct Validator<'r> {
    registry: &'r Registry,
    errors: Vec<ConfigError>,
}

impl<'r> Validator<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    // ------------------------------------------------------------------
    // primitive readers
    // ------------------------------------------------------------------

    /// Open a mapping; a non-mapping value is reported and treated as empty
    fn fields<'a>(&mut self, entity: impl Into<String>, value: Option<&'a Value>) -> Fields<'a> {
        let entity = entity.into();
        let map = match value {
            None => None,
            Some(Value::Mapping(map)) => Some(map),
            Some(other) => {
                let (parent, field) = split_path(&entity);
                self.push(ConfigError::TypeMismatch {
                    entity: parent,
                    field,
                    expected: "mapping".into(),
                    actual: kind(other).into(),
                });
                None
            }
        };
        Fields {
            entity,
            map,
            taken: BTreeSet::new(),
        }
    }

    fn mismatch(&mut self, f: &Fields<'_>, key: &str, expected: &str, actual: &Value) {
        self.push(ConfigError::TypeMismatch {
            entity: f.entity.clone(),
            field: key.to_string(),
            expected: expected.to_string(),
            actual: kind(actual).to_string(),
        });
    }

    fn missing(&mut self, f: &Fields<'_>, key: &str) {
        self.push(ConfigError::MissingField {
            entity: f.entity.clone(),
            field: key.to_string(),
        });
    }

    fn opt_string(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<String> {
        match f.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => {
                self.mismatch(f, key, "string", other);
                None
            }
        }
    }

    /// Required string; returns an empty placeholder after reporting
    ///
    /// Inside a container that was itself missing or mistyped nothing more
    /// is reported.
    fn req_string(&mut self, f: &mut Fields<'_>, key: &'static str) -> String {
        if f.map.is_none() {
            return String::new();
        }
        if f.get(key).is_none() {
            self.missing(f, key);
            return String::new();
        }
        self.opt_string(f, key).unwrap_or_default()
    }

    fn opt_bool(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<bool> {
        match f.get(key)? {
            Value::Bool(b) => Some(*b),
            other => {
                self.mismatch(f, key, "boolean", other);
                None
            }
        }
    }

    fn bool_or(&mut self, f: &mut Fields<'_>, key: &'static str, default: bool) -> bool {
        self.opt_bool(f, key).unwrap_or(default)
    }

    fn opt_f64(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<f64> {
        match f.get(key)? {
            Value::Number(n) => n.as_f64(),
            other => {
                self.mismatch(f, key, "number", other);
                None
            }
        }
    }

    /// Strictly positive integer read from `value`, reported under `path`
    fn positive(&mut self, entity: &str, key: &str, path: &str, value: &Value) -> Option<usize> {
        match value {
            Value::Number(n) if n.is_u64() => {
                let raw = n.as_u64().unwrap_or_default();
                if raw == 0 {
                    self.push(ConfigError::OutOfRange {
                        field: path.to_string(),
                        value: raw.to_string(),
                    });
                    return None;
                }
                match usize::try_from(raw) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        self.push(ConfigError::OutOfRange {
                            field: path.to_string(),
                            value: raw.to_string(),
                        });
                        None
                    }
                }
            }
            Value::Number(n) if n.is_i64() => {
                self.push(ConfigError::OutOfRange {
                    field: path.to_string(),
                    value: n.to_string(),
                });
                None
            }
            other => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.to_string(),
                    field: key.to_string(),
                    expected: "positive integer".into(),
                    actual: kind(other).into(),
                });
                None
            }
        }
    }

    fn opt_positive(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<usize> {
        let value = f.get(key)?;
        let path = f.path(key);
        self.positive(&f.entity, key, &path, value)
    }

    fn positive_or(&mut self, f: &mut Fields<'_>, key: &'static str, default: usize) -> usize {
        self.opt_positive(f, key).unwrap_or(default)
    }

    fn opt_int(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<i64> {
        match f.get(key)? {
            Value::Number(n) if !n.is_f64() => match n.as_i64() {
                Some(v) => Some(v),
                None => {
                    self.push(ConfigError::OutOfRange {
                        field: f.path(key),
                        value: n.to_string(),
                    });
                    None
                }
            },
            other => {
                self.mismatch(f, key, "integer", other);
                None
            }
        }
    }

    /// `-1` or a strictly positive integer
    fn positive_or_all(&mut self, f: &mut Fields<'_>, key: &'static str, default: i64) -> i64 {
        match self.opt_int(f, key) {
            Some(v) if v == -1 || v > 0 => v,
            Some(v) => {
                self.push(ConfigError::OutOfRange {
                    field: f.path(key),
                    value: v.to_string(),
                });
                default
            }
            None => default,
        }
    }

    fn positive_list(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<Vec<usize>> {
        let value = f.get(key)?;
        let Value::Sequence(items) = value else {
            self.mismatch(f, key, "sequence of positive integers", value);
            return None;
        };
        let entity = f.entity.clone();
        let path = f.path(key);
        let values = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| {
                self.positive(&entity, &format!("{key}[{i}]"), &format!("{path}[{i}]"), item)
            })
            .collect();
        Some(values)
    }

    /// Per-channel values; a single number stands for all three channels
    fn channel_values(&mut self, f: &mut Fields<'_>, key: &'static str) -> Option<Vec<f64>> {
        match f.get(key)? {
            Value::Number(n) => n.as_f64().map(|v| vec![v; 3]),
            Value::Sequence(items) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_f64() {
                        Some(v) => values.push(v),
                        None => self.push(ConfigError::TypeMismatch {
                            entity: f.entity.clone(),
                            field: format!("{key}[{i}]"),
                            expected: "number".into(),
                            actual: kind(item).into(),
                        }),
                    }
                }
                Some(values)
            }
            other => {
                self.mismatch(f, key, "number or sequence of numbers", other);
                None
            }
        }
    }

    fn string_list(&mut self, f: &mut Fields<'_>, key: &'static str) -> Vec<String> {
        let Some(value) = f.get(key) else {
            return Vec::new();
        };
        let Value::Sequence(items) = value else {
            self.mismatch(f, key, "sequence of strings", value);
            return Vec::new();
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => out.push(s.clone()),
                other => self.push(ConfigError::TypeMismatch {
                    entity: f.entity.clone(),
                    field: format!("{key}[{i}]"),
                    expected: "string".into(),
                    actual: kind(other).into(),
                }),
            }
        }
        out
    }

    fn params(&mut self, f: &mut Fields<'_>, key: &'static str) -> Params {
        let Some(value) = f.get(key) else {
            return Params::new();
        };
        let Value::Mapping(map) = value else {
            self.mismatch(f, key, "mapping", value);
            return Params::new();
        };
        let entity = f.path(key);
        let mut params = Params::new();
        for (k, v) in map {
            if let Some((name, json)) = self.param_entry(&entity, k, v) {
                params.insert(name, json);
            }
        }
        params
    }

    fn param_entry(
        &mut self,
        entity: &str,
        key: &Value,
        value: &Value,
    ) -> Option<(String, serde_json::Value)> {
        let Some(name) = key.as_str() else {
            self.push(ConfigError::TypeMismatch {
                entity: entity.to_string(),
                field: format!("{key:?}"),
                expected: "string key".into(),
                actual: kind(key).into(),
            });
            return None;
        };
        match serde_json::to_value(value) {
            Ok(json) => Some((name.to_string(), json)),
            Err(_) => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.to_string(),
                    field: name.to_string(),
                    expected: "plain data with string keys".into(),
                    actual: kind(value).into(),
                });
                None
            }
        }
    }

    fn choice<T: Copy>(
        &mut self,
        f: &mut Fields<'_>,
        key: &'static str,
        options: &[(&str, T)],
        default: T,
    ) -> T {
        let path = f.path(key);
        let Some(raw) = self.opt_string(f, key) else {
            return default;
        };
        match options.iter().find(|(name, _)| *name == raw) {
            Some((_, value)) => *value,
            None => {
                let expected: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
                self.push(ConfigError::InvalidChoice {
                    field: path,
                    value: raw,
                    expected: expected.join(", "),
                });
                default
            }
        }
    }

    fn reject_unknown(&mut self, f: &Fields<'_>) {
        for (key, _) in f.leftover() {
            self.push(ConfigError::UnknownField {
                entity: f.entity.clone(),
                field: key.as_str().map_or_else(|| format!("{key:?}"), str::to_string),
            });
        }
    }

    fn check_registered(&mut self, category: Category, name: &str) {
        if !name.is_empty() && !self.registry.contains(category, name) {
            self.push(ConfigError::UnknownIdentifier {
                category,
                name: name.to_string(),
            });
        }
    }

    fn sequence<'a>(&mut self, f: &mut Fields<'a>, key: &'static str) -> &'a [Value] {
        match f.get(key) {
            None => &[],
            Some(Value::Sequence(items)) => items.as_slice(),
            Some(other) => {
                self.mismatch(f, key, "sequence", other);
                &[]
            }
        }
    }

    // ------------------------------------------------------------------
    // document
    // ------------------------------------------------------------------

    fn document(&mut self, root: &Value) -> ExperimentConfig {
        let mut doc = match root {
            Value::Mapping(map) => Fields {
                entity: "document".into(),
                map: Some(map),
                taken: BTreeSet::new(),
            },
            other => {
                self.push(ConfigError::TypeMismatch {
                    entity: "document".into(),
                    field: "<root>".into(),
                    expected: "mapping".into(),
                    actual: kind(other).into(),
                });
                Fields {
                    entity: "document".into(),
                    map: None,
                    taken: BTreeSet::new(),
                }
            }
        };

        for section in ["model", "dataset", "trainer"] {
            if doc.get(section).is_none() && doc.map.is_some() {
                self.missing(&doc, section);
            }
        }
        let use_rich_text = self.bool_or(&mut doc, "use_rich_text", true);
        let model = doc.get("model");
        let dataset = doc.get("dataset");
        let tracker = doc.get("tracker");
        let trainer = doc.get("trainer");
        let exporter = doc.get("exporter");
        self.reject_unknown(&doc);

        let model = self.model(model);
        let dataset = self.dataset(dataset);
        let tracker = self.tracker(tracker);
        let trainer = self.trainer(trainer);
        let exporter = self.exporter(exporter);
        ExperimentConfig {
            use_rich_text,
            model,
            dataset,
            tracker,
            trainer,
            exporter,
        }
    }

    // ------------------------------------------------------------------
    // model
    // ------------------------------------------------------------------

    fn model(&mut self, value: Option<&Value>) -> ModelSpec {
        let mut f = self.fields("model", value);
        let name = self.req_string(&mut f, "name");
        let weights = self.opt_string(&mut f, "weights").map(PathBuf::from);

        let node_values = self.sequence(&mut f, "nodes");
        match f.get("nodes") {
            None if f.map.is_some() => self.missing(&f, "nodes"),
            Some(Value::Sequence(items)) if items.is_empty() => {
                self.push(ConfigError::EmptySection {
                    section: "model.nodes".into(),
                })
            }
            _ => {}
        }

        let mut nodes = Vec::with_capacity(node_values.len());
        let mut declared: BTreeSet<String> = BTreeSet::new();
        for (i, node_value) in node_values.iter().enumerate() {
            let node = self.node(i, node_value, &declared);
            let effective = node.effective_name().to_string();
            if !effective.is_empty() && !declared.insert(effective.clone()) {
                self.push(ConfigError::DuplicateName {
                    section: "model.nodes".into(),
                    name: effective,
                });
            }
            nodes.push(node);
        }

        let loss_values = self.sequence(&mut f, "losses");
        let metric_values = self.sequence(&mut f, "metrics");
        let visualizer_values = self.sequence(&mut f, "visualizers");

        let mut losses = Vec::with_capacity(loss_values.len());
        let mut loss_names = BTreeSet::new();
        for (i, value) in loss_values.iter().enumerate() {
            let loss = self.loss(i, value, &declared);
            self.unique("model.losses", loss.effective_name(), &mut loss_names);
            losses.push(loss);
        }

        let mut metrics = Vec::with_capacity(metric_values.len());
        let mut metric_names = BTreeSet::new();
        for (i, value) in metric_values.iter().enumerate() {
            let metric = self.metric(i, value, &declared);
            self.unique("model.metrics", metric.effective_name(), &mut metric_names);
            metrics.push(metric);
        }
        let main_count = metrics.iter().filter(|m| m.is_main_metric).count();
        if f.map.is_some() && main_count != 1 {
            self.push(ConfigError::MainMetricCardinality { count: main_count });
        }

        let mut visualizers = Vec::with_capacity(visualizer_values.len());
        let mut visualizer_names = BTreeSet::new();
        for (i, value) in visualizer_values.iter().enumerate() {
            let visualizer = self.visualizer(i, value, &declared);
            self.unique(
                "model.visualizers",
                visualizer.effective_name(),
                &mut visualizer_names,
            );
            visualizers.push(visualizer);
        }

        let explicit_outputs = self.string_list(&mut f, "outputs");
        for target in &explicit_outputs {
            if !declared.contains(target) {
                self.push(ConfigError::DanglingReference {
                    referrer: "model.outputs".into(),
                    target: target.clone(),
                });
            }
        }
        let outputs = if explicit_outputs.is_empty() {
            ModelSpec::infer_outputs(&nodes)
        } else {
            explicit_outputs
        };

        self.reject_unknown(&f);
        ModelSpec {
            name,
            weights,
            nodes,
            losses,
            metrics,
            visualizers,
            outputs,
        }
    }

    fn unique(&mut self, section: &str, name: &str, seen: &mut BTreeSet<String>) {
        if !name.is_empty() && !seen.insert(name.to_string()) {
            self.push(ConfigError::DuplicateName {
                section: section.to_string(),
                name: name.to_string(),
            });
        }
    }

    fn node(&mut self, index: usize, value: &Value, declared: &BTreeSet<String>) -> NodeSpec {
        let mut f = self.fields(format!("model.nodes[{index}]"), Some(value));
        let name = self.req_string(&mut f, "name");
        self.check_registered(Category::Node, &name);
        let alias = self.opt_string(&mut f, "alias");
        let referrer = alias.clone().unwrap_or_else(|| name.clone());

        let inputs = self.string_list(&mut f, "inputs");
        for input in &inputs {
            if !declared.contains(input) {
                self.push(ConfigError::DanglingReference {
                    referrer: referrer.clone(),
                    target: input.clone(),
                });
            }
        }
        let loader_inputs = self.string_list(&mut f, "loader_inputs");

        let freezing_value = f.get("freezing");
        let freezing = self.freezing(&f.path("freezing"), freezing_value);

        let variant_value = f.get("variant");
        let download_value = f.get("download_weights");
        let mut params = self.params(&mut f, "params");

        // unknown keys on a node are extra constructor parameters
        let entity = f.entity.clone();
        for (key, extra) in f.leftover() {
            let Some((param, json)) = self.param_entry(&entity, key, extra) else {
                continue;
            };
            if params.contains_key(&param) {
                self.push(ConfigError::ConflictingField {
                    entity: entity.clone(),
                    field: param,
                });
            } else {
                params.insert(param, json);
            }
        }

        let variant_param = params.remove("variant");
        let variant = match (variant_value, variant_param) {
            (Some(_), Some(_)) => {
                self.push(ConfigError::ConflictingField {
                    entity: entity.clone(),
                    field: "variant".into(),
                });
                None
            }
            (Some(value), None) => self.variant(&entity, "variant", value),
            (None, Some(json)) => self.variant_json(&entity, json),
            (None, None) => None,
        };

        let download_param = params.remove("download_weights");
        let download_weights = match (download_value, download_param) {
            (Some(_), Some(_)) => {
                self.push(ConfigError::ConflictingField {
                    entity: entity.clone(),
                    field: "download_weights".into(),
                });
                None
            }
            (Some(Value::Bool(b)), None) => Some(*b),
            (None, Some(serde_json::Value::Bool(b))) => Some(b),
            (Some(other), None) => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.clone(),
                    field: "download_weights".into(),
                    expected: "boolean".into(),
                    actual: kind(other).into(),
                });
                None
            }
            (None, Some(other)) => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.clone(),
                    field: "params.download_weights".into(),
                    expected: "boolean".into(),
                    actual: json_kind(&other).into(),
                });
                None
            }
            (None, None) => None,
        };

        NodeSpec {
            name,
            alias,
            variant,
            inputs,
            loader_inputs,
            download_weights,
            freezing,
            params,
        }
    }

    /// `variant` accepts strings and integers (`variant: 50`)
    fn variant(&mut self, entity: &str, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if !n.is_f64() => Some(n.to_string()),
            other => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.to_string(),
                    field: field.to_string(),
                    expected: "string".into(),
                    actual: kind(other).into(),
                });
                None
            }
        }
    }

    fn variant_json(&mut self, entity: &str, json: serde_json::Value) -> Option<String> {
        match json {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) if !n.is_f64() => Some(n.to_string()),
            other => {
                self.push(ConfigError::TypeMismatch {
                    entity: entity.to_string(),
                    field: "params.variant".into(),
                    expected: "string".into(),
                    actual: json_kind(&other).into(),
                });
                None
            }
        }
    }

    fn freezing(&mut self, entity: &str, value: Option<&Value>) -> FreezingSpec {
        let mut f = self.fields(entity, value);
        let active = self.bool_or(&mut f, "active", false);
        let path = f.path("unfreeze_after");
        let unfreeze_after = match f.get("unfreeze_after") {
            None => None,
            Some(Value::Number(n)) if n.is_u64() => n.as_u64().map(UnfreezeAfter::Epoch),
            Some(Value::Number(n)) if n.is_f64() => {
                let fraction = n.as_f64().unwrap_or(f64::NAN);
                if (0.0..=1.0).contains(&fraction) {
                    Some(UnfreezeAfter::Fraction(fraction))
                } else {
                    self.push(ConfigError::OutOfRange {
                        field: path,
                        value: fraction.to_string(),
                    });
                    None
                }
            }
            Some(Value::Number(n)) => {
                self.push(ConfigError::OutOfRange {
                    field: path,
                    value: n.to_string(),
                });
                None
            }
            Some(other) => {
                self.mismatch(&f, "unfreeze_after", "integer epoch or fraction", other);
                None
            }
        };
        self.reject_unknown(&f);
        FreezingSpec {
            active,
            unfreeze_after,
        }
    }

    /// Fields shared by losses, metrics and visualizers
    fn attached(
        &mut self,
        f: &mut Fields<'_>,
        category: Category,
        declared: &BTreeSet<String>,
    ) -> (String, Option<String>, String, Params) {
        let name = self.req_string(f, "name");
        self.check_registered(category, &name);
        let alias = self.opt_string(f, "alias");
        let attached_to = self.req_string(f, "attached_to");
        if !attached_to.is_empty() && !declared.contains(&attached_to) {
            self.push(ConfigError::DanglingReference {
                referrer: alias.clone().unwrap_or_else(|| name.clone()),
                target: attached_to.clone(),
            });
        }
        let params = self.params(f, "params");
        (name, alias, attached_to, params)
    }

    fn loss(&mut self, index: usize, value: &Value, declared: &BTreeSet<String>) -> LossSpec {
        let mut f = self.fields(format!("model.losses[{index}]"), Some(value));
        let (name, alias, attached_to, params) = self.attached(&mut f, Category::Loss, declared);
        let path = f.path("weight");
        let weight = match self.opt_f64(&mut f, "weight") {
            Some(w) if w.is_finite() && w >= 0.0 => w,
            Some(w) => {
                self.push(ConfigError::OutOfRange {
                    field: path,
                    value: w.to_string(),
                });
                default_loss_weight()
            }
            None => default_loss_weight(),
        };
        self.reject_unknown(&f);
        LossSpec {
            name,
            alias,
            attached_to,
            weight,
            params,
        }
    }

    fn metric(&mut self, index: usize, value: &Value, declared: &BTreeSet<String>) -> MetricSpec {
        let mut f = self.fields(format!("model.metrics[{index}]"), Some(value));
        let (name, alias, attached_to, params) =
            self.attached(&mut f, Category::Metric, declared);
        let is_main_metric = self.bool_or(&mut f, "is_main_metric", false);
        self.reject_unknown(&f);
        MetricSpec {
            name,
            alias,
            attached_to,
            is_main_metric,
            params,
        }
    }

    fn visualizer(
        &mut self,
        index: usize,
        value: &Value,
        declared: &BTreeSet<String>,
    ) -> VisualizerSpec {
        let mut f = self.fields(format!("model.visualizers[{index}]"), Some(value));
        let (name, alias, attached_to, params) =
            self.attached(&mut f, Category::Visualizer, declared);
        self.reject_unknown(&f);
        VisualizerSpec {
            name,
            alias,
            attached_to,
            params,
        }
    }

    // ------------------------------------------------------------------
    // dataset
    // ------------------------------------------------------------------

    fn dataset(&mut self, value: Option<&Value>) -> DatasetSpec {
        let mut f = self.fields("dataset", value);
        let name = self.req_string(&mut f, "name");
        let id = self.opt_string(&mut f, "id");
        let team_name = self.opt_string(&mut f, "team_name");
        let team_id = self.opt_string(&mut f, "team_id");
        let bucket_type = self.choice(
            &mut f,
            "bucket_type",
            &[
                ("internal", BucketType::Internal),
                ("external", BucketType::External),
            ],
            BucketType::default(),
        );
        let bucket_storage = self.choice(
            &mut f,
            "bucket_storage",
            &[
                ("local", BucketStorage::Local),
                ("s3", BucketStorage::S3),
                ("gcs", BucketStorage::Gcs),
                ("azure", BucketStorage::Azure),
            ],
            BucketStorage::default(),
        );
        let train_view = self
            .opt_string(&mut f, "train_view")
            .unwrap_or_else(default_train_view);
        let val_view = self
            .opt_string(&mut f, "val_view")
            .unwrap_or_else(default_val_view);
        let test_view = self
            .opt_string(&mut f, "test_view")
            .unwrap_or_else(default_test_view);
        let json_mode = self.bool_or(&mut f, "json_mode", false);
        let use_ldf = self.bool_or(&mut f, "use_ldf", true);
        let custom_dataset_params = self.params(&mut f, "custom_dataset_params");
        let custom_train_loader = self.opt_string(&mut f, "custom_train_loader");
        let custom_val_loader = self.opt_string(&mut f, "custom_val_loader");
        let custom_test_loader = self.opt_string(&mut f, "custom_test_loader");
        self.reject_unknown(&f);
        DatasetSpec {
            name,
            id,
            team_name,
            team_id,
            bucket_type,
            bucket_storage,
            train_view,
            val_view,
            test_view,
            json_mode,
            use_ldf,
            custom_dataset_params,
            custom_train_loader,
            custom_val_loader,
            custom_test_loader,
        }
    }

    // ------------------------------------------------------------------
    // tracker
    // ------------------------------------------------------------------

    fn tracker(&mut self, value: Option<&Value>) -> TrackerSpec {
        let mut f = self.fields("tracker", value);
        let project_name = self.opt_string(&mut f, "project_name");
        let project_id = self.opt_string(&mut f, "project_id");
        let run_name = self.opt_string(&mut f, "run_name");
        let run_id = self.opt_string(&mut f, "run_id");
        let save_directory = self
            .opt_string(&mut f, "save_directory")
            .unwrap_or_else(default_save_directory);
        let is_tensorboard = self.bool_or(&mut f, "is_tensorboard", true);
        let is_wandb = self.bool_or(&mut f, "is_wandb", false);
        let wandb_entity = self.opt_string(&mut f, "wandb_entity");
        let is_mlflow = self.bool_or(&mut f, "is_mlflow", false);
        self.reject_unknown(&f);
        TrackerSpec {
            project_name,
            project_id,
            run_name,
            run_id,
            save_directory,
            is_tensorboard,
            is_wandb,
            wandb_entity,
            is_mlflow,
        }
    }

    // ------------------------------------------------------------------
    // trainer
    // ------------------------------------------------------------------

    fn trainer(&mut self, value: Option<&Value>) -> TrainerSpec {
        let mut f = self.fields("trainer", value);
        let present = f.map.is_some();
        let batch_size = self.positive_or(&mut f, "batch_size", default_batch_size());
        let epochs = self.positive_or(&mut f, "epochs", default_epochs());
        let num_workers = self.positive_or(&mut f, "num_workers", default_num_workers());
        let validation_interval =
            self.positive_or(&mut f, "validation_interval", default_validation_interval());
        let num_log_images = self.positive_or(&mut f, "num_log_images", default_num_log_images());
        let accumulate_grad_batches = self.positive_or(
            &mut f,
            "accumulate_grad_batches",
            default_accumulate_grad_batches(),
        );
        let save_top_k = self.positive_or(&mut f, "save_top_k", default_save_top_k());
        let accelerator = self.choice(
            &mut f,
            "accelerator",
            &[
                ("auto", Accelerator::Auto),
                ("cpu", Accelerator::Cpu),
                ("gpu", Accelerator::Gpu),
            ],
            Accelerator::default(),
        );
        let devices = self.devices(&mut f);
        let strategy = self.choice(
            &mut f,
            "strategy",
            &[("auto", Strategy::Auto), ("ddp", Strategy::Ddp)],
            Strategy::default(),
        );
        let num_sanity_val_steps = match self.opt_int(&mut f, "num_sanity_val_steps") {
            Some(v) if v < -1 => {
                self.push(ConfigError::OutOfRange {
                    field: f.path("num_sanity_val_steps"),
                    value: v.to_string(),
                });
                default_num_sanity_val_steps()
            }
            Some(v) => v,
            None => default_num_sanity_val_steps(),
        };
        let profiler = f.get("profiler").map(|_| {
            self.choice(
                &mut f,
                "profiler",
                &[("simple", Profiler::Simple), ("advanced", Profiler::Advanced)],
                Profiler::Simple,
            )
        });
        let verbose = self.bool_or(&mut f, "verbose", true);
        let use_weighted_sampler = self.bool_or(&mut f, "use_weighted_sampler", false);
        let train_metrics_interval = self.positive_or_all(
            &mut f,
            "train_metrics_interval",
            default_train_metrics_interval(),
        );
        let skip_last_batch = self.bool_or(&mut f, "skip_last_batch", true);
        let log_sub_losses = self.bool_or(&mut f, "log_sub_losses", true);

        let preprocessing_value = f.get("preprocessing");
        let preprocessing = self.preprocessing(preprocessing_value);

        let callback_values = self.sequence(&mut f, "callbacks");
        let callbacks: Vec<CallbackSpec> = callback_values
            .iter()
            .enumerate()
            .map(|(i, value)| self.callback(i, value))
            .collect();

        let optimizer_value = f.get("optimizer");
        let optimizer = self.optimizer(optimizer_value);
        let scheduler_value = f.get("scheduler");
        let scheduler = self.scheduler(scheduler_value);
        self.reject_unknown(&f);

        if present && validation_interval > epochs {
            tracing::warn!(
                validation_interval,
                epochs,
                "validation_interval exceeds epochs, validation will never run"
            );
        }

        TrainerSpec {
            batch_size,
            epochs,
            num_workers,
            validation_interval,
            num_log_images,
            accumulate_grad_batches,
            save_top_k,
            accelerator,
            devices,
            strategy,
            num_sanity_val_steps,
            profiler,
            verbose,
            use_weighted_sampler,
            train_metrics_interval,
            skip_last_batch,
            log_sub_losses,
            preprocessing,
            callbacks,
            optimizer,
            scheduler,
        }
    }

    fn devices(&mut self, f: &mut Fields<'_>) -> Devices {
        let Some(value) = f.get("devices") else {
            return Devices::default();
        };
        match value {
            Value::String(name) => Devices::Named(name.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(count) if count == -1 || count > 0 => Devices::Count(count),
                _ => {
                    self.push(ConfigError::OutOfRange {
                        field: f.path("devices"),
                        value: n.to_string(),
                    });
                    Devices::default()
                }
            },
            Value::Sequence(items) => {
                let mut indices = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item.as_u64().and_then(|v| usize::try_from(v).ok()) {
                        Some(index) => indices.push(index),
                        None => self.push(ConfigError::TypeMismatch {
                            entity: f.entity.clone(),
                            field: format!("devices[{i}]"),
                            expected: "device index".into(),
                            actual: kind(item).into(),
                        }),
                    }
                }
                Devices::Indices(indices)
            }
            other => {
                self.mismatch(f, "devices", "integer, sequence of indices or string", other);
                Devices::default()
            }
        }
    }

    fn preprocessing(&mut self, value: Option<&Value>) -> PreprocessingSpec {
        let mut f = self.fields("trainer.preprocessing", value);
        let mut train_image_size = default_train_image_size();
        let path = f.path("train_image_size");
        match f.get("train_image_size") {
            None => {}
            Some(Value::Sequence(dims)) if dims.len() == 2 => {
                for (i, dim) in dims.iter().enumerate() {
                    let field = format!("train_image_size[{i}]");
                    let dim_path = format!("{path}[{i}]");
                    if let Some(size) = self.positive(&f.entity, &field, &dim_path, dim) {
                        train_image_size[i] = size;
                    }
                }
            }
            Some(Value::Sequence(dims)) => self.push(ConfigError::InvalidLength {
                field: path,
                expected: 2,
                actual: dims.len(),
            }),
            Some(other) => self.mismatch(&f, "train_image_size", "[height, width]", other),
        }
        let keep_aspect_ratio = self.bool_or(&mut f, "keep_aspect_ratio", true);
        let train_rgb = self.bool_or(&mut f, "train_rgb", true);

        let normalize_value = f.get("normalize");
        let mut n = self.fields("trainer.preprocessing.normalize", normalize_value);
        let active = self.bool_or(&mut n, "active", true);
        let params = if n.get("params").is_some() {
            self.params(&mut n, "params")
        } else {
            default_normalize_params()
        };
        self.reject_unknown(&n);
        let normalize = NormalizeSpec { active, params };

        let augmentation_values = self.sequence(&mut f, "augmentations");
        let mut augmentations = Vec::with_capacity(augmentation_values.len());
        for (i, value) in augmentation_values.iter().enumerate() {
            let mut a = self.fields(format!("trainer.preprocessing.augmentations[{i}]"), Some(value));
            let name = self.req_string(&mut a, "name");
            let params = self.params(&mut a, "params");
            self.reject_unknown(&a);
            augmentations.push(AugmentationSpec { name, params });
        }
        self.reject_unknown(&f);

        PreprocessingSpec {
            train_image_size,
            keep_aspect_ratio,
            train_rgb,
            normalize,
            augmentations,
        }
    }

    fn callback(&mut self, index: usize, value: &Value) -> CallbackSpec {
        let mut f = self.fields(format!("trainer.callbacks[{index}]"), Some(value));
        let name = self.req_string(&mut f, "name");
        self.check_registered(Category::Callback, &name);
        let active = self.bool_or(&mut f, "active", true);
        let params = self.params(&mut f, "params");
        self.reject_unknown(&f);
        if !active {
            tracing::debug!(callback = %name, "callback disabled");
        }
        CallbackSpec {
            name,
            active,
            params,
        }
    }

    fn optimizer(&mut self, value: Option<&Value>) -> OptimizerSpec {
        let mut f = self.fields("trainer.optimizer", value);
        let mut name_known = true;
        let name = match self.opt_string(&mut f, "name") {
            None => OptimizerKind::default(),
            Some(raw) => raw.parse::<OptimizerKind>().unwrap_or_else(|_| {
                name_known = false;
                self.push(ConfigError::UnknownIdentifier {
                    category: Category::Optimizer,
                    name: raw.clone(),
                });
                OptimizerKind::default()
            }),
        };
        let params = self.params(&mut f, "params");
        // parameters of an unknown optimizer cannot be checked
        if name_known {
            for key in params.keys() {
                if !name.accepts(key) {
                    self.push(ConfigError::UnknownParameter {
                        owner: name.to_string(),
                        param: key.clone(),
                    });
                }
            }
        }
        if let Some(lr) = params.get("lr") {
            match lr.as_f64() {
                Some(v) if v > 0.0 && v.is_finite() => {}
                Some(v) => self.push(ConfigError::OutOfRange {
                    field: "trainer.optimizer.params.lr".into(),
                    value: v.to_string(),
                }),
                None => self.push(ConfigError::TypeMismatch {
                    entity: "trainer.optimizer.params".into(),
                    field: "lr".into(),
                    expected: "number".into(),
                    actual: json_kind(lr).into(),
                }),
            }
        }
        self.reject_unknown(&f);
        OptimizerSpec { name, params }
    }

    fn scheduler(&mut self, value: Option<&Value>) -> SchedulerSpec {
        let mut f = self.fields("trainer.scheduler", value);
        let mut name_known = true;
        let name = match self.opt_string(&mut f, "name") {
            None => SchedulerKind::default(),
            Some(raw) => raw.parse::<SchedulerKind>().unwrap_or_else(|_| {
                name_known = false;
                self.push(ConfigError::UnknownIdentifier {
                    category: Category::Scheduler,
                    name: raw.clone(),
                });
                SchedulerKind::default()
            }),
        };
        let params = self.params(&mut f, "params");
        if name_known {
            for key in params.keys() {
                if !name.accepts(key) {
                    self.push(ConfigError::UnknownParameter {
                        owner: name.to_string(),
                        param: key.clone(),
                    });
                }
            }
        }
        self.reject_unknown(&f);
        SchedulerSpec { name, params }
    }

    // ------------------------------------------------------------------
    // exporter
    // ------------------------------------------------------------------

    fn exporter(&mut self, value: Option<&Value>) -> ExportSpec {
        let mut f = self.fields("exporter", value);
        let export_save_directory = self
            .opt_string(&mut f, "export_save_directory")
            .unwrap_or_else(default_export_save_directory);
        let input_shape = self.positive_list(&mut f, "input_shape");
        let export_model_name = self
            .opt_string(&mut f, "export_model_name")
            .unwrap_or_else(default_export_model_name);
        let data_type = self.choice(
            &mut f,
            "data_type",
            &[
                ("INT8", DataType::Int8),
                ("FP16", DataType::Fp16),
                ("FP32", DataType::Fp32),
            ],
            DataType::default(),
        );
        let reverse_input_channels = self.bool_or(&mut f, "reverse_input_channels", true);
        let scale_values = self.channel_values(&mut f, "scale_values");
        let mean_values = self.channel_values(&mut f, "mean_values");
        let output_names = f
            .get("output_names")
            .map(|_| self.string_list(&mut f, "output_names"));

        let onnx_value = f.get("onnx");
        let mut o = self.fields("exporter.onnx", onnx_value);
        let opset_version = self.positive_or(&mut o, "opset_version", default_opset_version());
        let dynamic_axes = o
            .get("dynamic_axes")
            .map(|_| self.params(&mut o, "dynamic_axes"));
        self.reject_unknown(&o);

        let blob_value = f.get("blobconverter");
        let mut b = self.fields("exporter.blobconverter", blob_value);
        let active = self.bool_or(&mut b, "active", false);
        let shaves = self.positive_or(&mut b, "shaves", default_shaves());
        self.reject_unknown(&b);

        let upload_url = self.opt_string(&mut f, "upload_url");
        self.reject_unknown(&f);
        ExportSpec {
            export_save_directory,
            input_shape,
            export_model_name,
            data_type,
            reverse_input_channels,
            scale_values,
            mean_values,
            output_names,
            onnx: OnnxSpec {
                opset_version,
                dynamic_axes,
            },
            blobconverter: BlobconverterSpec { active, shaves },
            upload_url,
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}

/// Split `a.b.c` into (`a.b`, `c`)
fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('.') {
        Some((parent, field)) => (parent.to_string(), field.to_string()),
        None => ("document".to_string(), path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
model:
  name: classifier
  nodes:
    - name: ResNet
    - name: ClassificationHead
      inputs: [ResNet]
  metrics:
    - name: Accuracy
      attached_to: ClassificationHead
      is_main_metric: true
dataset:
  name: cifar10_test
trainer:
  batch_size: 4
  epochs: 10
"#;

    fn check(yaml: &str) -> Result<ExperimentConfig, ValidationErrors> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        validate_document(&value, &Registry::builtin())
    }

    fn errors(yaml: &str) -> Vec<ConfigError> {
        check(yaml).unwrap_err().into_vec()
    }

    /// BASE with `from` replaced by `to`
    fn patched(from: &str, to: &str) -> String {
        assert!(BASE.contains(from), "patch target `{from}` not in BASE");
        BASE.replacen(from, to, 1)
    }

    #[test]
    fn test_minimal_document_gets_defaults() {
        let config = check(BASE).unwrap();
        let trainer = &config.trainer;
        assert_eq!(trainer.num_workers, 2);
        assert_eq!(trainer.validation_interval, 1);
        assert_eq!(trainer.num_log_images, 4);
        assert_eq!(trainer.save_top_k, 3);
        assert_eq!(trainer.accelerator, Accelerator::Auto);
        assert!(trainer.skip_last_batch);
        assert_eq!(trainer.preprocessing.train_image_size, [256, 256]);
        assert!(trainer.preprocessing.normalize.active);
        assert_eq!(trainer.optimizer.name, OptimizerKind::Adam);
        assert_eq!(trainer.scheduler.name, SchedulerKind::ConstantLR);
        assert_eq!(config.dataset.train_view, "train");
        assert_eq!(config.model.outputs, vec!["ClassificationHead"]);
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert_eq!(
            errors("- model\n- trainer\n"),
            vec![ConfigError::TypeMismatch {
                entity: "document".into(),
                field: "<root>".into(),
                expected: "mapping".into(),
                actual: "sequence".into(),
            }]
        );
    }

    #[test]
    fn test_missing_sections_reported_once_each() {
        let errs = errors("{}");
        assert_eq!(
            errs,
            ["model", "dataset", "trainer"]
                .iter()
                .map(|s| ConfigError::MissingField {
                    entity: "document".into(),
                    field: s.to_string(),
                })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unknown_top_level_key() {
        let yaml = format!("{BASE}datasets:\n  name: demo\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::UnknownField {
                entity: "document".into(),
                field: "datasets".into(),
            }]
        );
    }

    #[test]
    fn test_section_with_wrong_type() {
        let yaml = patched("dataset:\n  name: cifar10_test\n", "dataset: cifar10_test\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::TypeMismatch {
                entity: "document".into(),
                field: "dataset".into(),
                expected: "mapping".into(),
                actual: "string".into(),
            }]
        );
    }

    #[test]
    fn test_misspelled_trainer_field() {
        let yaml = patched("batch_size: 4", "bach_size: 4");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::UnknownField {
                entity: "trainer".into(),
                field: "bach_size".into(),
            }]
        );
    }

    #[test]
    fn test_non_positive_integers_out_of_range() {
        let yaml = patched("batch_size: 4\n  epochs: 10", "batch_size: 0\n  epochs: -3");
        assert_eq!(
            errors(&yaml),
            vec![
                ConfigError::OutOfRange {
                    field: "trainer.batch_size".into(),
                    value: "0".into(),
                },
                ConfigError::OutOfRange {
                    field: "trainer.epochs".into(),
                    value: "-3".into(),
                },
            ]
        );
    }

    #[test]
    fn test_batch_size_type_mismatch() {
        let yaml = patched("batch_size: 4", "batch_size: four");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::TypeMismatch {
                entity: "trainer".into(),
                field: "batch_size".into(),
                expected: "positive integer".into(),
                actual: "string".into(),
            }]
        );
    }

    #[test]
    fn test_unknown_identifiers() {
        let yaml = patched("- name: ResNet\n", "- name: ResNot\n      alias: ResNet\n");
        let yaml = format!("{yaml}  callbacks:\n    - name: NotACallback\n");
        let errs = errors(&yaml);
        assert_eq!(
            errs,
            vec![
                ConfigError::UnknownIdentifier {
                    category: Category::Node,
                    name: "ResNot".into(),
                },
                ConfigError::UnknownIdentifier {
                    category: Category::Callback,
                    name: "NotACallback".into(),
                },
            ]
        );
    }

    #[test]
    fn test_extended_registry_accepts_custom_node() {
        let yaml = patched("- name: ResNet\n", "- name: MyBackbone\n      alias: ResNet\n");
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        let registry = Registry::builtin().with(Category::Node, "MyBackbone");
        let config = validate_document(&value, &registry).unwrap();
        assert_eq!(config.model.nodes[0].name, "MyBackbone");
        assert_eq!(config.model.nodes[0].effective_name(), "ResNet");
    }

    #[test]
    fn test_dangling_node_input() {
        let yaml = patched("inputs: [ResNet]", "inputs: [Backbone]");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::DanglingReference {
                referrer: "ClassificationHead".into(),
                target: "Backbone".into(),
            }]
        );
    }

    #[test]
    fn test_inputs_must_reference_earlier_nodes() {
        let yaml = patched(
            "    - name: ResNet\n    - name: ClassificationHead\n      inputs: [ResNet]\n",
            "    - name: ClassificationHead\n      inputs: [ResNet]\n    - name: ResNet\n",
        );
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::DanglingReference {
                referrer: "ClassificationHead".into(),
                target: "ResNet".into(),
            }]
        );
    }

    #[test]
    fn test_empty_nodes() {
        let yaml = patched(
            "  nodes:\n    - name: ResNet\n    - name: ClassificationHead\n      inputs: [ResNet]\n",
            "  nodes: []\n",
        );
        let errs = errors(&yaml);
        assert!(errs.contains(&ConfigError::EmptySection {
            section: "model.nodes".into(),
        }));
        assert!(errs.contains(&ConfigError::DanglingReference {
            referrer: "Accuracy".into(),
            target: "ClassificationHead".into(),
        }));
    }

    #[test]
    fn test_duplicate_node_names_need_alias() {
        let dup = patched("- name: ResNet\n", "- name: ResNet\n    - name: ResNet\n");
        assert_eq!(
            errors(&dup),
            vec![ConfigError::DuplicateName {
                section: "model.nodes".into(),
                name: "ResNet".into(),
            }]
        );

        let aliased = patched(
            "- name: ResNet\n",
            "- name: ResNet\n    - name: ResNet\n      alias: frozen_backbone\n",
        );
        let config = check(&aliased).unwrap();
        assert_eq!(config.model.nodes.len(), 3);
        assert!(config.model.node("frozen_backbone").is_some());
        assert_eq!(
            config.model.outputs,
            vec!["frozen_backbone", "ClassificationHead"]
        );
    }

    #[test]
    fn test_main_metric_required() {
        let yaml = patched("is_main_metric: true", "is_main_metric: false");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::MainMetricCardinality { count: 0 }]
        );
    }

    #[test]
    fn test_two_main_metrics() {
        let yaml = patched(
            "      is_main_metric: true\n",
            "      is_main_metric: true\n    - name: F1Score\n      attached_to: ClassificationHead\n      is_main_metric: true\n",
        );
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::MainMetricCardinality { count: 2 }]
        );
    }

    #[test]
    fn test_extra_node_keys_become_params() {
        let yaml = patched("- name: ResNet\n", "- name: ResNet\n      pretrained: true\n");
        let config = check(&yaml).unwrap();
        let node = &config.model.nodes[0];
        assert_eq!(node.params["pretrained"], serde_json::json!(true));
    }

    #[test]
    fn test_variant_lifted_from_params() {
        let yaml = patched(
            "- name: ResNet\n",
            "- name: ResNet\n      params:\n        variant: \"18\"\n        download_weights: false\n",
        );
        let config = check(&yaml).unwrap();
        let node = &config.model.nodes[0];
        assert_eq!(node.variant.as_deref(), Some("18"));
        assert_eq!(node.download_weights, Some(false));
        assert!(node.params.is_empty());
        assert_eq!(node.construction_params()["variant"], serde_json::json!("18"));
    }

    #[test]
    fn test_integer_variant_normalised() {
        let yaml = patched("- name: ResNet\n", "- name: ResNet\n      variant: 50\n");
        let config = check(&yaml).unwrap();
        assert_eq!(config.model.nodes[0].variant.as_deref(), Some("50"));
    }

    #[test]
    fn test_variant_in_both_places_conflicts() {
        let yaml = patched(
            "- name: ResNet\n",
            "- name: ResNet\n      variant: \"50\"\n      params:\n        variant: \"18\"\n",
        );
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::ConflictingField {
                entity: "model.nodes[0]".into(),
                field: "variant".into(),
            }]
        );
    }

    #[test]
    fn test_freezing() {
        let yaml = patched(
            "- name: ResNet\n",
            "- name: ResNet\n      freezing:\n        active: true\n        unfreeze_after: 0.5\n",
        );
        let config = check(&yaml).unwrap();
        let freezing = &config.model.nodes[0].freezing;
        assert_eq!(freezing.unfreeze_after, Some(UnfreezeAfter::Fraction(0.5)));
        assert_eq!(freezing.unfreeze_epoch(config.trainer.epochs), Some(5));

        let bad = patched(
            "- name: ResNet\n",
            "- name: ResNet\n      freezing:\n        active: true\n        unfreeze_after: 1.5\n",
        );
        assert_eq!(
            errors(&bad),
            vec![ConfigError::OutOfRange {
                field: "model.nodes[0].freezing.unfreeze_after".into(),
                value: "1.5".into(),
            }]
        );
    }

    #[test]
    fn test_explicit_outputs_checked() {
        let yaml = patched("  metrics:", "  outputs: [Missing]\n  metrics:");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::DanglingReference {
                referrer: "model.outputs".into(),
                target: "Missing".into(),
            }]
        );
    }

    #[test]
    fn test_loss_weight_and_alias() {
        let yaml = patched(
            "  metrics:",
            "  losses:\n    - name: CrossEntropyLoss\n      alias: ce\n      attached_to: ClassificationHead\n      weight: 0.5\n  metrics:",
        );
        let config = check(&yaml).unwrap();
        let loss = &config.model.losses[0];
        assert_eq!(loss.effective_name(), "ce");
        assert_eq!(loss.weight, 0.5);
        assert_eq!(config.model.losses_for("ClassificationHead").count(), 1);

        let negative = yaml.replace("weight: 0.5", "weight: -1");
        assert_eq!(
            errors(&negative),
            vec![ConfigError::OutOfRange {
                field: "model.losses[0].weight".into(),
                value: "-1".into(),
            }]
        );
    }

    #[test]
    fn test_dangling_reference_uses_alias_as_referrer() {
        let yaml = patched(
            "      attached_to: ClassificationHead\n",
            "      alias: top1\n      attached_to: Head\n",
        );
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::DanglingReference {
                referrer: "top1".into(),
                target: "Head".into(),
            }]
        );
    }

    #[test]
    fn test_train_image_size_shape() {
        let long = format!("{BASE}  preprocessing:\n    train_image_size: [224, 224, 3]\n");
        assert_eq!(
            errors(&long),
            vec![ConfigError::InvalidLength {
                field: "trainer.preprocessing.train_image_size".into(),
                expected: 2,
                actual: 3,
            }]
        );

        let zero = format!("{BASE}  preprocessing:\n    train_image_size: [224, 0]\n");
        assert_eq!(
            errors(&zero),
            vec![ConfigError::OutOfRange {
                field: "trainer.preprocessing.train_image_size[1]".into(),
                value: "0".into(),
            }]
        );
    }

    #[test]
    fn test_normalize_and_augmentations() {
        let yaml = format!(
            "{BASE}  preprocessing:\n    augmentations:\n      - name: HorizontalFlip\n        params:\n          p: 0.5\n"
        );
        let config = check(&yaml).unwrap();
        let pipeline = config.trainer.preprocessing.augmentation_pipeline();
        let names: Vec<&str> = pipeline.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["HorizontalFlip", "Normalize"]);
        assert!(pipeline[1].params.contains_key("mean"));

        let off = format!("{BASE}  preprocessing:\n    normalize:\n      active: false\n");
        let config = check(&off).unwrap();
        assert!(config
            .trainer
            .preprocessing
            .augmentation_pipeline()
            .is_empty());
    }

    #[test]
    fn test_invalid_accelerator() {
        let yaml = format!("{BASE}  accelerator: tpu\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::InvalidChoice {
                field: "trainer.accelerator".into(),
                value: "tpu".into(),
                expected: "auto, cpu, gpu".into(),
            }]
        );
    }

    #[test]
    fn test_optimizer_parameters_checked() {
        let yaml = format!(
            "{BASE}  optimizer:\n    name: SGD\n    params:\n      lr: 0.02\n      momentum: 0.9\n      betas: [0.9, 0.99]\n"
        );
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::UnknownParameter {
                owner: "SGD".into(),
                param: "betas".into(),
            }]
        );
    }

    #[test]
    fn test_unknown_optimizer_skips_parameter_check() {
        let yaml = format!("{BASE}  optimizer:\n    name: Adamm\n    params:\n      anything: 1\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::UnknownIdentifier {
                category: Category::Optimizer,
                name: "Adamm".into(),
            }]
        );
    }

    #[test]
    fn test_learning_rate_must_be_positive() {
        let yaml = format!("{BASE}  optimizer:\n    name: SGD\n    params:\n      lr: -0.1\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::OutOfRange {
                field: "trainer.optimizer.params.lr".into(),
                value: "-0.1".into(),
            }]
        );
    }

    #[test]
    fn test_scheduler_parameters_checked() {
        let yaml = format!("{BASE}  scheduler:\n    name: ConstantLR\n    params:\n      gamma: 0.1\n");
        assert_eq!(
            errors(&yaml),
            vec![ConfigError::UnknownParameter {
                owner: "ConstantLR".into(),
                param: "gamma".into(),
            }]
        );
    }

    #[test]
    fn test_inactive_callbacks_are_kept_but_filtered() {
        let yaml = format!(
            "{BASE}  callbacks:\n    - name: ExportOnTrainEnd\n    - name: TestOnTrainEnd\n      active: false\n"
        );
        let config = check(&yaml).unwrap();
        assert_eq!(config.trainer.callbacks.len(), 2);
        let active: Vec<&str> = config
            .trainer
            .active_callbacks()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(active, vec!["ExportOnTrainEnd"]);
    }

    #[test]
    fn test_validation_interval_beyond_epochs_is_accepted() {
        let yaml = format!("{BASE}  validation_interval: 50\n");
        let config = check(&yaml).unwrap();
        assert_eq!(config.trainer.validation_interval, 50);
    }

    #[test]
    fn test_all_violations_reported_together() {
        let yaml = BASE
            .replace("batch_size: 4", "batch_size: 0")
            .replace("- name: ResNet\n", "- name: ResNot\n      alias: ResNet\n")
            .replace("is_main_metric: true", "is_main_metric: false")
            .replace("name: cifar10_test", "id: abc");
        let errs = errors(&yaml);
        assert_eq!(errs.len(), 4, "{errs:?}");
        assert!(errs.contains(&ConfigError::MainMetricCardinality { count: 0 }));
        assert!(errs.contains(&ConfigError::MissingField {
            entity: "dataset".into(),
            field: "name".into(),
        }));
    }

    #[test]
    fn test_empty_trainer_uses_defaults() {
        let yaml = patched("trainer:\n  batch_size: 4\n  epochs: 10\n", "trainer: {}\n");
        let trainer = check(&yaml).unwrap().trainer;
        assert_eq!(trainer.batch_size, 32);
        assert_eq!(trainer.epochs, 100);
        assert_eq!(trainer.devices, Devices::Named("auto".into()));
        assert_eq!(trainer.train_metrics_interval, -1);
    }

    #[test]
    fn test_runtime_trainer_fields() {
        let yaml = format!(
            "{BASE}  devices: [0, 1]\n  strategy: ddp\n  num_sanity_val_steps: 0\n  profiler: simple\n  verbose: false\n  use_weighted_sampler: true\n  train_metrics_interval: 5\n  log_sub_losses: false\n"
        );
        let trainer = check(&yaml).unwrap().trainer;
        assert_eq!(trainer.devices, Devices::Indices(vec![0, 1]));
        assert_eq!(trainer.strategy, Strategy::Ddp);
        assert_eq!(trainer.num_sanity_val_steps, 0);
        assert_eq!(trainer.profiler, Some(Profiler::Simple));
        assert!(!trainer.verbose);
        assert!(trainer.use_weighted_sampler);
        assert_eq!(trainer.train_metrics_interval, 5);
        assert!(!trainer.log_sub_losses);

        let config = check(&format!("{BASE}  devices: auto\n")).unwrap();
        assert_eq!(config.trainer.devices, Devices::Named("auto".into()));
        let config = check(&format!("{BASE}  devices: -1\n")).unwrap();
        assert_eq!(config.trainer.devices, Devices::Count(-1));
    }

    #[test]
    fn test_runtime_trainer_fields_checked() {
        let yaml = format!(
            "{BASE}  devices: 0\n  strategy: fsdp\n  num_sanity_val_steps: -2\n  profiler: pytorch\n  train_metrics_interval: 0\n  verbose: loud\n"
        );
        assert_eq!(
            errors(&yaml),
            vec![
                ConfigError::OutOfRange {
                    field: "trainer.devices".into(),
                    value: "0".into(),
                },
                ConfigError::InvalidChoice {
                    field: "trainer.strategy".into(),
                    value: "fsdp".into(),
                    expected: "auto, ddp".into(),
                },
                ConfigError::OutOfRange {
                    field: "trainer.num_sanity_val_steps".into(),
                    value: "-2".into(),
                },
                ConfigError::InvalidChoice {
                    field: "trainer.profiler".into(),
                    value: "pytorch".into(),
                    expected: "simple, advanced".into(),
                },
                ConfigError::TypeMismatch {
                    entity: "trainer".into(),
                    field: "verbose".into(),
                    expected: "boolean".into(),
                    actual: "string".into(),
                },
                ConfigError::OutOfRange {
                    field: "trainer.train_metrics_interval".into(),
                    value: "0".into(),
                },
            ]
        );
    }

    #[test]
    fn test_dataset_loader_fields() {
        let yaml = patched(
            "dataset:\n  name: cifar10_test\n",
            "dataset:\n  name: cifar10_test\n  team_name: vision\n  json_mode: true\n  use_ldf: false\n  custom_train_loader: MyLoader\n  custom_dataset_params:\n    root: /data\n",
        );
        let dataset = check(&yaml).unwrap().dataset;
        assert_eq!(dataset.team_name.as_deref(), Some("vision"));
        assert!(dataset.json_mode);
        assert!(!dataset.use_ldf);
        assert_eq!(dataset.custom_train_loader.as_deref(), Some("MyLoader"));
        assert_eq!(dataset.custom_val_loader, None);
        assert_eq!(dataset.custom_dataset_params["root"], serde_json::json!("/data"));
    }

    #[test]
    fn test_tracker_and_exporter_sections() {
        let yaml = format!(
            r#"use_rich_text: false
tracker:
  project_name: demo
  is_wandb: true
  wandb_entity: team
exporter:
  export_model_name: classifier
  data_type: INT8
  input_shape: [1, 3, 224, 224]
  scale_values: 255.0
  mean_values: [123.675, 116.28, 103.53]
  output_names: [logits]
  onnx:
    opset_version: 11
  blobconverter:
    active: true
{BASE}"#
        );
        let config = check(&yaml).unwrap();
        assert!(!config.use_rich_text);
        assert_eq!(config.tracker.project_name.as_deref(), Some("demo"));
        assert_eq!(config.tracker.backends(), vec!["tensorboard", "wandb"]);
        assert_eq!(config.tracker.save_directory, "output");

        let exporter = &config.exporter;
        assert_eq!(exporter.export_model_name, "classifier");
        assert_eq!(exporter.data_type, DataType::Int8);
        assert_eq!(exporter.input_shape, Some(vec![1, 3, 224, 224]));
        assert_eq!(exporter.scale_values, Some(vec![255.0; 3]));
        assert_eq!(exporter.mean_values, Some(vec![123.675, 116.28, 103.53]));
        assert_eq!(exporter.output_names, Some(vec!["logits".to_string()]));
        assert_eq!(exporter.onnx.opset_version, 11);
        assert!(exporter.blobconverter.active);
        assert_eq!(exporter.blobconverter.shaves, 6);
    }

    #[test]
    fn test_exporter_fields_checked() {
        let yaml = format!(
            "{BASE}exporter:\n  data_type: FP64\n  input_shape: [1, 0]\n  mean_values: [1.0, x]\n  onnx:\n    opset: 12\n"
        );
        assert_eq!(
            errors(&yaml),
            vec![
                ConfigError::OutOfRange {
                    field: "exporter.input_shape[1]".into(),
                    value: "0".into(),
                },
                ConfigError::InvalidChoice {
                    field: "exporter.data_type".into(),
                    value: "FP64".into(),
                    expected: "INT8, FP16, FP32".into(),
                },
                ConfigError::TypeMismatch {
                    entity: "exporter".into(),
                    field: "mean_values[1]".into(),
                    expected: "number".into(),
                    actual: "string".into(),
                },
                ConfigError::UnknownField {
                    entity: "exporter.onnx".into(),
                    field: "opset".into(),
                },
            ]
        );
    }

    #[test]
    fn test_validation_errors_display() {
        let errs = ValidationErrors::from(vec![
            ConfigError::UnresolvedAlias {
                alias: "epochs".into(),
            },
            ConfigError::MainMetricCardinality { count: 2 },
        ]);
        assert_eq!(
            errs.to_string(),
            "  - alias `*epochs` is used but never defined\n  - exactly one metric must set `is_main_metric: true`, found 2"
        );
    }
}
