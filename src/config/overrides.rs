//! Dotted-path configuration overrides
//!
//! An override such as `trainer.epochs=10` or `model.nodes.0.params.variant=18`
//! replaces one value of the resolved document before validation. Values are
//! parsed as YAML, so `10` is an integer, `true` a boolean and `[1, 2]` a
//! sequence.
//!
//! Overrides apply after anchor resolution: overriding a field that was
//! filled from an alias changes that field only, not the other use sites.

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::fmt;

/// A single `key.path=value` override
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: Vec<String>,
    pub value: Value,
}

impl Override {
    pub fn new(path: &str, value: Value) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::Override(format!("invalid key path `{path}`")));
        }
        Ok(Self {
            path: segments,
            value,
        })
    }

    pub fn key(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_yaml::to_string(&self.value).unwrap_or_default();
        write!(f, "{}={}", self.key(), rendered.trim_end())
    }
}

impl std::str::FromStr for Override {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| format!("Override must have the form KEY=VALUE, got `{s}`"))?;
        let value: Value = serde_yaml::from_str(raw)
            .map_err(|e| format!("Invalid value for override `{key}`: {e}"))?;
        Override::new(key.trim(), value).map_err(|e| e.to_string())
    }
}

/// Parse a list of `KEY=VALUE` strings
pub fn parse_overrides<I, S>(items: I) -> Result<Vec<Override>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| item.as_ref().parse().map_err(Error::Override))
        .collect()
}

/// Apply overrides to a resolved document in order
///
/// Missing intermediate mapping keys are created. Sequence segments must be
/// an existing index.
pub fn apply_overrides(root: &mut Value, overrides: &[Override]) -> Result<()> {
    for item in overrides {
        apply_one(root, item)?;
        tracing::debug!(key = %item.key(), "override applied");
    }
    Ok(())
}

fn apply_one(root: &mut Value, item: &Override) -> Result<()> {
    let mut current = root;
    for (depth, segment) in item.path.iter().enumerate() {
        let last = depth + 1 == item.path.len();
        let here = || item.path[..=depth].join(".");

        if current.is_null() {
            *current = Value::Mapping(Mapping::new());
        }
        current = match current {
            Value::Mapping(map) => {
                let key = Value::String(segment.clone());
                if last {
                    map.insert(key, item.value.clone());
                    return Ok(());
                }
                map.entry(key).or_insert(Value::Null)
            }
            Value::Sequence(items) => {
                let len = items.len();
                let index: usize = segment.parse().map_err(|_| {
                    Error::Override(format!("`{}` indexes a sequence, expected a number", here()))
                })?;
                let slot = items.get_mut(index).ok_or_else(|| {
                    Error::Override(format!(
                        "`{}` is out of bounds (sequence has {len} elements)",
                        here()
                    ))
                })?;
                if last {
                    *slot = item.value.clone();
                    return Ok(());
                }
                slot
            }
            _ => {
                return Err(Error::Override(format!(
                    "cannot descend into scalar at `{}`",
                    item.path[..depth].join(".")
                )))
            }
        };
    }
    Ok(())
}
