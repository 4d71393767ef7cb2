use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::format::format_for_path;
use crate::domain::template::TemplateMatch;
use crate::domain::value::{Bindings, ShapeHints, Value};

/// A document holding variable values and the hints used when matching:
///
/// ```yaml
/// variables:
///   user: alice
///   tags: [red, green]
///   filter: { lang: rust }
/// hints:
///   list: [tags]
///   map: [filter]
/// ```
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct BindingsFile {
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "HintSettings::is_empty")]
    pub hints: HintSettings,
}

/// Names of variables to treat as lists or maps while matching
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct HintSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map: Vec<String>,
}

impl HintSettings {
    pub fn is_empty(&self) -> bool {
        self.list.is_empty() && self.map.is_empty()
    }
}

impl BindingsFile {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Invalid YAML bindings")
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid JSON bindings")
    }

    /// Read a bindings file, choosing the format by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;

        format_for_path(path)
            .deserialize(&content)
            .with_context(|| format!("Invalid bindings file {}", path.display()))
    }

    pub fn bindings(&self) -> Bindings {
        self.variables
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn shape_hints(&self) -> Result<ShapeHints> {
        Ok(ShapeHints::new(
            self.hints.list.iter().cloned(),
            self.hints.map.iter().cloned(),
        )?)
    }

    /// A match result as a bindings document. List and map values are listed
    /// under `hints` so the document matches back the same way.
    pub fn from_match(found: &TemplateMatch) -> Self {
        let mut file = Self::default();
        for (name, value) in found {
            if value.as_list().is_some() {
                file.hints.list.push(name.clone());
            } else if value.as_map().is_some() {
                file.hints.map.push(name.clone());
            }
            file.variables.insert(name.clone(), Value::from(value.clone()));
        }
        file
    }

    /// Apply a `name=value` assignment on top of the file's variables
    pub fn assign(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = parse_assignment(assignment)?;
        self.variables.insert(name, value);
        Ok(())
    }
}

/// Parse `name=value` into a scalar binding. `name=` binds the empty string.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((name, value)) = assignment.split_once('=') else {
        bail!("Expected name=value, got '{}'", assignment);
    };
    if name.is_empty() {
        bail!("Variable name cannot be empty in '{}'", assignment);
    }

    Ok((name.to_string(), Value::from(value)))
}
