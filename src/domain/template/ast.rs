// Abstract Syntax Tree types for URI templates

use std::fmt;

use super::expansion::Expansion;
use super::parser::TemplateParser;
use crate::error::Result;

/// Represents a parsed template as a list of parts
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
}

impl Template {
    pub fn new(parts: Vec<TemplatePart>) -> Self {
        Self { parts }
    }

    pub fn parse(template: &str) -> Result<Self> {
        TemplateParser::parse(template)
    }

    /// Get all expansions in this template
    pub fn expansions(&self) -> impl Iterator<Item = &Expansion> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Expansion(expansion) => Some(expansion),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Get all variable references in this template, in order of appearance
    pub fn variables(&self) -> Vec<&VariableReference> {
        self.expansions()
            .flat_map(|expansion| expansion.variables())
            .collect()
    }

    /// Distinct variable names, in order of first appearance
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for var in self.variables() {
            if !names.contains(&var.name.as_str()) {
                names.push(&var.name);
            }
        }
        names
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => f.write_str(text)?,
                TemplatePart::Expansion(expansion) => write!(f, "{}", expansion)?,
            }
        }
        Ok(())
    }
}

/// A template consists of literal strings and `{...}` expansions
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Expansion(Expansion),
}

/// One variable occurrence inside an expansion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableReference {
    pub name: String,
    /// `:n`, keep the first n characters
    pub prefix: Option<u16>,
    /// `*`, explode list and map values
    pub composite: bool,
}

impl VariableReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            composite: false,
        }
    }

    pub fn with_prefix(mut self, prefix: u16) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn with_composite(mut self, composite: bool) -> Self {
        self.composite = composite;
        self
    }
}

impl fmt::Display for VariableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(prefix) = self.prefix {
            write!(f, ":{}", prefix)?;
        }
        if self.composite {
            f.write_str("*")?;
        }
        Ok(())
    }
}
