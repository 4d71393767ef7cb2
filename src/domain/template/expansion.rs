// A single `{...}` expression: one operator over an ordered variable list

use regex::Regex;
use std::fmt;
use tracing::{debug, trace};

use super::ast::VariableReference;
use super::matcher;
use super::operator::{Operator, PatternShape};
use super::pattern;
use super::resolver;
use crate::domain::value::{Bindings, MatchedValue, ShapeHints};
use crate::error::{Result, TemplateError};

/// Variables captured by one expansion, in declaration order
pub type ExpansionMatch = Vec<(VariableReference, MatchedValue)>;

/// Immutable once built; safe to share between threads and reuse across
/// any number of render and match calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    operator: Operator,
    variables: Vec<VariableReference>,
}

impl Expansion {
    pub fn new(operator: Operator, variables: Vec<VariableReference>) -> Result<Self> {
        if variables.is_empty() {
            return Err(TemplateError::invalid_argument(
                "an expansion needs at least one variable",
            ));
        }
        if variables.iter().any(|var| var.name.is_empty()) {
            return Err(TemplateError::invalid_argument("variable names cannot be empty"));
        }

        Ok(Self {
            operator,
            variables,
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn variables(&self) -> &[VariableReference] {
        &self.variables
    }

    /// Pattern fragment for this expansion, suitable for concatenation with
    /// the fragments of the surrounding parts. Contains no capture groups.
    pub fn build_pattern(&self, hints: &ShapeHints) -> String {
        let body = pattern::expansion_body(self, hints);
        trace!(expansion = %self, pattern = %body, "synthesized expansion pattern");
        body
    }

    /// Recover the variables this expansion would have rendered as `text`.
    ///
    /// Returns `None` when `text` could not have been produced by this
    /// expansion; variables that were not present are left out of the result.
    pub fn match_text(&self, text: &str, hints: &ShapeHints) -> Result<Option<ExpansionMatch>> {
        let Some(subject) = self.normalize(text) else {
            debug!(expansion = %self, text, "text does not start with the operator prefix");
            return Ok(None);
        };

        let regex = Regex::new(&pattern::expansion_matcher(self, hints))?;
        let Some(captures) = regex.captures(&subject) else {
            debug!(expansion = %self, text, "text not produced by expansion");
            return Ok(None);
        };

        Ok(matcher::interpret(self, &captures, hints))
    }

    /// Render the bound variables. Never mutates `bindings`.
    pub fn render(&self, bindings: &Bindings) -> String {
        let mut out = String::new();
        resolver::render_expansion(&mut out, self, bindings);
        out
    }

    /// Re-serialize to template syntax, e.g. `{?x,y*,z:3}`
    pub fn to_canonical_text(&self) -> String {
        self.to_string()
    }

    /// Subsequence-shaped text is rewritten into chain form: the shared
    /// leading text is replaced by a separator so every defined variable is
    /// introduced the same way.
    fn normalize(&self, text: &str) -> Option<String> {
        let config = self.operator.config();
        match config.shape() {
            PatternShape::Chain => Some(text.to_string()),
            PatternShape::Subsequence if text.is_empty() => Some(String::new()),
            PatternShape::Subsequence => {
                let rest = text.strip_prefix(config.first)?;
                let mut subject = String::with_capacity(rest.len() + 1);
                subject.push(config.separator);
                subject.push_str(rest);
                Some(subject)
            }
        }
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.operator)?;
        for (i, var) in self.variables.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", var)?;
        }
        f.write_str("}")
    }
}
