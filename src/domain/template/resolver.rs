// Template rendering: bindings in, URI text out

use url::Url;

use super::ast::{Template, TemplatePart, VariableReference};
use super::charset;
use super::expansion::Expansion;
use super::operator::OperatorConfig;
use crate::domain::value::{Bindings, Value};
use crate::error::Result;

/// Resolves variables in a template to produce the final URI text
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve template with provided variable values
    pub fn resolve(&self, template: &Template, bindings: &Bindings) -> String {
        let mut result = String::new();

        for part in &template.parts {
            match part {
                TemplatePart::Literal(text) => result.push_str(text),
                TemplatePart::Expansion(expansion) => {
                    render_expansion(&mut result, expansion, bindings)
                }
            }
        }

        result
    }

    /// Names of template variables with no defined binding
    pub fn undefined_variables<'t>(&self, template: &'t Template, bindings: &Bindings) -> Vec<&'t str> {
        template
            .variable_names()
            .into_iter()
            .filter(|name| !bindings.get(*name).is_some_and(Value::is_defined))
            .collect()
    }
}

impl Template {
    pub fn expand(&self, bindings: &Bindings) -> String {
        TemplateResolver::new().resolve(self, bindings)
    }

    /// Expand, then resolve the result as a reference against `base`
    pub fn expand_url(&self, base: &Url, bindings: &Bindings) -> Result<Url> {
        Ok(base.join(&self.expand(bindings))?)
    }
}

/// Append one expansion's text. Variables are visited in declaration order;
/// undefined ones contribute nothing, not even a separator.
pub(crate) fn render_expansion(out: &mut String, expansion: &Expansion, bindings: &Bindings) {
    let config = expansion.operator().config();
    let mut first = true;

    for var in expansion.variables() {
        let value = match bindings.get(&var.name) {
            Some(value) if value.is_defined() => value,
            _ => continue,
        };

        if first {
            out.push_str(config.first);
            first = false;
        } else {
            out.push(config.separator);
        }

        match value {
            Value::Absent => {}
            Value::Scalar(text) => render_element(out, var, &config, text),
            Value::List(items) => render_list(out, var, &config, items),
            Value::Map(entries) => render_map(out, var, &config, entries),
        }
    }
}

fn render_element(out: &mut String, var: &VariableReference, config: &OperatorConfig, text: &str) {
    let text = match var.prefix {
        Some(prefix) => charset::truncate(text, usize::from(prefix)),
        None => text,
    };

    if config.named {
        push_named(out, &var.name, text, config);
    } else {
        out.push_str(&charset::encode(text, config.allow_reserved));
    }
}

fn render_list(out: &mut String, var: &VariableReference, config: &OperatorConfig, items: &[String]) {
    if var.composite {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(config.separator);
            }
            if config.named {
                push_named(out, &var.name, item, config);
            } else {
                out.push_str(&charset::encode(item, config.allow_reserved));
            }
        }
        return;
    }

    if config.named {
        out.push_str(&var.name);
        out.push('=');
    }
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&charset::encode(item, config.allow_reserved));
    }
}

fn render_map(
    out: &mut String,
    var: &VariableReference,
    config: &OperatorConfig,
    entries: &[(String, String)],
) {
    if var.composite {
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                out.push(config.separator);
            }
            let key = charset::encode(key, config.allow_reserved);
            if config.named {
                push_named(out, &key, value, config);
            } else {
                out.push_str(&key);
                out.push('=');
                out.push_str(&charset::encode(value, config.allow_reserved));
            }
        }
        return;
    }

    if config.named {
        out.push_str(&var.name);
        out.push('=');
    }
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&charset::encode(key, config.allow_reserved));
        out.push(',');
        out.push_str(&charset::encode(value, config.allow_reserved));
    }
}

/// `name=value`, or `name` followed by the operator's empty-value suffix
fn push_named(out: &mut String, name: &str, value: &str, config: &OperatorConfig) {
    out.push_str(name);
    if value.is_empty() {
        out.push_str(config.if_empty);
    } else {
        out.push('=');
        out.push_str(&charset::encode(value, config.allow_reserved));
    }
}
