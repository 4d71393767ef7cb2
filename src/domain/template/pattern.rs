// Pattern synthesis: one alternation per variable, combined by operator shape
//
// Capture groups are named by position (`var0`, `var0list`, `var0map`, ...)
// so variable names never have to be valid group identifiers. `regex` keeps
// no capture history, so instead of per-item `var<i>key` / `var<i>value`
// groups each list or map is captured whole and split into items afterwards
// (see `matcher::split_shortest`).

use super::ast::VariableReference;
use super::charset;
use super::expansion::Expansion;
use super::operator::{OperatorConfig, PatternShape};
use crate::domain::value::ShapeHints;

/// Up to four pct-triplets encode one character
const MAX_UNITS_PER_CHAR: usize = 4;

/// Longest prefix written as a bounded repetition; longer prefixes use an
/// open run so the compiled pattern stays small.
const MAX_BOUNDED_UNITS: usize = 1024;

/// Which textual forms a variable may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Forms {
    pub scalar: bool,
    pub list: bool,
    pub map: bool,
}

impl Forms {
    pub fn of(var: &VariableReference, hints: &ShapeHints) -> Self {
        let treat_as_list = hints.is_list(&var.name);
        let treat_as_map = hints.is_map(&var.name);

        Self {
            scalar: !var.composite && !treat_as_list && !treat_as_map,
            list: treat_as_list || !treat_as_map,
            map: treat_as_map || !treat_as_list,
        }
    }
}

pub(crate) fn scalar_group(index: usize) -> String {
    format!("var{}", index)
}

pub(crate) fn list_group(index: usize) -> String {
    format!("var{}list", index)
}

pub(crate) fn map_group(index: usize) -> String {
    format!("var{}map", index)
}

/// Anchored pattern for matching one expansion's text after it has been
/// normalized to chain form. Every variable is independently optional and
/// introduced by the operator separator.
pub(crate) fn expansion_matcher(expansion: &Expansion, hints: &ShapeHints) -> String {
    let config = expansion.operator().config();
    let sep = escape_char(config.separator);

    let mut pattern = String::from("^");
    for (i, var) in expansion.variables().iter().enumerate() {
        pattern.push_str(&format!(
            "(?:{}{})?",
            sep,
            variable_pattern(var, Some(i), &config, hints)
        ));
    }
    pattern.push('$');
    pattern
}

/// Unanchored, capture-free pattern matching anything the expansion can
/// render, including the empty string.
pub(crate) fn expansion_body(expansion: &Expansion, hints: &ShapeHints) -> String {
    let config = expansion.operator().config();
    let sep = escape_char(config.separator);
    let patterns: Vec<String> = expansion
        .variables()
        .iter()
        .map(|var| variable_pattern(var, None, &config, hints))
        .collect();

    match config.shape() {
        PatternShape::Chain => patterns
            .iter()
            .map(|p| format!("(?:{}{})?", sep, p))
            .collect(),
        PatternShape::Subsequence => {
            // Linear in the variable count: any item may be introduced by the
            // leading text or the separator. `Expansion::match_text` rejects
            // spans the expansion could not have rendered.
            let lead = format!("(?:{}|{})", regex::escape(config.first), sep);
            patterns
                .iter()
                .map(|p| format!("(?:{}{})?", lead, p))
                .collect()
        }
    }
}

/// Pattern for one variable: a bounded scalar when it carries a prefix,
/// otherwise the alternation scalar | list | map (in that order), limited by
/// the variable's explode flag and the caller's hints.
pub(crate) fn variable_pattern(
    var: &VariableReference,
    index: Option<usize>,
    config: &OperatorConfig,
    hints: &ShapeHints,
) -> String {
    let chars = charset::character_pattern(config.allow_reserved);
    let count = if config.lazy() { "*?" } else { "*" };
    let value = format!("{}{}", chars, count);
    let name = regex::escape(&var.name);

    if let Some(prefix) = var.prefix {
        // Counted in characters after decoding; the matcher checks the
        // decoded length.
        let units = usize::from(prefix) * MAX_UNITS_PER_CHAR;
        let bounded = if units <= MAX_BOUNDED_UNITS {
            format!("{}{{0,{}}}", chars, units)
        } else {
            value.clone()
        };
        let body = if config.named {
            named_value(&name, &bounded, config)
        } else {
            bounded
        };
        return format!("{}{})", open_group(index.map(scalar_group)), body);
    }

    let forms = Forms::of(var, hints);
    let item_sep = escape_char(config.item_separator(var.composite));
    let kv_sep = escape_char(config.key_value_separator(var.composite));
    let mut alternatives = Vec::with_capacity(3);

    if forms.scalar {
        let body = if config.named {
            named_value(&name, &value, config)
        } else {
            value.clone()
        };
        alternatives.push(format!("{}{})", open_group(index.map(scalar_group)), body));
    }

    if forms.list {
        let body = if config.named && var.composite {
            // every exploded item repeats the variable name
            let item = named_value(&name, &value, config);
            format!("{item}(?:{item_sep}{item})*?")
        } else {
            let items = format!("{value}(?:{item_sep}{value})*?");
            if config.named {
                format!("{name}={items}")
            } else {
                items
            }
        };
        alternatives.push(format!("{}{})", open_group(index.map(list_group)), body));
    }

    if forms.map {
        let pair = if var.composite && config.allows_bare_key() {
            format!("{value}(?:{kv_sep}{value})?")
        } else {
            format!("{value}{kv_sep}{value}")
        };
        let pairs = format!("{pair}(?:{item_sep}{pair})*?");
        let body = if config.named && !var.composite {
            format!("{name}={pairs}")
        } else {
            pairs
        };
        alternatives.push(format!("{}{})", open_group(index.map(map_group)), body));
    }

    format!("(?:{})", alternatives.join("|"))
}

/// `name=value`, or `name` alone where the operator renders empty values
/// without the `=`
fn named_value(name: &str, value: &str, config: &OperatorConfig) -> String {
    if config.if_empty.is_empty() {
        format!("{}(?:={})?", name, value)
    } else {
        format!("{}={}", name, value)
    }
}

fn open_group(name: Option<String>) -> String {
    match name {
        Some(name) => format!("(?P<{}>", name),
        None => "(?:".to_string(),
    }
}

fn escape_char(ch: char) -> String {
    let mut buf = [0u8; 4];
    regex::escape(ch.encode_utf8(&mut buf))
}
