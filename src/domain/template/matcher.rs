// Match-to-value: turning captures back into variable values

use regex::{Captures, Regex};
use std::collections::{btree_map::Entry, BTreeMap, HashSet};
use tracing::debug;
use url::Url;

use super::ast::{Template, TemplatePart, VariableReference};
use super::charset;
use super::expansion::{Expansion, ExpansionMatch};
use super::operator::OperatorConfig;
use super::pattern::{self, Forms};
use crate::domain::value::{MatchedValue, ShapeHints};
use crate::error::Result;

/// Bindings recovered from a whole template, unified by variable name
pub type TemplateMatch = BTreeMap<String, MatchedValue>;

/// Resolve each variable's captures to a value.
///
/// Priority is fixed: a map capture wins, then a list capture (reported as a
/// scalar when it holds a single item and the variable may be a scalar),
/// then the scalar capture.
pub(crate) fn interpret(
    expansion: &Expansion,
    captures: &Captures,
    hints: &ShapeHints,
) -> Option<ExpansionMatch> {
    let config = expansion.operator().config();
    let mut results = Vec::new();

    for (i, var) in expansion.variables().iter().enumerate() {
        let value = if let Some(prefix) = var.prefix {
            let Some(m) = captures.name(&pattern::scalar_group(i)) else {
                continue;
            };
            let text = charset::decode(strip(m.as_str(), var, &config)?);
            if text.chars().count() > usize::from(prefix) {
                debug!(variable = %var.name, prefix, "capture longer than prefix");
                return None;
            }
            MatchedValue::Scalar(text)
        } else if let Some(m) = captures.name(&pattern::map_group(i)) {
            MatchedValue::Map(map_entries(m.as_str(), var, &config)?)
        } else if let Some(m) = captures.name(&pattern::list_group(i)) {
            let mut items = list_items(m.as_str(), var, &config)?;
            if !Forms::of(var, hints).scalar || items.len() > 1 {
                MatchedValue::List(items)
            } else {
                MatchedValue::Scalar(items.pop()?)
            }
        } else if let Some(m) = captures.name(&pattern::scalar_group(i)) {
            MatchedValue::Scalar(charset::decode(strip(m.as_str(), var, &config)?))
        } else {
            continue;
        };

        results.push((var.clone(), value));
    }

    Some(results)
}

fn list_items(span: &str, var: &VariableReference, config: &OperatorConfig) -> Option<Vec<String>> {
    let allow = config.allow_reserved;
    let sep = config.item_separator(var.composite);

    let pieces = if config.named && var.composite {
        // `x=a;x=b`: each item carries the name
        let named = split_shortest(
            span,
            sep,
            |item| strip_name(item, &var.name).is_some_and(|v| charset::all_allowed(v, allow)),
            |_| true,
        )?;
        named
            .into_iter()
            .map(|item| strip_name(item, &var.name))
            .collect::<Option<Vec<_>>>()?
    } else {
        let body = strip(span, var, config)?;
        split_shortest(body, sep, |item| charset::all_allowed(item, allow), |_| true)?
    };

    Some(pieces.into_iter().map(charset::decode).collect())
}

fn map_entries(
    span: &str,
    var: &VariableReference,
    config: &OperatorConfig,
) -> Option<Vec<(String, String)>> {
    let allow = config.allow_reserved;

    let raw: Vec<(&str, &str)> = if var.composite {
        let bare = config.allows_bare_key();
        let items = split_shortest(
            span,
            config.item_separator(true),
            |item| split_pair(item, allow, bare).is_some(),
            |_| true,
        )?;
        items
            .into_iter()
            .map(|item| split_pair(item, allow, bare))
            .collect::<Option<Vec<_>>>()?
    } else {
        // `k1,v1,k2,v2`
        let body = strip(span, var, config)?;
        let pieces = split_shortest(
            body,
            ',',
            |piece| charset::all_allowed(piece, allow),
            |count| count % 2 == 0,
        )?;
        pieces.chunks(2).map(|pair| (pair[0], pair[1])).collect()
    };

    let mut entries: Vec<(String, String)> = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let key = charset::decode(key);
        if entries.iter().any(|(existing, _)| *existing == key) {
            debug!(variable = %var.name, key = %key, "duplicate key in captured map");
            return None;
        }
        entries.push((key, charset::decode(value)));
    }
    Some(entries)
}

/// Split an exploded map entry at the first `=` that leaves a valid key
fn split_pair(item: &str, allow_reserved: bool, bare_key: bool) -> Option<(&str, &str)> {
    for (index, _) in item.match_indices('=') {
        let (key, value) = (&item[..index], &item[index + 1..]);
        if charset::all_allowed(key, allow_reserved) && charset::all_allowed(value, allow_reserved) {
            return Some((key, value));
        }
    }

    if bare_key && charset::all_allowed(item, allow_reserved) {
        Some((item, ""))
    } else {
        None
    }
}

/// Value part of a named capture, or the capture itself for unnamed operators
fn strip<'a>(text: &'a str, var: &VariableReference, config: &OperatorConfig) -> Option<&'a str> {
    if config.named {
        strip_name(text, &var.name)
    } else {
        Some(text)
    }
}

/// `name=value` -> `value`; a bare `name` is an empty value
fn strip_name<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(name)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('=')
    }
}

/// Split `span` at occurrences of `sep` into pieces that each satisfy
/// `accept`, preferring the shortest first piece, then the shortest second,
/// and so on; `complete` decides whether a full split with that many pieces
/// is usable. This is the order in which the lazy item repetition of the
/// synthesized pattern explores the same span.
fn split_shortest<'a>(
    span: &'a str,
    sep: char,
    accept: impl Fn(&str) -> bool,
    complete: impl Fn(usize) -> bool,
) -> Option<Vec<&'a str>> {
    let width = sep.len_utf8();
    let ends: Vec<usize> = span
        .match_indices(sep)
        .map(|(index, _)| index)
        .chain(std::iter::once(span.len()))
        .collect();

    // chosen[k] indexes `ends` where piece k stops
    let mut chosen: Vec<usize> = Vec::new();
    let mut start = 0;
    let mut candidate = 0;

    loop {
        let mut descended = false;
        while candidate < ends.len() {
            let end = ends[candidate];
            if accept(&span[start..end]) {
                if end == span.len() {
                    if complete(chosen.len() + 1) {
                        chosen.push(candidate);
                        return Some(pieces(span, &ends, &chosen, width));
                    }
                } else {
                    chosen.push(candidate);
                    start = end + width;
                    candidate += 1;
                    descended = true;
                    break;
                }
            }
            candidate += 1;
        }

        if descended {
            continue;
        }

        let last = chosen.pop()?;
        start = chosen.last().map_or(0, |&prev| ends[prev] + width);
        candidate = last + 1;
    }
}

fn pieces<'a>(span: &'a str, ends: &[usize], chosen: &[usize], width: usize) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(chosen.len());
    let mut start = 0;
    for &index in chosen {
        out.push(&span[start..ends[index]]);
        start = ends[index] + width;
    }
    out
}

impl Template {
    /// Anchored pattern for the whole template. Each expansion's text is
    /// captured as `part<k>`, k counting expansions only.
    pub fn build_pattern(&self, hints: &ShapeHints) -> String {
        let mut pattern = String::from("^");
        let mut index = 0;
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => pattern.push_str(&regex::escape(text)),
                TemplatePart::Expansion(expansion) => {
                    pattern.push_str(&format!(
                        "(?P<part{}>{})",
                        index,
                        expansion.build_pattern(hints)
                    ));
                    index += 1;
                }
            }
        }
        pattern.push('$');
        pattern
    }

    /// Recover the bindings that could have produced `text`.
    ///
    /// A variable used by several expansions must capture the same value in
    /// each, except that a prefixed occurrence only has to agree with the
    /// start of the full value. `None` means the text was not produced by
    /// this template.
    pub fn match_uri(&self, text: &str, hints: &ShapeHints) -> Result<Option<TemplateMatch>> {
        let regex = Regex::new(&self.build_pattern(hints))?;
        let Some(captures) = regex.captures(text) else {
            debug!(template = %self, text, "text not produced by template");
            return Ok(None);
        };

        let mut unifier = Unifier::default();
        for (index, expansion) in self.expansions().enumerate() {
            let slice = captures
                .name(&format!("part{}", index))
                .map_or("", |m| m.as_str());

            let Some(matched) = expansion.match_text(slice, hints)? else {
                return Ok(None);
            };

            for (var, value) in matched {
                if !unifier.add(&var, value) {
                    debug!(template = %self, variable = %var.name, "conflicting values for variable");
                    return Ok(None);
                }
            }
        }

        Ok(Some(unifier.values))
    }

    /// Match `candidate` relative to `base`. The remainder after the base
    /// URL is tried as-is and, when the base ends in `/`, with that slash
    /// kept, so both `users/{id}` and `/users/{id}` style templates work.
    pub fn match_url(
        &self,
        base: &Url,
        candidate: &Url,
        hints: &ShapeHints,
    ) -> Result<Option<TemplateMatch>> {
        let Some(rest) = candidate.as_str().strip_prefix(base.as_str()) else {
            return Ok(None);
        };

        if let Some(found) = self.match_uri(rest, hints)? {
            return Ok(Some(found));
        }

        if base.as_str().ends_with('/') {
            return self.match_uri(&format!("/{}", rest), hints);
        }

        Ok(None)
    }
}

#[derive(Default)]
struct Unifier {
    values: TemplateMatch,
    /// names whose stored value came from a prefixed occurrence
    truncated: HashSet<String>,
}

impl Unifier {
    fn add(&mut self, var: &VariableReference, value: MatchedValue) -> bool {
        let is_truncated = var.prefix.is_some();

        let mut entry = match self.values.entry(var.name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                if is_truncated {
                    self.truncated.insert(var.name.clone());
                }
                return true;
            }
            Entry::Occupied(entry) => entry,
        };

        if entry.get().same_as(&value) {
            if !is_truncated {
                self.truncated.remove(&var.name);
            }
            return true;
        }

        let (MatchedValue::Scalar(old), MatchedValue::Scalar(new)) = (entry.get(), &value) else {
            return false;
        };

        if is_truncated && old.starts_with(new.as_str()) {
            return true;
        }

        if self.truncated.contains(&var.name) && new.starts_with(old.as_str()) {
            entry.insert(value);
            if !is_truncated {
                self.truncated.remove(&var.name);
            }
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::Operator;

    fn scalar(text: &str) -> MatchedValue {
        MatchedValue::Scalar(text.to_string())
    }

    fn list(items: &[&str]) -> MatchedValue {
        MatchedValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn map(entries: &[(&str, &str)]) -> MatchedValue {
        MatchedValue::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn match_one(op: Operator, var: VariableReference, text: &str, hints: &ShapeHints) -> Option<MatchedValue> {
        let expansion = Expansion::new(op, vec![var]).unwrap();
        let mut matched = expansion.match_text(text, hints).unwrap()?;
        matched.pop().map(|(_, value)| value)
    }

    #[test]
    fn test_split_shortest_prefers_every_separator() {
        let pieces = split_shortest("a,b,,c", ',', |_| true, |_| true).unwrap();
        assert_eq!(pieces, vec!["a", "b", "", "c"]);

        let pieces = split_shortest("", ',', |_| true, |_| true).unwrap();
        assert_eq!(pieces, vec![""]);
    }

    #[test]
    fn test_split_shortest_backtracks_for_even_count() {
        let pieces = split_shortest("a,b,c", ',', |_| true, |count| count % 2 == 0).unwrap();
        assert_eq!(pieces, vec!["a", "b,c"]);
    }

    #[test]
    fn test_split_shortest_skips_rejected_pieces() {
        let pieces = split_shortest("a,b=1,c=2", ',', |p| p.contains('='), |_| true).unwrap();
        assert_eq!(pieces, vec!["a,b=1", "c=2"]);
        assert!(split_shortest("a,b", ',', |p| p.contains('='), |_| true).is_none());
    }

    #[test]
    fn test_strip_name() {
        assert_eq!(strip_name("x=1", "x"), Some("1"));
        assert_eq!(strip_name("x", "x"), Some(""));
        assert_eq!(strip_name("x=", "x"), Some(""));
        assert_eq!(strip_name("xy=1", "x"), None);
        assert_eq!(strip_name("y=1", "x"), None);
    }

    #[test]
    fn test_unhinted_single_value_is_scalar() {
        let value = match_one(Operator::Simple, VariableReference::new("x"), "abc", &ShapeHints::default());
        assert_eq!(value, Some(scalar("abc")));
    }

    #[test]
    fn test_unhinted_comma_run_is_list() {
        let value = match_one(Operator::Simple, VariableReference::new("x"), "a,b,c", &ShapeHints::default());
        assert_eq!(value, Some(list(&["a", "b", "c"])));
    }

    #[test]
    fn test_list_hint_forces_list_of_one() {
        let hints = ShapeHints::with_lists(["x"]).unwrap();
        let value = match_one(Operator::Simple, VariableReference::new("x"), "abc", &hints);
        assert_eq!(value, Some(list(&["abc"])));
    }

    #[test]
    fn test_map_hint_pairs_values() {
        let hints = ShapeHints::with_maps(["x"]).unwrap();
        let value = match_one(Operator::Simple, VariableReference::new("x"), "a,1,b,2", &hints);
        assert_eq!(value, Some(map(&[("a", "1"), ("b", "2")])));

        // an odd number of items cannot be a map
        let value = match_one(Operator::Simple, VariableReference::new("x"), "a,1,b", &hints);
        assert_eq!(value, None);
    }

    #[test]
    fn test_exploded_map_with_equals_is_map_without_hints() {
        let var = VariableReference::new("x").with_composite(true);
        let value = match_one(Operator::Simple, var, "a=1,b=2", &ShapeHints::default());
        assert_eq!(value, Some(map(&[("a", "1"), ("b", "2")])));
    }

    #[test]
    fn test_duplicate_map_keys_do_not_match() {
        let var = VariableReference::new("x").with_composite(true);
        let hints = ShapeHints::with_maps(["x"]).unwrap();
        assert_eq!(match_one(Operator::Simple, var, "a=1,a=2", &hints), None);
    }

    #[test]
    fn test_values_are_decoded() {
        let value = match_one(
            Operator::Simple,
            VariableReference::new("hello"),
            "Hello%20World%21",
            &ShapeHints::default(),
        );
        assert_eq!(value, Some(scalar("Hello World!")));
    }

    #[test]
    fn test_prefix_variable_never_list() {
        let var = VariableReference::new("x").with_prefix(3);
        let hints = ShapeHints::default();
        assert_eq!(match_one(Operator::Simple, var.clone(), "abc", &hints), Some(scalar("abc")));
        assert_eq!(match_one(Operator::Simple, var, "abcd", &hints), None);
    }

    #[test]
    fn test_prefix_counts_decoded_characters() {
        let hints = ShapeHints::default();
        let one = VariableReference::new("x").with_prefix(1);
        let two = VariableReference::new("x").with_prefix(2);

        assert_eq!(match_one(Operator::Simple, one.clone(), "%C3%A9", &hints), Some(scalar("é")));
        assert_eq!(match_one(Operator::Simple, one, "%C3%A9a", &hints), None);
        assert_eq!(match_one(Operator::Simple, two.clone(), "a%20", &hints), Some(scalar("a ")));
        assert_eq!(match_one(Operator::Query, two, "?x=%E2%82%AC%E2%82%AC", &hints), Some(scalar("€€")));
    }

    #[test]
    fn test_prefixed_multibyte_value_round_trips() {
        let template = Template::parse("{x:1}").unwrap();
        let mut bindings = crate::domain::value::Bindings::new();
        bindings.insert("x".to_string(), crate::domain::value::Value::from("éte"));

        let rendered = template.expand(&bindings);
        assert_eq!(rendered, "%C3%A9");

        let matched = template.match_uri(&rendered, &ShapeHints::default()).unwrap().unwrap();
        assert_eq!(matched["x"], scalar("é"));
    }

    #[test]
    fn test_path_parameter_bare_name_is_empty_string() {
        let value = match_one(
            Operator::PathParameter,
            VariableReference::new("empty"),
            ";empty",
            &ShapeHints::default(),
        );
        assert_eq!(value, Some(scalar("")));
    }

    #[test]
    fn test_query_exploded_list_repeats_name() {
        let var = VariableReference::new("list").with_composite(true);
        let hints = ShapeHints::with_lists(["list"]).unwrap();
        let value = match_one(Operator::Query, var, "?list=red&list=green&list=blue", &hints);
        assert_eq!(value, Some(list(&["red", "green", "blue"])));
    }

    #[test]
    fn test_path_parameter_exploded_map_bare_key() {
        let var = VariableReference::new("keys").with_composite(true);
        let hints = ShapeHints::with_maps(["keys"]).unwrap();
        let value = match_one(Operator::PathParameter, var, ";a=1;flag;b=2", &hints);
        assert_eq!(value, Some(map(&[("a", "1"), ("flag", ""), ("b", "2")])));
    }

    #[test]
    fn test_template_unifies_repeated_variable() {
        let template = Template::parse("/{user}/profile{?user}").unwrap();
        let hints = ShapeHints::default();

        let matched = template.match_uri("/fred/profile?user=fred", &hints).unwrap().unwrap();
        assert_eq!(matched["user"], scalar("fred"));

        assert!(template.match_uri("/fred/profile?user=wilma", &hints).unwrap().is_none());
    }

    #[test]
    fn test_template_prefix_agrees_with_full_value() {
        let template = Template::parse("{x:3}/{x}").unwrap();
        let hints = ShapeHints::default();

        let matched = template.match_uri("val/value", &hints).unwrap().unwrap();
        assert_eq!(matched["x"], scalar("value"));

        assert!(template.match_uri("abc/value", &hints).unwrap().is_none());
    }

    #[test]
    fn test_match_url_relative_to_base() {
        let template = Template::parse("/users/{id}").unwrap();
        let base = Url::parse("https://example.com/").unwrap();
        let candidate = Url::parse("https://example.com/users/42").unwrap();

        let matched = template
            .match_url(&base, &candidate, &ShapeHints::default())
            .unwrap()
            .unwrap();
        assert_eq!(matched["id"], scalar("42"));

        let elsewhere = Url::parse("https://other.example/users/42").unwrap();
        assert!(template
            .match_url(&base, &elsewhere, &ShapeHints::default())
            .unwrap()
            .is_none());
    }
}
