// Variable values: render input, match output, and the caller's shape hints

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Result, TemplateError};

/// A bound value, as handed to rendering
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Absent,
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl Value {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Undefined values (absent, empty list, empty map) render nothing,
    /// not even their separator. An empty string is defined.
    pub fn is_defined(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Scalar(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<(String, String)>> for Value {
    fn from(entries: Vec<(String, String)>) -> Self {
        Value::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Absent)
    }
}

/// Variable name to value
pub type Bindings = HashMap<String, Value>;

/// A value recovered by matching. Variables that did not capture are left out
/// of match results entirely, so there is no absent form here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedValue {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl MatchedValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            MatchedValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MatchedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, String)]> {
        match self {
            MatchedValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Map lookup by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Equality that ignores map entry order
    pub fn same_as(&self, other: &MatchedValue) -> bool {
        match (self, other) {
            (MatchedValue::Map(a), MatchedValue::Map(b)) => {
                a.len() == b.len() && a.iter().all(|entry| b.contains(entry))
            }
            _ => self == other,
        }
    }
}

impl From<MatchedValue> for Value {
    fn from(value: MatchedValue) -> Self {
        match value {
            MatchedValue::Scalar(s) => Value::Scalar(s),
            MatchedValue::List(items) => Value::List(items),
            MatchedValue::Map(entries) => Value::Map(entries),
        }
    }
}

/// Caller-declared list/map classification of variable names.
///
/// The same hints must be used when synthesizing a pattern and when
/// interpreting its captures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeHints {
    list: HashSet<String>,
    map: HashSet<String>,
}

impl ShapeHints {
    pub fn new<L, M>(list: L, map: M) -> Result<Self>
    where
        L: IntoIterator,
        L::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Ok(Self {
            list: collect_names(list, "listVariables")?,
            map: collect_names(map, "mapVariables")?,
        })
    }

    pub fn with_lists<I>(names: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(names, std::iter::empty::<String>())
    }

    pub fn with_maps<I>(names: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(std::iter::empty::<String>(), names)
    }

    pub fn is_list(&self, name: &str) -> bool {
        self.list.contains(name)
    }

    pub fn is_map(&self, name: &str) -> bool {
        self.map.contains(name)
    }
}

fn collect_names<I>(names: I, set: &str) -> Result<HashSet<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    names
        .into_iter()
        .map(Into::into)
        .map(|name| {
            if name.is_empty() {
                Err(TemplateError::invalid_argument(format!(
                    "{} contains an empty variable name",
                    set
                )))
            } else {
                Ok(name)
            }
        })
        .collect()
}

// Serde: values read naturally from YAML/JSON documents

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Absent => serializer.serialize_none(),
            Value::Scalar(s) => serializer.serialize_str(s),
            Value::List(items) => serialize_list(items, serializer),
            Value::Map(entries) => serialize_entries(entries, serializer),
        }
    }
}

fn serialize_list<S: Serializer>(
    items: &[String],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(item)?;
    }
    seq.end()
}

fn serialize_entries<S: Serializer>(
    entries: &[(String, String)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, a string, a list of strings, or a map of strings")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Absent)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Absent)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(ScalarText(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut entries = Vec::new();
        while let Some((ScalarText(key), ScalarText(value))) = map.next_entry()? {
            entries.push((key, value));
        }
        Ok(Value::Map(entries))
    }
}

/// Strings, numbers and booleans inside lists and maps all become text
struct ScalarText(String);

impl<'de> Deserialize<'de> for ScalarText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ScalarVisitor;

        impl<'de> Visitor<'de> for ScalarVisitor {
            type Value = ScalarText;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ScalarText, E> {
                Ok(ScalarText(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}
