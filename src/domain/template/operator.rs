// Expansion operators and the parameters that distinguish them

use std::fmt;

use super::charset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `{x}`
    Simple,
    /// `{+x}`
    Reserved,
    /// `{#x}`
    Fragment,
    /// `{.x}`
    Label,
    /// `{/x}`
    PathSegment,
    /// `{;x}`
    PathParameter,
    /// `{?x}`
    Query,
    /// `{&x}`
    QueryContinuation,
}

/// How the defined variables of one expansion are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternShape {
    /// `first` once, then `separator` between defined variables
    Subsequence,
    /// every defined variable introduced by its own `separator`
    Chain,
}

/// Rendering and matching parameters of one operator (RFC 6570 Appendix A)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorConfig {
    pub first: &'static str,
    pub separator: char,
    pub named: bool,
    pub if_empty: &'static str,
    pub allow_reserved: bool,
}

impl OperatorConfig {
    pub fn shape(&self) -> PatternShape {
        let mut first = self.first.chars();
        if first.next() == Some(self.separator) && first.next().is_none() {
            PatternShape::Chain
        } else {
            PatternShape::Subsequence
        }
    }

    /// Between the values of one list or map variable
    pub fn item_separator(&self, composite: bool) -> char {
        if composite {
            self.separator
        } else {
            ','
        }
    }

    /// Between a map key and its value
    pub fn key_value_separator(&self, composite: bool) -> char {
        if composite {
            '='
        } else {
            ','
        }
    }

    /// An exploded map entry with an empty value may render as a bare key
    pub fn allows_bare_key(&self) -> bool {
        self.named && self.if_empty.is_empty()
    }

    /// Values are matched shortest-first when separators can also occur
    /// inside them.
    pub fn lazy(&self) -> bool {
        self.allow_reserved || charset::is_unreserved(self.separator)
    }
}

impl Operator {
    pub fn from_sigil(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::PathSegment),
            ';' => Some(Operator::PathParameter),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    pub fn sigil(self) -> Option<char> {
        match self {
            Operator::Simple => None,
            Operator::Reserved => Some('+'),
            Operator::Fragment => Some('#'),
            Operator::Label => Some('.'),
            Operator::PathSegment => Some('/'),
            Operator::PathParameter => Some(';'),
            Operator::Query => Some('?'),
            Operator::QueryContinuation => Some('&'),
        }
    }

    pub fn config(self) -> OperatorConfig {
        let (first, separator, named, if_empty, allow_reserved) = match self {
            Operator::Simple => ("", ',', false, "", false),
            Operator::Reserved => ("", ',', false, "", true),
            Operator::Fragment => ("#", ',', false, "", true),
            Operator::Label => (".", '.', false, "", false),
            Operator::PathSegment => ("/", '/', false, "", false),
            Operator::PathParameter => (";", ';', true, "", false),
            Operator::Query => ("?", '&', true, "=", false),
            Operator::QueryContinuation => ("&", '&', true, "=", false),
        };

        OperatorConfig {
            first,
            separator,
            named,
            if_empty,
            allow_reserved,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sigil() {
            Some(ch) => write!(f, "{}", ch),
            None => Ok(()),
        }
    }
}
