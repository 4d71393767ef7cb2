// Template module for RFC 6570 URI templates
//
// This module provides parsing, expansion, and the inverse operation:
// matching URI text back to the variable values that could have produced it.

mod ast;
pub mod charset;
mod expansion;
mod matcher;
mod operator;
mod parser;
mod pattern;
mod resolver;

pub use ast::{Template, TemplatePart, VariableReference};
pub use charset::{RESERVED_PATTERN, UNRESERVED_PATTERN};
pub use expansion::{Expansion, ExpansionMatch};
pub use matcher::TemplateMatch;
pub use operator::{Operator, OperatorConfig, PatternShape};
pub use parser::TemplateParser;
pub use resolver::TemplateResolver;
