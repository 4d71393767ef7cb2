// urimatch: RFC 6570 URI template expansion and matching

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;

pub use config::BindingsFile;
pub use domain::template::{TemplateParser, TemplateResolver};
pub use domain::{
    Bindings, Expansion, MatchedValue, Operator, ShapeHints, Template, TemplateMatch, Value,
    VariableReference,
};
pub use error::{Result, TemplateError};
