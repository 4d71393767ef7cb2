// Domain model: templates and the values bound to their variables

pub mod template;
pub mod value;

pub use template::{Expansion, Operator, Template, TemplateMatch, VariableReference};
pub use value::{Bindings, MatchedValue, ShapeHints, Value};
