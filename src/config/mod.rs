// Configuration: bindings and shape hints loaded from YAML or JSON files

pub mod bindings_file;
pub mod format;

pub use bindings_file::{parse_assignment, BindingsFile, HintSettings};
pub use format::{format_by_name, format_for_path, BindingsFormat, JsonFormat, YamlFormat};
