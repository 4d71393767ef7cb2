// File formats a bindings document can be written in

use anyhow::Result;
use std::path::Path;

use super::bindings_file::BindingsFile;

/// Strategy trait for bindings file formats
pub trait BindingsFormat: Send + Sync {
    fn serialize(&self, file: &BindingsFile) -> Result<String>;
    fn deserialize(&self, content: &str) -> Result<BindingsFile>;
    fn file_extensions(&self) -> &'static [&'static str];
}

/// YAML format (default)
pub struct YamlFormat;

impl BindingsFormat for YamlFormat {
    fn serialize(&self, file: &BindingsFile) -> Result<String> {
        Ok(serde_yaml::to_string(file)?)
    }

    fn deserialize(&self, content: &str) -> Result<BindingsFile> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["yml", "yaml"]
    }
}

pub struct JsonFormat;

impl BindingsFormat for JsonFormat {
    fn serialize(&self, file: &BindingsFile) -> Result<String> {
        Ok(serde_json::to_string_pretty(file)?)
    }

    fn deserialize(&self, content: &str) -> Result<BindingsFile> {
        Ok(serde_json::from_str(content)?)
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["json"]
    }
}

/// Pick a format by file extension; anything unrecognized is read as YAML,
/// which also accepts JSON documents.
pub fn format_for_path(path: &Path) -> Box<dyn BindingsFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some(ext) if JsonFormat.file_extensions().contains(&ext) => Box::new(JsonFormat),
        _ => Box::new(YamlFormat),
    }
}

/// Pick a format by name (`json`, `yaml`, `yml`)
pub fn format_by_name(name: &str) -> Option<Box<dyn BindingsFormat>> {
    let name = name.to_ascii_lowercase();
    if JsonFormat.file_extensions().contains(&name.as_str()) {
        Some(Box::new(JsonFormat))
    } else if YamlFormat.file_extensions().contains(&name.as_str()) {
        Some(Box::new(YamlFormat))
    } else {
        None
    }
}
