use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).with_context(|| "failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).with_context(|| "failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => contents
            .parse::<toml::Value>()
            .with_context(|| "failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Parse `contents`, trying `preferred` first and then every other format
/// compiled into this build.
pub fn parse_document_any(contents: &str, preferred: DocumentFormat) -> Result<Value> {
    let primary = match parse_document_str(contents, preferred) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for candidate in DocumentFormat::available_formats() {
        if candidate == preferred {
            continue;
        }
        if let Ok(value) = parse_document_str(contents, candidate) {
            return Ok(value);
        }
    }
    Err(anyhow!(
        "tried {} (first error: {primary:#})",
        format_list()
    ))
}

/// Read and parse a document, using its extension as the format hint.
pub fn load_document(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read file {}", path.display()))?;
    let format = DocumentFormat::from_path(path).unwrap_or_default();
    parse_document_any(&contents, format)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn format_list() -> String {
    DocumentFormat::available_formats()
        .into_iter()
        .map(|fmt| fmt.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
