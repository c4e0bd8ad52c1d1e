//! Schema validation with detailed error reporting

use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

use crate::schema::registry::{DocumentKind, SchemaRegistry};

/// Validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed: {summary}")]
#[diagnostic(code(heatlab::schema::validation_error))]
pub struct ValidationError {
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Schema validator with compiled schemas
pub struct Validator {
    compiled: HashMap<DocumentKind, JsonValidator>,
}

impl Validator {
    /// Compile every schema in the registry
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();

        for kind in DocumentKind::all() {
            if let Some(schema_str) = registry.get(*kind) {
                if let Ok(schema_json) = serde_json::from_str::<JsonValue>(&schema_str) {
                    if let Ok(compiled_schema) = validator_for(&schema_json) {
                        compiled.insert(*kind, compiled_schema);
                    }
                }
            }
        }

        Self { compiled }
    }

    /// Validate YAML content, detecting the document kind when none is given.
    ///
    /// Returns the kind the content was validated as.
    pub fn validate(
        &self,
        content: &str,
        filename: &str,
        kind: Option<DocumentKind>,
    ) -> Result<DocumentKind, ValidationError> {
        let yaml_value: serde_yml::Value = match serde_yml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                let span = find_error_span(content, e.location());
                let violation = SchemaViolation::new(
                    format!("YAML parse error: {}", e),
                    "invalid YAML".to_string(),
                    span,
                    Some("Check YAML syntax - proper indentation, colons, quotes".to_string()),
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let json_value: JsonValue = match serde_json::to_value(&yaml_value) {
            Ok(v) => v,
            Err(e) => {
                let violation = SchemaViolation::new(
                    format!("Failed to convert YAML to JSON: {}", e),
                    "conversion error".to_string(),
                    (0, content.len()).into(),
                    None,
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let kind = match kind.or_else(|| DocumentKind::detect(&json_value)) {
            Some(k) => k,
            None => {
                let violation = SchemaViolation::new(
                    "Document is neither a lesson (mapping) nor a question bank (list)".to_string(),
                    "unexpected document".to_string(),
                    first_line_span(content),
                    None,
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let schema = match self.compiled.get(&kind) {
            Some(s) => s,
            None => return Ok(kind),
        };

        let violations: Vec<SchemaViolation> = schema
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(kind)
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&SchemaRegistry)
    }
}

/// Convert a JSON Schema validation error to our violation format
fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let path = error.instance_path.to_string();
    let location = if path.is_empty() {
        "document root".to_string()
    } else {
        format!("'{}'", path)
    };

    let (message, hint, help) = match &error.kind {
        jsonschema::error::ValidationErrorKind::Required { property } => {
            let prop_str = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            (
                format!("Missing required field: {} at {}", prop_str, location),
                "required field missing".to_string(),
                Some(format!("Add the '{}' field to your file", prop_str)),
            )
        }
        jsonschema::error::ValidationErrorKind::AdditionalProperties { unexpected } => (
            format!("Unknown field(s) at {}: {}", location, unexpected.join(", ")),
            "unknown field".to_string(),
            Some(if unexpected.len() == 1 {
                format!("Remove the '{}' field or check spelling", unexpected[0])
            } else {
                "Remove unknown fields or check spelling".to_string()
            }),
        ),
        _ => (
            format!("Validation error at {}: {}", location, error),
            "validation error".to_string(),
            None,
        ),
    };

    SchemaViolation::new(message, hint, find_path_span(content, &path), help)
}

fn first_line_span(content: &str) -> SourceSpan {
    let len = content.find('\n').unwrap_or(content.len()).max(1);
    (0, len).into()
}

/// Find the span (byte offset, length) for an error location
fn find_error_span(content: &str, location: Option<serde_yml::Location>) -> SourceSpan {
    let Some(loc) = location else {
        return first_line_span(content);
    };
    let line = loc.line().saturating_sub(1);
    let column = loc.column().saturating_sub(1);

    // Columns count characters, not bytes
    let mut offset = 0;
    for (i, line_content) in content.split_inclusive('\n').enumerate() {
        if i == line {
            let text = line_content.trim_end_matches(['\n', '\r']);
            offset += text
                .char_indices()
                .nth(column)
                .map(|(b, _)| b)
                .unwrap_or(text.len());
            break;
        }
        offset += line_content.len();
    }
    let offset = offset.min(content.len());

    let rest = &content[offset..];
    let len = rest.find('\n').unwrap_or(rest.len()).max(1);
    (offset, len).into()
}

/// Find the span for a JSON path in YAML content
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    // Array indices point at their parent key
    let key = json_path
        .split('/')
        .filter(|s| !s.is_empty() && s.parse::<usize>().is_err())
        .last();

    key.and_then(|k| find_key_span(content, k))
        .unwrap_or_else(|| first_line_span(content))
}

/// Find the span of a `key:` at the start of a line (ignoring indentation and list dashes)
fn find_key_span(content: &str, key: &str) -> Option<SourceSpan> {
    let pattern = format!("{}:", key);
    let mut offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start().trim_start_matches("- ");
        if trimmed.starts_with(&pattern) {
            let start = offset + (line.len() - trimmed.len());
            return Some((start, key.len()).into());
        }
        offset += line.len() + 1;
    }
    None
}
