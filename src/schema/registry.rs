//! Embedded JSON schemas for lesson and question bank files

use rust_embed::Embed;
use serde_json::Value as JsonValue;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// The kinds of YAML document heatlab reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DocumentKind {
    /// An interactive plot description
    Lesson,
    /// A list of quiz questions
    Bank,
}

impl DocumentKind {
    pub fn all() -> &'static [DocumentKind] {
        &[DocumentKind::Lesson, DocumentKind::Bank]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Lesson => "lesson",
            DocumentKind::Bank => "bank",
        }
    }

    fn schema_file(self) -> &'static str {
        match self {
            DocumentKind::Lesson => "lesson.schema.json",
            DocumentKind::Bank => "bank.schema.json",
        }
    }

    /// Guess the kind from the document shape: banks are lists, lessons are maps
    pub fn detect(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Array(_) => Some(DocumentKind::Bank),
            JsonValue::Object(_) => Some(DocumentKind::Lesson),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lookup of schema text by document kind
#[derive(Debug, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn get(&self, kind: DocumentKind) -> Option<String> {
        EmbeddedSchemas::get(kind.schema_file())
            .and_then(|file| String::from_utf8(file.data.into_owned()).ok())
    }
}
