//! Research-paper records as they arrive in the JSONL corpus

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Malformed JSON record: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Record is not a JSON object")]
    NotAnObject,
}

/// A paper record. Immutable once parsed; only the chunker reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub sections: Vec<String>,
    pub year: Option<String>,
    pub authors: Vec<String>,
}

impl Document {
    /// Parse one corpus line
    ///
    /// Field shapes are taken leniently: ids and years may be numbers,
    /// sections may be plain strings or objects carrying `text`/`content`.
    pub fn from_json_line(line: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(line)?;
        let record = value.as_object().ok_or(DocumentError::NotAnObject)?;
        Ok(Self::from_record(record))
    }

    fn from_record(record: &Map<String, Value>) -> Self {
        let id = record
            .get("paper_id")
            .or_else(|| record.get("id"))
            .and_then(scalar_text);

        let sections = record
            .get("sections")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(section_text).collect())
            .unwrap_or_default();

        let authors = record
            .get("authors")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|a| match a {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            title: string_field(record, "title"),
            abstract_text: string_field(record, "abstract"),
            sections,
            year: record.get("year").and_then(scalar_text),
            authors,
        }
    }

    /// Title, abstract and every section joined by single spaces, trimmed
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        text.push_str(self.title.as_deref().unwrap_or(""));
        text.push(' ');
        text.push_str(self.abstract_text.as_deref().unwrap_or(""));
        text.push(' ');
        for section in &self.sections {
            text.push_str(section);
            text.push(' ');
        }
        text.trim().to_string()
    }
}

fn string_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn section_text(section: &Value) -> String {
    match section {
        Value::String(s) => s.clone(),
        Value::Object(fields) => ["text", "content"]
            .iter()
            .filter_map(|key| fields.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| section.to_string()),
        other => other.to_string(),
    }
}
