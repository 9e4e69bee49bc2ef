//! Question index: read-only lookup from question id to question metadata.
//!
//! The catalog itself is external data. `InMemoryQuestionIndex` loads it once
//! from JSON and serves lookups without further I/O.

use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuestionRecord {
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub method_sets: Vec<serde_json::Value>,
}

impl QuestionRecord {
    pub fn new(question_text: impl Into<String>) -> Self {
        Self {
            question_text: question_text.into(),
            method_sets: Vec::new(),
        }
    }

    pub fn with_method_sets(mut self, method_sets: Vec<serde_json::Value>) -> Self {
        self.method_sets = method_sets;
        self
    }
}

/// Lookup capability consumed by the execution strategies.
pub trait QuestionIndex: Send + Sync {
    fn lookup(&self, question_id: &str) -> Option<QuestionRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryQuestionIndex {
    questions: HashMap<String, QuestionRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Keyed(HashMap<String, QuestionRecord>),
    Listed(Vec<ListedQuestion>),
}

#[derive(Deserialize)]
struct ListedQuestion {
    question_id: String,
    #[serde(flatten)]
    record: QuestionRecord,
}

impl InMemoryQuestionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question_id: impl Into<String>, record: QuestionRecord) {
        self.questions.insert(question_id.into(), record);
    }

    /// Parse a catalog from JSON.
    ///
    /// Accepts either an object keyed by question id or an array of records
    /// each carrying a `question_id` field.
    pub fn from_json_str(raw: &str) -> Result<Self, ExecutionError> {
        let parsed: CatalogFile = serde_json::from_str(raw).map_err(|e| {
            ExecutionError::Config(format!("Failed to parse question catalog: {}", e))
        })?;
        let questions = match parsed {
            CatalogFile::Keyed(map) => map,
            CatalogFile::Listed(list) => list
                .into_iter()
                .map(|entry| (entry.question_id, entry.record))
                .collect(),
        };
        Ok(Self { questions })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ExecutionError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionIndex for InMemoryQuestionIndex {
    fn lookup(&self, question_id: &str) -> Option<QuestionRecord> {
        self.questions.get(question_id).cloned()
    }
}

impl FromIterator<(String, QuestionRecord)> for InMemoryQuestionIndex {
    fn from_iter<I: IntoIterator<Item = (String, QuestionRecord)>>(iter: I) -> Self {
        Self {
            questions: iter.into_iter().collect(),
        }
    }
}
