//! Derived routing keys and per-question executor handles.
//!
//! Question ids of the form `<letters><digits>` map onto a 30-wide cycle of
//! `D{dimension}-Q{position}` keys (six dimensions of five questions), so
//! `Q031` routes exactly like `Q001`.

use crate::error::DerivationError;
use crate::executor::{ExecutorFactory, TaskExecutor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const CYCLE_WIDTH: u64 = 30;
const QUESTIONS_PER_DIMENSION: u64 = 5;

/// Compute the routing key for a question id. Pure; see `DerivationCache` for
/// the memoized form.
pub fn derive_key(question_id: &str) -> Result<String, DerivationError> {
    let number = parse_question_number(question_id)?;
    let slot = (number - 1) % CYCLE_WIDTH;
    let dimension = slot / QUESTIONS_PER_DIMENSION + 1;
    let position = slot % QUESTIONS_PER_DIMENSION + 1;
    Ok(format!("D{}-Q{}", dimension, position))
}

fn parse_question_number(question_id: &str) -> Result<u64, DerivationError> {
    let malformed = || DerivationError::MalformedQuestionId(question_id.to_string());

    let digits_start = question_id
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(malformed)?;
    let (prefix, digits) = question_id.split_at(digits_start);
    if prefix.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let number: u64 = digits.parse().map_err(|_| {
        DerivationError::QuestionNumberOutOfRange(question_id.to_string())
    })?;
    if number == 0 {
        return Err(DerivationError::QuestionNumberOutOfRange(
            question_id.to_string(),
        ));
    }
    Ok(number)
}

#[derive(Default)]
struct CacheEntry {
    derived_key: Option<String>,
    executor: Option<Arc<dyn TaskExecutor>>,
}

/// Memoized derived keys and executors, shared by every worker of a run.
///
/// Reads and writes both go through the one lock.
#[derive(Default)]
pub struct DerivationCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive_key(&self, question_id: &str) -> Result<String, DerivationError> {
        let mut entries = self.entries.lock();
        if let Some(key) = entries.get(question_id).and_then(|e| e.derived_key.clone()) {
            return Ok(key);
        }
        let key = derive_key(question_id)?;
        entries.entry(question_id.to_string()).or_default().derived_key = Some(key.clone());
        Ok(key)
    }

    /// Return the executor for `question_id`, building it with `factory` on
    /// first reference. Construction happens under the lock so a question never
    /// gets two executors.
    pub fn get_or_create_executor(
        &self,
        question_id: &str,
        factory: &dyn ExecutorFactory,
    ) -> anyhow::Result<Arc<dyn TaskExecutor>> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(question_id.to_string()).or_default();
        if let Some(executor) = &entry.executor {
            return Ok(Arc::clone(executor));
        }
        let derived_key = match &entry.derived_key {
            Some(key) => key.clone(),
            None => {
                let key = derive_key(question_id)?;
                entry.derived_key = Some(key.clone());
                key
            }
        };
        let executor = factory.create(question_id, &derived_key)?;
        entry.executor = Some(Arc::clone(&executor));
        Ok(executor)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every memoized key and executor.
    pub fn reset(&self) {
        self.entries.lock().clear();
    }
}
