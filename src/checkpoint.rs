//! Checkpoint storage
//!
//! Durable record of which tasks of a plan have completed, one JSON file per plan:
//! `{dir}/{plan_id}.checkpoint.json`.
//!
//! Each record carries a BLAKE3 digest over the canonical serialization of its
//! other fields. A record whose digest does not match, whose bytes differ from
//! the canonical rendering of what they parse to, or that cannot be read or
//! parsed, is reported as `CheckpointError::Corruption` and never as "absent".
//!
//! Plan ids are stored under a filename-safe encoding: bytes outside
//! `[A-Za-z0-9._-]` become `%XX`, so `region/2024` lives in
//! `region%2F2024.checkpoint.json`.
//!
//! Writes are serialized by an in-process lock. Two processes saving the same
//! plan id concurrently are not coordinated.

use crate::error::CheckpointError;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const CHECKPOINT_SUFFIX: &str = ".checkpoint.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CheckpointRecord {
    pub plan_id: String,
    pub completed_tasks: BTreeSet<String>,
    pub timestamp: String,
    pub metadata: BTreeMap<String, Value>,
    pub checkpoint_hash: String,
}

impl CheckpointRecord {
    fn new(
        plan_id: &str,
        completed_tasks: BTreeSet<String>,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Self, CheckpointError> {
        let mut record = Self {
            plan_id: plan_id.to_string(),
            completed_tasks,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            metadata,
            checkpoint_hash: String::new(),
        };
        record.checkpoint_hash = record.compute_hash()?;
        Ok(record)
    }

    /// Hex BLAKE3 digest over every field except the hash itself.
    ///
    /// Object keys are emitted in sorted order and the task set is sorted, so
    /// equal records always hash identically.
    pub fn compute_hash(&self) -> Result<String, CheckpointError> {
        let canonical = json!({
            "completed_tasks": self.completed_tasks,
            "metadata": self.metadata,
            "plan_id": self.plan_id,
            "timestamp": self.timestamp,
        });
        let bytes = serde_json::to_vec(&canonical)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    pub fn verify(&self) -> Result<(), CheckpointError> {
        let actual = self.compute_hash()?;
        if actual != self.checkpoint_hash {
            return Err(CheckpointError::Corruption {
                plan_id: self.plan_id.clone(),
                reason: format!(
                    "hash mismatch: stored {}, computed {}",
                    self.checkpoint_hash, actual
                ),
            });
        }
        Ok(())
    }
}

/// File-backed checkpoint store
pub struct CheckpointStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| CheckpointError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the completed set for `plan_id`, replacing any earlier record.
    ///
    /// Uses write-to-temp then rename so a crash mid-write never leaves a
    /// truncated record behind.
    pub fn save(
        &self,
        plan_id: &str,
        completed_task_ids: &HashSet<String>,
        metadata: BTreeMap<String, Value>,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.checkpoint_path(plan_id)?;
        let completed: BTreeSet<String> = completed_task_ids.iter().cloned().collect();

        let _guard = self.write_lock.lock();
        let record = CheckpointRecord::new(plan_id, completed, metadata)?;
        let serialized = encode_record(&record)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &serialized).map_err(|source| CheckpointError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            CheckpointError::Io {
                path: path.clone(),
                source,
            }
        })?;

        debug!(
            plan_id,
            completed = record.completed_tasks.len(),
            path = %path.display(),
            "Checkpoint saved"
        );
        Ok(path)
    }

    /// Load and verify the completed set for `plan_id`.
    ///
    /// `Ok(None)` means no checkpoint exists.
    pub fn resume(&self, plan_id: &str) -> Result<Option<HashSet<String>>, CheckpointError> {
        let path = self.checkpoint_path(plan_id)?;
        let Some(bytes) = self.read_if_present(plan_id, &path)? else {
            return Ok(None);
        };

        let record: CheckpointRecord =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Corruption {
                plan_id: plan_id.to_string(),
                reason: format!("unparseable record: {}", e),
            })?;
        // Parse-equivalent edits (`2.0` -> `2e0`, escaped characters) survive the
        // hash, so the bytes must also be exactly what `save` would write.
        let canonical = encode_record(&record)?;
        if canonical != bytes {
            return Err(CheckpointError::Corruption {
                plan_id: plan_id.to_string(),
                reason: "record bytes differ from their canonical form".to_string(),
            });
        }
        if record.plan_id != plan_id {
            return Err(CheckpointError::Corruption {
                plan_id: plan_id.to_string(),
                reason: format!("record belongs to plan {}", record.plan_id),
            });
        }
        record.verify()?;

        Ok(Some(record.completed_tasks.into_iter().collect()))
    }

    /// Delete the record for `plan_id`. Returns whether one existed.
    pub fn clear(&self, plan_id: &str) -> Result<bool, CheckpointError> {
        let path = self.checkpoint_path(plan_id)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(plan_id, "Checkpoint cleared");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }

    /// Raw record for diagnostics. The hash is not checked.
    pub fn inspect(&self, plan_id: &str) -> Result<Option<Value>, CheckpointError> {
        let path = self.checkpoint_path(plan_id)?;
        let Some(bytes) = self.read_if_present(plan_id, &path)? else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Corruption {
            plan_id: plan_id.to_string(),
            reason: format!("unparseable record: {}", e),
        })?;
        Ok(Some(value))
    }

    /// Plan ids that currently have a checkpoint, sorted.
    pub fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CheckpointError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut plan_ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CheckpointError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(plan_id) = name
                .to_str()
                .and_then(|n| n.strip_suffix(CHECKPOINT_SUFFIX))
                .and_then(decode_plan_id)
            {
                plan_ids.push(plan_id);
            }
        }
        plan_ids.sort();
        Ok(plan_ids)
    }

    /// Filesystem location of the record for `plan_id`. Any non-blank id maps
    /// to a single file directly inside the store directory.
    pub fn checkpoint_path(&self, plan_id: &str) -> Result<PathBuf, CheckpointError> {
        if plan_id.trim().is_empty() {
            return Err(CheckpointError::InvalidPlanId(plan_id.to_string()));
        }
        Ok(self
            .dir
            .join(format!("{}{}", encode_plan_id(plan_id), CHECKPOINT_SUFFIX)))
    }

    fn read_if_present(&self, plan_id: &str, path: &Path) -> Result<Option<Vec<u8>>, CheckpointError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::Corruption {
                plan_id: plan_id.to_string(),
                reason: format!("unreadable record at {:?}: {}", path, e),
            }),
        }
    }
}

fn encode_record(record: &CheckpointRecord) -> Result<Vec<u8>, CheckpointError> {
    serde_json::to_vec_pretty(record).map_err(|e| CheckpointError::Serialization(e.to_string()))
}

fn is_filename_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Percent-encode every byte outside `[A-Za-z0-9._-]`. A leading `.` is also
/// encoded so no id maps to a hidden file or to `.`/`..`.
fn encode_plan_id(plan_id: &str) -> String {
    let mut encoded = String::with_capacity(plan_id.len());
    for (i, byte) in plan_id.bytes().enumerate() {
        if is_filename_safe(byte) && !(i == 0 && byte == b'.') {
            encoded.push(byte as char);
        } else {
            encoded.push('%');
            encoded.push_str(&hex::encode_upper([byte]));
        }
    }
    encoded
}

fn decode_plan_id(encoded: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut rest = encoded.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'%' {
            let digits = tail.get(..2)?;
            bytes.extend(hex::decode(digits).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}
