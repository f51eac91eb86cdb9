//! Task type registry: built-in types plus user-defined ones in
//! `.taskraffle/types.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{lock_path_for, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;

pub const DEFAULT_TASK_TYPES: [&str; 4] = ["General", "Work", "Personal", "Shopping"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TypesFile {
    #[serde(default)]
    types: Vec<TaskTypeEntry>,
}

/// Built-in and stored type names merged: de-duplicated, sorted
pub fn merge_types<'a, I>(custom: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut names: Vec<String> = DEFAULT_TASK_TYPES
        .iter()
        .copied()
        .chain(custom)
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

#[derive(Debug, Clone)]
pub struct TaskTypeRegistry {
    storage: Storage,
}

impl TaskTypeRegistry {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// User-defined entries in insertion order
    pub fn custom(&self) -> Result<Vec<TaskTypeEntry>> {
        Ok(self.load()?.types)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let custom = self.custom()?;
        Ok(merge_types(custom.iter().map(|entry| entry.name.as_str())))
    }

    /// Register `name`; rejects names already known, ignoring case
    pub fn add(&self, name: &str) -> Result<TaskTypeEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("type name is required".to_string()));
        }
        self.storage.ensure_initialized()?;

        let path = self.storage.types_file();
        let _lock = FileLock::acquire(lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut file = self.load()?;
        let known = DEFAULT_TASK_TYPES
            .iter()
            .copied()
            .chain(file.types.iter().map(|entry| entry.name.as_str()));
        let folded = name.to_lowercase();
        if let Some(existing) = known.into_iter().find(|known| known.to_lowercase() == folded) {
            return Err(Error::TaskTypeExists(existing.to_string()));
        }

        let entry = TaskTypeEntry {
            name: name.to_string(),
            created_at: Utc::now(),
        };
        file.types.push(entry.clone());
        self.storage.write_json(&path, &file)?;
        tracing::debug!(name = %entry.name, "task type added");
        Ok(entry)
    }

    fn load(&self) -> Result<TypesFile> {
        let path = self.storage.types_file();
        if !path.exists() {
            return Ok(TypesFile::default());
        }
        self.storage.read_json(&path)
    }
}
