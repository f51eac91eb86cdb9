//! Storage layer for taskraffle
//!
//! All state lives under a single root directory:
//!
//! ```text
//! <root>/
//!   .taskraffle.toml            # Configuration (optional)
//!   .taskraffle/                # Store directory
//!     tasks.jsonl               # Append-only task events
//!     tasks.snapshot.json       # Materialised task list
//!     types.json                # User-defined task types
//!     *.lock                    # Advisory locks
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock;

/// Name of the store directory under the root
pub const STORE_DIR: &str = ".taskraffle";

/// Name of the configuration file under the root
pub const CONFIG_FILE: &str = ".taskraffle.toml";

/// Storage manager for one task root
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve the root: an explicit path wins, otherwise the nearest
    /// ancestor of `start` holding a store directory, otherwise `start`.
    pub fn discover(explicit: Option<&Path>, start: &Path) -> Self {
        if let Some(root) = explicit {
            return Self::new(root.to_path_buf());
        }
        let found = start
            .ancestors()
            .find(|dir| dir.join(STORE_DIR).is_dir())
            .unwrap_or(start);
        Self::new(found.to_path_buf())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `.taskraffle/` directory
    pub fn store_dir(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn tasks_log(&self) -> PathBuf {
        self.store_dir().join("tasks.jsonl")
    }

    pub fn tasks_snapshot(&self) -> PathBuf {
        self.store_dir().join("tasks.snapshot.json")
    }

    pub fn types_file(&self) -> PathBuf {
        self.store_dir().join("types.json")
    }

    /// Create the store directory and an empty event log
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.store_dir())?;
        let log = self.tasks_log();
        if !log.exists() {
            File::create(&log)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.store_dir().is_dir()
    }

    /// Fail with `StoreNotInitialized` unless `init` has run
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::StoreNotInitialized(self.root.clone()))
        }
    }

    /// Write pretty JSON atomically (temp file + rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        lock::write_atomic(path, serde_json::to_string_pretty(data)?.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Append one record as a JSON line.
    ///
    /// Not atomic on its own; callers hold the log's [`lock::FileLock`].
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut log = OpenOptions::new().create(true).append(true).open(path)?;
        log.write_all(&line)?;
        log.sync_data()?;
        Ok(())
    }

    /// Read every non-blank line of a JSONL file; a missing file is empty
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        let log = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(log).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }
}
