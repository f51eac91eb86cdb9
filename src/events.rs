//! JSONL event stream for scripts and integrations.
//!
//! Enabled with `--events <path>` (or `--events -` for stdout). Each mutating
//! command and each raffle draw writes one line.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub const EVENT_SCHEMA_VERSION: &str = "taskraffle.event.v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `None` for a missing or blank flag
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim)? {
            "" => None,
            "-" => Some(Self::Stdout),
            path => Some(Self::File(PathBuf::from(path))),
        }
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            Self::Stdout => Ok(EventSink::new(io::stdout())),
            Self::File(path) => EventSink::append_to(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskTypeCreated,
    RaffleDrawn,
    /// Full list republished by `watch`
    TasksChanged,
}

/// One line of the stream
#[derive(Debug, Serialize)]
pub struct Event<T: Serialize> {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(event: EventKind, data: T) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            data,
        }
    }
}

pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Append to `path`, creating it if necessary
    pub fn append_to(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    /// Writes the event as one line and flushes
    pub fn emit<T: Serialize>(&mut self, event: &Event<T>) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Emit one event when a sink is configured
pub fn emit_event<T: Serialize>(
    sink: Option<&mut EventSink>,
    kind: EventKind,
    data: T,
) -> Result<()> {
    match sink {
        Some(sink) => sink.emit(&Event::new(kind, data)),
        None => Ok(()),
    }
}
