//! taskraffle - tasks with a weighted raffle
//!
//! This library provides the core functionality for the taskraffle CLI:
//! a persistent task list and a seeded, priority-weighted raffle that picks
//! one task from it.
//!
//! # Core Concepts
//!
//! - **Tasks**: title, description, priority, type and completion state
//! - **Task store**: append-only event log with a snapshot, change
//!   subscriptions and a file watcher
//! - **Raffle**: deterministic weighted selection for a seed and instant
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskraffle.toml`
//! - `error`: Error types and result aliases
//! - `events`: JSONL event output
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON envelope output
//! - `query`: Search, filter, sort and stats
//! - `raffle`: Weighted random selection
//! - `storage`: Store layout and file helpers
//! - `store`: `TaskStore` trait and implementations
//! - `task`: Task model and event replay
//! - `task_types`: Built-in and custom task types

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod query;
pub mod raffle;
pub mod storage;
pub mod store;
pub mod task;
pub mod task_types;

pub use error::{Error, Result};
pub use raffle::{select, RaffleEntry, SeedToken, Selection};
pub use store::{FileTaskStore, MemoryTaskStore, Subscription, TaskStore};
pub use task::{Priority, Task, TaskDraft, TaskPatch};
