//! Command-line interface for taskraffle
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group lives in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::events::{emit_event, EventDestination, EventKind, EventSink};
use crate::output::OutputOptions;
use crate::query::{Filter, SortBy, TaskQuery};
use crate::storage::Storage;
use crate::store::FileTaskStore;

mod init;
mod raffle;
mod task;
mod types;
mod watch;

/// taskraffle - tasks with a weighted raffle
///
/// Keep a task list and let a seeded, priority-weighted raffle pick what to
/// work on next.
#[derive(Parser, Debug)]
#[command(name = "taskraffle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding `.taskraffle/` (defaults to the nearest ancestor)
    #[arg(long, global = true, env = "TASKRAFFLE_ROOT")]
    pub root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the task store and a default `.taskraffle.toml`
    Init,

    /// Add a task
    Add {
        title: String,

        #[arg(short, long)]
        description: String,

        /// low, medium or high (default from config)
        #[arg(short, long)]
        priority: Option<String>,

        /// Task type (default from config)
        #[arg(short = 't', long = "type")]
        task_type: Option<String>,

        /// Create the task already completed
        #[arg(long)]
        completed: bool,
    },

    /// List tasks
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Show one task
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short = 't', long = "type")]
        task_type: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },

    /// Flip a task between pending and completed
    Toggle { id: String },

    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: String },

    /// Task counts
    Stats,

    /// Task type management
    #[command(subcommand)]
    Types(TypesCommands),

    /// Draw a task at random, weighted by priority, status and age
    Raffle {
        #[command(flatten)]
        query: QueryArgs,

        /// Seed text (default: `<millis>-<random>`)
        #[arg(long)]
        seed: Option<String>,

        /// Evaluation instant, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,

        /// Pause before revealing the winner (default from config)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Include per-task weights
        #[arg(long)]
        explain: bool,
    },

    /// Print the task list whenever it changes
    Watch {
        /// Exit after this many updates
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TypesCommands {
    /// List built-in and custom types
    #[command(alias = "ls")]
    List,

    /// Register a custom type
    Add { name: String },
}

/// Search, filter, sort and limit flags shared by `list` and `raffle`
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Case-insensitive text over title, description and type
    #[arg(short, long)]
    pub search: Option<String>,

    /// all, completed, pending, high, medium or low
    #[arg(short, long)]
    pub filter: Option<String>,

    /// date, priority, status, title or type (default from config)
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

impl QueryArgs {
    pub fn to_query(&self, default_sort: SortBy) -> Result<TaskQuery> {
        let filter = match self.filter.as_deref() {
            Some(raw) => raw.parse()?,
            None => Filter::All,
        };
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse()?,
            None => default_sort,
        };
        Ok(TaskQuery {
            search: self.search.clone(),
            filter,
            sort,
            limit: self.limit,
        })
    }
}

/// Flags every command receives
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

impl GlobalOptions {
    fn events_to_stdout(&self) -> bool {
        matches!(
            EventDestination::parse(self.events.as_deref()),
            Some(EventDestination::Stdout)
        )
    }

    /// Envelope output steps aside when events own stdout
    pub fn output(&self) -> OutputOptions {
        let events_to_stdout = self.events_to_stdout();
        OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        }
    }
}

struct Context {
    storage: Storage,
    config: Config,
    store: FileTaskStore,
}

fn resolve_storage(root: Option<&std::path::Path>) -> Result<Storage> {
    let start = std::env::current_dir()?;
    Ok(Storage::discover(root, &start))
}

fn load_context(options: &GlobalOptions) -> Result<Context> {
    let storage = resolve_storage(options.root.as_deref())?;
    let config = Config::load_from_root(storage.root());
    let store = FileTaskStore::open(storage.clone(), config.tasks.clone())?;
    Ok(Context {
        storage,
        config,
        store,
    })
}

fn open_event_sink(options: &GlobalOptions) -> Result<Option<EventSink>> {
    EventDestination::parse(options.events.as_deref())
        .map(|dest| dest.open())
        .transpose()
}

/// Emit one event; failures become a warning instead of failing the command
fn emit_or_warn<T: Serialize>(
    sink: &mut Option<EventSink>,
    kind: EventKind,
    data: T,
) -> Option<String> {
    emit_event(sink.as_mut(), kind, data)
        .err()
        .map(|err| format!("event output failed: {err}"))
}

impl Cli {
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            root: self.root.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
        }
    }

    /// Run the selected command
    pub fn run(self) -> Result<()> {
        let global = self.global_options();
        match self.command {
            Commands::Init => init::run(&global),
            Commands::Add {
                title,
                description,
                priority,
                task_type,
                completed,
            } => task::run_add(
                &global,
                task::AddOptions {
                    title,
                    description,
                    priority,
                    task_type,
                    completed,
                },
            ),
            Commands::List { query } => task::run_list(&global, &query),
            Commands::Show { id } => task::run_show(&global, &id),
            Commands::Edit {
                id,
                title,
                description,
                priority,
                task_type,
                completed,
            } => task::run_edit(
                &global,
                task::EditOptions {
                    id,
                    title,
                    description,
                    priority,
                    task_type,
                    completed,
                },
            ),
            Commands::Toggle { id } => task::run_toggle(&global, &id),
            Commands::Rm { id } => task::run_delete(&global, &id),
            Commands::Stats => task::run_stats(&global),
            Commands::Types(cmd) => match cmd {
                TypesCommands::List => types::run_list(&global),
                TypesCommands::Add { name } => types::run_add(&global, &name),
            },
            Commands::Raffle {
                query,
                seed,
                at,
                delay_ms,
                explain,
            } => raffle::run(
                &global,
                raffle::RaffleOptions {
                    query,
                    seed,
                    at,
                    delay_ms,
                    explain,
                },
            ),
            Commands::Watch { count } => watch::run(&global, count),
        }
    }
}
