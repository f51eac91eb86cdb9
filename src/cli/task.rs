//! Task command implementations.

use serde::Serialize;

use crate::error::Result;
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::query::TaskStats;
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskDraft, TaskPatch};
use crate::task_types::TaskTypeRegistry;

use super::{emit_or_warn, load_context, open_event_sink, GlobalOptions, QueryArgs};

pub struct AddOptions {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub completed: bool,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Serialize)]
struct TaskListOutput {
    matched: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: String,
}

pub fn run_add(options: &GlobalOptions, add: AddOptions) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;

    let priority = match add.priority.as_deref() {
        Some(raw) => raw.parse()?,
        None => ctx.config.tasks.default_priority,
    };
    let task_type = add
        .task_type
        .unwrap_or_else(|| ctx.config.tasks.default_type.clone());
    let draft = TaskDraft::new(add.title, add.description)
        .priority(priority)
        .task_type(task_type)
        .completed(add.completed);

    let task = ctx.store.create(draft)?;

    let mut human = HumanOutput::new("Task created");
    if let Some(warning) = unregistered_type_warning(&ctx.storage, &task.task_type) {
        human.push_warning(warning);
    }
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TaskCreated, &task) {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &task);

    emit_success(options.output(), "add", &task, Some(&human))
}

pub fn run_list(options: &GlobalOptions, args: &QueryArgs) -> Result<()> {
    let ctx = load_context(options)?;
    let query = args.to_query(ctx.config.tasks.default_sort)?;
    let all = ctx.store.list()?;
    let matched = query.count_matches(&all);
    let tasks = query.apply(&all);

    let mut human = HumanOutput::new(format!("Tasks ({} of {})", tasks.len(), all.len()));
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if all.is_empty() {
        human.push_next_step("taskraffle add \"<title>\" --description \"<details>\"");
    }

    emit_success(
        options.output(),
        "list",
        &TaskListOutput { matched, tasks },
        Some(&human),
    )
}

pub fn run_show(options: &GlobalOptions, input: &str) -> Result<()> {
    let ctx = load_context(options)?;
    let id = ctx.store.resolve_id(input)?;
    let task = ctx.store.get(&id)?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task);
    human.push_detail(task.description.clone());

    emit_success(options.output(), "show", &task, Some(&human))
}

pub fn run_edit(options: &GlobalOptions, edit: EditOptions) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let id = ctx.store.resolve_id(&edit.id)?;

    let priority = edit
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;
    let patch = TaskPatch {
        title: edit.title,
        description: edit.description,
        priority,
        task_type: edit.task_type,
        completed: edit.completed,
    };
    let retyped = patch.task_type.is_some();
    let task = ctx.store.update(&id, patch)?;

    let mut human = HumanOutput::new("Task updated");
    if retyped {
        if let Some(warning) = unregistered_type_warning(&ctx.storage, &task.task_type) {
            human.push_warning(warning);
        }
    }
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TaskUpdated, &task) {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &task);

    emit_success(options.output(), "edit", &task, Some(&human))
}

pub fn run_toggle(options: &GlobalOptions, input: &str) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let id = ctx.store.resolve_id(input)?;
    let task = ctx.store.toggle_complete(&id)?;

    let header = if task.completed {
        "Task completed"
    } else {
        "Task reopened"
    };
    let mut human = HumanOutput::new(header);
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TaskUpdated, &task) {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &task);

    emit_success(options.output(), "toggle", &task, Some(&human))
}

pub fn run_delete(options: &GlobalOptions, input: &str) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let id = ctx.store.resolve_id(input)?;
    ctx.store.delete(&id)?;

    let output = TaskDeletedOutput { id: id.clone() };
    let mut human = HumanOutput::new("Task deleted");
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TaskDeleted, &output) {
        human.push_warning(warning);
    }
    human.push_summary("ID", id);

    emit_success(options.output(), "rm", &output, Some(&human))
}

pub fn run_stats(options: &GlobalOptions) -> Result<()> {
    let ctx = load_context(options)?;
    let stats = TaskStats::from_tasks(&ctx.store.list()?);

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("Pending", stats.pending.to_string());
    human.push_summary("Pending high", stats.high.to_string());
    human.push_summary("Pending medium", stats.medium.to_string());
    human.push_summary("Pending low", stats.low.to_string());

    emit_success(options.output(), "stats", &stats, Some(&human))
}

/// One-line rendering used by `list`, `raffle --explain` and `watch`
pub(super) fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!(
        "[{mark}] {}  {:<6}  {}  {}",
        task.id,
        task.priority.as_str(),
        task.task_type,
        task.title
    )
}

pub(super) fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary("Type", task.task_type.clone());
    human.push_summary(
        "Status",
        if task.completed { "completed" } else { "pending" },
    );
    human.push_summary("Created", task.created_at.to_rfc3339());
}

fn unregistered_type_warning(
    storage: &crate::storage::Storage,
    task_type: &str,
) -> Option<String> {
    let known = TaskTypeRegistry::new(storage.clone()).list().ok()?;
    let folded = task_type.to_lowercase();
    if known.iter().any(|name| name.to_lowercase() == folded) {
        return None;
    }
    Some(format!(
        "type '{task_type}' is not registered (taskraffle types add \"{task_type}\")"
    ))
}
