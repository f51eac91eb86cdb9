//! Task type commands.

use serde::Serialize;

use crate::error::Result;
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task_types::{TaskTypeRegistry, DEFAULT_TASK_TYPES};

use super::{emit_or_warn, load_context, open_event_sink, GlobalOptions};

#[derive(Serialize)]
struct TypeListOutput {
    types: Vec<String>,
    custom: Vec<String>,
}

pub fn run_list(options: &GlobalOptions) -> Result<()> {
    let ctx = load_context(options)?;
    let registry = TaskTypeRegistry::new(ctx.storage);
    let types = registry.list()?;
    let custom: Vec<String> = registry
        .custom()?
        .into_iter()
        .map(|entry| entry.name)
        .collect();

    let mut human = HumanOutput::new(format!("Task types ({})", types.len()));
    for name in &types {
        if DEFAULT_TASK_TYPES.contains(&name.as_str()) {
            human.push_detail(name.clone());
        } else {
            human.push_detail(format!("{name} (custom)"));
        }
    }

    emit_success(
        options.output(),
        "types list",
        &TypeListOutput { types, custom },
        Some(&human),
    )
}

pub fn run_add(options: &GlobalOptions, name: &str) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let entry = TaskTypeRegistry::new(ctx.storage).add(name)?;

    let mut human = HumanOutput::new("Task type added");
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TaskTypeCreated, &entry) {
        human.push_warning(warning);
    }
    human.push_summary("Name", entry.name.clone());
    human.push_next_step(format!(
        "taskraffle add \"<title>\" --description \"<details>\" --type \"{}\"",
        entry.name
    ));

    emit_success(options.output(), "types add", &entry, Some(&human))
}
