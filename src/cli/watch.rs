//! taskraffle watch: republish the task list on every change until Ctrl-C.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::query::TaskStats;
use crate::store::TaskStore;
use crate::task::Task;

use super::task::format_task_line;
use super::{emit_or_warn, load_context, open_event_sink, GlobalOptions};

#[derive(Serialize)]
struct TasksChanged<'a> {
    update: usize,
    stats: TaskStats,
    tasks: &'a [Task],
}

pub fn run(options: &GlobalOptions, count: Option<usize>) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let output_options = options.output();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Task>>();
    let _subscription = ctx.store.on_change(Box::new(move |tasks| {
        let _ = tx.send(tasks.to_vec());
    }));
    let _watcher = ctx.store.watch()?;

    if !output_options.json && !output_options.quiet {
        println!(
            "Watching {} ({} tasks), Ctrl-C to stop",
            ctx.storage.store_dir().display(),
            ctx.store.list()?.len()
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut seen = 0usize;
        loop {
            if count.is_some_and(|limit| seen >= limit) {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => return Ok(()),
                update = rx.recv() => {
                    let Some(tasks) = update else {
                        return Err(Error::OperationFailed("store watcher stopped".to_string()));
                    };
                    seen += 1;
                    let payload = TasksChanged {
                        update: seen,
                        stats: TaskStats::from_tasks(&tasks),
                        tasks: &tasks,
                    };

                    let mut human = HumanOutput::new(format!(
                        "Tasks changed ({} total, {} pending)",
                        payload.stats.total, payload.stats.pending
                    ));
                    if let Some(warning) = emit_or_warn(&mut sink, EventKind::TasksChanged, &payload) {
                        human.push_warning(warning);
                    }
                    for task in &tasks {
                        human.push_detail(format_task_line(task));
                    }
                    emit_success(output_options, "watch", &payload, Some(&human))?;
                }
            }
        }
    })
}
