//! taskraffle raffle command implementation
//!
//! Draws one task from the (optionally filtered) list. The winner is fixed
//! before the reveal pause; `--seed` with `--at` reproduces a draw exactly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::raffle::{reveal, select, Draw, SeedToken};
use crate::store::TaskStore;
use crate::task::Task;

use super::task::{format_task_line, push_task_summary};
use super::{emit_or_warn, load_context, open_event_sink, GlobalOptions, QueryArgs};

pub struct RaffleOptions {
    pub query: QueryArgs,
    pub seed: Option<String>,
    pub at: Option<String>,
    pub delay_ms: Option<u64>,
    pub explain: bool,
}

#[derive(Serialize)]
struct RaffleOutput {
    seed: String,
    evaluated_at: DateTime<Utc>,
    candidates: usize,
    index: usize,
    winner: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    draw: Option<Draw>,
}

#[derive(Serialize)]
struct RaffleEventData<'a> {
    seed: &'a str,
    evaluated_at: DateTime<Utc>,
    candidates: usize,
    index: usize,
    task_id: &'a str,
}

pub fn run(options: &GlobalOptions, raffle: RaffleOptions) -> Result<()> {
    let ctx = load_context(options)?;
    let mut sink = open_event_sink(options)?;
    let output_options = options.output();

    let query = raffle.query.to_query(ctx.config.tasks.default_sort)?;
    let candidates = query.apply(&ctx.store.list()?);

    let now = match raffle.at.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };
    let seed = match raffle.seed {
        Some(seed) => SeedToken::from(seed),
        None => SeedToken::generate(now),
    };

    // Scripts get the answer straight away; only the human view pauses.
    let delay = if output_options.json || output_options.quiet {
        Duration::ZERO
    } else {
        Duration::from_millis(
            raffle
                .delay_ms
                .unwrap_or(ctx.config.raffle.reveal_delay_ms),
        )
    };
    if !delay.is_zero() && !candidates.is_empty() {
        println!("Drawing from {} tasks...", candidates.len());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let selection = runtime.block_on(reveal(delay, async {
        select(&candidates, seed.as_str(), now.timestamp_millis())
    }))?;

    let winner = selection.winner.clone();
    let index = selection.index;
    let draw = selection.draw;

    let mut human = HumanOutput::new("Raffle winner");
    let event = RaffleEventData {
        seed: seed.as_str(),
        evaluated_at: now,
        candidates: candidates.len(),
        index,
        task_id: &winner.id,
    };
    if let Some(warning) = emit_or_warn(&mut sink, EventKind::RaffleDrawn, &event) {
        human.push_warning(warning);
    }
    push_task_summary(&mut human, &winner);
    human.push_summary("Seed", seed.as_str());
    human.push_summary("Candidates", candidates.len().to_string());
    if raffle.explain {
        for (line, (task, weight)) in candidates.iter().zip(&draw.weights).enumerate() {
            let marker = if line == index { ">" } else { " " };
            human.push_detail(format!(
                "{marker} {weight:>10.6} ({:>5.1}%)  {}",
                weight / draw.total_weight * 100.0,
                format_task_line(task)
            ));
        }
        human.push_detail(format!(
            "target {:.6} of {:.6} (r = {:.6}, numeric seed {})",
            draw.target, draw.total_weight, draw.final_random, draw.numeric_seed
        ));
    }
    if !winner.completed {
        human.push_next_step(format!("taskraffle toggle {}", winner.id));
    }

    let output = RaffleOutput {
        seed: seed.as_str().to_string(),
        evaluated_at: now,
        candidates: candidates.len(),
        index,
        winner,
        draw: raffle.explain.then_some(draw),
    };
    emit_success(output_options, "raffle", &output, Some(&human))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| {
            Error::InvalidArgument(format!("invalid --at '{}': {err} (expected RFC 3339)", raw.trim()))
        })
}
