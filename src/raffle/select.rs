//! Winner selection over the cumulative weight distribution.

use serde::Serialize;

use crate::error::{Error, Result};

use super::rng::pseudo_random;
use super::seed::derive_numeric_seed;
use super::weight::compute_weight;
use super::RaffleEntry;

/// Everything computed on the way to a winner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draw {
    pub numeric_seed: i64,
    pub weights: Vec<f64>,
    pub total_weight: f64,
    /// Generator output at index `weights.len()`
    pub final_random: f64,
    pub target: f64,
    pub winner_index: usize,
}

#[derive(Debug)]
pub struct Selection<'a, T> {
    pub winner: &'a T,
    pub index: usize,
    pub draw: Draw,
}

/// Pick one entry of `items`, weighted, for `seed_text` evaluated at
/// `now_millis`.
///
/// Fails with `InvalidArgument` on an empty slice and `NumericOverflow`
/// when a weight or running total stops being finite.
pub fn select<'a, T: RaffleEntry>(
    items: &'a [T],
    seed_text: &str,
    now_millis: i64,
) -> Result<Selection<'a, T>> {
    if items.is_empty() {
        return Err(Error::InvalidArgument(
            "raffle needs at least one task".to_string(),
        ));
    }

    let numeric_seed = derive_numeric_seed(seed_text, now_millis);
    let weights = items
        .iter()
        .enumerate()
        .map(|(index, item)| compute_weight(item, index, numeric_seed, now_millis))
        .collect::<Result<Vec<f64>>>()?;
    let cumulative = cumulative_weights(&weights)?;
    let total_weight = cumulative[cumulative.len() - 1];

    // One draw past the last entry index, never shared with an entry's factor.
    let final_random = pseudo_random(numeric_seed, items.len());
    let target = final_random * total_weight;
    let index = lower_bound(&cumulative, target);

    tracing::debug!(
        entries = items.len(),
        numeric_seed,
        total_weight,
        target,
        winner = index,
        "raffle drawn"
    );

    Ok(Selection {
        winner: &items[index],
        index,
        draw: Draw {
            numeric_seed,
            weights,
            total_weight,
            final_random,
            target,
            winner_index: index,
        },
    })
}

fn cumulative_weights(weights: &[f64]) -> Result<Vec<f64>> {
    let mut running = 0.0;
    let mut cumulative = Vec::with_capacity(weights.len());
    for (index, weight) in weights.iter().enumerate() {
        running += weight;
        if !running.is_finite() {
            return Err(Error::NumericOverflow(format!(
                "cumulative weight is not finite at entry {index}"
            )));
        }
        cumulative.push(running);
    }
    Ok(cumulative)
}

/// Smallest index whose cumulative weight reaches `target`; an exact tie
/// resolves to the lower index. A target past the end (rounding) maps to
/// the last index. `cumulative` must be non-empty.
fn lower_bound(cumulative: &[f64], target: f64) -> usize {
    cumulative
        .partition_point(|&sum| sum < target)
        .min(cumulative.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raffle::weight::base_weight;
    use crate::raffle::RaffleItem;
    use crate::task::{Priority, Task};
    use chrono::{DateTime, Utc};

    const T: i64 = 1_718_035_200_000;
    const DAY: i64 = 86_400_000;

    fn item(priority: Priority, completed: bool, created_at_millis: i64) -> RaffleItem {
        RaffleItem {
            priority,
            completed,
            created_at_millis,
        }
    }

    fn mixed_pool() -> Vec<RaffleItem> {
        vec![
            item(Priority::High, false, T - 3 * DAY),
            item(Priority::Low, true, T - 40 * DAY),
            item(Priority::Medium, false, T),
            item(Priority::Medium, true, T - DAY),
            item(Priority::High, true, T - 400 * DAY),
            item(Priority::Low, false, T + DAY),
        ]
    }

    #[test]
    fn empty_pool_is_invalid() {
        let pool: Vec<RaffleItem> = Vec::new();
        let err = select(&pool, "seed", T).expect_err("empty");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn single_entry_always_wins() {
        let pool = [item(Priority::Low, true, T - 900 * DAY)];
        for seed in ["", "a", "test-seed-1", "1718035200000-k3j9x0q2z8m"] {
            for now in [T, T + 123_456_789, -5] {
                let selection = select(&pool, seed, now).expect("select");
                assert_eq!(selection.index, 0);
                assert_eq!(selection.winner, &pool[0]);
            }
        }
    }

    #[test]
    fn winner_is_member_of_pool() {
        let pool = mixed_pool();
        for len in 1..=pool.len() {
            for n in 0..200 {
                let seed = format!("{}-{n}", T + n);
                let selection = select(&pool[..len], &seed, T + n).expect("select");
                assert!(selection.index < len);
                assert_eq!(selection.winner, &pool[selection.index]);
                assert_eq!(selection.draw.weights.len(), len);
            }
        }
    }

    #[test]
    fn same_inputs_same_winner() {
        let pool = mixed_pool();
        let first = select(&pool, "1718035200000-abc", T).expect("select");
        for _ in 0..10 {
            let again = select(&pool, "1718035200000-abc", T).expect("select");
            assert_eq!(again.index, first.index);
            assert_eq!(again.draw, first.draw);
        }
    }

    #[test]
    fn reordering_can_change_winner() {
        let pool = mixed_pool();
        let reversed: Vec<RaffleItem> = pool.iter().rev().copied().collect();
        let changed = (0..500).any(|n| {
            let seed = format!("order-{n}");
            let forward = select(&pool, &seed, T).expect("forward");
            let backward = select(&reversed, &seed, T).expect("backward");
            forward.winner != backward.winner
        });
        assert!(changed, "entry order never affected the winner");
    }

    #[test]
    fn draw_composes_documented_formula() {
        let pool = [
            item(Priority::High, false, T),
            item(Priority::Low, true, T),
        ];
        let selection = select(&pool, "test-seed-1", T).expect("select");
        let draw = &selection.draw;

        assert_eq!(draw.numeric_seed, derive_numeric_seed("test-seed-1", T));
        assert!((base_weight(&pool[0], T) - 1.38).abs() < 1e-12);
        assert!((base_weight(&pool[1], T) - 1.0).abs() < 1e-12);
        for (index, entry) in pool.iter().enumerate() {
            let expected =
                base_weight(entry, T) * (0.5 + pseudo_random(draw.numeric_seed, index));
            assert_eq!(draw.weights[index].to_bits(), expected.to_bits());
        }
        assert_eq!(
            draw.final_random.to_bits(),
            pseudo_random(draw.numeric_seed, 2).to_bits()
        );
        assert_eq!(draw.total_weight, draw.weights[0] + draw.weights[1]);
        assert_eq!(draw.target, draw.final_random * draw.total_weight);
        let expected_index = if draw.target <= draw.weights[0] { 0 } else { 1 };
        assert_eq!(selection.index, expected_index);
    }

    #[test]
    fn lower_bound_breaks_ties_low() {
        let cumulative = [1.0, 2.0, 3.0];
        assert_eq!(lower_bound(&cumulative, 0.0), 0);
        assert_eq!(lower_bound(&cumulative, 1.0), 0);
        assert_eq!(lower_bound(&cumulative, 1.5), 1);
        assert_eq!(lower_bound(&cumulative, 2.0), 1);
        assert_eq!(lower_bound(&cumulative, 3.0), 2);
        assert_eq!(lower_bound(&cumulative, 3.0 + 1e-9), 2);
    }

    #[test]
    fn overflowing_total_is_reported() {
        // Each weight is finite (~1e307) but ten of them are not.
        let pool = vec![item(Priority::High, false, T + 70_800 * DAY); 10];
        let err = select(&pool, "seed", T).expect_err("overflow");
        assert!(matches!(err, Error::NumericOverflow(_)));
    }

    #[test]
    fn tasks_are_raffle_entries() {
        let created: DateTime<Utc> = DateTime::from_timestamp_millis(T).expect("instant");
        let tasks: Vec<Task> = ["write", "review", "ship"]
            .iter()
            .map(|title| Task {
                id: format!("task-{title}"),
                title: title.to_string(),
                description: String::new(),
                priority: Priority::Medium,
                task_type: "Work".to_string(),
                completed: false,
                created_at: created,
                updated_at: created,
            })
            .collect();
        let selection = select(&tasks, "tasks", T).expect("select");
        assert!(tasks.iter().any(|task| task.id == selection.winner.id));
    }
}
