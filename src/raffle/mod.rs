//! Weighted, seeded task raffle.
//!
//! A draw folds a seed token into a numeric seed, weights every entry by
//! priority, completion status and age (scaled by a seeded random factor),
//! then picks the entry whose cumulative weight first reaches a seeded
//! target. For a fixed seed token, evaluation instant and entry order the
//! winner is always the same; reordering the entries can change it.
//!
//! The selection is pure. Showing the result after a pause is handled by
//! [`reveal`], which never touches the computation.

pub mod reveal;
pub mod rng;
pub mod seed;
pub mod select;
pub mod weight;

use crate::task::{Priority, Task};

pub use reveal::{present_after, reveal};
pub use rng::pseudo_random;
pub use seed::{derive_numeric_seed, SeedToken};
pub use select::{select, Draw, Selection};
pub use weight::{base_weight, compute_weight, MIN_WEIGHT};

/// What the raffle needs to know about an entry
pub trait RaffleEntry {
    fn priority(&self) -> Priority;
    fn completed(&self) -> bool;
    /// Creation instant, milliseconds since the Unix epoch
    fn created_at_millis(&self) -> i64;
}

impl RaffleEntry for Task {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn completed(&self) -> bool {
        self.completed
    }

    fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

/// Minimal stand-alone entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleItem {
    pub priority: Priority,
    pub completed: bool,
    pub created_at_millis: i64,
}

impl RaffleEntry for RaffleItem {
    fn priority(&self) -> Priority {
        self.priority
    }

    fn completed(&self) -> bool {
        self.completed
    }

    fn created_at_millis(&self) -> i64 {
        self.created_at_millis
    }
}

impl<T: RaffleEntry + ?Sized> RaffleEntry for &T {
    fn priority(&self) -> Priority {
        (**self).priority()
    }

    fn completed(&self) -> bool {
        (**self).completed()
    }

    fn created_at_millis(&self) -> i64 {
        (**self).created_at_millis()
    }
}
