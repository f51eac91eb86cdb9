//! Per-entry raffle weights.
//!
//! `weight = 1.0 × priority × pending × exp(-0.01 × age_days) × (0.5 + r)`
//! where `r = pseudo_random(numeric_seed, index)`.

use crate::error::{Error, Result};
use crate::task::Priority;

use super::rng::pseudo_random;
use super::RaffleEntry;

/// Floor for weights that underflow to zero
pub const MIN_WEIGHT: f64 = 1e-12;

const MS_PER_DAY: f64 = 86_400_000.0;
const AGE_DECAY_PER_DAY: f64 = 0.01;
const PENDING_BOOST: f64 = 1.15;

pub fn priority_multiplier(priority: Priority) -> f64 {
    match priority {
        Priority::High => 1.2,
        Priority::Medium => 1.1,
        Priority::Low => 1.0,
    }
}

pub fn status_multiplier(completed: bool) -> f64 {
    if completed {
        1.0
    } else {
        PENDING_BOOST
    }
}

/// `exp(-0.01 × days)`; future creation times give a factor above 1.
pub fn age_decay(created_at_millis: i64, now_millis: i64) -> f64 {
    let days = (now_millis as f64 - created_at_millis as f64) / MS_PER_DAY;
    (-AGE_DECAY_PER_DAY * days).exp()
}

/// Weight before the random factor
pub fn base_weight<E: RaffleEntry + ?Sized>(entry: &E, now_millis: i64) -> f64 {
    1.0 * priority_multiplier(entry.priority())
        * status_multiplier(entry.completed())
        * age_decay(entry.created_at_millis(), now_millis)
}

/// Final weight of the entry at `index`; always finite and positive.
pub fn compute_weight<E: RaffleEntry + ?Sized>(
    entry: &E,
    index: usize,
    numeric_seed: i64,
    now_millis: i64,
) -> Result<f64> {
    let random_factor = 0.5 + pseudo_random(numeric_seed, index);
    let weight = base_weight(entry, now_millis) * random_factor;
    if !weight.is_finite() {
        return Err(Error::NumericOverflow(format!(
            "weight for entry {index} is not finite (created_at {} ms, now {now_millis} ms)",
            entry.created_at_millis()
        )));
    }
    Ok(weight.max(MIN_WEIGHT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raffle::RaffleItem;

    const T: i64 = 1_718_035_200_000;

    fn item(priority: Priority, completed: bool, created_at_millis: i64) -> RaffleItem {
        RaffleItem {
            priority,
            completed,
            created_at_millis,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn fresh_pending_high_is_1_38() {
        assert!(close(base_weight(&item(Priority::High, false, T), T), 1.38));
        assert!(close(base_weight(&item(Priority::Low, true, T), T), 1.0));
    }

    #[test]
    fn random_factor_scales_base_weight() {
        let seed = crate::raffle::derive_numeric_seed("test-seed-1", T);
        let entries = [item(Priority::High, false, T), item(Priority::Low, true, T)];
        for (index, entry) in entries.iter().enumerate() {
            let expected = base_weight(entry, T) * (0.5 + pseudo_random(seed, index));
            let weight = compute_weight(entry, index, seed, T).expect("weight");
            assert_eq!(weight.to_bits(), expected.to_bits());
            assert!(weight >= base_weight(entry, T) * 0.5);
            assert!(weight < base_weight(entry, T) * 1.5);
        }
    }

    #[test]
    fn pending_outweighs_completed() {
        for priority in Priority::ALL {
            let pending = base_weight(&item(priority, false, T - 86_400_000), T);
            let done = base_weight(&item(priority, true, T - 86_400_000), T);
            assert!(pending >= done);
            assert!(close(pending / done, 1.15));
        }
    }

    #[test]
    fn priority_multipliers_are_ordered() {
        assert_eq!(priority_multiplier(Priority::High), 1.2);
        assert_eq!(priority_multiplier(Priority::Medium), 1.1);
        assert_eq!(priority_multiplier(Priority::Low), 1.0);
        let high = base_weight(&item(Priority::High, true, T), T);
        let medium = base_weight(&item(Priority::Medium, true, T), T);
        let low = base_weight(&item(Priority::Low, true, T), T);
        assert!(high > medium && medium > low);
    }

    #[test]
    fn older_entries_decay() {
        let hundred_days = 100 * 86_400_000;
        let decay = age_decay(T - hundred_days, T);
        assert!(close(decay, (-1.0f64).exp()));
        assert!(decay < age_decay(T, T));
    }

    #[test]
    fn future_entries_gain_weight() {
        let ten_days = 10 * 86_400_000;
        let future = base_weight(&item(Priority::Low, true, T + ten_days), T);
        assert!(future > 1.0);
        assert!(close(future, (0.1f64).exp()));
    }

    #[test]
    fn ancient_entries_clamp_to_floor() {
        let entry = item(Priority::Low, true, i64::MIN);
        assert_eq!(base_weight(&entry, T), 0.0);
        let weight = compute_weight(&entry, 0, 42, T).expect("weight");
        assert_eq!(weight, MIN_WEIGHT);
    }

    #[test]
    fn far_future_entries_overflow() {
        let entry = item(Priority::High, false, i64::MAX);
        let err = compute_weight(&entry, 0, 42, T).expect_err("overflow");
        assert!(matches!(err, Error::NumericOverflow(_)));
    }
}
