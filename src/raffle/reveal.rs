//! Presentation pause between starting a raffle and showing the winner.
//!
//! The winner is computed before the pause; waiting only delays when the
//! caller gets to show it.

use std::future::Future;
use std::time::Duration;

/// Hold `outcome` for `delay`, then hand it back unchanged.
pub async fn present_after<T>(delay: Duration, outcome: T) -> T {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    outcome
}

/// Run `draw` to completion, then pause for `delay` before returning its
/// result. Errors are returned without waiting.
pub async fn reveal<T, E, F>(delay: Duration, draw: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let outcome = draw.await?;
    Ok(present_after(delay, outcome).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let start = Instant::now();
        let value = present_after(Duration::ZERO, 7).await;
        assert_eq!(value, 7);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn delay_is_observed() {
        let start = Instant::now();
        let value = present_after(Duration::from_millis(30), "winner").await;
        assert_eq!(value, "winner");
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn errors_skip_the_pause() {
        let start = Instant::now();
        let result: Result<u8, &str> =
            reveal(Duration::from_secs(30), async { Err("empty pool") }).await;
        assert_eq!(result, Err("empty pool"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn delay_does_not_change_outcome() {
        let pool = [crate::raffle::RaffleItem {
            priority: crate::task::Priority::High,
            completed: false,
            created_at_millis: 0,
        }];
        let direct = crate::raffle::select(&pool, "seed", 1_000).expect("select").index;
        let delayed = reveal(Duration::from_millis(5), async {
            crate::raffle::select(&pool, "seed", 1_000).map(|selection| selection.index)
        })
        .await
        .expect("select");
        assert_eq!(direct, delayed);
    }
}
