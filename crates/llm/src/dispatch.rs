//! Bounded scatter/gather over independent requests

use futures::future::try_join_all;
use recap_common::{RecapError, Result};
use std::future::Future;
use tokio::sync::Semaphore;
use tracing::debug;

/// Run `op` over every item with at most `max_in_flight` running at once
///
/// Results come back in input order no matter which call finishes first.
/// The first failure (by completion) is returned immediately; calls still in
/// flight are dropped and never resolve.
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, max_in_flight: usize, op: F) -> Result<Vec<R>>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let limit = Semaphore::new(max_in_flight.max(1));
    let total = items.len();
    let limit = &limit;
    let op = &op;

    let tasks = items.into_iter().enumerate().map(move |(index, item)| async move {
        let _permit = limit
            .acquire()
            .await
            .map_err(|e| RecapError::internal(format!("Dispatch limiter closed: {}", e)))?;

        debug!("Dispatching request {}/{}", index + 1, total);
        op(index, item).await
    });

    try_join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Later items finish first
        let results = fan_out(vec![30u64, 20, 10, 0], 4, |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(index)
        })
        .await
        .unwrap();

        assert_eq!(results, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_respects_max_in_flight() {
        let in_flight_counter = AtomicUsize::new(0);
        let peak_counter = AtomicUsize::new(0);
        let in_flight = &in_flight_counter;
        let peak = &peak_counter;

        fan_out((0..8).collect(), 3, move |_, item: u32| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(item)
        })
        .await
        .unwrap();

        assert_eq!(peak_counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_failure_cancels_siblings() {
        let slow_finished_flag = AtomicBool::new(false);
        let slow_finished = &slow_finished_flag;

        let result: Result<Vec<()>> = fan_out(vec![0u8, 1], 2, move |index, _| async move {
            if index == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                slow_finished.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(RecapError::backend("connection refused"))
            }
        })
        .await;

        assert!(matches!(result, Err(RecapError::Backend(_))));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!slow_finished_flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<u8> = fan_out(Vec::<u8>::new(), 2, |_, item| async move { Ok(item) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
