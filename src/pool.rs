//! Static range partitioning and the blocking worker pool shared by all phases.

use std::ops::Range;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{ErrorCode, GcError, GcResult};

/// Splits `0..len` into exactly `workers` contiguous ranges.
///
/// Every range holds `len / workers` items except the last, which also takes
/// the remainder. With more workers than items the leading ranges are empty.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = len / workers;
    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i == workers - 1 { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Runs `work` once per partition of `0..len` on the blocking thread pool and
/// waits for all of them.
///
/// The first failing worker cancels `cancel`, which every worker is expected
/// to poll between units of work. The error returned is the first one that is
/// not itself a cancellation, so the caller sees the root cause.
pub async fn run_partitioned<T, F>(
    len: usize,
    workers: usize,
    cancel: &CancellationToken,
    work: F,
) -> GcResult<Vec<T>>
where
    T: Send + 'static,
    F: Fn(Range<usize>, &CancellationToken) -> GcResult<T> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let mut set = JoinSet::new();
    for (worker, range) in partition(len, workers).into_iter().enumerate() {
        let work = Arc::clone(&work);
        let cancel = cancel.clone();
        set.spawn_blocking(move || {
            debug!(worker, start = range.start, end = range.end, "worker started");
            work(range, &cancel)
        });
    }

    let mut results = Vec::with_capacity(workers);
    let mut failure: Option<GcError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = joined
            .map_err(|e| GcError::with_message(ErrorCode::WorkerFailed, e.to_string()))
            .and_then(|result| result);
        match outcome {
            Ok(value) => results.push(value),
            Err(err) => {
                if !cancel.is_cancelled() {
                    error!("{}", err);
                    cancel.cancel();
                }
                let replace = match &failure {
                    None => true,
                    Some(current) => current.is_cancelled() && !err.is_cancelled(),
                };
                if replace {
                    failure = Some(err);
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_partition_remainder_goes_last() {
        assert_eq!(partition(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition(65536, 10).last(), Some(&(58977..65536)));
        assert_eq!(partition(4, 4), vec![0..1, 1..2, 2..3, 3..4]);
    }

    #[test]
    fn test_partition_covers_everything_once() {
        for len in [0usize, 1, 7, 100, 65536] {
            for workers in [1usize, 2, 3, 10, 64, 200] {
                let ranges = partition(len, workers);
                assert_eq!(ranges.len(), workers);
                let mut next = 0;
                for range in &ranges {
                    assert_eq!(range.start, next);
                    assert!(range.end >= range.start);
                    next = range.end;
                }
                assert_eq!(next, len);
            }
        }
    }

    #[test]
    fn test_partition_more_workers_than_items() {
        assert_eq!(partition(2, 4), vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[tokio::test]
    async fn test_every_item_visited() {
        let visited = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visited);
        let cancel = CancellationToken::new();
        let results = run_partitioned(1000, 7, &cancel, move |range, _| {
            counter.fetch_add(range.len(), Ordering::Relaxed);
            Ok(range.len())
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 7);
        assert_eq!(results.iter().sum::<usize>(), 1000);
        assert_eq!(visited.load(Ordering::Relaxed), 1000);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_failure_cancels_siblings() {
        let cancel = CancellationToken::new();
        let result = run_partitioned(4, 4, &cancel, |range, cancel| -> GcResult<()> {
            if range.start == 0 {
                return Err(GcError::with_message(ErrorCode::ShardList, "boom"));
            }
            // siblings spin until they observe the cancellation
            while !cancel.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            Err(GcError::cancelled())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::ShardList);
        assert!(cancel.is_cancelled());
    }
}
