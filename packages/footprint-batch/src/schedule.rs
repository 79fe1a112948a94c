//! Static round-robin distribution of files over worker threads.

use anyhow::{anyhow, Result};
use std::thread;

/// Items handled by `worker` out of `workers`: worker, worker + workers, ...
pub fn partition(worker: usize, workers: usize, items: usize) -> Vec<usize> {
    if workers == 0 {
        return Vec::new();
    }
    (0..items).filter(|i| i % workers == worker).collect()
}

/// Worker pool size: `requested` (0 means all logical CPUs), never more
/// than the number of items and never less than one.
pub fn resolve_workers(requested: usize, items: usize) -> usize {
    let available = num_cpus::get();
    let workers = if requested == 0 { available } else { requested };
    workers.min(items).max(1)
}

/// An item that failed, and the worker that gave up on it.
#[derive(Debug)]
pub struct Failure {
    pub worker: usize,
    pub item: Option<usize>,
    pub error: anyhow::Error,
}

/// Runs `task(worker, item)` over `items` on `workers` scoped threads.
///
/// A worker stops at its first failing item; the others carry on. Every
/// worker is joined before the failures are returned. A panicking worker is
/// reported as a failure without an item, except under `panic = "abort"`
/// where the process ends.
pub fn run_partitioned<F>(items: usize, workers: usize, task: F) -> Vec<Failure>
where
    F: Fn(usize, usize) -> Result<()> + Sync,
{
    let task = &task;
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || -> Option<Failure> {
                    for item in partition(worker, workers, items) {
                        if let Err(error) = task(worker, item) {
                            log::error!("Worker {} stopped at item {}: {:#}", worker, item, error);
                            return Some(Failure {
                                worker,
                                item: Some(item),
                                error,
                            });
                        }
                    }
                    None
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .filter_map(|(worker, handle)| match handle.join() {
                Ok(failure) => failure,
                Err(_) => Some(Failure {
                    worker,
                    item: None,
                    error: anyhow!("worker {} panicked", worker),
                }),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn partitions_are_disjoint_and_complete() {
        for &(workers, items) in &[(1, 5), (3, 10), (4, 4), (5, 2), (3, 0)] {
            let mut seen = vec![0usize; items];
            for w in 0..workers {
                for i in partition(w, workers, items) {
                    assert_eq!(i % workers, w);
                    seen[i] += 1;
                }
            }
            assert!(seen.iter().all(|&n| n == 1), "{} workers, {} items", workers, items);
        }
    }

    #[test]
    fn partition_is_a_stride() {
        assert_eq!(partition(1, 3, 8), vec![1, 4, 7]);
        assert!(partition(0, 0, 8).is_empty());
    }

    #[test]
    fn workers_are_capped_by_items() {
        assert_eq!(resolve_workers(8, 3), 3);
        assert_eq!(resolve_workers(2, 10), 2);
        assert_eq!(resolve_workers(4, 0), 1);
        assert!(resolve_workers(0, 1000) >= 1);
    }

    #[test]
    fn panicking_worker_is_reported_after_join() {
        // Unwinding is only available outside the abort-on-panic release profile.
        let failures = run_partitioned(4, 2, |_, item| {
            if item == 3 {
                panic!("corrupt raster");
            }
            Ok(())
        });
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].worker, 1);
        assert_eq!(failures[0].item, None);
    }

    #[test]
    fn failure_stops_only_its_worker() {
        let done = Mutex::new(Vec::new());
        let failures = run_partitioned(9, 3, |_, item| {
            if item == 4 {
                anyhow::bail!("broken item");
            }
            done.lock().unwrap().push(item);
            Ok(())
        });

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].worker, 1);
        assert_eq!(failures[0].item, Some(4));

        let mut done = done.into_inner().unwrap();
        done.sort();
        // Worker 1 owns 1, 4, 7 and gives up after 4.
        assert_eq!(done, vec![0, 1, 2, 3, 5, 6, 8]);
    }
}
