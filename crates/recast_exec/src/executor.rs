//! Quick-fail batch execution on an explicitly sized rayon pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::{ExecError, QuickFail};

/// Results of a batch in which every unit succeeded.
#[derive(Debug)]
pub struct ExecReport<T> {
    /// One output per unit, in submission order.
    pub outputs: Vec<T>,
}

/// Runs independent units of work on a dedicated worker pool.
///
/// The pool is created by the caller and passed to the drivers; there is no
/// global pool. Units are started in submission order but may finish in any
/// order, and nothing is shared between them except what the caller captures.
pub struct WorkExecutor {
    pool: ThreadPool,
}

impl WorkExecutor {
    /// Creates an executor with `threads` workers (0 picks rayon's default,
    /// one per available core).
    pub fn new(threads: usize) -> Result<Self, ExecError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("recast-worker-{i}"))
            .build()
            .map_err(|e| ExecError::PoolBuild {
                threads,
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs every unit and blocks until all started units have finished.
    ///
    /// Dispatch only enqueues; the calling thread waits at the end of the
    /// batch. After the first unit returns `Err`, units that have not started
    /// yet are skipped. Units already running are never interrupted, and the
    /// call returns only once they are done. The first observed error is
    /// returned as the cause of the [`QuickFail`].
    pub fn run_quick_fail<T, E, F>(&self, units: Vec<F>) -> Result<ExecReport<T>, QuickFail<E>>
    where
        F: FnOnce() -> Result<T, E> + Send,
        T: Send,
        E: std::error::Error + Send + 'static,
    {
        let total = units.len();
        let cancelled_flag = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let cancelled = AtomicUsize::new(0);
        let first_error: Mutex<Option<E>> = Mutex::new(None);
        let outputs: Mutex<Vec<(usize, T)>> = Mutex::new(Vec::with_capacity(total));

        debug!(units = total, threads = self.threads(), "dispatching batch");

        self.pool.scope_fifo(|scope| {
            for (index, unit) in units.into_iter().enumerate() {
                let cancelled_flag = &cancelled_flag;
                let completed = &completed;
                let failed = &failed;
                let cancelled = &cancelled;
                let first_error = &first_error;
                let outputs = &outputs;
                scope.spawn_fifo(move |_| {
                    if cancelled_flag.load(Ordering::Acquire) {
                        cancelled.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    let result = unit();
                    completed.fetch_add(1, Ordering::Relaxed);
                    match result {
                        Ok(value) => outputs.lock().push((index, value)),
                        Err(e) => {
                            cancelled_flag.store(true, Ordering::Release);
                            failed.fetch_add(1, Ordering::Relaxed);
                            let mut slot = first_error.lock();
                            if slot.is_none() {
                                *slot = Some(e);
                            } else {
                                warn!(unit = index, error = %e, "additional unit failure");
                            }
                        }
                    }
                });
            }
        });

        if let Some(cause) = first_error.into_inner() {
            let fail = QuickFail {
                cause,
                total,
                completed: completed.into_inner(),
                failed: failed.into_inner(),
                cancelled: cancelled.into_inner(),
            };
            warn!(
                completed = fail.completed,
                cancelled = fail.cancelled,
                "batch failed"
            );
            return Err(fail);
        }

        let mut outputs = outputs.into_inner();
        outputs.sort_by_key(|(index, _)| *index);
        Ok(ExecReport {
            outputs: outputs.into_iter().map(|(_, value)| value).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("unit {0} failed")]
    struct UnitError(usize);

    type Unit<'a> = Box<dyn FnOnce() -> Result<usize, UnitError> + Send + 'a>;

    #[test]
    fn all_units_succeed_in_submission_order() {
        let exec = WorkExecutor::new(4).unwrap();
        let units: Vec<Unit> = (0..32)
            .map(|i: usize| Box::new(move || Ok(i * 2)) as Unit)
            .collect();
        let report = exec.run_quick_fail(units).unwrap();
        assert_eq!(report.outputs, (0..32).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn empty_batch_succeeds() {
        let exec = WorkExecutor::new(2).unwrap();
        let report = exec.run_quick_fail(Vec::<Unit>::new()).unwrap();
        assert!(report.outputs.is_empty());
    }

    #[test]
    fn explicit_thread_count() {
        let exec = WorkExecutor::new(3).unwrap();
        assert_eq!(exec.threads(), 3);
    }

    #[test]
    fn single_worker_stops_after_first_failure() {
        let exec = WorkExecutor::new(1).unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let units: Vec<Unit> = (0..6)
            .map(|i| {
                let started = Arc::clone(&started);
                Box::new(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    if i == 1 {
                        Err(UnitError(i))
                    } else {
                        Ok(i)
                    }
                }) as Unit
            })
            .collect();

        let err = exec.run_quick_fail(units).unwrap_err();
        assert_eq!(err.cause, UnitError(1));
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(err.completed, 2);
        assert_eq!(err.cancelled, 4);
        assert_eq!(err.total, 6);
    }

    #[test]
    fn many_workers_never_exceed_batch() {
        let exec = WorkExecutor::new(4).unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let units: Vec<Unit> = (0..64)
            .map(|i| {
                let started = Arc::clone(&started);
                Box::new(move || {
                    started.fetch_add(1, Ordering::SeqCst);
                    if i == 10 {
                        Err(UnitError(i))
                    } else {
                        Ok(i)
                    }
                }) as Unit
            })
            .collect();

        let err = exec.run_quick_fail(units).unwrap_err();
        assert_eq!(err.cause, UnitError(10));
        let started = started.load(Ordering::SeqCst);
        assert!(started <= 64);
        assert_eq!(err.completed, started);
        assert_eq!(err.completed + err.cancelled, 64);
    }

    #[test]
    fn in_flight_units_finish_before_return() {
        let exec = WorkExecutor::new(2).unwrap();
        let slow_started = Arc::new(AtomicBool::new(false));
        let slow_finished = Arc::new(AtomicBool::new(false));

        let slow: Unit = {
            let started = Arc::clone(&slow_started);
            let finished = Arc::clone(&slow_finished);
            Box::new(move || {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                finished.store(true, Ordering::SeqCst);
                Ok(0)
            })
        };
        let failing: Unit = {
            let started = Arc::clone(&slow_started);
            Box::new(move || {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
                    std::thread::yield_now();
                }
                Err(UnitError(1))
            })
        };

        let err = exec.run_quick_fail(vec![slow, failing]).unwrap_err();
        assert_eq!(err.cause, UnitError(1));
        assert!(slow_finished.load(Ordering::SeqCst));
        assert_eq!(err.completed, 2);
    }
}
