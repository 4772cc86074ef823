//! Background execution of submitted requests.
//!
//! Submission never blocks the caller: jobs are queued (or handed to a new
//! thread) and the call returns immediately.

use std::collections::BinaryHeap;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::types::Priority;

/// A unit of work run off the caller's thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs outside the calling thread.
pub trait Execute: Send + Sync {
    /// Schedule `job`. Returns once the job is queued, never after it ran.
    fn execute(&self, priority: Priority, job: Job) -> Result<()>;
}

struct Queued {
    priority: Priority,
    seq: u64,
    job: Job,
}

// Max-heap order: highest priority first, then lowest sequence number.
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Queued {}

#[derive(Default)]
struct PoolState {
    queue: BinaryHeap<Queued>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

/// A fixed set of worker threads draining a priority-ordered queue.
///
/// A stalled request ties up one worker; submissions keep queueing
/// regardless, and other workers keep draining the queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start `workers` threads (at least one).
    pub fn new(workers: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::default()),
            available: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("jsonwire-worker-{}", index))
                .spawn(move || Self::worker_loop(&shared))?;
            handles.push(handle);
        }
        log::debug!("Started worker pool with {} threads", handles.len());

        Ok(Self {
            shared,
            workers: Mutex::new(handles),
        })
    }

    fn worker_loop(shared: &Shared) {
        loop {
            let next = {
                let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    if let Some(queued) = state.queue.pop() {
                        break Some(queued);
                    }
                    if state.shutdown {
                        break None;
                    }
                    state = shared
                        .available
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            let Some(queued) = next else {
                return;
            };

            if panic::catch_unwind(AssertUnwindSafe(queued.job)).is_err() {
                log::error!("Job at {} priority panicked", queued.priority);
            }
        }
    }

    /// Number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .len()
    }

    /// Stop accepting jobs and wake idle workers. Returns `false` if the
    /// pool was already shut down.
    fn signal_shutdown(&self) -> bool {
        {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.shutdown {
                return false;
            }
            state.shutdown = true;
        }
        self.shared.available.notify_all();
        true
    }

    /// Stop accepting jobs, let the workers drain the queue, and join them.
    ///
    /// Blocks until every queued job has run.
    pub fn shutdown(&self) {
        if !self.signal_shutdown() {
            return;
        }

        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let current = thread::current().id();
        for handle in handles {
            // A job may drop the last handle to its own pool.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::warn!("Worker thread exited abnormally");
            }
        }
        log::debug!("Worker pool shut down");
    }
}

impl Execute for WorkerPool {
    fn execute(&self, priority: Priority, job: Job) -> Result<()> {
        {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.shutdown {
                return Err(Error::Rejected {
                    message: "worker pool has shut down".to_string(),
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push(Queued { priority, seq, job });
        }
        self.shared.available.notify_one();
        Ok(())
    }
}

// Workers finish the queued jobs and exit on their own; dropping the last
// handle never waits for them.
impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.signal_shutdown() {
            log::debug!("Worker pool released; workers exit after draining the queue");
        }
    }
}

/// One new OS thread per job.
///
/// Priority only shows up in the thread name; there is no portable way to
/// raise an OS thread's scheduling priority.
#[derive(Default)]
pub struct ThreadPerRequest {
    spawned: AtomicU64,
}

impl ThreadPerRequest {
    /// Create an executor that spawns a thread per job.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Execute for ThreadPerRequest {
    fn execute(&self, priority: Priority, job: Job) -> Result<()> {
        let n = self.spawned.fetch_add(1, AtomicOrdering::Relaxed);
        thread::Builder::new()
            .name(format!("jsonwire-{}-{}", priority, n))
            .spawn(job)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn pool_runs_jobs_off_the_caller_thread() {
        let pool = WorkerPool::new(2).unwrap();
        let (tx, rx) = mpsc::channel();
        let caller = thread::current().id();

        pool.execute(
            Priority::Normal,
            Box::new(move || {
                tx.send(thread::current().id()).unwrap();
            }),
        )
        .unwrap();

        let worker = rx.recv_timeout(WAIT).unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn higher_priority_runs_first() {
        let pool = WorkerPool::new(1).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();

        // Occupy the only worker so the next jobs queue up.
        pool.execute(
            Priority::Normal,
            Box::new(move || {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
            }),
        )
        .unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        for (priority, label) in [
            (Priority::Low, "low"),
            (Priority::Urgent, "urgent"),
            (Priority::Normal, "normal-1"),
            (Priority::Normal, "normal-2"),
        ] {
            let tx = tx.clone();
            pool.execute(priority, Box::new(move || tx.send(label).unwrap()))
                .unwrap();
        }
        assert_eq!(pool.queued(), 4);

        gate_tx.send(()).unwrap();
        let order: Vec<_> = (0..4).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(order, vec!["urgent", "normal-1", "normal-2", "low"]);
    }

    #[test]
    fn stalled_job_does_not_block_submission_or_other_workers() {
        let pool = WorkerPool::new(2).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();

        pool.execute(
            Priority::High,
            Box::new(move || {
                gate_rx.recv().unwrap();
            }),
        )
        .unwrap();

        pool.execute(Priority::Low, Box::new(move || tx.send("done").unwrap()))
            .unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "done");
        gate_tx.send(()).unwrap();
    }

    #[test]
    fn shutdown_drains_queue_then_rejects() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            pool.execute(Priority::Normal, Box::new(move || tx.send(i).unwrap()))
                .unwrap();
        }
        pool.shutdown();

        let mut ran: Vec<i32> = rx.try_iter().collect();
        ran.sort();
        assert_eq!(ran, vec![0, 1, 2, 3, 4]);

        let err = pool
            .execute(Priority::Normal, Box::new(|| {}))
            .unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }

    #[test]
    fn dropping_the_pool_does_not_wait_for_running_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel();

        pool.execute(
            Priority::Normal,
            Box::new(move || {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
            }),
        )
        .unwrap();
        pool.execute(Priority::Normal, Box::new(move || tx.send("queued").unwrap()))
            .unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        let opener = thread::spawn(move || {
            thread::sleep(Duration::from_secs(2));
            gate_tx.send(()).unwrap();
        });

        let start = std::time::Instant::now();
        drop(pool);
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), "queued");
        opener.join().unwrap();
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(Priority::Normal, Box::new(|| panic!("boom")))
            .unwrap();
        pool.execute(Priority::Normal, Box::new(move || tx.send(1).unwrap()))
            .unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);
    }

    #[test]
    fn thread_per_request_names_threads_by_priority() {
        let executor = ThreadPerRequest::new();
        let (tx, rx) = mpsc::channel();

        executor
            .execute(
                Priority::High,
                Box::new(move || {
                    tx.send(thread::current().name().map(str::to_string)).unwrap();
                }),
            )
            .unwrap();

        let name = rx.recv_timeout(WAIT).unwrap().unwrap();
        assert_eq!(name, "jsonwire-high-0");
    }

    #[test]
    fn queued_order_is_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        for (seq, priority) in [Priority::Low, Priority::High, Priority::High, Priority::Normal]
            .into_iter()
            .enumerate()
        {
            heap.push(Queued {
                priority,
                seq: seq as u64,
                job: Box::new(|| {}),
            });
        }
        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|q| (q.priority, q.seq))
            .collect();
        assert_eq!(
            order,
            vec![
                (Priority::High, 1),
                (Priority::High, 2),
                (Priority::Normal, 3),
                (Priority::Low, 0),
            ]
        );
    }
}
