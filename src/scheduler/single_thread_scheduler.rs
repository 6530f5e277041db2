use crate::constants::{DEFAULT_PUMP_INTERVAL_MS, SCHEDULER_JOIN_TIMEOUT_MS};
use crate::scheduler::SchedulerError;
use crate::utils::{lock_or_recover, panic_message};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use once_cell::sync::OnceCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

pub type SchedulerWork = Box<dyn FnOnce() + Send>;

struct SchedulerShared {
    name: String,
    /// Taken on shutdown; dropping it disconnects the worker.
    work_tx: Mutex<Option<Sender<SchedulerWork>>>,
    work_rx: Receiver<SchedulerWork>,
    /// Items queued or executing; more than one executing only while pumping.
    outstanding: AtomicUsize,
    closed: AtomicBool,
    idle_tx: Sender<()>,
    idle_rx: Receiver<()>,
    worker_thread: OnceCell<ThreadId>,
}

impl SchedulerShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn closed_error(&self) -> SchedulerError {
        SchedulerError::Closed {
            name: self.name.clone(),
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Coalesced; waiters re-check the counter anyway.
            let _ = self.idle_tx.try_send(());
        }
    }

    /// Runs `work`, or drops it unrun once the scheduler is closed.
    fn run_item(&self, work: SchedulerWork) {
        if self.is_closed() {
            drop(work);
        } else if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
            tracing::error!(
                "[{}] Work item panicked: {}",
                self.name,
                panic_message(payload.as_ref())
            );
        }
        self.finish_one();
    }

    fn worker_loop(&self) {
        tracing::debug!("[{}] Scheduler worker started", self.name);

        // Ends once shutdown drops the sender and the queue is drained.
        while let Ok(work) = self.work_rx.recv() {
            self.run_item(work);
        }

        tracing::debug!("[{}] Scheduler worker exiting", self.name);
    }
}

/// A FIFO executor backed by exactly one dedicated thread.
///
/// Work items run one at a time, in the order they were queued. The only
/// exception is [`pump_until`](Self::pump_until): a running item may drain
/// further items inline while it waits for a condition, which is how a
/// synchronous call made from the worker thread still sees its response.
///
/// A panicking item is caught and logged; the worker carries on with the
/// next one.
pub struct SingleThreadScheduler {
    shared: Arc<SchedulerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Disconnects when the worker thread returns.
    worker_done: Receiver<()>,
}

impl SingleThreadScheduler {
    /// Starts the worker thread. The thread carries `name`.
    pub fn spawn(name: impl Into<String>) -> Result<Self, SchedulerError> {
        let name = name.into();
        let (work_tx, work_rx) = crossbeam::channel::unbounded::<SchedulerWork>();
        let (idle_tx, idle_rx) = crossbeam::channel::bounded(1);
        let (done_tx, worker_done) = crossbeam::channel::bounded::<()>(1);

        let shared = Arc::new(SchedulerShared {
            name: name.clone(),
            work_tx: Mutex::new(Some(work_tx)),
            work_rx,
            outstanding: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            idle_tx,
            idle_rx,
            worker_thread: OnceCell::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = done_tx;
                worker.worker_loop();
            })
            .map_err(|e| SchedulerError::Spawn(e.to_string()))?;

        let _ = shared.worker_thread.set(handle.thread().id());
        tracing::info!("Scheduler `{}` started", name);

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
            worker_done,
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Appends `work` to the queue.
    pub fn queue<F>(&self, work: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let work_tx = lock_or_recover(&self.shared.work_tx);
        let Some(work_tx) = work_tx.as_ref() else {
            return Err(self.shared.closed_error());
        };

        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);
        if work_tx.send(Box::new(work)).is_err() {
            self.shared.finish_one();
            return Err(self.shared.closed_error());
        }
        Ok(())
    }

    /// True when nothing is queued and nothing is running, or once closed.
    pub fn is_idle(&self) -> bool {
        self.shared.is_closed()
            || (self.shared.work_rx.is_empty() && self.shared.outstanding.load(Ordering::SeqCst) == 0)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// True when called from this scheduler's worker thread.
    pub fn is_active_thread(&self) -> bool {
        self.shared
            .worker_thread
            .get()
            .is_some_and(|id| *id == std::thread::current().id())
    }

    /// Runs queued items inline until `condition` holds.
    ///
    /// Must be called from the worker thread. `condition` is re-checked after
    /// every item and at least once per `poll_interval`, so it may also be
    /// satisfied by another thread. Fails with `Closed` if the scheduler
    /// shuts down first.
    pub fn pump_until<F>(&self, mut condition: F, poll_interval: Duration) -> Result<(), SchedulerError>
    where
        F: FnMut() -> bool,
    {
        if !self.is_active_thread() {
            return Err(SchedulerError::NotWorkerThread {
                name: self.shared.name.clone(),
            });
        }

        loop {
            if condition() {
                return Ok(());
            }
            if self.shared.is_closed() {
                return Err(self.shared.closed_error());
            }

            match self.shared.work_rx.recv_timeout(poll_interval) {
                Ok(work) => {
                    tracing::trace!("[{}] Pumping nested work item", self.shared.name);
                    self.shared.run_item(work);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(self.shared.closed_error()),
            }
        }
    }

    /// Blocks until the scheduler is idle or `timeout` passes. Returns whether
    /// it became idle.
    ///
    /// On the worker thread the scheduler is by definition busy, so this
    /// returns `false` immediately instead of deadlocking.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        if self.is_active_thread() {
            return false;
        }

        let deadline = Instant::now() + timeout;
        let recheck = Duration::from_millis(DEFAULT_PUMP_INTERVAL_MS);
        loop {
            if self.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Another waiter may consume the signal; the bounded slice
            // covers that.
            let _ = self.shared.idle_rx.recv_timeout(recheck.min(deadline - now));
        }
    }

    /// Closes the scheduler. Queued items are dropped unrun, pumps return
    /// `Closed`, and the worker is joined unless this is the worker itself.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // No more sends; the worker's `recv` disconnects once drained.
        drop(lock_or_recover(&self.shared.work_tx).take());

        let mut dropped = 0usize;
        for work in self.shared.work_rx.try_iter() {
            drop(work);
            self.shared.finish_one();
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(
                "[{}] Dropping {} queued work items on shutdown",
                self.shared.name,
                dropped
            );
        }

        tracing::info!("Scheduler `{}` shut down", self.shared.name);

        if self.is_active_thread() {
            return;
        }

        let finished = match self
            .worker_done
            .recv_timeout(Duration::from_millis(SCHEDULER_JOIN_TIMEOUT_MS))
        {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };

        let handle = lock_or_recover(&self.handle).take();
        match (finished, handle) {
            (true, Some(handle)) => {
                if handle.join().is_err() {
                    tracing::error!("[{}] Scheduler worker panicked", self.shared.name);
                }
            }
            (false, Some(_)) => {
                tracing::warn!(
                    "[{}] Worker still busy after {} ms; detaching",
                    self.shared.name,
                    SCHEDULER_JOIN_TIMEOUT_MS
                );
            }
            (_, None) => {}
        }
    }
}

impl Drop for SingleThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SingleThreadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleThreadScheduler")
            .field("name", &self.shared.name)
            .finish()
    }
}
