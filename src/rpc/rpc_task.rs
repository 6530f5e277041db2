use crate::rpc::RpcError;
use crate::utils::lock_or_recover;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

type Continuation<T> = Box<dyn FnOnce(&Result<T, RpcError>) + Send>;
type Outcome<T> = Arc<Result<T, RpcError>>;

struct TaskState<T> {
    outcome: Option<Outcome<T>>,
    notify: Option<oneshot::Sender<Outcome<T>>>,
    continuations: Vec<Continuation<T>>,
}

struct TaskShared<T> {
    state: Mutex<TaskState<T>>,
    completed: Condvar,
}

/// A completable, single-assignment result handle.
///
/// The task completes at most once, with either a value or an [`RpcError`].
/// It can be observed three ways: by blocking (`wait`), by registering a
/// continuation (`on_complete`), or by awaiting it as a `Future`. Clones
/// share the same outcome.
///
/// A task whose completer is dropped without completing it simply never
/// completes; this is how abandoned calls behave after their endpoint ends.
pub struct RpcTask<T> {
    shared: Arc<TaskShared<T>>,
    awaited: Shared<oneshot::Receiver<Outcome<T>>>,
}

impl<T> Clone for RpcTask<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            awaited: self.awaited.clone(),
        }
    }
}

impl<T> Default for RpcTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RpcTask<T> {
    /// An incomplete task.
    pub fn new() -> Self {
        let (notify, awaited) = oneshot::channel();
        Self {
            shared: Arc::new(TaskShared {
                state: Mutex::new(TaskState {
                    outcome: None,
                    notify: Some(notify),
                    continuations: Vec::new(),
                }),
                completed: Condvar::new(),
            }),
            awaited: awaited.shared(),
        }
    }

    pub fn from_outcome(outcome: Result<T, RpcError>) -> Self {
        let task = Self::new();
        task.complete(outcome);
        task
    }

    pub fn from_result(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    /// Completes the task. Returns `false` (and drops `outcome`) if it was
    /// already complete.
    pub fn complete(&self, outcome: Result<T, RpcError>) -> bool {
        let outcome = Arc::new(outcome);

        let (notify, continuations) = {
            let mut state = lock_or_recover(&self.shared.state);
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(Arc::clone(&outcome));
            (
                state.notify.take(),
                std::mem::take(&mut state.continuations),
            )
        };

        self.shared.completed.notify_all();

        if let Some(notify) = notify {
            // Every handle holds a receiver, so this cannot fail.
            let _ = notify.send(Arc::clone(&outcome));
        }
        for continuation in continuations {
            continuation(&outcome);
        }

        true
    }

    pub fn set_result(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    pub fn set_fault(&self, error: RpcError) -> bool {
        self.complete(Err(error))
    }

    pub fn is_completed(&self) -> bool {
        lock_or_recover(&self.shared.state).outcome.is_some()
    }

    /// Shared view of the outcome, if the task has completed.
    pub fn outcome(&self) -> Option<Outcome<T>> {
        lock_or_recover(&self.shared.state).outcome.clone()
    }

    /// Runs `f` once the task completes, on the completing thread. Runs it
    /// immediately on the calling thread if the task is already complete.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(&Result<T, RpcError>) + Send + 'static,
    {
        let mut state = lock_or_recover(&self.shared.state);
        if let Some(outcome) = state.outcome.clone() {
            drop(state);
            f(&outcome);
            return;
        }
        state.continuations.push(Box::new(f));
    }

    /// A task completed with `f(value)` when this one succeeds, or with the
    /// same error when it faults.
    pub fn map<U, F>(&self, f: F) -> RpcTask<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let mapped = RpcTask::<U>::new();
        let completer = mapped.clone();
        self.on_complete(move |outcome| {
            let next = match outcome {
                Ok(value) => Ok(f(value)),
                Err(e) => Err(e.clone()),
            };
            completer.complete(next);
        });
        mapped
    }

    fn wait_outcome(&self, timeout: Option<Duration>) -> Option<Outcome<T>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = lock_or_recover(&self.shared.state);

        loop {
            if let Some(outcome) = &state.outcome {
                return Some(Arc::clone(outcome));
            }

            state = match deadline {
                None => self
                    .shared
                    .completed
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.shared
                        .completed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
            };
        }
    }
}

impl<T: Clone> RpcTask<T> {
    /// The outcome, if the task has completed.
    pub fn try_result(&self) -> Option<Result<T, RpcError>> {
        self.outcome().map(|outcome| (*outcome).clone())
    }

    /// Blocks the current thread until the task completes.
    ///
    /// Never call this on the scheduler that is expected to complete the
    /// task; use the endpoint's synchronous call path instead, which pumps.
    pub fn wait(&self) -> Result<T, RpcError> {
        match self.wait_outcome(None) {
            Some(outcome) => (*outcome).clone(),
            None => Err(RpcError::Abandoned),
        }
    }

    /// Like `wait`, returning `None` if the task is still incomplete after
    /// `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, RpcError>> {
        self.wait_outcome(Some(timeout))
            .map(|outcome| (*outcome).clone())
    }
}

impl<T: Clone> Future for RpcTask<T> {
    type Output = Result<T, RpcError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Checked first so a completed `Shared` is never polled twice.
        if let Some(outcome) = self.outcome() {
            return Poll::Ready((*outcome).clone());
        }
        match self.awaited.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready((*outcome).clone()),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(RpcError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for RpcTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcTask")
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn completes_only_once() {
        let task = RpcTask::<u32>::new();
        assert!(!task.is_completed());
        assert!(task.set_result(7));
        assert!(!task.set_fault(RpcError::Abandoned));
        assert_eq!(task.try_result(), Some(Ok(7)));
    }

    #[test]
    fn continuations_run_on_completion_or_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let task = RpcTask::<String>::new();

        let h = hits.clone();
        task.on_complete(move |outcome| {
            assert_eq!(outcome.as_deref(), Ok("done"));
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        task.set_result("done".to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let h = hits.clone();
        task.on_complete(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn map_forwards_faults() {
        let task = RpcTask::<u8>::new();
        let doubled = RpcTask::map(&task, |v| u16::from(*v) * 2);
        task.set_fault(RpcError::RemoteFault {
            message: "nope".into(),
        });
        assert_eq!(
            doubled.try_result(),
            Some(Err(RpcError::RemoteFault {
                message: "nope".into()
            }))
        );
    }

    #[test]
    fn wait_unblocks_from_another_thread() {
        let task = RpcTask::<i64>::new();
        let completer = task.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            completer.set_result(-3);
        });

        assert_eq!(task.wait(), Ok(-3));
        handle.join().unwrap();
    }

    #[test]
    fn clones_await_the_same_outcome() {
        let task = RpcTask::<u32>::new();
        let completer = task.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            completer.set_result(5);
        });

        let both = futures::future::join(task.clone(), task.clone());
        assert_eq!(futures::executor::block_on(both), (Ok(5), Ok(5)));
        assert_eq!(futures::executor::block_on(task), Ok(5));
        handle.join().unwrap();
    }

    #[test]
    fn wait_timeout_expires_on_incomplete_task() {
        let task = RpcTask::<()>::new();
        assert_eq!(task.wait_timeout(Duration::from_millis(10)), None);
    }
}
