use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler has been shut down and accepts no more work.
    Closed { name: String },

    /// A worker-only operation (such as pumping) was called from another thread.
    NotWorkerThread { name: String },

    /// The worker thread could not be started.
    Spawn(String),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Closed { name } => write!(f, "scheduler `{}` is closed", name),
            SchedulerError::NotWorkerThread { name } => write!(
                f,
                "operation requires the worker thread of scheduler `{}`",
                name
            ),
            SchedulerError::Spawn(msg) => write!(f, "failed to spawn scheduler thread: {}", msg),
        }
    }
}

impl std::error::Error for SchedulerError {}
