mod scheduler_error;
mod single_thread_scheduler;

pub use scheduler_error::SchedulerError;
pub use single_thread_scheduler::{SchedulerWork, SingleThreadScheduler};
