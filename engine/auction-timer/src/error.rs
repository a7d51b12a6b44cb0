//! Error types for timer handles and the tick scheduler

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyRunning,

    #[error("timer is not running")]
    NotRunning,

    #[error("timer has already completed")]
    Expired,

    #[error("scheduler is already running")]
    SchedulerAlreadyRunning,
}
