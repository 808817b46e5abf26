//! Deadline race for host calls that cannot be cancelled.
//!
//! The operation runs as its own task, so losing the race leaves it running.
//! Its late settlement can still be collected through [`LateSettlement`];
//! callers decide whether that result is still relevant.

use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum RaceError {
    #[error("operation task aborted before settling: {0}")]
    Aborted(String),
}

pub enum Race<T> {
    Settled(T),
    TimedOut(LateSettlement<T>),
}

/// Handle to an operation that lost the race against its deadline.
pub struct LateSettlement<T> {
    handle: JoinHandle<T>,
    deadline: Duration,
}

impl<T> LateSettlement<T> {
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the operation's eventual result.
    pub async fn settled(self) -> Result<T, RaceError> {
        self.handle
            .await
            .map_err(|err| RaceError::Aborted(err.to_string()))
    }
}

pub async fn with_timeout<F, T>(operation: F, deadline: Duration) -> Result<Race<T>, RaceError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(operation);
    tokio::select! {
        biased;
        joined = &mut handle => joined
            .map(Race::Settled)
            .map_err(|err| RaceError::Aborted(err.to_string())),
        _ = tokio::time::sleep(deadline) => Ok(Race::TimedOut(LateSettlement { handle, deadline })),
    }
}

#[cfg(test)]
#[path = "tests/timeout_tests.rs"]
mod tests;
