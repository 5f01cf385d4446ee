//! Bounded fan-out/fan-in over independent fetch tasks.
//!
//! Keys are fed to the pool only as worker slots free up, so at most
//! `max_workers` tasks exist at any moment. Each task owns its result slot
//! and outcomes are handed back in completion order, so no lock guards the
//! accumulated results.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::warn;

use crate::error::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Applied to each task from the moment it takes a worker slot.
    pub task_timeout: Duration,
}

/// Result of one pool task, tagged with the key it was started for.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Done { key: String, value: T },
    Failed { key: String, error: SourceError },
}

impl<T> TaskOutcome<T> {
    pub fn key(&self) -> &str {
        match self {
            TaskOutcome::Done { key, .. } | TaskOutcome::Failed { key, .. } => key,
        }
    }
}

pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Runs `task` once per key with at most `max_workers` in flight.
    ///
    /// Outcomes arrive in completion order. A task that panics yields a
    /// transient failure for its key.
    pub async fn run<T, F, Fut>(&self, keys: Vec<String>, task: F) -> Vec<TaskOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
    {
        match self.run_until(keys, task, |_| false).await {
            Ok(outcomes) | Err(Stopped { outcomes, .. }) => outcomes,
        }
    }

    /// Like [`WorkerPool::run`], but stops at the first outcome for which
    /// `stop` returns true. Tasks still running are aborted and keys not yet
    /// started are never handed to `task`.
    pub async fn run_until<T, F, Fut, S>(
        &self,
        keys: Vec<String>,
        task: F,
        stop: S,
    ) -> Result<Vec<TaskOutcome<T>>, Stopped<T>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, SourceError>> + Send + 'static,
        S: Fn(&TaskOutcome<T>) -> bool,
    {
        let workers = self.config.max_workers.max(1);
        let limit = self.config.task_timeout;
        let mut pending = keys.into_iter();
        let mut tasks = JoinSet::new();
        let mut outcomes = Vec::with_capacity(pending.len());

        loop {
            while tasks.len() < workers {
                let Some(key) = pending.next() else { break };
                let work = AssertUnwindSafe(task(key.clone())).catch_unwind();
                tasks.spawn(async move {
                    let result = match timeout(limit, work).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(panic)) => Err(SourceError::transient(format!(
                            "worker panicked: {}",
                            panic_message(panic.as_ref())
                        ))),
                        Err(_) => Err(SourceError::Timeout(limit)),
                    };
                    match result {
                        Ok(value) => TaskOutcome::Done { key, value },
                        Err(error) => TaskOutcome::Failed { key, error },
                    }
                });
            }

            let Some(joined) = tasks.join_next().await else {
                return Ok(outcomes);
            };
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "worker task aborted");
                    continue;
                }
            };
            if stop(&outcome) {
                tasks.abort_all();
                return Err(Stopped { outcome, outcomes });
            }
            outcomes.push(outcome);
        }
    }
}

/// A run cut short by its stop condition.
#[derive(Debug)]
pub struct Stopped<T> {
    /// The outcome that stopped the run.
    pub outcome: TaskOutcome<T>,
    /// Outcomes collected before it.
    pub outcomes: Vec<TaskOutcome<T>>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
