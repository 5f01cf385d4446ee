//! Discovery of every function deployed in one environment.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{FetchError, SourceError};
use crate::model::Inventory;
use crate::pool::{PoolConfig, Stopped, TaskOutcome, WorkerPool};
use crate::source::Environment;

/// Lists every function in `env` and fetches each configuration through a
/// bounded worker pool.
///
/// A function whose detail fetch fails or times out is dropped and recorded
/// in [`Inventory::dropped`]; the rest of the inventory is still returned.
/// Listing failures abort the environment, and so does the first
/// authentication failure: fetches still running are cancelled.
pub async fn fetch_inventory(env: &Environment, pool: &PoolConfig) -> Result<Inventory, FetchError> {
    let names = list_names(env, pool).await?;
    info!(
        environment = %env.label,
        count = names.len(),
        "found {} functions, fetching details",
        names.len()
    );

    let source = Arc::clone(&env.functions);
    let outcomes = WorkerPool::new(*pool)
        .run_until(
            names,
            move |name| {
                let source = Arc::clone(&source);
                async move { source.get_function(&name).await }
            },
            |outcome| matches!(outcome, TaskOutcome::Failed { error, .. } if error.is_auth()),
        )
        .await;

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(Stopped { outcome, .. }) => {
            warn!(
                environment = %env.label,
                function = %outcome.key(),
                "authentication failed during detail fetch, aborting"
            );
            let message = match outcome {
                TaskOutcome::Failed { error: SourceError::Auth(message), .. } => message,
                other => format!("detail fetch of {} stopped", other.key()),
            };
            return Err(FetchError::Auth {
                environment: env.label.clone(),
                message,
            });
        }
    };

    let mut inventory = Inventory::new();
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Done { key, value } => {
                if value.name != key {
                    debug!(listed = %key, returned = %value.name, "function renamed between list and fetch");
                }
                inventory.insert(value);
            }
            TaskOutcome::Failed { key, error } => {
                warn!(
                    environment = %env.label,
                    function = %key,
                    error = %error,
                    "dropping function: detail fetch failed"
                );
                inventory.record_dropped(key);
            }
        }
    }

    info!(
        environment = %env.label,
        fetched = inventory.len(),
        dropped = inventory.dropped().len(),
        "inventory complete"
    );
    Ok(inventory)
}

/// Drains the listing completely; the total is known before any detail fetch.
async fn list_names(env: &Environment, pool: &PoolConfig) -> Result<Vec<String>, FetchError> {
    let mut pages = env.functions.list_function_names();
    let mut names = Vec::new();
    loop {
        let next = match timeout(pool.task_timeout, pages.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(SourceError::Timeout(pool.task_timeout))),
        };
        match next {
            Some(Ok(name)) => names.push(name),
            Some(Err(SourceError::Auth(message))) => {
                return Err(FetchError::Auth {
                    environment: env.label.clone(),
                    message,
                });
            }
            Some(Err(source)) => {
                return Err(FetchError::Listing {
                    environment: env.label.clone(),
                    source,
                });
            }
            None => break,
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}
