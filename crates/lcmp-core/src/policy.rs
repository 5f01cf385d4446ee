//! On-demand lookup of the policies attached to execution identities.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::model::{PolicySet, role_name};
use crate::pool::{PoolConfig, TaskOutcome, WorkerPool};
use crate::source::{Environment, PolicySource};

/// Fetches the managed and inline policies attached to `role_ref`.
///
/// Never fails: any listing error or timeout degrades to an empty set.
pub async fn fetch_policy_set(
    source: &dyn PolicySource,
    role_ref: &str,
    call_timeout: Duration,
) -> PolicySet {
    let Some(role) = role_name(role_ref) else {
        warn!(role_ref, "execution identity has no role name, using empty policy set");
        return PolicySet::default();
    };

    let (managed, inline) = tokio::join!(
        bounded(call_timeout, source.list_managed_policies(role)),
        bounded(call_timeout, source.list_inline_policies(role)),
    );
    match (managed, inline) {
        (Ok(managed), Ok(inline)) => {
            debug!(role, managed = managed.len(), inline = inline.len(), "policies fetched");
            PolicySet::new(managed, inline)
        }
        (Err(error), _) | (_, Err(error)) => {
            warn!(role, error = %error, "policy lookup failed, using empty policy set");
            PolicySet::default()
        }
    }
}

/// Resolves each distinct role reference once, in parallel.
pub async fn fetch_policy_sets<I>(
    env: &Environment,
    role_refs: I,
    pool: &PoolConfig,
) -> HashMap<String, PolicySet>
where
    I: IntoIterator<Item = String>,
{
    let unique: BTreeSet<String> = role_refs.into_iter().collect();
    let policies = Arc::clone(&env.policies);
    let call_timeout = pool.task_timeout;

    // Each role makes two calls, so the per-task cap is doubled.
    let pool = PoolConfig {
        task_timeout: call_timeout * 2,
        ..*pool
    };
    let outcomes = WorkerPool::new(pool)
        .run(unique.into_iter().collect(), move |role_ref| {
            let policies = Arc::clone(&policies);
            async move { Ok(fetch_policy_set(policies.as_ref(), &role_ref, call_timeout).await) }
        })
        .await;

    outcomes
        .into_iter()
        .map(|outcome| match outcome {
            TaskOutcome::Done { key, value } => (key, value),
            TaskOutcome::Failed { key, error } => {
                warn!(environment = %env.label, role_ref = %key, error = %error, "policy lookup failed, using empty policy set");
                (key, PolicySet::default())
            }
        })
        .collect()
}

async fn bounded<F>(limit: Duration, call: F) -> Result<Vec<String>, SourceError>
where
    F: std::future::Future<Output = Result<Vec<String>, SourceError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(limit)),
    }
}
