//! Deterministic in-memory environments for exercising the reconciliation engine.
//!
//! [`InMemoryEnvironment`] implements both collaborator traits from
//! `lcmp-core` on top of plain maps. Tests configure functions, attached
//! policies and injected failures with builder methods, then turn the
//! builder into an [`Environment`] plus a [`CallStats`] handle to inspect
//! how the engine called it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use lcmp_core::model::role_name;
use lcmp_core::{Environment, FunctionRecord, FunctionSource, PolicySet, PolicySource, SourceError};

pub const ACCOUNT_ROLE_PREFIX: &str = "arn:aws:iam::000000000000:role/";

/// A Lambda-shaped record with the usual deployment fields filled in.
pub fn lambda_record(name: &str) -> FunctionRecord {
    FunctionRecord::new(name)
        .with_config("Runtime", "python3.12")
        .with_config("Handler", "app.handler")
        .with_config("MemorySize", 128)
        .with_config("Timeout", 10)
        .with_config("ReservedConcurrencyLimit", serde_json::Value::Null)
        .with_config("DeadLetterConfig", serde_json::Value::Null)
        .with_role(format!("{ACCOUNT_ROLE_PREFIX}{name}-role"))
}

/// Counters shared between an in-memory environment and the test body.
#[derive(Debug, Default)]
pub struct CallStats {
    listings: AtomicUsize,
    detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    policy_lookups: Mutex<HashMap<String, usize>>,
}

impl CallStats {
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Highest number of detail fetches observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Number of managed-policy listings made for `role`.
    pub fn policy_lookups(&self, role: &str) -> usize {
        self.lookups().get(role).copied().unwrap_or(0)
    }

    pub fn total_policy_lookups(&self) -> usize {
        self.lookups().values().sum()
    }

    fn lookups(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.policy_lookups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builder and backing store for one fake environment.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEnvironment {
    label: String,
    account_id: Option<String>,
    functions: BTreeMap<String, FunctionRecord>,
    role_policies: HashMap<String, PolicySet>,
    function_failures: HashMap<String, SourceError>,
    function_delays: HashMap<String, Duration>,
    role_failures: HashMap<String, SourceError>,
    role_delays: HashMap<String, Duration>,
    listing_failure: Option<SourceError>,
    listing_stalls: bool,
    latency: Duration,
    page_size: usize,
}

impl InMemoryEnvironment {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            page_size: 50,
            ..Self::default()
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_function(mut self, record: FunctionRecord) -> Self {
        self.functions.insert(record.name.clone(), record);
        self
    }

    pub fn with_functions(self, records: impl IntoIterator<Item = FunctionRecord>) -> Self {
        records.into_iter().fold(self, Self::with_function)
    }

    /// Attaches policies to the role with the given name (not the full reference).
    pub fn with_role_policies(mut self, role: impl Into<String>, policies: PolicySet) -> Self {
        self.role_policies.insert(role.into(), policies);
        self
    }

    /// Every detail fetch sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn fail_function(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.function_failures
            .insert(name.into(), SourceError::transient(message));
        self
    }

    pub fn fail_function_auth(mut self, name: impl Into<String>) -> Self {
        self.function_failures
            .insert(name.into(), SourceError::auth("security token expired"));
        self
    }

    /// Makes the detail fetch of `name` take `delay` instead of the base latency.
    pub fn delay_function(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.function_delays.insert(name.into(), delay);
        self
    }

    /// The listing yields its first page and then fails with `error`.
    pub fn fail_listing(mut self, error: SourceError) -> Self {
        self.listing_failure = Some(error);
        self
    }

    /// The listing yields its first page and then never answers again.
    pub fn stall_listing(mut self) -> Self {
        self.listing_stalls = true;
        self
    }

    /// Makes both policy listings for `role` take `delay`.
    pub fn delay_role(mut self, role: impl Into<String>, delay: Duration) -> Self {
        self.role_delays.insert(role.into(), delay);
        self
    }

    pub fn fail_role(mut self, role: impl Into<String>, message: impl Into<String>) -> Self {
        self.role_failures
            .insert(role.into(), SourceError::transient(message));
        self
    }

    pub fn into_environment(self) -> (Environment, Arc<CallStats>) {
        let stats = Arc::new(CallStats::default());
        let label = self.label.clone();
        let account_id = self.account_id.clone();
        let source = Arc::new(InMemorySource {
            state: self,
            stats: Arc::clone(&stats),
        });
        let mut env = Environment::new(label, source.clone(), source);
        if let Some(account_id) = account_id {
            env = env.with_account_id(account_id);
        }
        (env, stats)
    }
}

struct InMemorySource {
    state: InMemoryEnvironment,
    stats: Arc<CallStats>,
}

#[async_trait]
impl FunctionSource for InMemorySource {
    fn list_function_names(&self) -> BoxStream<'_, Result<String, SourceError>> {
        self.stats.listings.fetch_add(1, Ordering::SeqCst);
        let names: Vec<String> = self.state.functions.keys().cloned().collect();
        let pages: Vec<Vec<String>> = names
            .chunks(self.state.page_size.max(1))
            .map(<[String]>::to_vec)
            .collect();

        match &self.state.listing_failure {
            Some(error) => {
                let first = pages.into_iter().next().unwrap_or_default();
                stream::iter(first.into_iter().map(Ok))
                    .chain(stream::once(futures::future::ready(Err(error.clone()))))
                    .boxed()
            }
            None if self.state.listing_stalls => {
                let first = pages.into_iter().next().unwrap_or_default();
                stream::iter(first.into_iter().map(Ok))
                    .chain(stream::pending())
                    .boxed()
            }
            None => stream::iter(pages)
                .flat_map(|page| stream::iter(page.into_iter().map(Ok)))
                .boxed(),
        }
    }

    async fn get_function(&self, name: &str) -> Result<FunctionRecord, SourceError> {
        self.stats.enter();
        let delay = self
            .state
            .function_delays
            .get(name)
            .copied()
            .unwrap_or(self.state.latency);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.stats.leave();

        if let Some(error) = self.state.function_failures.get(name) {
            return Err(error.clone());
        }
        self.state
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::transient(format!("function not found: {name}")))
    }
}

#[async_trait]
impl PolicySource for InMemorySource {
    async fn list_managed_policies(&self, role: &str) -> Result<Vec<String>, SourceError> {
        *self.stats.lookups().entry(role.to_string()).or_default() += 1;
        self.role_latency(role).await;
        self.policies(role)
            .map(|set| set.managed.into_iter().collect())
    }

    async fn list_inline_policies(&self, role: &str) -> Result<Vec<String>, SourceError> {
        self.role_latency(role).await;
        self.policies(role)
            .map(|set| set.inline.into_iter().collect())
    }
}

impl InMemorySource {
    async fn role_latency(&self, role: &str) {
        if let Some(delay) = self.state.role_delays.get(role) {
            tokio::time::sleep(*delay).await;
        }
    }

    fn policies(&self, role: &str) -> Result<PolicySet, SourceError> {
        if let Some(error) = self.state.role_failures.get(role) {
            return Err(error.clone());
        }
        Ok(self.state.role_policies.get(role).cloned().unwrap_or_default())
    }
}

/// Role name for a record built with [`lambda_record`] or any role reference.
pub fn role_of(record: &FunctionRecord) -> String {
    role_name(&record.role_ref).unwrap_or_default().to_string()
}
