//! Matching and reconciliation engine for serverless function migrations.
//!
//! The crate discovers the functions deployed in two environments, pairs them
//! up by normalized name, and diffs configuration, environment variables and
//! attached policies for every pair. Network access happens only through the
//! [`source`] traits, so the engine itself is agnostic of any cloud SDK.

pub mod config;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod model;
pub mod naming;
pub mod policy;
pub mod pool;
pub mod reconcile;
pub mod resolver;
pub mod source;

pub use config::CompareConfig;
pub use diff::{Comparison, ConfigDiff, EnvDiff, FieldChange, PolicyDiff, ValueChange, Verdict};
pub use error::{FetchError, SourceError};
pub use inventory::fetch_inventory;
pub use model::{FunctionRecord, Inventory, PolicySet};
pub use naming::NamingRules;
pub use reconcile::{Reconciler, RunResult, RunSummary};
pub use resolver::{Collision, Correspondence, TargetOutcome, TargetStatus, resolve};
pub use source::{Environment, FunctionSource, PolicySource};
