//! End-to-end run: fetch both inventories, pair them, diff every pair.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CompareConfig;
use crate::diff::{Comparison, Verdict};
use crate::error::FetchError;
use crate::inventory::fetch_inventory;
use crate::model::{Inventory, PolicySet};
use crate::policy::fetch_policy_sets;
use crate::resolver::{Collision, Correspondence, TargetOutcome, resolve};
use crate::source::Environment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub old_account_functions: usize,
    pub new_account_functions: usize,
    pub matched_functions: usize,
    pub passed: usize,
    pub needs_review: usize,
    pub unmatched_old: Vec<String>,
    pub unmatched_new: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_old: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_new: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<Collision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub summary: RunSummary,
    pub comparisons: Vec<Comparison>,
}

impl RunResult {
    /// True when every matched pair passed.
    pub fn all_passed(&self) -> bool {
        self.summary.needs_review == 0
    }
}

pub struct Reconciler {
    config: CompareConfig,
}

impl Reconciler {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Fetches both environments concurrently and reconciles them.
    ///
    /// Fails only when an environment cannot be inventoried at all; every
    /// per-function and per-policy failure degrades inside the result.
    pub async fn run(&self, old: &Environment, new: &Environment) -> Result<RunResult, FetchError> {
        let pool = self.config.pool();
        let (old_inventory, new_inventory) =
            tokio::try_join!(fetch_inventory(old, &pool), fetch_inventory(new, &pool))?;
        Ok(self
            .reconcile(old, &old_inventory, new, &new_inventory)
            .await)
    }

    /// Reconciles two already fetched inventories.
    pub async fn reconcile(
        &self,
        old_env: &Environment,
        old: &Inventory,
        new_env: &Environment,
        new: &Inventory,
    ) -> RunResult {
        let correspondence = resolve(old, new, &self.config.naming);
        info!(
            matched = correspondence.len(),
            unmatched_old = correspondence.unmatched_old().len(),
            unmatched_new = correspondence.unmatched_new().len(),
            "resolved function correspondence"
        );

        let policies = if self.config.compare_policies {
            Some(self.fetch_policies(&correspondence, old_env, old, new_env, new).await)
        } else {
            None
        };

        let mut comparisons = Vec::with_capacity(correspondence.len());
        for (new_name, old_name) in correspondence.pairs() {
            let (Some(old_record), Some(new_record)) = (old.get(old_name), new.get(new_name)) else {
                warn!(old = old_name, new = new_name, "matched function missing from inventory");
                continue;
            };
            let pair_policies = policies.as_ref().map(|(old_sets, new_sets)| {
                (
                    lookup(old_sets, &old_record.role_ref),
                    lookup(new_sets, &new_record.role_ref),
                )
            });
            let comparison = Comparison::new(old_record, new_record, pair_policies);
            if comparison.verdict() == Verdict::Review {
                info!(old = old_name, new = new_name, "differences found");
            }
            comparisons.push(comparison);
        }

        let summary = summarize(&correspondence, &comparisons, old_env, old, new_env, new);
        info!(
            matched = summary.matched_functions,
            passed = summary.passed,
            needs_review = summary.needs_review,
            "reconciliation complete"
        );
        RunResult {
            summary,
            comparisons,
        }
    }

    async fn fetch_policies(
        &self,
        correspondence: &Correspondence,
        old_env: &Environment,
        old: &Inventory,
        new_env: &Environment,
        new: &Inventory,
    ) -> (HashMap<String, PolicySet>, HashMap<String, PolicySet>) {
        let pool = self.config.pool();
        let old_roles: Vec<String> = correspondence
            .pairs()
            .filter_map(|(_, old_name)| old.get(old_name))
            .map(|record| record.role_ref.clone())
            .collect();
        let new_roles: Vec<String> = correspondence
            .pairs()
            .filter_map(|(new_name, _)| new.get(new_name))
            .map(|record| record.role_ref.clone())
            .collect();
        tokio::join!(
            fetch_policy_sets(old_env, old_roles, &pool),
            fetch_policy_sets(new_env, new_roles, &pool),
        )
    }
}

fn lookup<'a>(sets: &'a HashMap<String, PolicySet>, role_ref: &str) -> &'a PolicySet {
    static EMPTY: PolicySet = PolicySet {
        managed: BTreeSet::new(),
        inline: BTreeSet::new(),
    };
    sets.get(role_ref).unwrap_or(&EMPTY)
}

fn summarize(
    correspondence: &Correspondence,
    comparisons: &[Comparison],
    old_env: &Environment,
    old: &Inventory,
    new_env: &Environment,
    new: &Inventory,
) -> RunSummary {
    let passed = comparisons
        .iter()
        .filter(|c| c.verdict() == Verdict::Pass)
        .count();
    RunSummary {
        old_account_functions: old.len(),
        new_account_functions: new.len(),
        matched_functions: comparisons.len(),
        passed,
        needs_review: comparisons.len() - passed,
        unmatched_old: correspondence.unmatched_old().to_vec(),
        unmatched_new: correspondence.unmatched_new().to_vec(),
        dropped_old: old.dropped().to_vec(),
        dropped_new: new.dropped().to_vec(),
        collisions: correspondence.collisions().to_vec(),
        targets: correspondence.targets().to_vec(),
        old_account: old_env.account_id.clone(),
        new_account: new_env.account_id.clone(),
    }
}
