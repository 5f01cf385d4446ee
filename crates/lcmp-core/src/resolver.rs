//! Pairs new-environment functions with their old-environment counterparts.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::Inventory;
use crate::naming::NamingRules;

/// Two old names reduced to the same core name; the later one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub core_name: String,
    pub kept: String,
    pub shadowed: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Matched,
    MissingInNew,
    MissingInOld,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub target: String,
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

/// Injective mapping from new names to old names plus everything left over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Correspondence {
    matches: IndexMap<String, String>,
    unmatched_new: Vec<String>,
    unmatched_old: Vec<String>,
    collisions: Vec<Collision>,
    targets: Vec<TargetOutcome>,
}

impl Correspondence {
    /// Matched pairs as `(new, old)` in new-environment traversal order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.matches.iter().map(|(n, o)| (n.as_str(), o.as_str()))
    }

    pub fn old_for(&self, new_name: &str) -> Option<&str> {
        self.matches.get(new_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn unmatched_new(&self) -> &[String] {
        &self.unmatched_new
    }

    pub fn unmatched_old(&self) -> &[String] {
        &self.unmatched_old
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Per-target outcomes; empty unless the rules carry a target list.
    pub fn targets(&self) -> &[TargetOutcome] {
        &self.targets
    }
}

/// Computes the correspondence between two inventories.
///
/// Old names sharing a core name collide and the later name (in name order)
/// wins the index slot; the shadowed name ends up unmatched. A new name whose
/// counterpart was already claimed by an earlier new name is reported as
/// unmatched, so no old name is ever the target of two matches.
pub fn resolve(old: &Inventory, new: &Inventory, rules: &NamingRules) -> Correspondence {
    let targets = rules.target_core_names();
    let target_set: Option<HashSet<&str>> = targets
        .as_ref()
        .map(|t| t.iter().map(String::as_str).collect());
    let selected = |name: &str| -> Option<String> {
        if !rules.admits(name) {
            return None;
        }
        let core = rules.core_name(name);
        match &target_set {
            Some(set) if !set.contains(core.as_str()) => None,
            _ => Some(core),
        }
    };

    let filtered_old: Vec<(&str, String)> = old
        .names()
        .filter_map(|name| selected(name).map(|core| (name, core)))
        .collect();
    let filtered_new: Vec<(&str, String)> = new
        .names()
        .filter_map(|name| selected(name).map(|core| (name, core)))
        .collect();

    let mut index: HashMap<&str, &str> = HashMap::new();
    let mut collisions = Vec::new();
    for (name, core) in &filtered_old {
        if let Some(shadowed) = index.insert(core.as_str(), *name) {
            warn!(core_name = %core, kept = %name, shadowed = %shadowed, "old functions share a core name, keeping the later one");
            collisions.push(Collision {
                core_name: core.clone(),
                kept: name.to_string(),
                shadowed: shadowed.to_string(),
            });
        }
    }

    let mut matches = IndexMap::new();
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    let mut first_new_by_core: HashMap<&str, &str> = HashMap::new();
    let mut unmatched_new = Vec::new();
    for (name, core) in &filtered_new {
        first_new_by_core.entry(core.as_str()).or_insert(*name);
        match index.get(core.as_str()).copied() {
            Some(old_name) => {
                if let Some(previous) = claimed.get(old_name) {
                    warn!(new = %name, old = %old_name, claimed_by = %previous, "old function already matched, leaving new function unmatched");
                    unmatched_new.push(name.to_string());
                } else {
                    debug!(new = %name, old = %old_name, "matched");
                    claimed.insert(old_name, *name);
                    matches.insert(name.to_string(), old_name.to_string());
                }
            }
            None => unmatched_new.push(name.to_string()),
        }
    }

    let unmatched_old = filtered_old
        .iter()
        .filter(|(name, _)| !claimed.contains_key(*name))
        .map(|(name, _)| name.to_string())
        .collect();

    let targets = targets
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|target| {
            let old_name = index.get(target.as_str()).map(|n| n.to_string());
            let new_name = first_new_by_core.get(target.as_str()).map(|n| n.to_string());
            let status = match (&old_name, &new_name) {
                (Some(_), Some(_)) => TargetStatus::Matched,
                (Some(_), None) => TargetStatus::MissingInNew,
                (None, Some(_)) => TargetStatus::MissingInOld,
                (None, None) => TargetStatus::NotFound,
            };
            TargetOutcome {
                target: target.clone(),
                status,
                old_name,
                new_name,
            }
        })
        .collect();

    Correspondence {
        matches,
        unmatched_new,
        unmatched_old,
        collisions,
        targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionRecord;

    fn inventory(names: &[&str]) -> Inventory {
        Inventory::from_records(names.iter().map(|n| FunctionRecord::new(*n)))
    }

    #[test]
    fn exact_names_match_and_leftovers_are_reported() {
        let old = inventory(&["a-lambda", "b-lambda"]);
        let new = inventory(&["a-lambda"]);
        let c = resolve(&old, &new, &NamingRules::default());
        assert_eq!(c.pairs().collect::<Vec<_>>(), vec![("a-lambda", "a-lambda")]);
        assert_eq!(c.unmatched_old(), ["b-lambda".to_string()]);
        assert!(c.unmatched_new().is_empty());
    }

    #[test]
    fn suffix_drift_still_matches() {
        let old = inventory(&["dev-orders-lambda", "dev-billing-function"]);
        let new = inventory(&["dev-orders-fn", "dev-billing_lambda", "dev-extra"]);
        let c = resolve(&old, &new, &NamingRules::default().with_prefix("dev"));
        assert_eq!(c.old_for("dev-orders-fn"), Some("dev-orders-lambda"));
        assert_eq!(c.old_for("dev-billing_lambda"), Some("dev-billing-function"));
        assert_eq!(c.unmatched_new(), ["dev-extra".to_string()]);
        assert!(c.unmatched_old().is_empty());
    }

    #[test]
    fn prefix_filter_excludes_other_environments() {
        let old = inventory(&["dev-orders-lambda", "prod-orders-lambda"]);
        let new = inventory(&["DEV-orders-lambda", "staging-orders-lambda"]);
        let c = resolve(&old, &new, &NamingRules::default().with_prefix("dev"));
        assert_eq!(c.len(), 1);
        assert_eq!(c.old_for("DEV-orders-lambda"), Some("dev-orders-lambda"));
        assert!(c.unmatched_old().is_empty());
        assert!(c.unmatched_new().is_empty());
    }

    #[test]
    fn colliding_old_names_resolve_last_write_wins() {
        // "orders-lambda" and "orders-function" both reduce to "orders";
        // name order puts "orders-lambda" last, so it wins the index slot.
        let old = inventory(&["orders-function", "orders-lambda"]);
        let new = inventory(&["orders"]);
        let c = resolve(&old, &new, &NamingRules::default());

        assert_eq!(c.old_for("orders"), Some("orders-lambda"));
        assert_eq!(
            c.collisions(),
            [Collision {
                core_name: "orders".into(),
                kept: "orders-lambda".into(),
                shadowed: "orders-function".into(),
            }]
        );
        assert_eq!(c.unmatched_old(), ["orders-function".to_string()]);
    }

    #[test]
    fn an_old_function_is_never_matched_twice() {
        let old = inventory(&["orders-lambda"]);
        let new = inventory(&["orders-fn", "orders-function"]);
        let c = resolve(&old, &new, &NamingRules::default());

        assert_eq!(c.len(), 1);
        let targets: HashSet<&str> = c.pairs().map(|(_, old)| old).collect();
        assert_eq!(targets.len(), c.len());
        // name order visits "orders-fn" first
        assert_eq!(c.old_for("orders-fn"), Some("orders-lambda"));
        assert_eq!(c.unmatched_new(), ["orders-function".to_string()]);
    }

    #[test]
    fn resolving_twice_gives_identical_result() {
        let old = inventory(&["dev-a-lambda", "dev-b-fn", "dev-c", "dev-c-lambda"]);
        let new = inventory(&["dev-a", "dev-b-lambda", "dev-c-function", "dev-d"]);
        let rules = NamingRules::default().with_prefix("dev");
        assert_eq!(resolve(&old, &new, &rules), resolve(&old, &new, &rules));
    }

    #[test]
    fn target_outcomes_cover_every_case() {
        let old = inventory(&["dev-login-lambda", "dev-logout-lambda", "dev-other-lambda"]);
        let new = inventory(&["dev-login-lambda", "dev-signup-lambda", "dev-other-lambda"]);
        let rules = NamingRules::default().with_prefix("dev").with_targets([
            "login-lambda",
            "logout-lambda",
            "signup-lambda",
            "vanished-lambda",
        ]);
        let c = resolve(&old, &new, &rules);

        let statuses: Vec<_> = c.targets().iter().map(|t| (t.target.as_str(), t.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("login", TargetStatus::Matched),
                ("logout", TargetStatus::MissingInNew),
                ("signup", TargetStatus::MissingInOld),
                ("vanished", TargetStatus::NotFound),
            ]
        );
        // non-target functions are ignored entirely
        assert_eq!(c.len(), 1);
        assert_eq!(c.unmatched_old(), ["dev-logout-lambda".to_string()]);
        assert_eq!(c.unmatched_new(), ["dev-signup-lambda".to_string()]);
    }
}
