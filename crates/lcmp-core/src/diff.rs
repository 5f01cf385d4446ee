//! Field, key and set level differences for one matched pair.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{FunctionRecord, PolicySet};

/// Deployment fields that take part in the config diff, in report order.
pub const COMPARED_FIELDS: [&str; 6] = [
    "Runtime",
    "Handler",
    "MemorySize",
    "Timeout",
    "ReservedConcurrencyLimit",
    "DeadLetterConfig",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

pub type ConfigDiff = IndexMap<String, FieldChange>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub key: String,
    pub old_value: String,
    pub new_value: String,
}

/// Environment-variable differences in three disjoint buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvDiff {
    pub missing_in_new: Vec<String>,
    pub missing_in_old: Vec<String>,
    pub different_values: Vec<ValueChange>,
}

impl EnvDiff {
    pub fn is_empty(&self) -> bool {
        self.missing_in_new.is_empty()
            && self.missing_in_old.is_empty()
            && self.different_values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyDiff {
    pub managed_only_in_old: Vec<String>,
    pub managed_only_in_new: Vec<String>,
    pub inline_only_in_old: Vec<String>,
    pub inline_only_in_new: Vec<String>,
}

impl PolicyDiff {
    pub fn is_empty(&self) -> bool {
        self.managed_only_in_old.is_empty()
            && self.managed_only_in_new.is_empty()
            && self.inline_only_in_old.is_empty()
            && self.inline_only_in_new.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Review,
}

impl Verdict {
    /// Policy differences are informational and never change the verdict.
    pub fn from_diffs(config: &ConfigDiff, env: &EnvDiff) -> Self {
        if config.is_empty() && env.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Review
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Review => "REVIEW",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn compare_config(old: &FunctionRecord, new: &FunctionRecord) -> ConfigDiff {
    COMPARED_FIELDS
        .iter()
        .filter_map(|field| {
            let old_value = old.config_value(field);
            let new_value = new.config_value(field);
            (old_value != new_value).then(|| {
                (
                    field.to_string(),
                    FieldChange {
                        old: old_value.cloned(),
                        new: new_value.cloned(),
                    },
                )
            })
        })
        .collect()
}

pub fn compare_env_vars(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> EnvDiff {
    let mut diff = EnvDiff::default();
    for (key, old_value) in old {
        match new.get(key) {
            None => diff.missing_in_new.push(key.clone()),
            Some(new_value) if new_value != old_value => diff.different_values.push(ValueChange {
                key: key.clone(),
                old_value: old_value.clone(),
                new_value: new_value.clone(),
            }),
            Some(_) => {}
        }
    }
    diff.missing_in_old = new
        .keys()
        .filter(|key| !old.contains_key(*key))
        .cloned()
        .collect();
    diff
}

/// Set differences in both directions; `None` when the sets are equal.
pub fn compare_policies(old: &PolicySet, new: &PolicySet) -> Option<PolicyDiff> {
    let diff = PolicyDiff {
        managed_only_in_old: only_in(&old.managed, &new.managed),
        managed_only_in_new: only_in(&new.managed, &old.managed),
        inline_only_in_old: only_in(&old.inline, &new.inline),
        inline_only_in_new: only_in(&new.inline, &old.inline),
    };
    (!diff.is_empty()).then_some(diff)
}

fn only_in(left: &BTreeSet<String>, right: &BTreeSet<String>) -> Vec<String> {
    left.difference(right).cloned().collect()
}

pub fn compare(old: &FunctionRecord, new: &FunctionRecord) -> (ConfigDiff, EnvDiff) {
    (
        compare_config(old, new),
        compare_env_vars(&old.env_vars, &new.env_vars),
    )
}

/// Outcome of comparing one matched pair. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    old_function: String,
    new_function: String,
    config_differences: ConfigDiff,
    env_var_differences: EnvDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    policy_differences: Option<PolicyDiff>,
    status: Verdict,
}

impl Comparison {
    pub fn new(
        old: &FunctionRecord,
        new: &FunctionRecord,
        policies: Option<(&PolicySet, &PolicySet)>,
    ) -> Self {
        let (config_differences, env_var_differences) = compare(old, new);
        let status = Verdict::from_diffs(&config_differences, &env_var_differences);
        Self {
            old_function: old.name.clone(),
            new_function: new.name.clone(),
            config_differences,
            env_var_differences,
            policy_differences: policies.and_then(|(o, n)| compare_policies(o, n)),
            status,
        }
    }

    pub fn old_function(&self) -> &str {
        &self.old_function
    }

    pub fn new_function(&self) -> &str {
        &self.new_function
    }

    pub fn config_differences(&self) -> &ConfigDiff {
        &self.config_differences
    }

    pub fn env_var_differences(&self) -> &EnvDiff {
        &self.env_var_differences
    }

    pub fn policy_differences(&self) -> Option<&PolicyDiff> {
        self.policy_differences.as_ref()
    }

    pub fn verdict(&self) -> Verdict {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lambda(name: &str) -> FunctionRecord {
        FunctionRecord::new(name)
            .with_config("Runtime", "python3.12")
            .with_config("Handler", "app.handler")
            .with_config("MemorySize", 256)
            .with_config("Timeout", 10)
            .with_env("TABLE", "orders")
            .with_role("arn:aws:iam::111111111111:role/orders-exec")
    }

    #[test]
    fn identical_records_pass() {
        let old = lambda("orders");
        let new = lambda("orders");
        let policies = PolicySet::new(["AWSLambdaBasicExecutionRole"], ["inline-sqs"]);
        let cmp = Comparison::new(&old, &new, Some((&policies, &policies)));
        assert!(cmp.config_differences().is_empty());
        assert!(cmp.env_var_differences().is_empty());
        assert!(cmp.policy_differences().is_none());
        assert_eq!(cmp.verdict(), Verdict::Pass);
    }

    #[test]
    fn timeout_change_is_reported_and_needs_review() {
        let old = lambda("authdev1-foo-lambda");
        let new = lambda("authdev1-foo-lambda").with_config("Timeout", 30);
        let cmp = Comparison::new(&old, &new, None);
        assert_eq!(
            serde_json::to_value(cmp.config_differences()).unwrap(),
            json!({"Timeout": {"old": 10, "new": 30}})
        );
        assert_eq!(cmp.verdict(), Verdict::Review);
    }

    #[test]
    fn absent_and_null_fields_are_equal_but_differ_from_values() {
        let old = FunctionRecord::new("f").with_config("DeadLetterConfig", Value::Null);
        let new = FunctionRecord::new("f");
        assert!(compare_config(&old, &new).is_empty());

        let new = new.with_config("ReservedConcurrencyLimit", 5);
        let diff = compare_config(&old, &new);
        assert_eq!(
            diff.get("ReservedConcurrencyLimit"),
            Some(&FieldChange {
                old: None,
                new: Some(json!(5)),
            })
        );
    }

    #[test]
    fn fields_outside_allow_list_are_ignored() {
        let old = lambda("f").with_config("CodeSha256", "aaa");
        let new = lambda("f").with_config("CodeSha256", "bbb");
        assert!(compare_config(&old, &new).is_empty());
    }

    #[test]
    fn env_keys_land_in_exactly_one_bucket() {
        let old = FunctionRecord::new("f")
            .with_env("SAME", "1")
            .with_env("CHANGED", "old")
            .with_env("GONE", "x");
        let new = FunctionRecord::new("f")
            .with_env("SAME", "1")
            .with_env("CHANGED", "new")
            .with_env("ADDED", "y");
        let diff = compare_env_vars(&old.env_vars, &new.env_vars);

        assert_eq!(diff.missing_in_new, vec!["GONE"]);
        assert_eq!(diff.missing_in_old, vec!["ADDED"]);
        assert_eq!(
            diff.different_values,
            vec![ValueChange {
                key: "CHANGED".into(),
                old_value: "old".into(),
                new_value: "new".into(),
            }]
        );

        let keys: BTreeSet<&str> = old.env_vars.keys().chain(new.env_vars.keys()).map(String::as_str).collect();
        for key in keys {
            let hits = [
                diff.missing_in_new.iter().any(|k| k == key),
                diff.missing_in_old.iter().any(|k| k == key),
                diff.different_values.iter().any(|c| c.key == key),
            ]
            .iter()
            .filter(|hit| **hit)
            .count();
            assert!(hits <= 1, "{key} appears in {hits} buckets");
        }
    }

    #[test]
    fn env_comparison_is_exact_string_equality() {
        let old = FunctionRecord::new("f").with_env("PORT", "8080");
        let new = FunctionRecord::new("f").with_env("PORT", "08080");
        assert_eq!(compare_env_vars(&old.env_vars, &new.env_vars).different_values.len(), 1);
    }

    #[test]
    fn policy_differences_do_not_change_verdict() {
        let old = lambda("f");
        let new = lambda("f");
        let old_policies = PolicySet::new(["AWSLambdaBasicExecutionRole", "LegacyAccess"], ["sqs"]);
        let new_policies = PolicySet::new(["AWSLambdaBasicExecutionRole"], ["sqs", "kms"]);
        let cmp = Comparison::new(&old, &new, Some((&old_policies, &new_policies)));

        assert_eq!(cmp.verdict(), Verdict::Pass);
        assert_eq!(
            cmp.policy_differences(),
            Some(&PolicyDiff {
                managed_only_in_old: vec!["LegacyAccess".into()],
                managed_only_in_new: vec![],
                inline_only_in_old: vec![],
                inline_only_in_new: vec!["kms".into()],
            })
        );
    }

    #[test]
    fn comparison_serializes_with_report_keys() {
        let cmp = Comparison::new(&lambda("old-f"), &lambda("new-f"), None);
        let value = serde_json::to_value(&cmp).unwrap();
        assert_eq!(value["old_function"], "old-f");
        assert_eq!(value["new_function"], "new-f");
        assert_eq!(value["status"], "PASS");
        assert_eq!(value["env_var_differences"]["missing_in_new"], json!([]));
        assert!(value.get("policy_differences").is_none());
    }
}
