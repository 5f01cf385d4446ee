use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration snapshot of one deployed function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    /// Deployment fields keyed by their provider name (`Runtime`, `Timeout`, ...).
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    /// Reference to the execution identity, e.g. a role ARN.
    #[serde(default)]
    pub role_ref: String,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            role_ref: String::new(),
        }
    }

    pub fn with_config(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(field.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_role(mut self, role_ref: impl Into<String>) -> Self {
        self.role_ref = role_ref.into();
        self
    }

    /// Returns a config field, treating an explicit `null` as absent.
    pub fn config_value(&self, field: &str) -> Option<&Value> {
        self.config.get(field).filter(|v| !v.is_null())
    }

    pub fn role_name(&self) -> Option<&str> {
        role_name(&self.role_ref)
    }
}

/// Role name carried by an execution-identity reference: its last path segment.
///
/// `arn:aws:iam::123456789012:role/service-role/orders-exec` yields `orders-exec`.
pub fn role_name(role_ref: &str) -> Option<&str> {
    role_ref
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// All functions discovered in one environment, keyed and ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    functions: BTreeMap<String, FunctionRecord>,
    dropped: Vec<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FunctionRecord>) -> Self {
        let mut inventory = Self::new();
        for record in records {
            inventory.insert(record);
        }
        inventory
    }

    pub fn insert(&mut self, record: FunctionRecord) {
        self.functions.insert(record.name.clone(), record);
    }

    /// Remembers a function that was listed but whose details could not be fetched.
    pub fn record_dropped(&mut self, name: impl Into<String>) {
        self.dropped.push(name.into());
        self.dropped.sort();
    }

    pub fn get(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.values()
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Policies attached to an execution identity. Identifiers only, no documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default)]
    pub managed: BTreeSet<String>,
    #[serde(default)]
    pub inline: BTreeSet<String>,
}

impl PolicySet {
    pub fn new<M, I>(managed: M, inline: I) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            managed: managed.into_iter().map(Into::into).collect(),
            inline: inline.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty() && self.inline.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_is_last_path_segment() {
        assert_eq!(
            role_name("arn:aws:iam::123456789012:role/service-role/orders-exec"),
            Some("orders-exec")
        );
        assert_eq!(role_name("orders-exec"), Some("orders-exec"));
        assert_eq!(role_name(""), None);
        assert_eq!(role_name("arn:aws:iam::1:role/"), None);
    }

    #[test]
    fn null_config_values_read_as_absent() {
        let record = FunctionRecord::new("f")
            .with_config("Timeout", Value::Null)
            .with_config("Handler", "index.handler");
        assert!(record.config_value("Timeout").is_none());
        assert_eq!(
            record.config_value("Handler"),
            Some(&Value::from("index.handler"))
        );
    }

    #[test]
    fn dropped_names_stay_sorted() {
        let mut inventory = Inventory::new();
        inventory.record_dropped("b");
        inventory.record_dropped("a");
        assert_eq!(inventory.dropped(), ["a".to_string(), "b".to_string()]);
    }
}
