//! Name normalization used to pair functions across environments.
//!
//! A *core name* is what remains of a function name once the environment
//! prefix, an optional filter substring and one known suffix are stripped.
//! The rules are plain data so they can be loaded from a file and tested
//! without any fetch logic.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Suffix tokens checked in order; the first match is stripped.
pub const DEFAULT_SUFFIXES: &[&str] = &["-lambda", "_lambda", "-function", "-fn"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Environment prefix; names must start with `<prefix>-` (case-insensitive).
    pub prefix: Option<String>,
    /// Names must contain this substring (case-insensitive); it is removed from core names.
    pub filter: Option<String>,
    pub suffixes: Vec<String>,
    /// Restricts matching to these functions, given by name or core name.
    pub targets: Option<Vec<String>>,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            prefix: None,
            filter: None,
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            targets: None,
        }
    }
}

/// One deterministic rewrite applied while computing a core name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeStep {
    StripPrefix(String),
    RemoveSubstring(String),
    StripSuffix(Vec<String>),
}

impl NormalizeStep {
    /// Applies the step to an already lower-cased name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NormalizeStep::StripPrefix(prefix) => {
                name.strip_prefix(prefix.as_str()).unwrap_or(name).to_string()
            }
            NormalizeStep::RemoveSubstring(needle) => remove_first(name, needle),
            NormalizeStep::StripSuffix(suffixes) => suffixes
                .iter()
                .find(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
                .map(|suffix| name[..name.len() - suffix.len()].to_string())
                .unwrap_or_else(|| name.to_string()),
        }
    }
}

impl NamingRules {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_targets<I>(mut self, targets: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// `<prefix>-` in lower case, if a non-empty prefix is configured.
    fn prefix_token(&self) -> Option<String> {
        non_empty(self.prefix.as_deref()).map(|p| format!("{}-", p.to_lowercase()))
    }

    fn filter_token(&self) -> Option<String> {
        non_empty(self.filter.as_deref()).map(str::to_lowercase)
    }

    /// The ordered rewrites that turn a lower-cased name into its core name.
    pub fn steps(&self) -> Vec<NormalizeStep> {
        let mut steps = Vec::new();
        if let Some(prefix) = self.prefix_token() {
            steps.push(NormalizeStep::StripPrefix(prefix));
        }
        if let Some(filter) = self.filter_token() {
            steps.push(NormalizeStep::RemoveSubstring(filter));
        }
        let suffixes: Vec<String> = self
            .suffixes
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect();
        if !suffixes.is_empty() {
            steps.push(NormalizeStep::StripSuffix(suffixes));
        }
        steps
    }

    /// Whether `name` passes the prefix and filter restrictions.
    pub fn admits(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if let Some(prefix) = self.prefix_token() {
            if !lower.starts_with(&prefix) {
                return false;
            }
        }
        if let Some(filter) = self.filter_token() {
            if !lower.contains(&filter) {
                return false;
            }
        }
        true
    }

    pub fn core_name(&self, name: &str) -> String {
        self.steps()
            .iter()
            .fold(name.to_lowercase(), |current, step| step.apply(&current))
    }

    /// Target list as core names, de-duplicated in the given order.
    pub fn target_core_names(&self) -> Option<Vec<String>> {
        let targets = self.targets.as_ref()?;
        let mut seen = HashSet::new();
        Some(
            targets
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| self.core_name(t))
                .filter(|core| seen.insert(core.clone()))
                .collect(),
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_separator(c: char) -> bool {
    c == '-' || c == '_'
}

/// Removes the first occurrence of `needle`, leaving a single separator at
/// the seam and none at either end.
fn remove_first(name: &str, needle: &str) -> String {
    let Some(idx) = name.find(needle) else {
        return name.to_string();
    };
    let head = &name[..idx];
    let tail = &name[idx + needle.len()..];
    if head.is_empty() {
        return tail.strip_prefix(is_separator).unwrap_or(tail).to_string();
    }
    if tail.is_empty() {
        return head.strip_suffix(is_separator).unwrap_or(head).to_string();
    }
    if head.ends_with(is_separator) && tail.starts_with(is_separator) {
        return format!("{head}{}", &tail[1..]);
    }
    format!("{head}{tail}")
}
