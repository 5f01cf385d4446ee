//! Naming-rule flags shared by `compare` and `explain`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lcmp_core::NamingRules;

#[derive(Args, Debug, Clone, Default)]
pub struct NamingArgs {
    /// Environment prefix; only functions named `<prefix>-...` are compared
    #[arg(long, env = "LCMP_PREFIX")]
    pub prefix: Option<String>,

    /// Only compare functions containing this substring (removed when matching)
    #[arg(long)]
    pub filter: Option<String>,

    /// Compare only these functions (repeatable); per-target outcomes are reported
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// JSON file with naming rules (prefix, filter, suffixes, targets)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,
}

impl NamingArgs {
    /// Rules from `--rules`, overridden by any explicit flag.
    pub fn naming_rules(&self) -> Result<NamingRules> {
        let mut rules = match &self.rules {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read naming rules {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse naming rules {}", path.display()))?
            }
            None => NamingRules::default(),
        };
        if let Some(prefix) = &self.prefix {
            rules.prefix = Some(prefix.clone());
        }
        if let Some(filter) = &self.filter {
            rules.filter = Some(filter.clone());
        }
        if !self.targets.is_empty() {
            rules.targets = Some(self.targets.clone());
        }
        Ok(rules)
    }
}
