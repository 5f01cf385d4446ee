//! `lcmp explain` command.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::rules::NamingArgs;
use crate::opts::GlobalOpts;
use crate::output::print_success;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub naming: NamingArgs,

    /// Function names to reduce
    #[arg(required = true)]
    pub names: Vec<String>,
}

pub fn cmd_explain(opts: &GlobalOpts, args: &ExplainArgs) -> Result<()> {
    let rules = args.naming.naming_rules()?;
    let targets = rules.target_core_names();

    let rows: Vec<_> = args
        .names
        .iter()
        .map(|name| {
            let core = rules.core_name(name);
            let targeted = targets.as_ref().is_none_or(|t| t.contains(&core));
            json!({
                "name": name,
                "admitted": rules.admits(name) && targeted,
                "core_name": core,
            })
        })
        .collect();

    if opts.wants_json() {
        return print_success(opts, json!(rows), vec![]);
    }
    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            let marker = if row["admitted"] == true { " " } else { "x" };
            format!(
                "{marker} {} -> {}",
                row["name"].as_str().unwrap_or_default(),
                row["core_name"].as_str().unwrap_or_default()
            )
        })
        .collect();
    print_success(opts, json!(lines.join("\n")), vec![])
}
