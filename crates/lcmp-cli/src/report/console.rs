//! Human-readable narrative of a run.

use std::io::{self, Write};

use lcmp_core::{Comparison, RunResult, TargetStatus, Verdict};
use serde_json::Value;

pub fn write_narrative(out: &mut impl Write, result: &RunResult) -> io::Result<()> {
    let summary = &result.summary;
    if !summary.targets.is_empty() {
        writeln!(out, "Target functions:")?;
        for target in &summary.targets {
            let line = match target.status {
                TargetStatus::Matched => format!(
                    "Matched: {} -> {}",
                    target.old_name.as_deref().unwrap_or_default(),
                    target.new_name.as_deref().unwrap_or_default()
                ),
                TargetStatus::MissingInNew => format!(
                    "Missing in new account: {} (found as {} in old)",
                    target.target,
                    target.old_name.as_deref().unwrap_or_default()
                ),
                TargetStatus::MissingInOld => format!(
                    "Missing in old account: {} (found as {} in new)",
                    target.target,
                    target.new_name.as_deref().unwrap_or_default()
                ),
                TargetStatus::NotFound => {
                    format!("Not found in either account: {}", target.target)
                }
            };
            writeln!(out, "  {line}")?;
        }
        writeln!(out)?;
    }

    for comparison in &result.comparisons {
        write_comparison(out, comparison)?;
    }

    writeln!(out)?;
    writeln!(out, "Summary:")?;
    writeln!(out, "  Old account functions: {}", summary.old_account_functions)?;
    writeln!(out, "  New account functions: {}", summary.new_account_functions)?;
    writeln!(out, "  Total comparisons: {}", summary.matched_functions)?;
    writeln!(out, "  Passed: {}", summary.passed)?;
    writeln!(out, "  Need review: {}", summary.needs_review)?;
    write_names(out, "Missing in new account", &summary.unmatched_old)?;
    write_names(out, "Only in new account", &summary.unmatched_new)?;
    write_names(out, "Not fetched from old account", &summary.dropped_old)?;
    write_names(out, "Not fetched from new account", &summary.dropped_new)?;
    for collision in &summary.collisions {
        writeln!(
            out,
            "  Name collision on '{}': compared {}, ignored {}",
            collision.core_name, collision.kept, collision.shadowed
        )?;
    }
    Ok(())
}

fn write_comparison(out: &mut impl Write, comparison: &Comparison) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Comparing {} -> {}",
        comparison.old_function(),
        comparison.new_function()
    )?;
    if comparison.verdict() == Verdict::Pass {
        writeln!(out, "  PASS - No significant differences")?;
    } else {
        writeln!(out, "  REVIEW - Differences found:")?;
        let config = comparison.config_differences();
        if !config.is_empty() {
            writeln!(out, "    Config differences:")?;
            for (field, change) in config {
                writeln!(
                    out,
                    "      {field}: {} -> {}",
                    display(change.old.as_ref()),
                    display(change.new.as_ref())
                )?;
            }
        }
        let env = comparison.env_var_differences();
        if !env.missing_in_new.is_empty() {
            writeln!(out, "    Missing env vars in new: {}", env.missing_in_new.join(", "))?;
        }
        if !env.missing_in_old.is_empty() {
            writeln!(out, "    New env vars: {}", env.missing_in_old.join(", "))?;
        }
        if !env.different_values.is_empty() {
            writeln!(out, "    Changed env vars:")?;
            for change in &env.different_values {
                writeln!(
                    out,
                    "      {}: {} -> {}",
                    change.key, change.old_value, change.new_value
                )?;
            }
        }
    }

    if let Some(policies) = comparison.policy_differences() {
        writeln!(out, "    Policy differences:")?;
        for (label, names) in [
            ("managed only in old", &policies.managed_only_in_old),
            ("managed only in new", &policies.managed_only_in_new),
            ("inline only in old", &policies.inline_only_in_old),
            ("inline only in new", &policies.inline_only_in_new),
        ] {
            if !names.is_empty() {
                writeln!(out, "      {label}: {}", names.join(", "))?;
            }
        }
    }
    Ok(())
}

fn write_names(out: &mut impl Write, label: &str, names: &[String]) -> io::Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    writeln!(out, "  {label} ({}):", names.len())?;
    for name in names {
        writeln!(out, "    - {name}")?;
    }
    Ok(())
}

fn display(value: Option<&Value>) -> String {
    match value {
        None => "(none)".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
