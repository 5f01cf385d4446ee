//! `lcmp render` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

use crate::opts::GlobalOpts;
use crate::output::print_success;
use crate::report::html;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON result written by `lcmp compare --output`
    pub input: PathBuf,

    /// HTML file to write (default: lambda-comparison-report[-<prefix>].html)
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Prefix shown in the report title
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn cmd_render(opts: &GlobalOpts, args: &RenderArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;
    let report: Value = serde_json::from_str(&text)
        .with_context(|| format!("parse {}", args.input.display()))?;
    let path = write_html(&report, args.html.clone(), args.prefix.as_deref())?;
    print_success(
        opts,
        json!({ "html": path.display().to_string() }),
        vec![],
    )
}

/// Writes the HTML report and returns the path it went to.
pub fn write_html(report: &Value, path: Option<PathBuf>, prefix: Option<&str>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| PathBuf::from(html::default_file_name(prefix)));
    std::fs::write(&path, html::render(report, prefix))
        .with_context(|| format!("write HTML report {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_report_from_saved_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("result.json");
        std::fs::write(
            &input,
            r#"{"summary": {"matched_functions": 0, "unmatched_old": [], "unmatched_new": []}, "comparisons": []}"#,
        )
        .unwrap();
        let target = dir.path().join("report.html");

        let args = RenderArgs {
            input,
            html: Some(target.clone()),
            prefix: None,
        };
        cmd_render(&GlobalOpts::default(), &args).unwrap();

        let html = std::fs::read_to_string(target).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Old account: <strong>Unknown</strong>"));
    }
}
