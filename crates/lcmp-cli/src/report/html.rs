//! Self-contained HTML report.
//!
//! Works on the serialized result so a JSON file saved by an earlier run can
//! be rendered again without touching either account.

use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const UNKNOWN_ACCOUNT: &str = "Unknown";

static SQS_ACCOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"sqs\.[a-z0-9-]+\.amazonaws\.com/(\d{12})/").expect("valid SQS queue URL pattern")
});

/// Default report file name for an optional prefix.
pub fn default_file_name(prefix: Option<&str>) -> String {
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("lambda-comparison-report-{prefix}.html"),
        None => "lambda-comparison-report.html".to_string(),
    }
}

/// Old and new account ids: from the summary when known, else from SQS queue
/// URLs found in changed environment variables.
pub fn account_ids(report: &Value) -> (String, String) {
    let summary = &report["summary"];
    let from_summary = |key: &str| summary[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);
    let (mut old, mut new) = (from_summary("old_account"), from_summary("new_account"));

    if old.is_none() || new.is_none() {
        if let Some((old_id, new_id)) = sqs_account_ids(report) {
            old.get_or_insert(old_id);
            new.get_or_insert(new_id);
        }
    }
    (
        old.unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string()),
        new.unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string()),
    )
}

fn sqs_account_ids(report: &Value) -> Option<(String, String)> {
    let account = |text: &str| {
        SQS_ACCOUNT
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    report["comparisons"]
        .as_array()?
        .iter()
        .filter_map(|c| c["env_var_differences"]["different_values"].as_array())
        .flatten()
        .find_map(|change| {
            let old = account(change["old_value"].as_str()?)?;
            let new = account(change["new_value"].as_str()?)?;
            Some((old, new))
        })
}

pub fn render(report: &Value, prefix: Option<&str>) -> String {
    let (old_account, new_account) = account_ids(report);
    let summary = &report["summary"];
    let title = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("Lambda Migration Comparison Report - {}", prefix.to_uppercase()),
        None => "Lambda Migration Comparison Report".to_string(),
    };

    let mut cards = String::new();
    if let Some(comparisons) = report["comparisons"].as_array() {
        for comparison in comparisons {
            cards.push_str(&card(comparison));
        }
    }

    let mut unmatched = String::new();
    unmatched.push_str(&name_list("Missing in new account", &summary["unmatched_old"]));
    unmatched.push_str(&name_list("New in new account", &summary["unmatched_new"]));
    unmatched.push_str(&name_list("Not fetched (old account)", &summary["dropped_old"]));
    unmatched.push_str(&name_list("Not fetched (new account)", &summary["dropped_new"]));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
body {{ font-family: -apple-system, 'Segoe UI', Arial, sans-serif; margin: 0; padding: 20px; background: #f5f7fa; color: #333; }}
.header {{ text-align: center; margin-bottom: 30px; padding: 20px; background: white; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
.header h1 {{ color: #232f3e; margin: 0 0 10px 0; }}
.summary {{ display: flex; justify-content: center; gap: 40px; margin: 20px 0; }}
.summary-number {{ font-size: 32px; font-weight: bold; color: #ff9900; }}
.summary-label {{ font-size: 14px; color: #666; }}
details {{ background: white; margin-bottom: 10px; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }}
summary {{ padding: 15px 20px; cursor: pointer; display: flex; justify-content: space-between; font-weight: 600; }}
.content {{ padding: 0 20px 20px 20px; }}
.section-title {{ font-weight: 600; margin: 15px 0 8px 0; color: #232f3e; }}
.diff-item {{ font-family: monospace; margin: 4px 0; }}
.diff-removed {{ color: #d13212; }}
.diff-added {{ color: #1d8102; }}
.status-PASS {{ color: #1d8102; }}
.status-REVIEW {{ color: #ff9900; }}
.leftovers {{ background: white; padding: 15px 20px; border-radius: 8px; margin-top: 20px; }}
</style>
</head>
<body>
<div class="header">
<h1>{title}</h1>
<p>Old account: <strong>{old_account}</strong> &rarr; New account: <strong>{new_account}</strong></p>
<div class="summary">
{old_count}
{new_count}
{matched}
{passed}
{review}
</div>
</div>
<div id="functions">
{cards}</div>
<div class="leftovers">
{unmatched}</div>
<script type="application/json" id="report-data">
{data}
</script>
</body>
</html>
"#,
        title = encode_text(&title),
        old_account = encode_text(&old_account),
        new_account = encode_text(&new_account),
        old_count = summary_item(&summary["old_account_functions"], "Old Account Functions"),
        new_count = summary_item(&summary["new_account_functions"], "New Account Functions"),
        matched = summary_item(&summary["matched_functions"], "Matched Functions"),
        passed = summary_item(&summary["passed"], "Passed"),
        review = summary_item(&summary["needs_review"], "Need Review"),
        data = embed_json(report),
    )
}

/// The report JSON made safe for a `<script>` element; `<` is only ever
/// inside strings, where the unicode escape is equivalent.
fn embed_json(report: &Value) -> String {
    serde_json::to_string_pretty(report)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
}

fn summary_item(value: &Value, label: &str) -> String {
    format!(
        "<div class=\"summary-item\"><div class=\"summary-number\">{}</div><div class=\"summary-label\">{label}</div></div>",
        value.as_u64().unwrap_or(0)
    )
}

fn card(comparison: &Value) -> String {
    let new_name = comparison["new_function"].as_str().unwrap_or_default();
    let old_name = comparison["old_function"].as_str().unwrap_or_default();
    let status = comparison["status"].as_str().unwrap_or("REVIEW");

    let mut body = String::new();
    if let Some(fields) = comparison["config_differences"].as_object().filter(|f| !f.is_empty()) {
        body.push_str("<div class=\"section-title\">Configuration Differences</div>\n");
        for (field, change) in fields {
            body.push_str(&change_item(field, &display(&change["old"]), &display(&change["new"])));
        }
    }

    let env = &comparison["env_var_differences"];
    let env_sections = [
        ("Missing in New Account", "diff-removed", '-', &env["missing_in_new"]),
        ("New in New Account", "diff-added", '+', &env["missing_in_old"]),
    ];
    let changed = env["different_values"].as_array().filter(|c| !c.is_empty());
    let has_env = changed.is_some()
        || env_sections
            .iter()
            .any(|(_, _, _, keys)| keys.as_array().is_some_and(|k| !k.is_empty()));
    if has_env {
        body.push_str("<div class=\"section-title\">Environment Variable Differences</div>\n");
        for (heading, class, sign, keys) in env_sections {
            let Some(keys) = keys.as_array().filter(|k| !k.is_empty()) else {
                continue;
            };
            body.push_str(&format!("<div class=\"diff-item\"><strong>{heading}:</strong></div>\n"));
            for key in keys {
                body.push_str(&format!(
                    "<div class=\"diff-item\"><span class=\"{class}\">{sign} {}</span></div>\n",
                    encode_text(key.as_str().unwrap_or_default())
                ));
            }
        }
        if let Some(changed) = changed {
            body.push_str("<div class=\"diff-item\"><strong>Changed Values:</strong></div>\n");
            for change in changed {
                body.push_str(&change_item(
                    change["key"].as_str().unwrap_or_default(),
                    change["old_value"].as_str().unwrap_or_default(),
                    change["new_value"].as_str().unwrap_or_default(),
                ));
            }
        }
    }

    if let Some(policies) = comparison["policy_differences"].as_object() {
        body.push_str("<div class=\"section-title\">Policy Differences</div>\n");
        for (key, label, class, sign) in [
            ("managed_only_in_old", "Managed, old only", "diff-removed", '-'),
            ("managed_only_in_new", "Managed, new only", "diff-added", '+'),
            ("inline_only_in_old", "Inline, old only", "diff-removed", '-'),
            ("inline_only_in_new", "Inline, new only", "diff-added", '+'),
        ] {
            for name in policies.get(key).and_then(Value::as_array).into_iter().flatten() {
                body.push_str(&format!(
                    "<div class=\"diff-item\">{label}: <span class=\"{class}\">{sign} {}</span></div>\n",
                    encode_text(name.as_str().unwrap_or_default())
                ));
            }
        }
    }

    if body.is_empty() {
        body.push_str("<p>No differences found.</p>\n");
    }

    format!(
        "<details data-old=\"{old_attr}\">\n<summary><span>{new}</span><span class=\"status-{status_class}\">{status}</span></summary>\n<div class=\"content\">\n<div class=\"diff-item\">old: {old}</div>\n{body}</div>\n</details>\n",
        old_attr = encode_double_quoted_attribute(old_name),
        new = encode_text(new_name),
        old = encode_text(old_name),
        status_class = encode_double_quoted_attribute(status),
        status = encode_text(status),
    )
}

fn change_item(key: &str, old: &str, new: &str) -> String {
    format!(
        "<div class=\"diff-item\"><strong>{}:</strong><br><span class=\"diff-removed\">- {}</span><br><span class=\"diff-added\">+ {}</span></div>\n",
        encode_text(key),
        encode_text(old),
        encode_text(new)
    )
}

fn name_list(heading: &str, names: &Value) -> String {
    let Some(names) = names.as_array().filter(|n| !n.is_empty()) else {
        return String::new();
    };
    let mut out = format!("<div class=\"section-title\">{heading} ({})</div>\n", names.len());
    for name in names {
        out.push_str(&format!(
            "<div class=\"diff-item\">{}</div>\n",
            encode_text(name.as_str().unwrap_or_default())
        ));
    }
    out
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn report() -> Value {
        json!({
            "summary": {
                "old_account_functions": 2,
                "new_account_functions": 1,
                "matched_functions": 1,
                "passed": 0,
                "needs_review": 1,
                "unmatched_old": ["dev-legacy-lambda"],
                "unmatched_new": []
            },
            "comparisons": [{
                "old_function": "dev-orders-lambda",
                "new_function": "dev-orders-fn",
                "config_differences": {"Timeout": {"old": 10, "new": 30}},
                "env_var_differences": {
                    "missing_in_new": ["<script>alert(1)</script>"],
                    "missing_in_old": [],
                    "different_values": [{
                        "key": "QUEUE_URL",
                        "old_value": "https://sqs.eu-west-2.amazonaws.com/111111111111/orders",
                        "new_value": "https://sqs.eu-west-2.amazonaws.com/222222222222/orders"
                    }]
                },
                "status": "REVIEW"
            }]
        })
    }

    #[test]
    fn account_ids_fall_back_to_queue_urls() {
        assert_eq!(
            account_ids(&report()),
            ("111111111111".to_string(), "222222222222".to_string())
        );
    }

    #[test]
    fn queue_pattern_needs_a_full_account_id() {
        assert!(SQS_ACCOUNT.is_match("https://sqs.us-east-1.amazonaws.com/123456789012/jobs"));
        assert!(!SQS_ACCOUNT.is_match("https://sqs.us-east-1.amazonaws.com/1234/jobs"));
        assert!(!SQS_ACCOUNT.is_match("https://sns.us-east-1.amazonaws.com/123456789012/jobs"));
    }

    #[test]
    fn summary_account_ids_take_precedence() {
        let mut report = report();
        report["summary"]["old_account"] = json!("333333333333");
        let (old, new) = account_ids(&report);
        assert_eq!(old, "333333333333");
        assert_eq!(new, "222222222222");
    }

    #[test]
    fn unknown_accounts_without_any_hint() {
        let report = json!({"summary": {}, "comparisons": []});
        assert_eq!(
            account_ids(&report),
            (UNKNOWN_ACCOUNT.to_string(), UNKNOWN_ACCOUNT.to_string())
        );
    }

    #[test]
    fn rendered_page_escapes_names_and_embedded_json() {
        let html = render(&report(), Some("dev"));
        assert!(html.contains("Lambda Migration Comparison Report - DEV"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("\\u003c/script>"));
        assert!(html.contains("dev-legacy-lambda"));
        assert!(html.contains("- 10"));
        assert!(html.contains("+ 30"));
    }

    #[test]
    fn default_file_name_carries_prefix() {
        assert_eq!(default_file_name(Some("dev")), "lambda-comparison-report-dev.html");
        assert_eq!(default_file_name(None), "lambda-comparison-report.html");
    }
}
