//! `lcmp compare` command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use lcmp_aws::AwsSession;
use lcmp_core::{CompareConfig, Reconciler, RunResult};
use tracing::info;

use super::render::write_html;
use super::rules::NamingArgs;
use crate::opts::GlobalOpts;
use crate::output::{notice, print_success};
use crate::report::console;

const DEFAULT_REGION: &str = "eu-west-2";

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// AWS profile for the old account
    #[arg(long, env = "LCMP_OLD_PROFILE")]
    pub old_profile: String,

    /// AWS profile for the new account
    #[arg(long, env = "LCMP_NEW_PROFILE")]
    pub new_profile: String,

    #[arg(long, default_value = DEFAULT_REGION)]
    pub old_region: String,

    #[arg(long, default_value = DEFAULT_REGION)]
    pub new_region: String,

    /// Expected old account id; the run stops if the profile resolves elsewhere
    #[arg(long)]
    pub old_account: Option<String>,

    /// Expected new account id
    #[arg(long)]
    pub new_account: Option<String>,

    #[command(flatten)]
    pub naming: NamingArgs,

    /// Concurrent detail fetches per account (env: LCMP_MAX_WORKERS)
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Timeout for every AWS call in milliseconds (env: LCMP_CALL_TIMEOUT_MS)
    #[arg(long)]
    pub call_timeout_ms: Option<u64>,

    /// Skip fetching and diffing attached role policies
    #[arg(long)]
    pub no_policies: bool,

    /// Write the JSON result to this file (also writes the HTML report)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// HTML report path (default: lambda-comparison-report[-<prefix>].html)
    #[arg(long)]
    pub html: Option<PathBuf>,
}

impl CompareArgs {
    fn compare_config(&self) -> Result<CompareConfig> {
        let mut config = CompareConfig::from_env().with_naming(self.naming.naming_rules()?);
        if let Some(workers) = self.max_workers {
            config.max_workers = workers.max(1);
        }
        if let Some(ms) = self.call_timeout_ms {
            config.call_timeout = Duration::from_millis(ms);
        }
        config.compare_policies = !self.no_policies;
        Ok(config)
    }
}

pub async fn cmd_compare(opts: &GlobalOpts, args: &CompareArgs) -> Result<()> {
    let config = args.compare_config()?;

    info!(profile = %args.old_profile, "authenticating with old account");
    info!(profile = %args.new_profile, "authenticating with new account");
    let (old_session, new_session) = tokio::try_join!(
        connect(&args.old_profile, &args.old_region, config.call_timeout),
        connect(&args.new_profile, &args.new_region, config.call_timeout),
    )?;
    check_account("old", &old_session, args.old_account.as_deref())?;
    check_account("new", &new_session, args.new_account.as_deref())?;

    let old = old_session.environment("old");
    let new = new_session.environment("new");
    let reconciler = Reconciler::new(config);
    let result = reconciler.run(&old, &new).await.map_err(|err| {
        let hint = if err.is_auth() {
            let profile = if err.environment() == "old" {
                &args.old_profile
            } else {
                &args.new_profile
            };
            format!("; run `aws sso login --profile {profile}`")
        } else {
            String::new()
        };
        anyhow::anyhow!("{err}{hint}")
    })?;

    let mut warnings = Vec::new();
    if let Some(path) = &args.output {
        save_json(&result, path)?;
        warnings.push(format!("results saved to {}", path.display()));
    }
    if args.output.is_some() || args.html.is_some() {
        let report = serde_json::to_value(&result).context("serialize result")?;
        let html = write_html(
            &report,
            args.html.clone(),
            reconciler.config().naming.prefix.as_deref(),
        )?;
        warnings.push(format!("HTML report generated: {}", html.display()));
    }

    if opts.wants_json() {
        let data = serde_json::to_value(&result).context("serialize result")?;
        return print_success(opts, data, warnings);
    }
    if !opts.quiet {
        let stdout = std::io::stdout();
        console::write_narrative(&mut stdout.lock(), &result).context("write report")?;
    }
    for warning in warnings {
        notice(opts, warning)?;
    }
    Ok(())
}

async fn connect(profile: &str, region: &str, call_timeout: Duration) -> Result<AwsSession> {
    AwsSession::connect(profile, region, call_timeout)
        .await
        .with_context(|| format!("connect with profile {profile} in {region}"))
}

fn check_account(label: &str, session: &AwsSession, expected: Option<&str>) -> Result<()> {
    match expected {
        Some(expected) if expected != session.account_id() => bail!(
            "{label} profile {} resolves to account {}, expected {expected}",
            session.profile(),
            session.account_id()
        ),
        _ => Ok(()),
    }
}

fn save_json(result: &RunResult, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(result).context("serialize result")?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use lcmp_testkit::{InMemoryEnvironment, lambda_record};

    use super::*;

    #[tokio::test]
    async fn saved_json_keeps_config_field_order() {
        let (old, _) = InMemoryEnvironment::new("old")
            .with_function(lambda_record("f-lambda"))
            .into_environment();
        let (new, _) = InMemoryEnvironment::new("new")
            .with_function(
                lambda_record("f-lambda")
                    .with_config("Runtime", "python3.13")
                    .with_config("Handler", "main.handler"),
            )
            .into_environment();
        let result = Reconciler::new(CompareConfig::default())
            .run(&old, &new)
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_json(&result, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let runtime = text.find("\"Runtime\"").unwrap();
        let handler = text.find("\"Handler\"").unwrap();
        assert!(runtime < handler);
        assert!(text.contains("\"status\": \"REVIEW\""));
    }
}
