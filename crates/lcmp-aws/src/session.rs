use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use lcmp_core::{Environment, SourceError};
use tokio::time::timeout;
use tracing::info;

use crate::error::classify;
use crate::iam::IamPolicySource;
use crate::lambda::LambdaFunctionSource;

/// A verified AWS session for one named profile and region.
#[derive(Debug, Clone)]
pub struct AwsSession {
    profile: String,
    region: String,
    account_id: String,
    config: SdkConfig,
}

impl AwsSession {
    /// Loads the shared configuration for `profile` and proves it works with
    /// an STS identity call.
    pub async fn connect(
        profile: &str,
        region: &str,
        call_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let sts = aws_sdk_sts::Client::new(&config);
        let identity = match timeout(call_timeout, sts.get_caller_identity().send()).await {
            Ok(result) => result.map_err(|err| classify("GetCallerIdentity", err)),
            Err(_) => Err(SourceError::Timeout(call_timeout)),
        }
        .map_err(|err| verification_error(profile, err))?;

        let account_id = identity.account().unwrap_or_default().to_string();
        info!(profile, region, account = %account_id, "session verified");
        Ok(Self {
            profile: profile.to_string(),
            region: region.to_string(),
            account_id,
            config,
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Builds the engine-facing handle for this session.
    pub fn environment(&self, label: impl Into<String>) -> Environment {
        let functions = Arc::new(LambdaFunctionSource::new(aws_sdk_lambda::Client::new(
            &self.config,
        )));
        let policies = Arc::new(IamPolicySource::new(aws_sdk_iam::Client::new(&self.config)));
        let env = Environment::new(label, functions, policies);
        if self.account_id.is_empty() {
            env
        } else {
            env.with_account_id(self.account_id.clone())
        }
    }
}

/// Only an auth failure gets the login hint; network trouble stays transient.
fn verification_error(profile: &str, err: SourceError) -> SourceError {
    match err {
        SourceError::Auth(message) => SourceError::auth(format!(
            "could not verify profile {profile} ({message}); run `aws sso login --profile {profile}`"
        )),
        other => other,
    }
}
