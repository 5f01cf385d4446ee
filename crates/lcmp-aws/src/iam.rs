use async_trait::async_trait;
use aws_sdk_iam::Client;
use lcmp_core::{PolicySource, SourceError};

use crate::error::classify;

/// Attached and inline role policies read from IAM, by name.
pub struct IamPolicySource {
    client: Client,
}

impl IamPolicySource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicySource for IamPolicySource {
    async fn list_managed_policies(&self, role_name: &str) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .list_attached_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| classify("ListAttachedRolePolicies", err))?;
            names.extend(
                page.attached_policies()
                    .iter()
                    .filter_map(|p| p.policy_name())
                    .map(str::to_owned),
            );
            marker = page.marker().map(str::to_owned);
            if marker.is_none() {
                return Ok(names);
            }
        }
    }

    async fn list_inline_policies(&self, role_name: &str) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        let mut marker = None;
        loop {
            let page = self
                .client
                .list_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|err| classify("ListRolePolicies", err))?;
            names.extend(page.policy_names().iter().cloned());
            marker = page.marker().map(str::to_owned);
            if marker.is_none() {
                return Ok(names);
            }
        }
    }
}
