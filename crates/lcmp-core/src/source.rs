//! Collaborator seams: how the engine talks to an environment.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::SourceError;
use crate::model::FunctionRecord;

/// Read access to the functions deployed in one environment.
#[async_trait]
pub trait FunctionSource: Send + Sync {
    /// Every function identifier, page by page. The stream is finite and can
    /// only be drained once.
    fn list_function_names(&self) -> BoxStream<'_, Result<String, SourceError>>;

    async fn get_function(&self, name: &str) -> Result<FunctionRecord, SourceError>;
}

/// Read access to the policies attached to execution identities.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn list_managed_policies(&self, role_name: &str) -> Result<Vec<String>, SourceError>;
    async fn list_inline_policies(&self, role_name: &str) -> Result<Vec<String>, SourceError>;
}

/// Authenticated handle to one environment.
#[derive(Clone)]
pub struct Environment {
    pub label: String,
    pub account_id: Option<String>,
    pub functions: Arc<dyn FunctionSource>,
    pub policies: Arc<dyn PolicySource>,
}

impl Environment {
    pub fn new(
        label: impl Into<String>,
        functions: Arc<dyn FunctionSource>,
        policies: Arc<dyn PolicySource>,
    ) -> Self {
        Self {
            label: label.into(),
            account_id: None,
            functions,
            policies,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("label", &self.label)
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}
