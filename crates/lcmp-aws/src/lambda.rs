use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::types::FunctionConfiguration;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use lcmp_core::{FunctionRecord, FunctionSource, SourceError};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::classify;

/// Function inventory backed by the Lambda control plane.
pub struct LambdaFunctionSource {
    client: Client,
}

impl LambdaFunctionSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionSource for LambdaFunctionSource {
    fn list_function_names(&self) -> BoxStream<'_, Result<String, SourceError>> {
        // `None` state ends the stream; `Some(marker)` requests the next page.
        stream::unfold(Some(None::<String>), move |state| async move {
            let marker = state?;
            match self.client.list_functions().set_marker(marker).send().await {
                Ok(page) => {
                    let names: Vec<Result<String, SourceError>> = page
                        .functions()
                        .iter()
                        .filter_map(FunctionConfiguration::function_name)
                        .map(|name| Ok(name.to_string()))
                        .collect();
                    debug!(count = names.len(), "listed function page");
                    let next = page
                        .next_marker()
                        .filter(|m| !m.is_empty())
                        .map(|m| Some(m.to_string()));
                    Some((stream::iter(names), next))
                }
                Err(err) => Some((stream::iter(vec![Err(classify("ListFunctions", err))]), None)),
            }
        })
        .flatten()
        .boxed()
    }

    async fn get_function(&self, name: &str) -> Result<FunctionRecord, SourceError> {
        let output = self
            .client
            .get_function()
            .function_name(name)
            .send()
            .await
            .map_err(|err| classify("GetFunction", err))?;
        let config = output.configuration().ok_or_else(|| {
            SourceError::transient(format!("GetFunction returned no configuration for {name}"))
        })?;
        let reserved = output
            .concurrency()
            .and_then(|c| c.reserved_concurrent_executions());
        Ok(function_record(name, config, reserved))
    }
}

/// Flattens a Lambda configuration into the provider-keyed record the diff reads.
pub(crate) fn function_record(
    name: &str,
    config: &FunctionConfiguration,
    reserved_concurrency: Option<i32>,
) -> FunctionRecord {
    let mut record = FunctionRecord::new(config.function_name().unwrap_or(name))
        .with_config("Runtime", optional(config.runtime().map(|r| r.as_str())))
        .with_config("Handler", optional(config.handler()))
        .with_config("MemorySize", optional(config.memory_size()))
        .with_config("Timeout", optional(config.timeout()))
        .with_config("ReservedConcurrencyLimit", optional(reserved_concurrency))
        .with_config(
            "DeadLetterConfig",
            config
                .dead_letter_config()
                .and_then(|d| d.target_arn())
                .map_or(Value::Null, |arn| json!({ "TargetArn": arn })),
        )
        .with_role(config.role().unwrap_or_default());

    if let Some(vars) = config.environment().and_then(|e| e.variables()) {
        for (key, value) in vars {
            record = record.with_env(key.clone(), value.clone());
        }
    }
    record
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

#[cfg(test)]
mod tests {
    use aws_sdk_lambda::types::{DeadLetterConfig, EnvironmentResponse, Runtime};

    use super::*;

    #[test]
    fn configuration_maps_to_compared_fields() {
        let config = FunctionConfiguration::builder()
            .function_name("dev-orders-lambda")
            .runtime(Runtime::from("python3.12"))
            .handler("app.handler")
            .memory_size(256)
            .timeout(30)
            .role("arn:aws:iam::123456789012:role/orders-exec")
            .dead_letter_config(
                DeadLetterConfig::builder()
                    .target_arn("arn:aws:sqs:eu-west-2:123456789012:orders-dlq")
                    .build(),
            )
            .environment(
                EnvironmentResponse::builder()
                    .variables("TABLE", "orders")
                    .build(),
            )
            .build();

        let record = function_record("dev-orders-lambda", &config, Some(5));

        assert_eq!(record.config_value("Runtime"), Some(&json!("python3.12")));
        assert_eq!(record.config_value("MemorySize"), Some(&json!(256)));
        assert_eq!(record.config_value("Timeout"), Some(&json!(30)));
        assert_eq!(record.config_value("ReservedConcurrencyLimit"), Some(&json!(5)));
        assert_eq!(
            record.config_value("DeadLetterConfig"),
            Some(&json!({"TargetArn": "arn:aws:sqs:eu-west-2:123456789012:orders-dlq"}))
        );
        assert_eq!(record.env_vars.get("TABLE").map(String::as_str), Some("orders"));
        assert_eq!(record.role_name(), Some("orders-exec"));
    }

    #[test]
    fn missing_fields_read_as_absent() {
        let config = FunctionConfiguration::builder().function_name("bare").build();
        let record = function_record("bare", &config, None);
        assert_eq!(record.config_value("Handler"), None);
        assert_eq!(record.config_value("DeadLetterConfig"), None);
        assert!(record.env_vars.is_empty());
        assert_eq!(record.role_name(), None);
    }
}
