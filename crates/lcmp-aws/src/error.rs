use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use lcmp_core::SourceError;

/// Service error codes that mean the session itself is unusable.
const AUTH_CODES: &[&str] = &[
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "AuthFailure",
];

const AUTH_MESSAGE_MARKERS: &[&str] = &["token has expired", "sso", "credential"];

/// Maps an SDK failure of `operation` onto the engine's error kinds.
pub(crate) fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> SourceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(ProvideErrorMetadata::code)
        .map(str::to_owned);
    let message = format!("{operation}: {}", DisplayErrorContext(&err));
    classify_parts(code.as_deref(), message)
}

/// AccessDenied is a permission gap on one call, not a dead session.
fn classify_parts(code: Option<&str>, message: String) -> SourceError {
    if code.is_some_and(|c| AUTH_CODES.contains(&c)) {
        return SourceError::Auth(message);
    }
    let lower = message.to_lowercase();
    if code.is_none() && AUTH_MESSAGE_MARKERS.iter().any(|m| lower.contains(m)) {
        return SourceError::Auth(message);
    }
    SourceError::Transient(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_tokens_are_auth_failures() {
        let err = classify_parts(Some("ExpiredTokenException"), "GetFunction: expired".into());
        assert!(err.is_auth());
    }

    #[test]
    fn access_denied_is_transient() {
        let err = classify_parts(
            Some("AccessDenied"),
            "ListRolePolicies: not authorized to perform iam:ListRolePolicies".into(),
        );
        assert!(!err.is_auth());
    }

    #[test]
    fn credential_resolution_failure_without_code_is_auth() {
        let err = classify_parts(
            None,
            "ListFunctions: failed to load credentials: the SSO session has expired".into(),
        );
        assert!(err.is_auth());

        let err = classify_parts(None, "ListFunctions: connection reset by peer".into());
        assert_eq!(
            err,
            SourceError::Transient("ListFunctions: connection reset by peer".into())
        );
    }

    #[test]
    fn throttling_is_transient() {
        let err = classify_parts(Some("TooManyRequestsException"), "Rate exceeded".into());
        assert!(matches!(err, SourceError::Transient(_)));
    }
}
