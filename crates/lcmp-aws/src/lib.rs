//! AWS implementations of the engine's environment traits.
//!
//! Functions come from Lambda, attached policies from IAM, and the session
//! is verified through STS before any listing starts.

mod error;
pub mod iam;
pub mod lambda;
pub mod session;

pub use iam::IamPolicySource;
pub use lambda::LambdaFunctionSource;
pub use session::AwsSession;
