pub mod client;
pub mod orchestrator;
pub mod pool;
pub mod schema;

pub use client::{GeminiClient, InferenceClient};
pub use orchestrator::{Orchestrator, RetryPolicy};
pub use pool::CredentialPool;

use thiserror::Error;

/// Classified outcome of a single inference attempt. Internal to the
/// orchestrator's retry loop; never crosses to the state machine.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    /// Remote signaled a rate/usage limit; triggers credential rotation.
    #[error("quota exceeded: {0}")]
    Quota(String),
    /// Network/service fault or empty/malformed reply; triggers
    /// same-credential backoff retry.
    #[error("transient service error: {0}")]
    Transient(String),
    /// Decoded payload missing required fields or wrong types; retried
    /// like a transient error.
    #[error("schema violation: {0}")]
    Schema(String),
}

/// Terminal outcome of one orchestrated analyze call. The only failure
/// kinds that cross the orchestrator boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("no inference credentials configured")]
    NoCredentialsConfigured,
    #[error("all inference credentials exhausted")]
    AllCredentialsExhausted,
    #[error("inference service unavailable: {0}")]
    ServiceUnavailable(String),
}
