use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::analysis::NutritionAnalysis;
use crate::codec::EncodedImage;
use crate::inference::{schema, AnalyzeError, AttemptError, CredentialPool, InferenceClient};

/// Retry/backoff knobs for one credential.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum calls spent on a single credential before giving up.
    pub max_attempts_per_credential: u32,
    /// Linear backoff base: the n-th retry on a credential waits `base × n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts_per_credential: 4,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Transient cursor over the credential × attempt search space. Lives for
/// the duration of one orchestrated call only.
#[derive(Debug, Default)]
struct RetryContext {
    credential_index: usize,
    attempt_in_credential: u32,
}

/// Executes one logical "analyze image" request: credential rotation on
/// quota failures, linear backoff on transient ones, independent validation
/// of every reply. Only terminal outcomes cross this boundary.
pub struct Orchestrator {
    client: Arc<dyn InferenceClient>,
    pool: CredentialPool,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn InferenceClient>, pool: CredentialPool, policy: RetryPolicy) -> Self {
        Self {
            client,
            pool,
            policy,
        }
    }

    /// Analyze an encoded image, driving retries internally.
    ///
    /// No state survives between top-level calls; concurrent invocations
    /// each own their retry context.
    pub async fn analyze(&self, image: &EncodedImage) -> Result<NutritionAnalysis, AnalyzeError> {
        if self.pool.is_empty() {
            return Err(AnalyzeError::NoCredentialsConfigured);
        }

        let mut ctx = RetryContext::default();
        while let Some(credential) = self.pool.get(ctx.credential_index) {
            match self.attempt(credential, image).await {
                Ok(analysis) => {
                    debug!(
                        credential = ctx.credential_index,
                        attempt = ctx.attempt_in_credential,
                        "analysis succeeded"
                    );
                    return Ok(analysis);
                }
                Err(AttemptError::Quota(reason)) => {
                    // Quota exhaustion is deterministic: rotate immediately,
                    // a different quota pool is assumed independent.
                    warn!(
                        credential = ctx.credential_index,
                        %reason,
                        "quota exceeded, rotating credential"
                    );
                    ctx.credential_index += 1;
                    ctx.attempt_in_credential = 0;
                }
                Err(err) => {
                    ctx.attempt_in_credential += 1;
                    if ctx.attempt_in_credential >= self.policy.max_attempts_per_credential {
                        warn!(
                            credential = ctx.credential_index,
                            attempts = ctx.attempt_in_credential,
                            error = %err,
                            "retry ceiling reached"
                        );
                        return Err(AnalyzeError::ServiceUnavailable(err.to_string()));
                    }
                    let delay = self.policy.base_delay * ctx.attempt_in_credential;
                    debug!(
                        credential = ctx.credential_index,
                        attempt = ctx.attempt_in_credential,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Quota rotation walked past the last credential.
        Err(AnalyzeError::AllCredentialsExhausted)
    }

    async fn attempt(
        &self,
        credential: &str,
        image: &EncodedImage,
    ) -> Result<NutritionAnalysis, AttemptError> {
        let raw = self.client.generate(credential, image).await?;
        schema::decode_analysis(&raw)
    }
}
