//! Resilient structured requests against the completion service.
//!
//! One [`ResilientRequester::request`] call drives the attempt loop: call the
//! client, recover JSON from the text, decode it, and on a retryable failure
//! sleep the policy's backoff before trying again. Nothing is kept between
//! calls, so one requester is shared by every concurrent driver evaluation.

use crate::retry::RetryPolicy;
use loyalty_core::{
    AttemptError, ChatMessage, CompletionClient, CompletionError, CompletionOptions,
    ContractViolation, NoopObserver, PipelineEvent, PipelineObserver, RequestFailure,
    RequestScope, recover,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A decoded value and the attempts it took.
#[derive(Clone, Debug, PartialEq)]
pub struct Recovered<T> {
    /// Decoded value
    pub value: T,
    /// Attempts used, at least 1
    pub attempts: u32,
}

/// Retrying JSON requester.
#[derive(Clone)]
pub struct ResilientRequester {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
    options: CompletionOptions,
    attempt_timeout: Option<Duration>,
    observer: Arc<dyn PipelineObserver>,
}

impl std::fmt::Debug for ResilientRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientRequester")
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl ResilientRequester {
    /// Create a requester with the default policy and options
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            options: CompletionOptions::default(),
            attempt_timeout: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set model options
    #[must_use]
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Bound every attempt; expiry counts as a transient timeout
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Report attempt events to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The retry policy in use
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Request a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] once the attempt budget is spent, or at the
    /// first non-retryable client error.
    pub async fn request(
        &self,
        messages: Vec<ChatMessage>,
        scope: &RequestScope,
    ) -> Result<Recovered<Value>, RequestFailure> {
        self.request_with(messages, scope, Ok).await
    }

    /// Request a JSON object and decode it with `decode`.
    ///
    /// Decode failures are contract violations and are retried like
    /// malformed output.
    ///
    /// # Errors
    ///
    /// Returns [`RequestFailure`] once the attempt budget is spent, or at the
    /// first non-retryable client error.
    pub async fn request_with<T, D>(
        &self,
        messages: Vec<ChatMessage>,
        scope: &RequestScope,
        decode: D,
    ) -> Result<Recovered<T>, RequestFailure>
    where
        D: Fn(Value) -> Result<T, ContractViolation>,
    {
        let request = self.options.to_request(messages);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match self.call(request.clone(), scope).await {
                Ok(text) => recover(&text)
                    .map_err(AttemptError::from)
                    .and_then(|value| decode(value).map_err(AttemptError::from)),
                Err(err) => Err(AttemptError::from(err)),
            };

            let cause = match outcome {
                Ok(value) => {
                    self.observer.on_event(&PipelineEvent::RequestSucceeded {
                        scope: scope.clone(),
                        attempts: attempt,
                    });
                    return Ok(Recovered {
                        value,
                        attempts: attempt,
                    });
                }
                Err(cause) => cause,
            };

            let retry_in = (cause.is_retryable() && self.policy.allows_retry_after(attempt))
                .then(|| self.policy.delay_after(attempt));

            self.observer.on_event(&PipelineEvent::AttemptFailed {
                scope: scope.clone(),
                attempt,
                error: cause.to_string(),
                retry_in,
            });

            match retry_in {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    return Err(RequestFailure {
                        attempts: attempt,
                        cause,
                    });
                }
            }
        }
    }

    async fn call(
        &self,
        request: loyalty_core::ChatRequest,
        scope: &RequestScope,
    ) -> Result<String, CompletionError> {
        let call = self.client.complete(request, scope);
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(CompletionError::Timeout)),
            None => call.await,
        }
    }
}
