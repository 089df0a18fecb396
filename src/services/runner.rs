use crate::core::config::BackendConfig;
use crate::core::state::{FormState, RunError, RunOutcome, RunResult, UNKNOWN_ENGINE_ERROR};
use crate::services::backend::{Backend, BackendReply, HttpBackend};
use futures_util::future::{self, Either};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Submits storyboards to the `run-full` endpoint and classifies the reply.
#[derive(Clone)]
pub struct Runner {
    config: BackendConfig,
    backend: Arc<dyn Backend>,
}

impl Runner {
    pub fn new(config: BackendConfig, backend: Arc<dyn Backend>) -> Self {
        info!("Using API base: {}", config.api_base());
        Self { config, backend }
    }

    pub fn over_http(config: BackendConfig) -> Self {
        Self::new(config, Arc::new(HttpBackend::new()))
    }

    /// One submit: local JSON check, a single POST, then classification.
    pub async fn submit(&self, input: &str) -> RunOutcome {
        let storyboard: Value = match serde_json::from_str(input) {
            Ok(v) => v,
            Err(e) => {
                debug!("Rejected storyboard before sending: {}", e);
                return RunOutcome::Failure(RunError::InvalidJson);
            }
        };

        let url = self.config.run_full_url();
        debug!("POST {}", url);

        let outcome = match self.backend.post_json(&url, &storyboard).await {
            Ok(reply) => classify_reply(reply),
            Err(e) => RunOutcome::Failure(RunError::Network(format!("{:#}", e))),
        };

        match &outcome {
            RunOutcome::Success(results) => info!("Run finished with {} result(s)", results.len()),
            RunOutcome::Failure(err) => warn!("Run failed: {}", err),
        }
        outcome
    }

    /// Like [`Runner::submit`], but yields `None` as soon as `token` is cancelled.
    pub async fn submit_until_cancelled(
        &self,
        input: &str,
        token: &CancellationToken,
    ) -> Option<RunOutcome> {
        if token.is_cancelled() {
            return None;
        }
        let work = self.submit(input);
        let cancelled = token.cancelled();
        futures_util::pin_mut!(work, cancelled);

        match future::select(work, cancelled).await {
            Either::Left((outcome, _)) => Some(outcome),
            Either::Right(_) => {
                debug!("Run cancelled before the backend answered");
                None
            }
        }
    }

    /// Drives a full Idle -> Submitting -> (Success | Error) cycle on `state`.
    /// Returns false when the run was cancelled and left no outcome.
    pub async fn run(&self, state: &mut FormState) -> bool {
        let input = state.input.clone();
        let ticket = state.begin();
        match self.submit_until_cancelled(&input, ticket.token()).await {
            Some(outcome) => state.complete(&ticket, outcome),
            None => false,
        }
    }
}

pub fn classify_reply(reply: BackendReply) -> RunOutcome {
    if !reply.is_success() {
        return RunOutcome::Failure(RunError::Http {
            status: reply.status,
            detail: error_detail(&reply.body),
        });
    }

    let body: Value = match serde_json::from_str(&reply.body) {
        Ok(v) => v,
        Err(e) => return RunOutcome::Failure(RunError::Network(e.to_string())),
    };

    if !body.is_object() {
        return RunOutcome::Failure(RunError::Network(format!(
            "Unexpected response body: expected a JSON object, got {}",
            body
        )));
    }

    if body.get("status").and_then(Value::as_str) == Some("ERROR") {
        let message = match body.get("error") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) if is_truthy(other) => other.to_string(),
            _ => UNKNOWN_ENGINE_ERROR.to_string(),
        };
        return RunOutcome::Failure(RunError::Backend(message));
    }

    match body.get("results") {
        Some(results) if is_truthy(results) => {
            match serde_json::from_value::<Vec<RunResult>>(results.clone()) {
                Ok(items) => RunOutcome::Success(items),
                Err(e) => RunOutcome::Failure(RunError::Network(format!(
                    "Unexpected results payload: {}",
                    e
                ))),
            }
        }
        _ => RunOutcome::Success(Vec::new()),
    }
}

/// Best-effort detail for a non-2xx reply: the `detail` field when set, else the whole
/// body. A body that is not JSON at all reads as `{}`.
pub fn error_detail(body: &str) -> String {
    let parsed: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()));
    match parsed.get("detail") {
        Some(detail) if is_truthy(detail) => detail.to_string(),
        _ => parsed.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
