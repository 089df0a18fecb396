use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const INVALID_JSON_MESSAGE: &str =
    "JSON inválido: Por favor revisa la sintaxis (comas, llaves, etc.)";
pub const UNKNOWN_ENGINE_ERROR: &str = "El motor devolvió un error desconocido.";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssetReference {
    pub ref_id: String,
    pub resolved_url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunResult {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<u32>,
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub final_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_sent: Option<Vec<AssetReference>>,
}

/// The backend writes missing values as `null`; read those as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RunResult {
    /// Card heading: the task id, suffixed with the variant number when the
    /// backend produced more than one image for the task.
    pub fn title(&self) -> String {
        let variant = self.variant();
        if variant > 1 {
            format!("{} (v{})", self.task_id, variant)
        } else {
            self.task_id.clone()
        }
    }

    pub fn variant(&self) -> u32 {
        self.variant.unwrap_or(1)
    }

    pub fn assets(&self) -> &[AssetReference] {
        self.assets_sent.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("{}", INVALID_JSON_MESSAGE)]
    InvalidJson,

    #[error("Error de red o servidor: Error HTTP: {status} - {detail}")]
    Http { status: u16, detail: String },

    #[error("{0}")]
    Backend(String),

    #[error("Error de red o servidor: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(Vec<RunResult>),
    Failure(RunError),
}

/// Identifies one submit. Only the newest ticket may write back into the form.
#[derive(Debug, Clone)]
pub struct RunTicket {
    generation: u64,
    token: CancellationToken,
}

impl RunTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Default)]
pub struct FormState {
    pub input: String,
    in_flight: bool,
    error: Option<String>,
    results: Vec<RunResult>,
    generation: u64,
    current: Option<CancellationToken>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn can_submit(&self) -> bool {
        can_submit(&self.input, self.in_flight)
    }

    pub fn shows_empty_state(&self) -> bool {
        self.results.is_empty() && !self.in_flight
    }

    /// Enters Submitting: clears the previous outcome and cancels any run still pending.
    pub fn begin(&mut self) -> RunTicket {
        self.cancel_current();
        self.error = None;
        self.results.clear();
        self.in_flight = true;
        self.generation += 1;

        let token = CancellationToken::new();
        self.current = Some(token.clone());
        RunTicket {
            generation: self.generation,
            token,
        }
    }

    /// Applies a finished run. Returns false, leaving the state untouched, when the
    /// ticket was cancelled or superseded by a newer submit.
    pub fn complete(&mut self, ticket: &RunTicket, outcome: RunOutcome) -> bool {
        if ticket.generation != self.generation || ticket.token.is_cancelled() {
            log::debug!("Dropping outcome of stale run #{}", ticket.generation);
            return false;
        }
        apply_outcome(&mut self.error, &mut self.results, outcome);
        self.in_flight = false;
        self.current = None;
        true
    }

    /// Abandons the pending run, if any, and returns to Idle.
    pub fn cancel(&mut self) {
        self.cancel_current();
        self.in_flight = false;
    }

    fn cancel_current(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

pub fn can_submit(input: &str, in_flight: bool) -> bool {
    !in_flight && !input.trim().is_empty()
}

/// Writes an outcome into the error/results pair; the two are never both set.
pub fn apply_outcome(error: &mut Option<String>, results: &mut Vec<RunResult>, outcome: RunOutcome) {
    match outcome {
        RunOutcome::Success(items) => {
            *error = None;
            *results = items;
        }
        RunOutcome::Failure(err) => {
            *error = Some(err.to_string());
            results.clear();
        }
    }
}
