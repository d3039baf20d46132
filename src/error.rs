use thiserror::Error;
use tokio::io;

use crate::share::ShareError;
use crate::storage::StorageError;

pub type ServiceResult<T> = core::result::Result<T, ServiceError>;

/// Fallback shown when the generator fails without saying why.
pub const GENERIC_UPSTREAM_MESSAGE: &str =
    "Itinerary generation failed. Check the API key configuration and try again.";

/// Failures on the generation path. All of them end at the submission
/// boundary as a single user-visible message.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no API key is configured for the generation service")]
    Configuration,
    #[error("the generation service returned no content")]
    EmptyResponse,
    #[error("{0}")]
    Upstream(String),
    #[error("invalid trip request: {0}")]
    InvalidRequest(String),
    #[error("a plan is already being generated")]
    Busy,
}

impl PlanError {
    pub fn upstream(message: Option<String>) -> Self {
        match message {
            Some(m) if !m.trim().is_empty() => PlanError::Upstream(m),
            _ => PlanError::Upstream(GENERIC_UPSTREAM_MESSAGE.to_string()),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PlanError::Configuration => "No API key is configured. Set GEMINI_API_KEY or run \
                 `roadtrip config` and enter a key, then try again."
                .to_string(),
            PlanError::EmptyResponse => {
                "The AI returned no itinerary. Please try again in a moment.".to_string()
            }
            PlanError::Upstream(message) => message.clone(),
            PlanError::InvalidRequest(message) => message.clone(),
            PlanError::Busy => {
                "A plan is already being generated, wait for it to finish.".to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    FromString(String),
    #[error("{0}")]
    Plan(#[from] PlanError),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Share(#[from] ShareError),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("plan not found: {0}")]
    PlanNotFound(String),
}
