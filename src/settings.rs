use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GeminiConfig};
use crate::prompts::DEFAULT_VEHICLE;
use crate::storage::{KeyValueStore, StorageError};
use crate::types::LatLng;

pub const SETTINGS_KEY: &str = "settings";
pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000/";

/// Persistent settings, stored as `settings.json` next to the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub vehicle: String,
    /// `"<lat>,<lng>"` used to bias map results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub share_base_url: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            vehicle: DEFAULT_VEHICLE.to_string(),
            location: None,
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Values from flags or environment that win over the stored settings.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub location: Option<String>,
}

impl Settings {
    /// Missing settings are defaults. Unreadable ones are logged and replaced
    /// by defaults as well, so a bad file never blocks startup.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "settings are corrupt, using defaults");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "couldn't read settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(self)?;
        store.set(SETTINGS_KEY, &raw)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(key) = overrides.api_key {
            self.api_key = Some(key);
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(location) = overrides.location {
            self.location = Some(location);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| format!("Invalid endpoint '{}': {e}", self.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(format!(
                "Endpoint '{}' must use http or https",
                self.endpoint
            ));
        }
        Url::parse(&self.share_base_url)
            .map_err(|e| format!("Invalid share base URL '{}': {e}", self.share_base_url))?;
        if self.timeout_secs == 0 {
            return Err("Timeout must be at least one second".to_string());
        }
        if self.vehicle.trim().is_empty() {
            return Err("Vehicle description cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Best-effort location hint: an unparsable value is logged and dropped.
    pub fn location_hint(&self) -> Option<LatLng> {
        let raw = self.location.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(location) => Some(location),
            Err(e) => {
                warn!(error = %e, "ignoring location hint");
                None
            }
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
