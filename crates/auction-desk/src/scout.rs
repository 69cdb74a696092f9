// AI scouting reports via the Anthropic Messages API.
//
// A single non-streaming request per report, no retries. Every failure path
// degrades to a fixed fallback string; callers never see an error.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::Player;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Returned when no API key is configured.
pub const DISABLED_FALLBACK: &str = "AI Scouting disabled: API Key missing.";
/// Returned when the request fails or the provider rejects it.
pub const UNAVAILABLE_FALLBACK: &str = "Scouting report unavailable.";
/// Returned when the provider answers with no usable text.
pub const EMPTY_FALLBACK: &str = "No scouting report available at this time.";

// ---------------------------------------------------------------------------
// ScoutReporter
// ---------------------------------------------------------------------------

/// Low-level Anthropic Messages API client.
pub struct ScoutReporter {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ScoutReporter {
    /// Create a new reporter with the given API key and model identifier.
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        ScoutReporter {
            http: reqwest::Client::new(),
            api_url: ANTHROPIC_API_URL.to_string(),
            api_key,
            model,
            max_tokens,
        }
    }

    /// Point the reporter at a different endpoint (mock servers in tests).
    #[cfg(test)]
    fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    /// Request a scouting report for `player`. Degrades to a fallback
    /// string on any failure.
    pub async fn scouting_report(&self, player: &Player) -> String {
        if self.api_key.is_empty() {
            return DISABLED_FALLBACK.to_string();
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": build_prompt(player) }]
        });

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("scouting report request failed: {e}");
                return UNAVAILABLE_FALLBACK.to_string();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("scouting report provider returned status {status}");
            return UNAVAILABLE_FALLBACK.to_string();
        }

        let data = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to read scouting report response: {e}");
                return UNAVAILABLE_FALLBACK.to_string();
            }
        };

        debug!(player = %player.name, "scouting report received");
        match parse_report_text(&data) {
            Some(text) if !text.trim().is_empty() => text,
            _ => EMPTY_FALLBACK.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoutClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either an active reporter or disabled.
pub enum ScoutClient {
    /// The provider is configured and ready.
    Active(ScoutReporter),
    /// Scouting is disabled (no API key configured).
    Disabled,
}

impl ScoutClient {
    /// Build a `ScoutClient` from the application config.
    ///
    /// Returns `Active` if an API key is present in credentials, otherwise
    /// returns `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => ScoutClient::Active(ScoutReporter::new(
                key.clone(),
                config.llm.model.clone(),
                config.llm.max_tokens,
            )),
            _ => ScoutClient::Disabled,
        }
    }

    /// Request a report, delegating to the inner reporter or returning the
    /// disabled fallback immediately.
    pub async fn scouting_report(&self, player: &Player) -> String {
        match self {
            ScoutClient::Active(reporter) => reporter.scouting_report(player).await,
            ScoutClient::Disabled => DISABLED_FALLBACK.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt and response helpers
// ---------------------------------------------------------------------------

/// Build the scouting prompt for a player.
pub(crate) fn build_prompt(player: &Player) -> String {
    let stats = serde_json::to_string(&player.stats).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Provide a short, professional cricket scouting report for {} ({}). \
         Stats: {}. \
         Focus on T20 viability, key strengths, and potential weaknesses. \
         Keep it under 100 words.",
        player.name,
        player.role.as_str(),
        stats
    )
}

/// Extract the first text block from a Messages API response.
///
/// Expected shape: `{ "content": [ { "type": "text", "text": "..." } ] }`
pub(crate) fn parse_report_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("content")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
