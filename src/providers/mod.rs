//! External collaborator interfaces
//!
//! The engine implements none of these. The host application wires real
//! clients (simulator bridge, provider SDKs, audio device, template
//! renderer) behind these traits; tests wire scripted mocks.

use crate::model::{FlightStage, Poi, Telemetry};
use crate::Result;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Live telemetry from the simulator bridge.
pub trait TelemetrySource: Send + Sync {
    fn get(&self) -> Telemetry;

    /// How far ahead of the aircraft the POI selector should project.
    /// Driven by the latency tracker after every generation.
    fn set_prediction_window(&self, window: Duration);

    /// When the given stage was last entered, if ever this session.
    fn last_transition(&self, stage: FlightStage) -> Option<DateTime<Utc>>;
}

/// Scored POI storage and hydration.
pub trait PoiStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Poi>;

    fn get_near(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<Poi>;

    /// Number of selectable POIs scoring above `threshold`, capped at
    /// `limit`. Used by the skew sampler to count rivals.
    fn count_scored_above(&self, threshold: f64, limit: usize) -> usize;

    fn save_last_played(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Article fetcher. The engine only consumes cached prose; this exists for
/// hydration paths the host may run on demand.
pub trait WikipediaClient: Send + Sync {
    fn article_html(&self, title: &str, lang: &str) -> Result<String>;
}

/// Persistent key-value and article store.
pub trait StateStore: Send + Sync {
    fn get_state(&self, key: &str) -> Option<String>;
    fn set_state(&self, key: &str, value: &str) -> Result<()>;
    fn save_poi(&self, poi: &Poi) -> Result<()>;
    fn get_article(&self, id: &str) -> Option<String>;
    fn save_article(&self, id: &str, text: &str) -> Result<()>;
    fn get_recently_played(&self, since: DateTime<Utc>) -> Vec<String>;
}

/// One LLM text request. `exclude_providers` forces the collaborator's
/// failover chain past the named providers on retry.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    pub exclude_providers: Vec<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            exclude_providers: Vec::new(),
        }
    }

    pub fn excluding(mut self, provider: impl Into<String>) -> Self {
        self.exclude_providers.push(provider.into());
        self
    }
}

/// LLM response with the label of the provider that answered, so retries
/// can exclude it.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
}

/// Text generation with profile-based model selection and provider
/// failover. Profiles are named after narrative kinds plus the cheap
/// `script_rescue` and `summary` profiles.
pub trait LlmClient: Send + Sync {
    fn generate_text(&self, profile: &str, request: &LlmRequest) -> Result<LlmResponse>;

    fn generate_image_text(
        &self,
        profile: &str,
        request: &LlmRequest,
        image: &Path,
    ) -> Result<LlmResponse>;

    fn has_profile(&self, name: &str) -> bool;
}

/// Why a TTS attempt failed. Rate limits, server errors and auth failures
/// poison the provider for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsErrorKind {
    RateLimited,
    ServerError,
    Auth,
    Io,
    Other,
}

#[derive(Error, Debug, Clone)]
#[error("TTS {kind:?}: {message}")]
pub struct TtsError {
    pub kind: TtsErrorKind,
    pub message: String,
}

impl TtsError {
    pub fn new(kind: TtsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Speech synthesis. `synthesize` writes `<output_stem>.<suffix>` and
/// returns the suffix.
pub trait TtsClient: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        output_stem: &Path,
    ) -> std::result::Result<String, TtsError>;

    /// Whether this error should latch the session fallback.
    fn is_fatal(&self, err: &TtsError) -> bool {
        matches!(
            err.kind,
            TtsErrorKind::RateLimited | TtsErrorKind::ServerError | TtsErrorKind::Auth
        )
    }

    /// Files at or below this size are treated as silent failures.
    fn min_audio_size(&self) -> u64 {
        1024
    }
}

/// Callback fired by the audio collaborator when playback finishes, from
/// its own thread.
pub type PlaybackCallback = Box<dyn FnOnce() + Send + 'static>;

/// Audio device output. Owns volume, device pause state and the last-file
/// replay buffer.
pub trait AudioSink: Send + Sync {
    fn play(&self, path: &Path, skip_checks: bool, on_complete: PlaybackCallback) -> Result<()>;
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn is_busy(&self) -> bool;
    fn duration(&self) -> Option<Duration>;
    fn remaining(&self) -> Option<Duration>;
    fn is_user_paused(&self) -> bool;

    /// Replay the last played file. Returns whether playback started.
    fn replay_last(&self, on_complete: PlaybackCallback) -> bool;
}

/// Template renderer: pure function from template name + data bag to the
/// final prompt string.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct GeoLocation {
    pub country: String,
    /// First-level administrative region.
    pub admin1: String,
    pub city: String,
}

/// Reverse geocoding.
pub trait GeoLookup: Send + Sync {
    fn location_for(&self, lat: f64, lon: f64) -> Option<GeoLocation>;
}

/// Per-provider usage accounting.
pub trait UsageTracker: Send + Sync {
    fn is_free_tier(&self, provider: &str) -> bool;
    fn record_success(&self, provider: &str);
    fn record_failure(&self, provider: &str);
}
