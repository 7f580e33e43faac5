//! Engine configuration
//!
//! Typed configuration for the narration engine. Values arrive from the
//! host application as TOML; everything has a default so partial files are
//! fine.

use crate::{Result, SkytaleError};
use serde::{Deserialize, Serialize};

/// Unit system for distances in the navigation phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    Metric,
    Imperial,
    /// Metric distances with imperial altitudes, the aviation mix.
    Hybrid,
}

impl UnitSystem {
    /// True when navigation distances are spoken in kilometers.
    pub fn uses_kilometers(&self) -> bool {
        !matches!(self, UnitSystem::Imperial)
    }
}

/// Primary TTS engine selection. An unrecognized name is a construction
/// error, not a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TtsEngineKind {
    Sapi,
    Edge,
    FishAudio,
    AzureSpeech,
}

impl std::str::FromStr for TtsEngineKind {
    type Err = SkytaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sapi" => Ok(TtsEngineKind::Sapi),
            "edge" => Ok(TtsEngineKind::Edge),
            "fish-audio" => Ok(TtsEngineKind::FishAudio),
            "azure-speech" => Ok(TtsEngineKind::AzureSpeech),
            other => Err(SkytaleError::ConfigError(format!(
                "Unknown TTS engine: {}",
                other
            ))),
        }
    }
}

/// Action bound to the transponder ident button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentAction {
    PauseToggle,
    Stop,
    Skip,
}

/// Narration language resolved from a BCP-47 tag or plain code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
    pub code: String,
    pub name: String,
    pub locale: String,
}

/// Resolve a language tag to code/name/locale for the prompt.
pub fn resolve_language(tag: &str) -> LanguageSpec {
    let primary = tag.split(['-', '_']).next().unwrap_or("en").to_lowercase();
    let (name, locale) = match primary.as_str() {
        "en" => ("English", "en-US"),
        "de" => ("German", "de-DE"),
        "fr" => ("French", "fr-FR"),
        "es" => ("Spanish", "es-ES"),
        "it" => ("Italian", "it-IT"),
        "pt" => ("Portuguese", "pt-PT"),
        "nl" => ("Dutch", "nl-NL"),
        "pl" => ("Polish", "pl-PL"),
        "sv" => ("Swedish", "sv-SE"),
        "fi" => ("Finnish", "fi-FI"),
        "ja" => ("Japanese", "ja-JP"),
        "zh" => ("Chinese", "zh-CN"),
        _ => {
            return LanguageSpec {
                code: primary.clone(),
                name: primary.clone(),
                locale: tag.to_string(),
            }
        }
    };
    // A full tag like "en-GB" keeps its own locale.
    let locale = if tag.contains('-') || tag.contains('_') {
        tag.replace('_', "-")
    } else {
        locale.to_string()
    };
    LanguageSpec {
        code: primary,
        name: name.to_string(),
        locale,
    }
}

/// Narrator behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorConfig {
    pub units: UnitSystem,

    /// BCP-47 tag or plain language code.
    pub target_language: String,

    pub narration_length_short_words: u32,
    pub narration_length_long_words: u32,
    pub summary_max_words: u32,

    /// How many past narrations feed the recent-context prompt field.
    pub context_history_size: usize,

    /// Minimum seconds before the same POI may be narrated again.
    pub repeat_ttl_seconds: u64,

    pub debrief: DebriefConfig,

    /// Free-form interest hints piped into the prompt.
    pub interests: String,

    /// Free-form avoid hints piped into the prompt.
    pub avoid: String,

    /// Topics the essay rotation draws from.
    pub essay_topics: Vec<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            units: UnitSystem::Metric,
            target_language: "en".to_string(),
            narration_length_short_words: 50,
            narration_length_long_words: 200,
            summary_max_words: 150,
            context_history_size: 5,
            repeat_ttl_seconds: 1800,
            debrief: DebriefConfig::default(),
            interests: String::new(),
            avoid: String::new(),
            essay_topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebriefConfig {
    pub enabled: bool,
}

impl Default for DebriefConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// TTS selection. The providers themselves live behind the TTS trait; the
/// engine only records which one the host wired up and which voice to ask
/// for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub engine: TtsEngineKind,
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: TtsEngineKind::Edge,
            voice: String::new(),
        }
    }
}

/// LLM provider chain, passed through to the LLM collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ordered primary providers.
    pub providers: Vec<String>,

    /// Fallback chain tried after the primaries.
    pub fallback: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransponderConfig {
    pub ident_action: IdentAction,
}

impl Default for TransponderConfig {
    fn default() -> Self {
        Self {
            ident_action: IdentAction::PauseToggle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Pause between narrations so audio tail silence can breathe.
    pub pacing_seconds: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { pacing_seconds: 3 }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub narrator: NarratorConfig,
    pub tts: TtsConfig,
    pub llm: LlmConfig,
    pub transponder: TransponderConfig,
    pub playback: PlaybackConfig,
}

impl EngineConfig {
    /// Parse a TOML document. Unknown TTS engine names fail here rather
    /// than at first synthesis.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SkytaleError::ConfigError(e.to_string()))
    }

    pub fn language(&self) -> LanguageSpec {
        resolve_language(&self.narrator.target_language)
    }

    pub fn repeat_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.narrator.repeat_ttl_seconds)
    }

    pub fn pacing(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.playback.pacing_seconds)
    }
}
