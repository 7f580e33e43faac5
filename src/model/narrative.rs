use crate::model::poi::Poi;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What a narrative (or the job producing it) is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NarrativeKind {
    Poi,
    Screenshot,
    Border,
    Essay,
    Debriefing,
    Briefing,
    Letsgo,
    Other,
}

impl NarrativeKind {
    /// Lowercase name, also the LLM profile name for everything but POIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeKind::Poi => "poi",
            NarrativeKind::Screenshot => "screenshot",
            NarrativeKind::Border => "border",
            NarrativeKind::Essay => "essay",
            NarrativeKind::Debriefing => "debriefing",
            NarrativeKind::Briefing => "briefing",
            NarrativeKind::Letsgo => "letsgo",
            NarrativeKind::Other => "other",
        }
    }

    /// LLM profile used for this kind. POIs use the narration profile.
    pub fn llm_profile(&self) -> &'static str {
        match self {
            NarrativeKind::Poi => "narration",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for NarrativeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ready-to-play narration: script, synthesized audio, and the metadata
/// the UI and the session log need.
#[derive(Debug, Clone)]
pub struct Narrative {
    pub kind: NarrativeKind,

    /// Title extracted from the script's TITLE: line, empty if none.
    pub title: String,

    /// Full script text as sent to TTS.
    pub script: String,

    /// Path of the synthesized audio file.
    pub audio_path: PathBuf,

    /// Format suffix reported by the TTS provider, e.g. "mp3" or "wav".
    pub audio_format: String,

    /// Word budget the script was generated under (0 = unbudgeted).
    pub requested_words: u32,

    pub manual: bool,

    pub created_at: DateTime<Utc>,

    /// Measured generate-to-ready latency.
    pub latency: Duration,

    /// Latency the tracker predicted when generation started.
    pub predicted_latency: Duration,

    pub poi: Option<Poi>,

    pub image_path: Option<PathBuf>,

    pub essay_topic: Option<String>,

    pub thumbnail_url: Option<String>,

    /// Whether the UI should open the info panel for this narration.
    pub show_info_panel: bool,
}

impl Narrative {
    /// Identifier of the POI this narrative is about, if any.
    pub fn poi_id(&self) -> Option<&str> {
        self.poi.as_ref().map(|p| p.id.as_str())
    }

    /// One-sentence summary for the session event log: the title when
    /// present, else the first sentence of the script.
    pub fn summary_line(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        match self.script.split_terminator(['.', '!', '?']).next() {
            Some(first) => first.trim().to_string(),
            None => String::new(),
        }
    }
}
