//! Session state
//!
//! Single-session container for everything the prompts and the UI need to
//! remember about the trip so far. Mutations fan in from the orchestrator
//! and the generator only.

use crate::model::{Narrative, NarrativeKind, Poi};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Persistent-store key for the serialized session snapshot.
pub const SESSION_STATE_KEY: &str = "session_context";

/// One narrated item in the structured event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub category: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// The serialized blob written through the persistent store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub trip_summary: String,
    pub narrated_count: u32,
    pub events: Vec<SessionEvent>,
    pub last_poi_id: Option<String>,
    pub last_essay_topic: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
}

#[derive(Debug, Default)]
pub struct SessionState {
    /// Rolling LLM-maintained summary of the trip so far.
    pub trip_summary: String,

    pub narrated_count: u32,

    pub last_poi: Option<Poi>,
    pub last_essay_topic: Option<String>,
    pub last_essay_title: Option<String>,
    pub last_image_path: Option<PathBuf>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,

    /// Closing sentence of the last narration, handed to the next prompt
    /// so scripts chain naturally.
    pub last_sentence: String,

    pub events: Vec<SessionEvent>,

    /// Recent narration titles + summaries for the recent-context field.
    history: VecDeque<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully played-or-queued narration.
    pub fn record_narration(&mut self, narrative: &Narrative, lat: f64, lon: f64, history_size: usize) {
        self.narrated_count += 1;
        self.last_latitude = Some(lat);
        self.last_longitude = Some(lon);
        self.last_sentence = last_sentence_of(&narrative.script);

        match narrative.kind {
            NarrativeKind::Poi => {
                self.last_poi = narrative.poi.clone();
            }
            NarrativeKind::Essay => {
                self.last_essay_topic = narrative.essay_topic.clone();
                self.last_essay_title = Some(narrative.title.clone());
            }
            NarrativeKind::Screenshot => {
                self.last_image_path = narrative.image_path.clone();
            }
            _ => {}
        }

        let category = narrative
            .poi
            .as_ref()
            .map(|p| p.category.clone())
            .unwrap_or_default();
        self.events.push(SessionEvent {
            timestamp: narrative.created_at,
            kind: narrative.kind.to_string(),
            category,
            title: narrative.title.clone(),
            summary: narrative.summary_line(),
            metadata: serde_json::Value::Null,
        });

        let entry = if narrative.title.is_empty() {
            narrative.summary_line()
        } else {
            narrative.title.clone()
        };
        if !entry.is_empty() {
            self.history.push_back(entry);
        }
        while self.history.len() > history_size.max(1) {
            self.history.pop_front();
        }
    }

    /// Comma-joined recent narration titles, newest last.
    pub fn recent_context(&self) -> String {
        self.history.iter().cloned().collect::<Vec<_>>().join(", ")
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            trip_summary: self.trip_summary.clone(),
            narrated_count: self.narrated_count,
            events: self.events.clone(),
            last_poi_id: self.last_poi.as_ref().map(|p| p.id.clone()),
            last_essay_topic: self.last_essay_topic.clone(),
            last_latitude: self.last_latitude,
            last_longitude: self.last_longitude,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Last complete sentence of a script, for prompt chaining.
pub fn last_sentence_of(script: &str) -> String {
    let trimmed = script.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .next_back()
        .unwrap_or(trimmed)
        .to_string()
}
