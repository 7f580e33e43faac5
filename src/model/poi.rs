use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Badge marking a POI whose source article is a stub; stubs are never
/// narrated.
pub const BADGE_STUB: &str = "stub";

/// Beacon color shown on the map for the POI currently being narrated or
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeaconColor {
    Amber,
    Coral,
    Violet,
    Teal,
    Lime,
}

impl BeaconColor {
    /// Palette cycled by the orchestrator when a POI becomes the beacon
    /// target.
    pub const PALETTE: [BeaconColor; 5] = [
        BeaconColor::Amber,
        BeaconColor::Coral,
        BeaconColor::Violet,
        BeaconColor::Teal,
        BeaconColor::Lime,
    ];
}

/// A narratable point of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poi {
    /// Stable opaque identifier from the POI store.
    pub id: String,

    /// Display name in the narration language.
    pub name: String,

    /// Name in the local language of the region, when different.
    pub local_name: Option<String>,

    /// Category tag, e.g. "airport", "castle", "bridge".
    pub category: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Non-negative selection score from the POI scorer.
    pub score: f64,

    pub article_url: Option<String>,

    /// Cached article prose, already reduced to plain text.
    pub article_text: Option<String>,

    pub thumbnail_url: Option<String>,

    pub last_played: Option<DateTime<Utc>>,

    pub beacon_color: Option<BeaconColor>,

    pub badges: Vec<String>,
}

impl Poi {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            local_name: None,
            category: String::new(),
            latitude,
            longitude,
            score: 0.0,
            article_url: None,
            article_text: None,
            thumbnail_url: None,
            last_played: None,
            beacon_color: None,
            badges: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_article(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.article_url = Some(url.into());
        self.article_text = Some(text.into());
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badges.push(badge.into());
        self
    }

    /// A stub article has too little substance to narrate.
    pub fn is_stub(&self) -> bool {
        self.badges.iter().any(|b| b == BADGE_STUB)
    }

    /// Word count of the cached article prose.
    pub fn article_words(&self) -> usize {
        self.article_text
            .as_deref()
            .map(|t| t.split_whitespace().count())
            .unwrap_or(0)
    }
}
