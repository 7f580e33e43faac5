use crate::model::narrative::{Narrative, NarrativeKind};
use crate::model::poi::Poi;
use crate::model::telemetry::Telemetry;
use crate::prompt::budget::DominanceStrategy;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Continuation invoked by the queue worker when a job finishes, with the
/// produced narrative or the failure. Jobs without a continuation deliver
/// to the playback queue instead.
pub type JobCallback = Box<dyn FnOnce(crate::Result<Narrative>) + Send + 'static>;

/// A queued request to generate one narrative.
///
/// The telemetry snapshot is copied in at enqueue time; prompt data is
/// assembled when the worker picks the job up, so recent-context and the
/// trip summary are as fresh as possible.
pub struct GenerationJob {
    pub kind: NarrativeKind,

    /// Subject POI for `Poi` jobs.
    pub poi: Option<Poi>,

    /// Identifier of the announcement instance this job belongs to.
    pub announcement: Option<String>,

    pub telemetry: Telemetry,

    pub manual: bool,

    pub strategy: DominanceStrategy,

    /// Screenshot to describe, for `Screenshot` jobs.
    pub image_path: Option<PathBuf>,

    /// Topic drawn from the rotation, for `Essay` jobs.
    pub essay_topic: Option<String>,

    /// Country pair for `Border` jobs.
    pub border: Option<(String, String)>,

    pub created_at: DateTime<Utc>,

    pub on_complete: Option<JobCallback>,
}

impl GenerationJob {
    pub fn new(kind: NarrativeKind, telemetry: Telemetry) -> Self {
        Self {
            kind,
            poi: None,
            announcement: None,
            telemetry,
            manual: false,
            strategy: DominanceStrategy::Unset,
            image_path: None,
            essay_topic: None,
            border: None,
            created_at: Utc::now(),
            on_complete: None,
        }
    }

    pub fn with_poi(mut self, poi: Poi) -> Self {
        self.poi = Some(poi);
        self
    }

    pub fn with_manual(mut self, manual: bool) -> Self {
        self.manual = manual;
        self
    }

    pub fn with_strategy(mut self, strategy: DominanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_announcement(mut self, id: impl Into<String>) -> Self {
        self.announcement = Some(id.into());
        self
    }

    pub fn with_image(mut self, path: PathBuf) -> Self {
        self.image_path = Some(path);
        self
    }

    pub fn with_essay_topic(mut self, topic: impl Into<String>) -> Self {
        self.essay_topic = Some(topic.into());
        self
    }

    pub fn with_border(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.border = Some((from.into(), to.into()));
        self
    }

    pub fn with_callback(mut self, cb: JobCallback) -> Self {
        self.on_complete = Some(cb);
        self
    }

    pub fn poi_id(&self) -> Option<&str> {
        self.poi.as_ref().map(|p| p.id.as_str())
    }
}

impl std::fmt::Debug for GenerationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationJob")
            .field("kind", &self.kind)
            .field("poi", &self.poi_id())
            .field("announcement", &self.announcement)
            .field("manual", &self.manual)
            .field("strategy", &self.strategy)
            .field("created_at", &self.created_at)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}
