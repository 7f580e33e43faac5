//! Announcement manager
//!
//! Registry of flight-phase announcement state machines, ticked on every
//! telemetry update. The manager decides *when* to generate and *when* to
//! play; the orchestrator bridges its decisions to the queues.

pub mod kinds;

pub use kinds::AnnouncementKind;

use crate::model::{FlightStage, Narrative, Telemetry};
use crate::providers::PoiStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementStatus {
    Idle,
    Generating,
    Held,
    Triggered,
    Done,
}

struct Announcement {
    kind: AnnouncementKind,
    status: AnnouncementStatus,
    held: Option<Narrative>,
    /// Set when the play window opened while generation was still running;
    /// the completion callback then plays immediately.
    trigger_pending: bool,
}

impl Announcement {
    fn new(kind: AnnouncementKind) -> Self {
        Self {
            kind,
            status: AnnouncementStatus::Idle,
            held: None,
            trigger_pending: false,
        }
    }
}

/// What the orchestrator should do after a tick.
#[derive(Debug)]
pub enum TickAction {
    /// Start generating for this announcement.
    Generate {
        id: String,
        kind: AnnouncementKind,
    },
    /// Hand this narrative to the playback queue with high priority.
    Play { id: String, narrative: Narrative },
}

pub struct AnnouncementManager {
    registry: Mutex<BTreeMap<String, Announcement>>,
    last_stage: Mutex<FlightStage>,
    poi_store: Arc<dyn PoiStore>,
    debrief_enabled: bool,
}

impl AnnouncementManager {
    pub fn new(poi_store: Arc<dyn PoiStore>, debrief_enabled: bool) -> Self {
        let mut registry = BTreeMap::new();
        for kind in [
            AnnouncementKind::Briefing,
            AnnouncementKind::Letsgo,
            AnnouncementKind::Debriefing,
        ] {
            registry.insert(kind.id().to_string(), Announcement::new(kind));
        }
        Self {
            registry: Mutex::new(registry),
            last_stage: Mutex::new(FlightStage::Unknown),
            poi_store,
            debrief_enabled,
        }
    }

    /// Advance every state machine against a fresh telemetry snapshot.
    /// Returns the queue operations the orchestrator should perform.
    pub fn tick(&self, tel: &Telemetry) -> Vec<TickAction> {
        let prev_stage = {
            let mut last = self.last_stage.lock();
            std::mem::replace(&mut *last, tel.stage)
        };

        let mut actions = Vec::new();
        let mut registry = self.registry.lock();

        for (id, ann) in registry.iter_mut() {
            let play_now = ann.kind.should_play(tel, prev_stage);
            match ann.status {
                AnnouncementStatus::Idle => {
                    if play_now {
                        // The window already passed; generating now would
                        // play a stale announcement.
                        debug!(id = %id, "play window open with nothing held, closing");
                        ann.status = AnnouncementStatus::Done;
                    } else if ann.kind.should_generate(
                        tel,
                        self.poi_store.as_ref(),
                        self.debrief_enabled,
                    ) {
                        info!(id = %id, "announcement generation starting");
                        ann.status = AnnouncementStatus::Generating;
                        actions.push(TickAction::Generate {
                            id: id.clone(),
                            kind: ann.kind.clone(),
                        });
                    }
                }
                AnnouncementStatus::Generating => {
                    if play_now && !ann.trigger_pending {
                        debug!(id = %id, "play window opened mid-generation");
                        ann.trigger_pending = true;
                    }
                }
                AnnouncementStatus::Held => {
                    if play_now || ann.trigger_pending {
                        info!(id = %id, "announcement triggered");
                        ann.status = AnnouncementStatus::Triggered;
                        ann.trigger_pending = false;
                        if let Some(narrative) = ann.held.take() {
                            actions.push(TickAction::Play {
                                id: id.clone(),
                                narrative,
                            });
                        }
                    }
                }
                AnnouncementStatus::Triggered | AnnouncementStatus::Done => {}
            }
        }

        actions
    }

    /// Arm the caller-driven border announcement for a country crossing.
    /// Returns the generate action, or None while a previous crossing is
    /// still in flight.
    pub fn arm_border(&self, from: impl Into<String>, to: impl Into<String>) -> Option<TickAction> {
        let kind = AnnouncementKind::Border {
            from: from.into(),
            to: to.into(),
        };
        let id = kind.id().to_string();
        let mut registry = self.registry.lock();

        if let Some(existing) = registry.get(&id) {
            if existing.status == AnnouncementStatus::Generating {
                warn!("Border crossing ignored, previous one still generating");
                return None;
            }
        }

        let mut ann = Announcement::new(kind.clone());
        ann.status = AnnouncementStatus::Generating;
        // Border calls play the moment generation completes.
        ann.trigger_pending = true;
        registry.insert(id.clone(), ann);

        Some(TickAction::Generate { id, kind })
    }

    /// Deliver a finished generation. Returns the narrative when it should
    /// play right now (the window opened while generating).
    pub fn complete(&self, id: &str, result: crate::Result<Narrative>) -> Option<Narrative> {
        let mut registry = self.registry.lock();
        let ann = registry.get_mut(id)?;

        match result {
            Ok(narrative) => {
                if ann.trigger_pending {
                    ann.status = AnnouncementStatus::Triggered;
                    ann.trigger_pending = false;
                    Some(narrative)
                } else {
                    debug!(id = %id, "announcement held until its window opens");
                    ann.status = AnnouncementStatus::Held;
                    ann.held = Some(narrative);
                    None
                }
            }
            Err(e) => {
                warn!(id = %id, "announcement generation failed: {}", e);
                ann.status = AnnouncementStatus::Idle;
                ann.trigger_pending = false;
                None
            }
        }
    }

    /// The triggered narrative was handed to playback.
    pub fn mark_played(&self, id: &str) {
        if let Some(ann) = self.registry.lock().get_mut(id) {
            if ann.status == AnnouncementStatus::Triggered {
                ann.status = AnnouncementStatus::Done;
            }
        }
    }

    pub fn status(&self, id: &str) -> Option<AnnouncementStatus> {
        self.registry.lock().get(id).map(|a| a.status)
    }

    /// Session reset: everything back to idle, held audio dropped.
    pub fn reset(&self) {
        let mut registry = self.registry.lock();
        for ann in registry.values_mut() {
            ann.status = AnnouncementStatus::Idle;
            ann.held = None;
            ann.trigger_pending = false;
        }
        // A border announcement belongs to the crossing that armed it.
        registry.remove("border");
        *self.last_stage.lock() = FlightStage::Unknown;
    }
}
