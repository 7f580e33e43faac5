//! Announcement kinds
//!
//! Each kind carries its own generate/play predicates. Announcements are
//! a closed set; registering them into the manager's flat map is all the
//! polymorphism this needs.

use crate::model::{FlightStage, NarrativeKind, Telemetry};
use crate::providers::PoiStore;

/// How close an airport POI must be for a departure briefing, km.
const BRIEFING_AIRPORT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementKind {
    /// Departure briefing for the airport the aircraft is parked at.
    Briefing,
    /// Short "here we go" call when the takeoff roll starts.
    Letsgo,
    /// Flight recap after landing.
    Debriefing,
    /// Caller-driven country-crossing call.
    Border { from: String, to: String },
}

impl AnnouncementKind {
    /// Stable registry identifier.
    pub fn id(&self) -> &'static str {
        match self {
            AnnouncementKind::Briefing => "briefing",
            AnnouncementKind::Letsgo => "letsgo",
            AnnouncementKind::Debriefing => "debriefing",
            AnnouncementKind::Border { .. } => "border",
        }
    }

    pub fn narrative_kind(&self) -> NarrativeKind {
        match self {
            AnnouncementKind::Briefing => NarrativeKind::Briefing,
            AnnouncementKind::Letsgo => NarrativeKind::Letsgo,
            AnnouncementKind::Debriefing => NarrativeKind::Debriefing,
            AnnouncementKind::Border { .. } => NarrativeKind::Border,
        }
    }

    /// Whether generation should start now, so the audio is ready when the
    /// play window opens.
    pub fn should_generate(
        &self,
        tel: &Telemetry,
        poi_store: &dyn PoiStore,
        debrief_enabled: bool,
    ) -> bool {
        match self {
            AnnouncementKind::Briefing => {
                matches!(
                    tel.stage,
                    FlightStage::Parked | FlightStage::Taxi | FlightStage::Hold
                ) && has_airport_nearby(tel, poi_store)
            }
            AnnouncementKind::Letsgo => tel.stage == FlightStage::Taxi,
            AnnouncementKind::Debriefing => {
                debrief_enabled
                    && matches!(tel.stage, FlightStage::Approach | FlightStage::Landing)
            }
            // Border calls are armed by the crossing notification itself.
            AnnouncementKind::Border { .. } => false,
        }
    }

    /// Whether the play window is open.
    pub fn should_play(&self, tel: &Telemetry, prev_stage: FlightStage) -> bool {
        match self {
            AnnouncementKind::Briefing => {
                matches!(tel.stage, FlightStage::Taxi | FlightStage::Hold)
            }
            AnnouncementKind::Letsgo => tel.stage == FlightStage::TakeOff,
            AnnouncementKind::Debriefing => {
                tel.on_ground
                    && matches!(
                        tel.stage,
                        FlightStage::Landing | FlightStage::Taxi | FlightStage::Parked
                    )
                    && matches!(prev_stage, FlightStage::Approach | FlightStage::Landing)
            }
            AnnouncementKind::Border { .. } => true,
        }
    }
}

fn has_airport_nearby(tel: &Telemetry, poi_store: &dyn PoiStore) -> bool {
    poi_store
        .get_near(tel.latitude, tel.longitude, BRIEFING_AIRPORT_RADIUS_KM)
        .iter()
        .any(|p| p.category == "airport")
}
