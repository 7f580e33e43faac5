use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flight stage as reported by the simulator bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightStage {
    Parked,
    Taxi,
    TakeOff,
    Climb,
    Cruise,
    Descent,
    Approach,
    Landing,
    Hold,
    Unknown,
}

impl FlightStage {
    /// Stages where the aircraft has left the ground.
    pub fn is_airborne(&self) -> bool {
        matches!(
            self,
            FlightStage::TakeOff
                | FlightStage::Climb
                | FlightStage::Cruise
                | FlightStage::Descent
                | FlightStage::Approach
                | FlightStage::Hold
        )
    }

    /// Lowercase name used in prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStage::Parked => "parked",
            FlightStage::Taxi => "taxi",
            FlightStage::TakeOff => "takeoff",
            FlightStage::Climb => "climb",
            FlightStage::Cruise => "cruise",
            FlightStage::Descent => "descent",
            FlightStage::Approach => "approach",
            FlightStage::Landing => "landing",
            FlightStage::Hold => "hold",
            FlightStage::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FlightStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of the aircraft state at one instant.
///
/// Snapshots are copied into generation jobs; nothing in the engine holds a
/// live reference into the simulator bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub latitude: f64,
    pub longitude: f64,

    /// Position projected one prediction window ahead along the current
    /// track, when the bridge has one.
    pub predicted_latitude: Option<f64>,
    pub predicted_longitude: Option<f64>,

    /// True heading in degrees, 0..360.
    pub heading_deg: f64,

    /// Ground speed in knots.
    pub ground_speed_kts: f64,

    /// Altitude above ground level, feet.
    pub altitude_agl_ft: f64,

    /// Altitude above mean sea level, feet.
    pub altitude_msl_ft: f64,

    /// Vertical speed in feet per minute.
    pub vertical_speed_fpm: f64,

    pub on_ground: bool,
    pub stage: FlightStage,
    pub timestamp: DateTime<Utc>,
}

impl Telemetry {
    /// The position POI distances are measured from: the predicted position
    /// when available, the current position otherwise.
    pub fn reference_position(&self) -> (f64, f64) {
        match (self.predicted_latitude, self.predicted_longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => (self.latitude, self.longitude),
        }
    }

    pub fn is_airborne(&self) -> bool {
        !self.on_ground
    }
}
