pub mod job;
pub mod narrative;
pub mod poi;
pub mod telemetry;

pub use job::{GenerationJob, JobCallback};
pub use narrative::{Narrative, NarrativeKind};
pub use poi::{BeaconColor, Poi, BADGE_STUB};
pub use telemetry::{FlightStage, Telemetry};
