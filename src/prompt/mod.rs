//! Prompt assembly
//!
//! Builds the typed data bag the template renderer consumes. Assembly is a
//! pure function of the POI, the telemetry snapshot, the session state and
//! the configuration; nothing here talks to a provider.

pub mod budget;
pub mod navigation;

use crate::config::{EngineConfig, UnitSystem};
use crate::model::{Poi, Telemetry};
use crate::providers::GeoLocation;
use crate::session::SessionState;
use budget::DominanceStrategy;
use serde::Serialize;

/// Spoken persona shared by every narration prompt.
const PERSONA: &str = "an experienced tour guide riding along in the cockpit";

/// The keyed bag handed to the template renderer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptData {
    pub persona: String,

    pub language_code: String,
    pub language_name: String,
    pub language_locale: String,

    pub flight_stage: String,

    pub poi_name: String,
    pub poi_local_name: String,
    pub category: String,

    /// Article prose, possibly empty.
    pub wiki_prose: String,
    pub article_url: String,

    pub navigation_phrase: String,

    pub country: String,
    pub region: String,

    pub word_budget: u32,
    pub strategy: String,

    pub recent_context: String,

    pub latitude: f64,
    pub longitude: f64,
    pub predicted_latitude: f64,
    pub predicted_longitude: f64,

    pub units_instruction: String,

    pub interests: String,
    pub avoid: String,

    pub altitude_ft: f64,
    pub heading_deg: f64,
    pub groundspeed_kts: f64,

    pub trip_summary: String,
    pub last_sentence: String,
    pub flight_status: String,

    /// Optional enrichment text grounded before generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pregrounding: Option<String>,

    /// Essay topic, set for essay prompts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essay_topic: Option<String>,

    /// Country pair, set for border-crossing prompts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_to: Option<String>,
}

impl PromptData {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Everything POI prompt assembly needs beyond the POI itself.
pub struct AssembleContext<'a> {
    pub telemetry: &'a Telemetry,
    pub session: &'a SessionState,
    pub config: &'a EngineConfig,

    /// Rows returned by `count_scored_above(0.5 * score, 2)`.
    pub rival_count: usize,

    /// User length setting 1..=5 from persistent state.
    pub user_length: u32,

    pub location: Option<GeoLocation>,
    pub pregrounding: Option<String>,
}

/// Assemble the prompt bag for a POI narration. Also resolves the
/// dominance strategy and the word budget, which the generator needs for
/// the rescue pass.
pub fn assemble_poi(poi: &Poi, strategy: DominanceStrategy, ctx: &AssembleContext<'_>) -> PromptData {
    let strategy = budget::resolve_strategy(strategy, ctx.rival_count);

    let pregrounding_words = ctx
        .pregrounding
        .as_deref()
        .map(|t| t.split_whitespace().count())
        .unwrap_or(0);
    let source_words = poi.article_words() + pregrounding_words;

    let words = budget::word_budget(
        ctx.config.narrator.narration_length_short_words,
        ctx.config.narrator.narration_length_long_words,
        ctx.user_length,
        source_words,
        strategy,
        poi.is_stub(),
    );

    let mut data = base_data(ctx);
    data.poi_name = poi.name.clone();
    data.poi_local_name = poi.local_name.clone().unwrap_or_else(|| poi.name.clone());
    data.category = poi.category.clone();
    data.wiki_prose = poi.article_text.clone().unwrap_or_default();
    data.article_url = poi.article_url.clone().unwrap_or_default();
    data.navigation_phrase = navigation::navigation_phrase(
        ctx.telemetry,
        poi.latitude,
        poi.longitude,
        ctx.config.narrator.units,
    );
    data.word_budget = words;
    data.strategy = strategy.to_string();
    data.pregrounding = ctx.pregrounding.clone();
    data
}

/// Assemble the prompt bag for non-POI kinds (announcements, essays,
/// screenshots). The word budget is the long target scaled by the user
/// length.
pub fn assemble_general(ctx: &AssembleContext<'_>, essay_topic: Option<&str>) -> PromptData {
    let mut data = base_data(ctx);
    // No source text caps these kinds; only the target limit applies.
    data.word_budget = budget::word_budget(
        ctx.config.narrator.narration_length_short_words,
        ctx.config.narrator.narration_length_long_words,
        ctx.user_length,
        1_000_000,
        DominanceStrategy::MaxSkew,
        false,
    );
    data.strategy = DominanceStrategy::MaxSkew.to_string();
    data.essay_topic = essay_topic.map(String::from);
    data
}

fn base_data(ctx: &AssembleContext<'_>) -> PromptData {
    let tel = ctx.telemetry;
    let language = ctx.config.language();
    let (pred_lat, pred_lon) = tel.reference_position();
    let location = ctx.location.clone().unwrap_or_default();

    PromptData {
        persona: PERSONA.to_string(),
        language_code: language.code,
        language_name: language.name,
        language_locale: language.locale,
        flight_stage: tel.stage.to_string(),
        country: location.country,
        region: location.admin1,
        recent_context: ctx.session.recent_context(),
        latitude: tel.latitude,
        longitude: tel.longitude,
        predicted_latitude: pred_lat,
        predicted_longitude: pred_lon,
        units_instruction: units_instruction(ctx.config.narrator.units).to_string(),
        interests: ctx.config.narrator.interests.clone(),
        avoid: ctx.config.narrator.avoid.clone(),
        altitude_ft: tel.altitude_msl_ft,
        heading_deg: tel.heading_deg,
        groundspeed_kts: tel.ground_speed_kts,
        trip_summary: ctx.session.trip_summary.clone(),
        last_sentence: ctx.session.last_sentence.clone(),
        flight_status: flight_status_sentence(tel),
        ..Default::default()
    }
}

fn units_instruction(units: UnitSystem) -> &'static str {
    match units {
        UnitSystem::Metric => {
            "Use metric units: kilometers for distances, meters for elevations."
        }
        UnitSystem::Imperial => {
            "Use imperial units: nautical miles for distances, feet for elevations."
        }
        UnitSystem::Hybrid => {
            "Use kilometers for distances on the ground and feet for altitudes."
        }
    }
}

/// One-sentence description of what the aircraft is doing right now.
fn flight_status_sentence(tel: &Telemetry) -> String {
    if tel.on_ground {
        format!("The aircraft is on the ground, {}.", tel.stage)
    } else {
        format!(
            "The aircraft is in the {} phase at {:.0} feet, heading {:.0} degrees at {:.0} knots.",
            tel.stage, tel.altitude_msl_ft, tel.heading_deg, tel.ground_speed_kts
        )
    }
}
