//! End-to-end scenarios through scripted mock collaborators.
//!
//! The engine runs exactly as in production: real queues, real worker
//! thread, real generator pipeline. Only the provider edges are mocked:
//! a scripted LLM, a file-writing TTS, and an audio sink the tests
//! complete by hand.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skytale::config::EngineConfig;
use skytale::model::{FlightStage, Poi, Telemetry};
use skytale::orchestrator::{Collaborators, Orchestrator};
use skytale::prompt::budget::DominanceStrategy;
use skytale::providers::{
    AudioSink, GeoLocation, GeoLookup, LlmClient, LlmRequest, LlmResponse, PlaybackCallback,
    PoiStore, PromptRenderer, StateStore, TelemetrySource, TtsClient, TtsError, TtsErrorKind,
    UsageTracker,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ----- mock collaborators ---------------------------------------------

struct MockTelemetry {
    current: Mutex<Telemetry>,
    window: Mutex<Option<Duration>>,
}

impl MockTelemetry {
    fn new(tel: Telemetry) -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(tel),
            window: Mutex::new(None),
        })
    }

    fn set(&self, tel: Telemetry) {
        *self.current.lock() = tel;
    }
}

impl TelemetrySource for MockTelemetry {
    fn get(&self) -> Telemetry {
        self.current.lock().clone()
    }

    fn set_prediction_window(&self, window: Duration) {
        *self.window.lock() = Some(window);
    }

    fn last_transition(&self, _stage: FlightStage) -> Option<DateTime<Utc>> {
        None
    }
}

struct MockPoiStore {
    pois: Mutex<HashMap<String, Poi>>,
    rival_rows: AtomicUsize,
    saved_last_played: Mutex<Vec<String>>,
}

impl MockPoiStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            pois: Mutex::new(HashMap::new()),
            rival_rows: AtomicUsize::new(1),
            saved_last_played: Mutex::new(Vec::new()),
        })
    }

    fn insert(&self, poi: Poi) {
        self.pois.lock().insert(poi.id.clone(), poi);
    }
}

impl PoiStore for MockPoiStore {
    fn get(&self, id: &str) -> Option<Poi> {
        self.pois.lock().get(id).cloned()
    }

    fn get_near(&self, _lat: f64, _lon: f64, _radius_km: f64) -> Vec<Poi> {
        self.pois.lock().values().cloned().collect()
    }

    fn count_scored_above(&self, _threshold: f64, _limit: usize) -> usize {
        self.rival_rows.load(Ordering::SeqCst)
    }

    fn save_last_played(&self, id: &str, _at: DateTime<Utc>) -> skytale::Result<()> {
        self.saved_last_played.lock().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MockStateStore {
    map: Mutex<HashMap<String, String>>,
}

impl StateStore for MockStateStore {
    fn get_state(&self, key: &str) -> Option<String> {
        self.map.lock().get(key).cloned()
    }

    fn set_state(&self, key: &str, value: &str) -> skytale::Result<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn save_poi(&self, _poi: &Poi) -> skytale::Result<()> {
        Ok(())
    }

    fn get_article(&self, _id: &str) -> Option<String> {
        None
    }

    fn save_article(&self, _id: &str, _text: &str) -> skytale::Result<()> {
        Ok(())
    }

    fn get_recently_played(&self, _since: DateTime<Utc>) -> Vec<String> {
        Vec::new()
    }
}

/// Scripted LLM: narration profiles pop from `scripts` (with an optional
/// per-response delay to simulate slow providers), the rescue profile pops
/// from `rescues`, the summary profile always answers.
struct ScriptedLlm {
    scripts: Mutex<VecDeque<(String, Duration)>>,
    rescues: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            rescues: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn push_script(&self, text: &str) {
        self.scripts
            .lock()
            .push_back((text.to_string(), Duration::ZERO));
    }

    fn push_slow_script(&self, text: &str, delay: Duration) {
        self.scripts.lock().push_back((text.to_string(), delay));
    }

    fn push_rescue(&self, text: &str) {
        self.rescues.lock().push_back(text.to_string());
    }

    /// The JSON data bag of the last narration prompt.
    fn last_narration_data(&self) -> serde_json::Value {
        let prompts = self.prompts.lock();
        let (_, prompt) = prompts
            .iter()
            .rev()
            .find(|(profile, _)| profile != "script_rescue" && profile != "summary")
            .expect("no narration prompt recorded");
        let (_, json) = prompt.split_once('\n').expect("prompt missing data bag");
        serde_json::from_str(json).expect("data bag is not valid JSON")
    }

    fn respond(text: String) -> skytale::Result<LlmResponse> {
        Ok(LlmResponse {
            text,
            provider: "mock-llm".to_string(),
        })
    }
}

impl LlmClient for ScriptedLlm {
    fn generate_text(&self, profile: &str, request: &LlmRequest) -> skytale::Result<LlmResponse> {
        self.prompts
            .lock()
            .push((profile.to_string(), request.prompt.clone()));
        match profile {
            "script_rescue" => {
                let text = self
                    .rescues
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| "RESCUE_FAILED".to_string());
                Self::respond(text)
            }
            "summary" => Self::respond("The trip so far in one line.".to_string()),
            _ => {
                let (text, delay) = self
                    .scripts
                    .lock()
                    .pop_front()
                    .unwrap_or_else(|| ("A short narration.".to_string(), Duration::ZERO));
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                Self::respond(text)
            }
        }
    }

    fn generate_image_text(
        &self,
        profile: &str,
        request: &LlmRequest,
        _image: &Path,
    ) -> skytale::Result<LlmResponse> {
        self.generate_text(profile, request)
    }

    fn has_profile(&self, _name: &str) -> bool {
        true
    }
}

enum TtsBehavior {
    Write(usize),
    Fail(TtsErrorKind),
}

/// File-writing TTS mock. Behaviors are consumed per call; the default
/// writes a healthy-sized file.
struct MockTts {
    name: &'static str,
    behaviors: Mutex<VecDeque<TtsBehavior>>,
    call_log: Arc<Mutex<Vec<&'static str>>>,
}

impl MockTts {
    fn new(name: &'static str, call_log: Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviors: Mutex::new(VecDeque::new()),
            call_log,
        })
    }

    fn push(&self, behavior: TtsBehavior) {
        self.behaviors.lock().push_back(behavior);
    }
}

impl TtsClient for MockTts {
    fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        output_stem: &Path,
    ) -> std::result::Result<String, TtsError> {
        self.call_log.lock().push(self.name);
        let behavior = self
            .behaviors
            .lock()
            .pop_front()
            .unwrap_or(TtsBehavior::Write(4096));
        match behavior {
            TtsBehavior::Write(size) => {
                let path = output_stem.with_extension("wav");
                std::fs::write(&path, vec![0u8; size])
                    .map_err(|e| TtsError::new(TtsErrorKind::Io, e.to_string()))?;
                Ok("wav".to_string())
            }
            TtsBehavior::Fail(kind) => Err(TtsError::new(kind, "scripted failure")),
        }
    }
}

/// Audio sink the tests drive by hand: `finish_current` fires the pending
/// completion callback exactly as the device thread would.
struct ManualAudio {
    pending: Mutex<Option<PlaybackCallback>>,
    played: Mutex<Vec<PathBuf>>,
    play_count: AtomicUsize,
}

impl ManualAudio {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(None),
            played: Mutex::new(Vec::new()),
            play_count: AtomicUsize::new(0),
        })
    }

    fn finish_current(&self) {
        let callback = self.pending.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl AudioSink for ManualAudio {
    fn play(
        &self,
        path: &Path,
        _skip_checks: bool,
        on_complete: PlaybackCallback,
    ) -> skytale::Result<()> {
        self.played.lock().push(path.to_path_buf());
        self.play_count.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock() = Some(on_complete);
        Ok(())
    }

    fn stop(&self) {
        self.finish_current();
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn is_busy(&self) -> bool {
        self.pending.lock().is_some()
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn remaining(&self) -> Option<Duration> {
        None
    }

    fn is_user_paused(&self) -> bool {
        false
    }

    fn replay_last(&self, on_complete: PlaybackCallback) -> bool {
        if self.played.lock().is_empty() {
            return false;
        }
        self.play_count.fetch_add(1, Ordering::SeqCst);
        on_complete();
        true
    }
}

/// Renderer that echoes the template and the data bag, so tests can read
/// exactly what the assembler produced.
struct EchoRenderer;

impl PromptRenderer for EchoRenderer {
    fn render(&self, template: &str, data: &serde_json::Value) -> skytale::Result<String> {
        Ok(format!("{}\n{}", template, data))
    }
}

struct MockGeo;

impl GeoLookup for MockGeo {
    fn location_for(&self, _lat: f64, _lon: f64) -> Option<GeoLocation> {
        Some(GeoLocation {
            country: "Testland".to_string(),
            admin1: "Coastal Province".to_string(),
            city: "Harborton".to_string(),
        })
    }
}

#[derive(Default)]
struct MockTracker {
    successes: Mutex<Vec<String>>,
}

impl UsageTracker for MockTracker {
    fn is_free_tier(&self, _provider: &str) -> bool {
        false
    }

    fn record_success(&self, provider: &str) {
        self.successes.lock().push(provider.to_string());
    }

    fn record_failure(&self, _provider: &str) {}
}

// ----- rig -------------------------------------------------------------

struct Rig {
    orchestrator: Orchestrator,
    telemetry: Arc<MockTelemetry>,
    poi_store: Arc<MockPoiStore>,
    state_store: Arc<MockStateStore>,
    llm: Arc<ScriptedLlm>,
    tts_primary: Arc<MockTts>,
    tts_log: Arc<Mutex<Vec<&'static str>>>,
    audio: Arc<ManualAudio>,
    tracker: Arc<MockTracker>,
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn rig_with_config(mut config: EngineConfig, initial_tel: Telemetry) -> Rig {
    init_tracing();
    // No pacing gap in tests.
    config.playback.pacing_seconds = 0;

    let telemetry = MockTelemetry::new(initial_tel);
    let poi_store = MockPoiStore::new();
    let state_store = Arc::new(MockStateStore::default());
    let llm = ScriptedLlm::new();
    let tts_log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let tts_primary = MockTts::new("primary", Arc::clone(&tts_log));
    let audio = ManualAudio::new();

    let tracker = Arc::new(MockTracker::default());

    let fallback_log = Arc::clone(&tts_log);
    let deps = Collaborators {
        telemetry: telemetry.clone(),
        poi_store: poi_store.clone(),
        state_store: state_store.clone(),
        llm: llm.clone(),
        tts_primary: tts_primary.clone(),
        tts_fallback_factory: Box::new(move || {
            MockTts::new("fallback", Arc::clone(&fallback_log)) as Arc<dyn TtsClient>
        }),
        audio: audio.clone(),
        renderer: Arc::new(EchoRenderer),
        geo: Arc::new(MockGeo),
        tracker: tracker.clone(),
    };

    let orchestrator = Orchestrator::new(config, deps).expect("engine construction");

    Rig {
        orchestrator,
        telemetry,
        poi_store,
        state_store,
        llm,
        tts_primary,
        tts_log,
        audio,
        tracker,
    }
}

fn rig(initial_tel: Telemetry) -> Rig {
    rig_with_config(EngineConfig::default(), initial_tel)
}

fn cruise_tel() -> Telemetry {
    Telemetry {
        latitude: 10.0,
        longitude: 20.0,
        predicted_latitude: None,
        predicted_longitude: None,
        heading_deg: 0.0,
        ground_speed_kts: 120.0,
        altitude_agl_ft: 3000.0,
        altitude_msl_ft: 4500.0,
        vertical_speed_fpm: 0.0,
        on_ground: false,
        stage: FlightStage::Cruise,
        timestamp: Utc::now(),
    }
}

fn ground_tel(stage: FlightStage) -> Telemetry {
    Telemetry {
        latitude: 10.0,
        longitude: 20.0,
        predicted_latitude: None,
        predicted_longitude: None,
        heading_deg: 0.0,
        ground_speed_kts: 0.0,
        altitude_agl_ft: 0.0,
        altitude_msl_ft: 1000.0,
        vertical_speed_fpm: 0.0,
        on_ground: true,
        stage,
        timestamp: Utc::now(),
    }
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    done()
}

fn thousand_words() -> String {
    vec!["word"; 1000].join(" ")
}

// ----- seed scenarios ---------------------------------------------------

/// S1: happy POI at cruise, metric, > 4.5 km dead ahead.
#[test]
fn s1_happy_poi_at_cruise() {
    let r = rig(cruise_tel());
    r.state_store.set_state("text_length", "1").unwrap();
    r.poi_store.insert(
        Poi::new("q1", "Q1", 10.05, 20.0)
            .with_category("landmark")
            .with_score(5.0)
            .with_article("https://example.org/q1", thousand_words()),
    );
    // One row back from the rival query: no rival.
    r.poi_store.rival_rows.store(1, Ordering::SeqCst);

    r.orchestrator
        .prepare_next_narrative("q1", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();

    let data = r.llm.last_narration_data();
    assert_eq!(data["strategy"], "max_skew");
    assert_eq!(data["word_budget"], 200);
    assert_eq!(
        data["navigation_phrase"],
        "At your 12 o'clock, about 6 kilometers away"
    );

    // Narrative parked on the playback queue, session advanced, latency
    // recorded into the prediction window.
    assert_eq!(r.orchestrator.playback_queue_len(), 1);
    assert_eq!(r.orchestrator.narrated_count(), 1);
    assert!(r.telemetry.window.lock().is_some());

    // Audio file really exists.
    r.orchestrator.process_playback_queue();
    assert!(r.orchestrator.is_playing());
    let played = r.audio.played.lock()[0].clone();
    assert!(played.exists());

    // Provider usage was reported and last-played persisted (the latter
    // off-thread).
    assert!(r.tracker.successes.lock().contains(&"mock-llm".to_string()));
    assert!(wait_until(Duration::from_secs(1), || {
        r.poi_store.saved_last_played.lock().contains(&"q1".to_string())
    }));
}

/// S2: POI too close, on the ground, imperial: empty phrase, narration
/// still produced.
#[test]
fn s2_poi_on_ground_too_close() {
    let mut config = EngineConfig::default();
    config.narrator.units = skytale::config::UnitSystem::Imperial;
    let r = rig_with_config(config, ground_tel(FlightStage::Parked));
    r.poi_store.insert(
        Poi::new("q2", "Q2", 10.03, 20.0)
            .with_category("mill")
            .with_article("https://example.org/q2", thousand_words()),
    );

    r.orchestrator
        .prepare_next_narrative("q2", DominanceStrategy::Unset, &ground_tel(FlightStage::Parked))
        .unwrap();

    let data = r.llm.last_narration_data();
    let phrase = data["navigation_phrase"].as_str().unwrap();
    assert!(phrase.is_empty());
    assert!(!phrase.contains("mile"));
    assert!(!phrase.contains("kilometer"));
    assert_eq!(r.orchestrator.playback_queue_len(), 1);
}

/// S3: manual request while an automatic generation is in flight; both
/// complete and play in arrival order.
#[test]
fn s3_manual_request_while_generating() {
    let r = rig(cruise_tel());
    r.poi_store.insert(
        Poi::new("a", "Alpha", 10.05, 20.0).with_article("u", thousand_words()),
    );
    r.poi_store.insert(
        Poi::new("b", "Bravo", 10.06, 20.0).with_article("u", thousand_words()),
    );

    // A's generation is slow enough for B to arrive mid-flight.
    r.llm
        .push_slow_script("TITLE: Alpha\nAlpha script.", Duration::from_millis(200));
    r.llm.push_script("TITLE: Bravo\nBravo script.");

    r.orchestrator.start();
    r.orchestrator
        .play_poi("a", false, false, &cruise_tel(), DominanceStrategy::Unset)
        .unwrap();

    assert!(wait_until(Duration::from_secs(1), || {
        r.orchestrator.is_generating()
    }));

    // User asks for B while A is generating.
    r.orchestrator
        .play_poi("b", true, true, &cruise_tel(), DominanceStrategy::Unset)
        .unwrap();
    assert_eq!(r.orchestrator.generation_queue_len(), 1);

    assert!(wait_until(Duration::from_secs(3), || {
        r.orchestrator.narrated_count() == 2
    }));

    // A entered playback first and is playing; B waits its turn.
    assert_eq!(r.orchestrator.active_poi().as_deref(), Some("a"));
    assert!(wait_until(Duration::from_secs(1), || {
        r.orchestrator.playback_queue_len() == 1
    }));

    r.audio.finish_current();
    assert!(wait_until(Duration::from_secs(1), || {
        r.orchestrator.active_poi().as_deref() == Some("b")
    }));

    r.orchestrator.stop();
}

/// S4: briefing generation spans the Parked -> Taxi transition and plays
/// exactly once.
#[test]
fn s4_briefing_spans_stage_transition() {
    let r = rig(ground_tel(FlightStage::Parked));
    r.poi_store
        .insert(Poi::new("ap1", "Home Field", 10.01, 20.0).with_category("airport"));
    r.llm.push_slow_script(
        "TITLE: Departure Briefing\nWelcome aboard.",
        Duration::from_millis(200),
    );

    r.orchestrator.start();

    // Parked at the airport: generation starts.
    r.orchestrator.handle_telemetry(&ground_tel(FlightStage::Parked));
    assert!(wait_until(Duration::from_secs(1), || {
        r.orchestrator.is_generating()
    }));

    // Stage flips to Taxi while the briefing is still generating.
    r.telemetry.set(ground_tel(FlightStage::Taxi));
    r.orchestrator.handle_telemetry(&ground_tel(FlightStage::Taxi));

    // Completion triggers immediate high-priority playback.
    assert!(wait_until(Duration::from_secs(3), || {
        r.orchestrator.is_playing()
    }));
    assert_eq!(
        r.orchestrator.announcements().status("briefing"),
        Some(skytale::announce::AnnouncementStatus::Done)
    );
    assert_eq!(r.audio.play_count.load(Ordering::SeqCst), 1);

    // Later ticks never replay it.
    r.audio.finish_current();
    r.orchestrator.handle_telemetry(&ground_tel(FlightStage::Taxi));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(r.audio.play_count.load(Ordering::SeqCst), 1);

    r.orchestrator.stop();
}

/// S5: over-length script is rescued and re-titled.
#[test]
fn s5_rescue_engaged_and_retitled() {
    let r = rig(cruise_tel());
    r.state_store.set_state("text_length", "1").unwrap();
    // 20 source words cap the budget at 10.
    r.poi_store.insert(
        Poi::new("q5", "Q5", 10.05, 20.0).with_article("u", vec!["w"; 20].join(" ")),
    );

    let long_script = format!("TITLE: Foo\n{}", vec!["word"; 25].join(" "));
    r.llm.push_script(&long_script);
    r.llm.push_rescue("TITLE: Bar\nShortened.");

    r.orchestrator
        .prepare_next_narrative("q5", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    r.orchestrator.process_playback_queue();

    assert_eq!(r.orchestrator.narrated_count(), 1);

    // The narrative carries the rescued title and script.
    let data = r.llm.last_narration_data();
    assert_eq!(data["word_budget"], 10);
    assert_eq!(r.orchestrator.last_title().as_deref(), Some("Bar"));
    assert_eq!(r.orchestrator.last_sentence(), "Shortened.");
}

/// S6: fatal primary TTS latches the fallback, which serves the rest of
/// the session.
#[test]
fn s6_tts_fatal_then_fallback() {
    let r = rig(cruise_tel());
    r.poi_store
        .insert(Poi::new("q6", "Q6", 10.05, 20.0).with_article("u", thousand_words()));
    r.poi_store
        .insert(Poi::new("q7", "Q7", 10.06, 20.0).with_article("u", thousand_words()));
    r.tts_primary
        .push(TtsBehavior::Fail(TtsErrorKind::RateLimited));

    assert!(!r.orchestrator.is_fallback_active());
    r.orchestrator
        .prepare_next_narrative("q6", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();

    assert!(r.orchestrator.is_fallback_active());
    assert_eq!(r.orchestrator.playback_queue_len(), 1);
    assert_eq!(*r.tts_log.lock(), vec!["primary", "fallback"]);

    // The next narration goes straight to the fallback voice.
    r.orchestrator
        .prepare_next_narrative("q7", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    assert_eq!(*r.tts_log.lock(), vec!["primary", "fallback", "fallback"]);
}

// ----- cross-cutting behaviors ------------------------------------------

#[test]
fn manual_request_for_queued_poi_promotes_instead_of_regenerating() {
    let r = rig(cruise_tel());
    r.poi_store
        .insert(Poi::new("x", "X", 10.05, 20.0).with_article("u", thousand_words()));

    r.orchestrator
        .prepare_next_narrative("x", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    let narrated_before = r.orchestrator.narrated_count();

    // A manual request for the already-queued POI promotes it instead of
    // generating again.
    r.orchestrator
        .play_poi("x", true, true, &cruise_tel(), DominanceStrategy::Unset)
        .unwrap();
    assert_eq!(r.orchestrator.narrated_count(), narrated_before);
    assert_eq!(r.orchestrator.generation_queue_len(), 0);
    // Promotion drains the queue into playback.
    assert!(r.orchestrator.is_playing());
}

#[test]
fn pause_holds_the_drain_until_resume() {
    let r = rig(cruise_tel());
    r.poi_store
        .insert(Poi::new("p", "P", 10.05, 20.0).with_article("u", thousand_words()));

    r.orchestrator.pause();
    r.orchestrator
        .prepare_next_narrative("p", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    r.orchestrator.process_playback_queue();
    assert!(!r.orchestrator.is_playing());
    assert_eq!(r.orchestrator.playback_queue_len(), 1);

    r.orchestrator.resume();
    assert!(r.orchestrator.is_playing());
    assert_eq!(r.orchestrator.playback_queue_len(), 0);
}

#[test]
fn reset_session_clears_queues_fallback_and_counters() {
    let r = rig(cruise_tel());
    r.poi_store
        .insert(Poi::new("p", "P", 10.05, 20.0).with_article("u", thousand_words()));
    r.tts_primary
        .push(TtsBehavior::Fail(TtsErrorKind::ServerError));

    r.orchestrator
        .prepare_next_narrative("p", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    assert!(r.orchestrator.is_fallback_active());
    assert_eq!(r.orchestrator.narrated_count(), 1);

    r.orchestrator.reset_session();
    assert!(!r.orchestrator.is_fallback_active());
    assert_eq!(r.orchestrator.narrated_count(), 0);
    assert_eq!(r.orchestrator.playback_queue_len(), 0);
    assert!(r.orchestrator.beacon_target().is_none());
}

#[test]
fn replay_last_reports_whether_anything_played() {
    let r = rig(cruise_tel());
    assert!(!r.orchestrator.replay_last());

    r.poi_store
        .insert(Poi::new("p", "P", 10.05, 20.0).with_article("u", thousand_words()));
    r.orchestrator
        .prepare_next_narrative("p", DominanceStrategy::Unset, &cruise_tel())
        .unwrap();
    r.orchestrator.process_playback_queue();
    r.audio.finish_current();

    assert!(r.orchestrator.replay_last());
}

#[test]
fn unknown_poi_is_not_found() {
    let r = rig(cruise_tel());
    let err = r
        .orchestrator
        .play_poi("ghost", true, true, &cruise_tel(), DominanceStrategy::Unset)
        .unwrap_err();
    assert!(matches!(err, skytale::SkytaleError::NotFound(_)));
}

#[test]
fn stub_poi_is_skipped_silently() {
    let r = rig(cruise_tel());
    r.poi_store.insert(
        Poi::new("stub", "Stub", 10.05, 20.0)
            .with_article("u", thousand_words())
            .with_badge(skytale::model::BADGE_STUB),
    );
    r.orchestrator
        .play_poi("stub", true, true, &cruise_tel(), DominanceStrategy::Unset)
        .unwrap();
    assert_eq!(r.orchestrator.generation_queue_len(), 0);
}

#[test]
fn essay_requires_configured_topics() {
    let r = rig(cruise_tel());
    let err = r.orchestrator.play_essay(&cruise_tel()).unwrap_err();
    assert!(matches!(err, skytale::SkytaleError::ConfigError(_)));

    let mut config = EngineConfig::default();
    config.narrator.essay_topics = vec!["geology".to_string()];
    let r = rig_with_config(config, cruise_tel());
    r.llm.push_script("TITLE: On Rocks\nRocks are old.");
    r.orchestrator.start();
    r.orchestrator.play_essay(&cruise_tel()).unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        r.orchestrator.narrated_count() == 1
    }));
    r.orchestrator.stop();
}

#[test]
fn screenshot_goes_through_the_multimodal_path() {
    let r = rig(cruise_tel());
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("cockpit.png");
    std::fs::write(&image, [0u8; 16]).unwrap();

    r.llm.push_script("TITLE: Out the Window\nA ridge line.");
    r.orchestrator.start();
    r.orchestrator.play_screenshot(image, &cruise_tel());

    assert!(wait_until(Duration::from_secs(3), || {
        r.orchestrator.narrated_count() == 1
    }));
    assert_eq!(r.orchestrator.last_title().as_deref(), Some("Out the Window"));
    r.orchestrator.stop();
}

#[test]
fn border_crossing_plays_with_high_priority() {
    let r = rig(cruise_tel());
    r.llm.push_script("TITLE: Crossing\nWelcome to Italy.");
    r.orchestrator.start();

    r.orchestrator.notify_border_crossing("France", "Italy");

    assert!(wait_until(Duration::from_secs(3), || {
        r.orchestrator.is_playing()
    }));
    assert_eq!(
        r.orchestrator.announcements().status("border"),
        Some(skytale::announce::AnnouncementStatus::Done)
    );
    r.orchestrator.stop();
}
