//! Orchestrator
//!
//! Top-level coordinator. Owns the generation and playback queues and the
//! active-playback slot under one coarse lock, runs the queue worker
//! thread, drives the playback drain, and bridges announcement decisions
//! to the queues. No external collaborator is ever called while the lock
//! is held.

use crate::announce::{AnnouncementKind, AnnouncementManager, TickAction};
use crate::config::{EngineConfig, IdentAction};
use crate::essay::EssayRotation;
use crate::fallback::TtsFallback;
use crate::generator::{BusyGate, GenerationRequest, Generator};
use crate::latency::LatencyTracker;
use crate::model::{BeaconColor, GenerationJob, Narrative, NarrativeKind, Poi, Telemetry};
use crate::prompt::budget::DominanceStrategy;
use crate::prompt::{self, AssembleContext};
use crate::providers::{
    AudioSink, GeoLookup, LlmClient, PoiStore, PromptRenderer, StateStore, TelemetrySource,
    TtsClient, UsageTracker,
};
use crate::queues::{GenerationQueue, PlaybackQueue};
use crate::session::{SessionState, SESSION_STATE_KEY};
use crate::{Result, SkytaleError};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Persistent-state key for the user's 1..=5 narration length setting.
const TEXT_LENGTH_KEY: &str = "text_length";

/// Default user length when the stored value is missing or malformed.
const DEFAULT_TEXT_LENGTH: u32 = 3;

/// External collaborators wired in by the host application.
pub struct Collaborators {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub poi_store: Arc<dyn PoiStore>,
    pub state_store: Arc<dyn StateStore>,
    pub llm: Arc<dyn LlmClient>,
    pub tts_primary: Arc<dyn TtsClient>,
    pub tts_fallback_factory: Box<dyn Fn() -> Arc<dyn TtsClient> + Send + Sync>,
    pub audio: Arc<dyn AudioSink>,
    pub renderer: Arc<dyn PromptRenderer>,
    pub geo: Arc<dyn GeoLookup>,
    pub tracker: Arc<dyn UsageTracker>,
}

/// Everything behind the coarse lock.
struct EngineState {
    generation_queue: GenerationQueue,
    playback_queue: PlaybackQueue,
    active: Option<Narrative>,
    generating_poi: Option<String>,
    paused: bool,
    skip_cooldown: bool,
    beacon_target: Option<String>,
    beacon_cycle: usize,
}

impl EngineState {
    fn new() -> Self {
        Self {
            generation_queue: GenerationQueue::new(),
            playback_queue: PlaybackQueue::new(),
            active: None,
            generating_poi: None,
            paused: false,
            skip_cooldown: false,
            beacon_target: None,
            beacon_cycle: 0,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    state: Arc<Mutex<EngineState>>,
    session: Arc<Mutex<SessionState>>,
    config: Arc<EngineConfig>,

    telemetry: Arc<dyn TelemetrySource>,
    poi_store: Arc<dyn PoiStore>,
    state_store: Arc<dyn StateStore>,
    audio: Arc<dyn AudioSink>,
    geo: Arc<dyn GeoLookup>,

    generator: Arc<Generator>,
    gate: Arc<BusyGate>,
    fallback: Arc<TtsFallback>,
    latency: Arc<LatencyTracker>,
    announcements: Arc<AnnouncementManager>,
    essays: Option<Arc<EssayRotation>>,

    kick_tx: Sender<()>,
    kick_rx: Receiver<()>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    session_epoch: Arc<AtomicU64>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig, deps: Collaborators) -> Result<Self> {
        let audio_dir = std::env::temp_dir().join("skytale");
        std::fs::create_dir_all(&audio_dir)?;

        let state = Arc::new(Mutex::new(EngineState::new()));
        let session = Arc::new(Mutex::new(SessionState::new()));
        let gate = Arc::new(BusyGate::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let latency = Arc::new(LatencyTracker::new(Arc::clone(&deps.telemetry)));
        let fallback = Arc::new(TtsFallback::new(
            Arc::clone(&deps.tts_primary),
            deps.tts_fallback_factory,
        ));
        let announcements = Arc::new(AnnouncementManager::new(
            Arc::clone(&deps.poi_store),
            config.narrator.debrief.enabled,
        ));
        let essays = EssayRotation::new(config.narrator.essay_topics.clone())
            .ok()
            .map(Arc::new);

        let generator = Arc::new(Generator::new(
            Arc::clone(&deps.llm),
            Arc::clone(&fallback),
            Arc::clone(&deps.renderer),
            Arc::clone(&deps.tracker),
            Arc::clone(&latency),
            Arc::clone(&session),
            Arc::clone(&gate),
            Arc::clone(&cancel),
            config.tts.voice.clone(),
            audio_dir,
            config.narrator.summary_max_words,
            config.narrator.context_history_size,
        ));

        let (kick_tx, kick_rx) = bounded(64);

        Ok(Self {
            state,
            session,
            config: Arc::new(config),
            telemetry: deps.telemetry,
            poi_store: deps.poi_store,
            state_store: deps.state_store,
            audio: deps.audio,
            geo: deps.geo,
            generator,
            gate,
            fallback,
            latency,
            announcements,
            essays,
            kick_tx,
            kick_rx,
            worker: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
            cancel,
            session_epoch: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Spawn the queue worker. Idempotent.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let orch = self.clone();
        let handle = thread::spawn(move || orch.worker_loop());
        *worker = Some(handle);
        info!("Generation worker started");
    }

    /// Shut the engine down: stop audio, cancel any in-flight generation
    /// and let the worker exit.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cancel.store(true, Ordering::SeqCst);
        let _ = self.kick_tx.try_send(());
        self.audio.stop();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        info!("Orchestrator stopped");
    }

    // ----- telemetry entry point --------------------------------------

    /// Drive the announcement state machines from a telemetry update.
    pub fn handle_telemetry(&self, tel: &Telemetry) {
        let actions = self.announcements.tick(tel);
        for action in actions {
            self.apply_tick_action(action, tel);
        }
    }

    /// A country crossing was detected by the caller.
    pub fn notify_border_crossing(&self, from: impl Into<String>, to: impl Into<String>) {
        if let Some(action) = self.announcements.arm_border(from, to) {
            let tel = self.telemetry.get();
            self.apply_tick_action(action, &tel);
        }
    }

    fn apply_tick_action(&self, action: TickAction, tel: &Telemetry) {
        match action {
            TickAction::Generate { id, kind } => self.spawn_announcement_job(id, kind, tel.clone()),
            TickAction::Play { id, narrative } => {
                self.enqueue_high_priority(narrative);
                self.announcements.mark_played(&id);
                self.process_playback_queue();
            }
        }
    }

    fn spawn_announcement_job(&self, id: String, kind: AnnouncementKind, tel: Telemetry) {
        let mut job =
            GenerationJob::new(kind.narrative_kind(), tel).with_announcement(id.clone());
        if let AnnouncementKind::Border { from, to } = &kind {
            job = job.with_border(from.clone(), to.clone());
        }

        let orch = self.clone();
        let job = job.with_callback(Box::new(move |result| {
            if let Some(narrative) = orch.announcements.complete(&id, result) {
                orch.enqueue_high_priority(narrative);
                orch.announcements.mark_played(&id);
                orch.process_playback_queue();
            }
        }));

        self.enqueue_job(job);
    }

    // ----- public play operations -------------------------------------

    /// Narrate a POI. Manual requests may queue behind the in-flight
    /// generation; automatic ones defer to manual work and to the playback
    /// caps.
    pub fn play_poi(
        &self,
        poi_id: &str,
        manual: bool,
        enqueue_if_busy: bool,
        tel: &Telemetry,
        strategy: DominanceStrategy,
    ) -> Result<()> {
        let poi = self
            .poi_store
            .get(poi_id)
            .ok_or_else(|| SkytaleError::NotFound(format!("POI {}", poi_id)))?;

        if poi.is_stub() {
            debug!(poi = poi_id, "stub POI, skipping narration");
            return Ok(());
        }

        // Light the beacon right away for visual feedback.
        let color = self.retarget_beacon(poi_id);
        let mut flagged = poi.clone();
        flagged.beacon_color = Some(color);
        if let Err(e) = self.state_store.save_poi(&flagged) {
            debug!("Beacon color not persisted: {}", e);
        }

        {
            let mut st = self.state.lock();

            // Already playing this one: nothing to do.
            if st.active.as_ref().and_then(|n| n.poi_id()) == Some(poi_id) {
                debug!(poi = poi_id, "already playing");
                return Ok(());
            }

            // Already queued: move it up front instead of re-generating.
            if st.playback_queue.promote(poi_id) {
                debug!(poi = poi_id, "promoted in playback queue");
                drop(st);
                self.process_playback_queue();
                return Ok(());
            }

            if st.generation_queue.has_poi(poi_id)
                || st.generating_poi.as_deref() == Some(poi_id)
            {
                debug!(poi = poi_id, "generation already underway");
                return Ok(());
            }

            if manual {
                if !enqueue_if_busy
                    && (self.gate.is_busy() || st.generation_queue.has_pending())
                {
                    return Err(SkytaleError::Busy(format!(
                        "generation in progress, POI {} not queued",
                        poi_id
                    )));
                }
            } else {
                if st.generation_queue.has_pending_manual() || self.gate.is_busy() {
                    debug!(poi = poi_id, "automatic request yields to manual work");
                    return Ok(());
                }
                if !self.repeat_ttl_expired(&poi) {
                    debug!(poi = poi_id, "narrated too recently, skipping");
                    return Ok(());
                }
                // The tighter admission rule: an automatic POI only joins
                // an empty-of-POIs-and-essays queue. Checking here avoids
                // wasting a generation on audio that would be refused.
                if st.playback_queue.has_any_poi_or_essay() {
                    debug!(poi = poi_id, "playback queue occupied, skipping automatic POI");
                    return Ok(());
                }
            }
        }

        let job = GenerationJob::new(NarrativeKind::Poi, tel.clone())
            .with_poi(poi)
            .with_manual(manual)
            .with_strategy(strategy);
        self.enqueue_job(job);
        Ok(())
    }

    /// Synchronous pre-fetch used one prediction window ahead: generate
    /// now, park the narrative on the playback queue.
    pub fn prepare_next_narrative(
        &self,
        poi_id: &str,
        strategy: DominanceStrategy,
        tel: &Telemetry,
    ) -> Result<()> {
        let poi = self
            .poi_store
            .get(poi_id)
            .ok_or_else(|| SkytaleError::NotFound(format!("POI {}", poi_id)))?;

        if poi.is_stub() || !self.repeat_ttl_expired(&poi) {
            return Ok(());
        }

        let request = self.build_request(
            NarrativeKind::Poi,
            Some(poi),
            tel.clone(),
            false,
            strategy,
            None,
            None,
            None,
            false,
        );
        let narrative = self.generator.generate(request)?;

        let accepted = self.state.lock().playback_queue.enqueue(narrative, false);
        if !accepted {
            debug!(poi = poi_id, "prefetched narrative refused by playback queue");
        }
        // The queue worker yields while a synchronous generation holds the
        // gate; wake it back up.
        self.kick_worker();
        Ok(())
    }

    /// Describe a screenshot through the multimodal profile.
    pub fn play_screenshot(&self, image_path: PathBuf, tel: &Telemetry) {
        let job = GenerationJob::new(NarrativeKind::Screenshot, tel.clone()).with_image(image_path);
        self.enqueue_job(job);
    }

    /// Narrate a regional essay on the next topic in the rotation.
    pub fn play_essay(&self, tel: &Telemetry) -> Result<()> {
        let essays = self.essays.as_ref().ok_or_else(|| {
            SkytaleError::ConfigError("Essay topic list is empty".to_string())
        })?;
        let topic = essays.select_topic();
        let job = GenerationJob::new(NarrativeKind::Essay, tel.clone()).with_essay_topic(topic);
        self.enqueue_job(job);
        Ok(())
    }

    /// Start playing a narrative immediately. Rejected when something is
    /// already in the active slot.
    pub fn play_narrative(&self, narrative: Narrative) -> Result<()> {
        let path = narrative.audio_path.clone();
        let poi = narrative.poi.clone();
        {
            let mut st = self.state.lock();
            if st.active.is_some() {
                return Err(SkytaleError::Busy("a narrative is already playing".to_string()));
            }
            st.active = Some(narrative);
        }

        let orch = self.clone();
        let result = self
            .audio
            .play(&path, false, Box::new(move || orch.on_playback_complete()));

        if let Err(e) = result {
            // Roll back so the drain can try the next item.
            self.state.lock().active = None;
            return Err(e);
        }

        if let Some(poi) = poi {
            self.persist_played(poi);
        }
        Ok(())
    }

    /// Drain the playback queue: start the head narrative unless paused or
    /// already playing. On a start failure the next item is tried.
    pub fn process_playback_queue(&self) {
        loop {
            let next = {
                let mut st = self.state.lock();
                if st.paused || st.active.is_some() {
                    None
                } else {
                    st.playback_queue.pop()
                }
            };

            let Some(narrative) = next else { return };
            match self.play_narrative(narrative) {
                Ok(()) => return,
                Err(e) => {
                    warn!("Playback start failed, trying next: {}", e);
                }
            }
        }
    }

    /// Replay the last played audio file. Returns whether anything
    /// happened.
    pub fn replay_last(&self) -> bool {
        let orch = self.clone();
        let accepted = self
            .audio
            .replay_last(Box::new(move || orch.on_playback_complete()));
        if accepted {
            // Restore the beacon to the narration being replayed.
            let last_poi = self.session.lock().last_poi.clone();
            if let Some(poi) = last_poi {
                self.retarget_beacon(&poi.id);
            }
        }
        accepted
    }

    /// Stop the current narration; its completion callback advances the
    /// queue without the pacing gap.
    pub fn skip(&self) {
        {
            let mut st = self.state.lock();
            if st.active.is_none() {
                return;
            }
            st.skip_cooldown = true;
        }
        self.audio.stop();
    }

    pub fn pause(&self) {
        self.state.lock().paused = true;
        self.audio.pause();
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.audio.resume();
        self.process_playback_queue();
    }

    /// Transponder ident button, mapped per configuration.
    pub fn ident(&self) {
        match self.config.transponder.ident_action {
            IdentAction::PauseToggle => {
                if self.is_paused() {
                    self.resume();
                } else {
                    self.pause();
                }
            }
            IdentAction::Stop => {
                self.pause();
                self.audio.stop();
            }
            IdentAction::Skip => self.skip(),
        }
    }

    /// Skip the pacing gap before the next narration, once.
    pub fn skip_cooldown(&self) {
        self.state.lock().skip_cooldown = true;
    }

    pub fn reset_skip_cooldown(&self) {
        self.state.lock().skip_cooldown = false;
    }

    /// Clear both queues, cancel in-flight work, drop held announcements
    /// and start the session over.
    pub fn reset_session(&self) {
        self.session_epoch.fetch_add(1, Ordering::SeqCst);
        {
            let mut st = self.state.lock();
            st.generation_queue.clear();
            st.playback_queue.clear();
            st.active = None;
            st.beacon_target = None;
            st.skip_cooldown = false;
            if self.gate.is_busy() {
                self.cancel.store(true, Ordering::SeqCst);
            }
        }
        self.audio.stop();
        self.session.lock().reset();
        self.latency.clear();
        self.fallback.reset();
        self.announcements.reset();
        info!("Session reset");
    }

    // ----- introspection ----------------------------------------------

    pub fn is_generating(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn is_fallback_active(&self) -> bool {
        self.fallback.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().active.is_some()
    }

    pub fn playback_queue_len(&self) -> usize {
        self.state.lock().playback_queue.count()
    }

    pub fn generation_queue_len(&self) -> usize {
        self.state.lock().generation_queue.count()
    }

    pub fn beacon_target(&self) -> Option<String> {
        self.state.lock().beacon_target.clone()
    }

    /// POI of the narrative in the active playback slot.
    pub fn active_poi(&self) -> Option<String> {
        self.state
            .lock()
            .active
            .as_ref()
            .and_then(|n| n.poi_id())
            .map(str::to_string)
    }

    /// Title of the most recent narration.
    pub fn last_title(&self) -> Option<String> {
        self.session.lock().events.last().map(|e| e.title.clone())
    }

    /// Closing sentence of the most recent narration script.
    pub fn last_sentence(&self) -> String {
        self.session.lock().last_sentence.clone()
    }

    pub fn narrated_count(&self) -> u32 {
        self.session.lock().narrated_count
    }

    pub fn announcements(&self) -> &AnnouncementManager {
        &self.announcements
    }

    pub fn trip_summary(&self) -> String {
        self.session.lock().trip_summary.clone()
    }

    // ----- internals --------------------------------------------------

    fn enqueue_job(&self, job: GenerationJob) {
        {
            let mut st = self.state.lock();
            st.generation_queue.enqueue(job);
        }
        self.kick_worker();
    }

    fn kick_worker(&self) {
        match self.kick_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                warn!("Worker kick channel disconnected");
            }
        }
    }

    fn enqueue_high_priority(&self, narrative: Narrative) {
        let accepted = self.state.lock().playback_queue.enqueue(narrative, true);
        if !accepted {
            warn!("High-priority narrative refused by playback queue");
        }
    }

    /// Point the map beacon at a POI, cycling the palette.
    fn retarget_beacon(&self, poi_id: &str) -> BeaconColor {
        let mut st = self.state.lock();
        if st.beacon_target.as_deref() != Some(poi_id) {
            st.beacon_cycle = st.beacon_cycle.wrapping_add(1);
            st.beacon_target = Some(poi_id.to_string());
        }
        BeaconColor::PALETTE[st.beacon_cycle % BeaconColor::PALETTE.len()]
    }

    fn repeat_ttl_expired(&self, poi: &Poi) -> bool {
        match poi.last_played {
            Some(last) => {
                let elapsed = chrono::Utc::now().signed_duration_since(last);
                elapsed.num_seconds() >= self.config.narrator.repeat_ttl_seconds as i64
            }
            None => true,
        }
    }

    /// Persist last-played bookkeeping off the lock and off this thread.
    fn persist_played(&self, poi: Poi) {
        let poi_store = Arc::clone(&self.poi_store);
        let state_store = Arc::clone(&self.state_store);
        let snapshot = self.session.lock().snapshot();
        thread::spawn(move || {
            let now = chrono::Utc::now();
            if let Err(e) = poi_store.save_last_played(&poi.id, now) {
                debug!("last_played not persisted: {}", e);
            }
            match serde_json::to_string(&snapshot) {
                Ok(json) => {
                    if let Err(e) = state_store.set_state(SESSION_STATE_KEY, &json) {
                        debug!("session snapshot not persisted: {}", e);
                    }
                }
                Err(e) => debug!("session snapshot not serialized: {}", e),
            }
        });
    }

    /// Playback finished. Fired from the audio collaborator's thread.
    fn on_playback_complete(&self) {
        let skip_gap = {
            let mut st = self.state.lock();
            std::mem::take(&mut st.skip_cooldown)
        };
        if !skip_gap {
            // Let the audio tail breathe before the next narration.
            thread::sleep(self.config.pacing());
        }

        {
            let mut st = self.state.lock();
            st.active = None;

            // Anticipatory beacon switch: point at what plays or builds
            // next.
            let next_poi = st
                .playback_queue
                .peek()
                .and_then(|n| n.poi_id())
                .map(str::to_string);
            if let Some(id) = next_poi {
                if st.beacon_target.as_deref() != Some(id.as_str()) {
                    st.beacon_cycle = st.beacon_cycle.wrapping_add(1);
                    st.beacon_target = Some(id);
                }
            } else if let Some(id) = st.generating_poi.clone() {
                if st.beacon_target.as_deref() != Some(id.as_str()) {
                    st.beacon_cycle = st.beacon_cycle.wrapping_add(1);
                    st.beacon_target = Some(id);
                }
            }
        }

        self.process_playback_queue();
    }

    // ----- queue worker -----------------------------------------------

    fn worker_loop(&self) {
        info!("Generation worker ready");
        while !self.shutdown.load(Ordering::SeqCst) {
            if self.kick_rx.recv().is_err() {
                break;
            }
            self.drain_generation_queue();
        }
        info!("Generation worker stopped");
    }

    fn drain_generation_queue(&self) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            // A synchronous caller may hold the gate; it kicks us again
            // when it finishes.
            let Some(guard) = self.gate.try_acquire() else { return };

            let job = {
                let mut st = self.state.lock();
                match st.generation_queue.pop() {
                    Some(job) => {
                        st.generating_poi = job.poi_id().map(str::to_string);
                        Some(job)
                    }
                    None => None,
                }
            };
            let Some(job) = job else {
                drop(guard);
                return;
            };

            let epoch = self.session_epoch.load(Ordering::SeqCst);
            debug!(kind = %job.kind, manual = job.manual, "worker picked job");

            let GenerationJob {
                kind,
                poi,
                telemetry,
                manual,
                strategy,
                image_path,
                essay_topic,
                border,
                on_complete,
                ..
            } = job;

            let request = self.build_request(
                kind,
                poi,
                telemetry,
                manual,
                strategy,
                image_path,
                essay_topic,
                border,
                true,
            );
            let outcome = self.generator.generate(request);

            drop(guard);
            self.cancel.store(false, Ordering::SeqCst);
            self.state.lock().generating_poi = None;

            if self.session_epoch.load(Ordering::SeqCst) != epoch {
                debug!("session reset during generation, dropping result");
                continue;
            }

            match on_complete {
                Some(callback) => callback(outcome),
                None => match outcome {
                    Ok(narrative) => {
                        let high = narrative.manual;
                        let accepted =
                            self.state.lock().playback_queue.enqueue(narrative, high);
                        if !accepted {
                            debug!("generated narrative refused by playback queue");
                        }
                        self.process_playback_queue();
                    }
                    Err(e) => {
                        warn!(kind = %kind, "generation failed: {}", e);
                        self.process_playback_queue();
                    }
                },
            }
        }
    }

    /// Assemble prompt data and build the full generation request. All
    /// provider lookups here happen off the coarse lock.
    #[allow(clippy::too_many_arguments)]
    fn build_request(
        &self,
        kind: NarrativeKind,
        poi: Option<Poi>,
        telemetry: Telemetry,
        manual: bool,
        strategy: DominanceStrategy,
        image_path: Option<PathBuf>,
        essay_topic: Option<String>,
        border: Option<(String, String)>,
        skip_busy_check: bool,
    ) -> GenerationRequest {
        let user_length = self.user_length();
        let location = self.geo.location_for(telemetry.latitude, telemetry.longitude);

        let rival_count = poi
            .as_ref()
            .map(|p| self.poi_store.count_scored_above(p.score * 0.5, 2))
            .unwrap_or(0);

        let data = {
            let session = self.session.lock();
            let ctx = AssembleContext {
                telemetry: &telemetry,
                session: &session,
                config: &self.config,
                rival_count,
                user_length,
                location,
                pregrounding: None,
            };
            match (&kind, &poi) {
                (NarrativeKind::Poi, Some(poi)) => prompt::assemble_poi(poi, strategy, &ctx),
                _ => {
                    let mut data = prompt::assemble_general(&ctx, essay_topic.as_deref());
                    if let Some((from, to)) = &border {
                        data.border_from = Some(from.clone());
                        data.border_to = Some(to.clone());
                    }
                    data
                }
            }
        };

        GenerationRequest {
            kind,
            poi,
            data,
            telemetry,
            manual,
            skip_busy_check,
            // Essays are long-form enough to deserve the polish pass.
            two_pass: kind == NarrativeKind::Essay,
            image_path,
            essay_topic,
        }
    }

    fn user_length(&self) -> u32 {
        self.state_store
            .get_state(TEXT_LENGTH_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(|v| v.clamp(1, 5))
            .unwrap_or(DEFAULT_TEXT_LENGTH)
    }
}
