//! Narrative generator
//!
//! Executes one generation job end to end: render the prompt, call the
//! LLM, extract the title, rescue over-length scripts, optionally run a
//! polish pass, synthesize audio with retry and fallback, and emit the
//! finished narrative. Exactly one generation runs at a time; the busy
//! gate enforces it.

use crate::fallback::TtsFallback;
use crate::latency::LatencyTracker;
use crate::model::{Narrative, NarrativeKind, Poi, Telemetry};
use crate::prompt::PromptData;
use crate::providers::{LlmClient, LlmRequest, PromptRenderer, UsageTracker};
use crate::session::SessionState;
use crate::{Result, SkytaleError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Scripts longer than budget times this trigger the rescue pass.
const RESCUE_TRIGGER_FACTOR: f64 = 1.30;

/// The rescue pass itself gets a little headroom over the budget.
const RESCUE_BUDGET_FACTOR: f64 = 1.50;

/// Sentinel the rescue profile returns when it could not shorten.
const RESCUE_FAILED: &str = "RESCUE_FAILED";

/// TTS attempts before giving up on a narration.
const TTS_ATTEMPTS: u32 = 3;

/// Mutual-exclusion gate for generation. The queue worker holds it across
/// a job; synchronous callers get `Busy` instead of waiting.
#[derive(Default)]
pub struct BusyGate {
    flag: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(BusyGuard { gate: self })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub struct BusyGuard<'a> {
    gate: &'a BusyGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.flag.store(false, Ordering::SeqCst);
    }
}

/// One fully-specified generation request.
pub struct GenerationRequest {
    pub kind: NarrativeKind,
    pub poi: Option<Poi>,
    pub data: PromptData,
    pub telemetry: Telemetry,
    pub manual: bool,

    /// The queue worker already holds the busy gate; everyone else leaves
    /// this false and may get `Busy`.
    pub skip_busy_check: bool,

    /// Opt into the polish pass after the script is in budget.
    pub two_pass: bool,

    pub image_path: Option<PathBuf>,
    pub essay_topic: Option<String>,
}

pub struct Generator {
    llm: Arc<dyn LlmClient>,
    tts: Arc<TtsFallback>,
    renderer: Arc<dyn PromptRenderer>,
    tracker: Arc<dyn UsageTracker>,
    latency: Arc<LatencyTracker>,
    session: Arc<Mutex<SessionState>>,
    gate: Arc<BusyGate>,
    cancel: Arc<AtomicBool>,

    voice_id: String,
    audio_dir: PathBuf,
    summary_max_words: u32,
    context_history_size: usize,
}

impl Generator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tts: Arc<TtsFallback>,
        renderer: Arc<dyn PromptRenderer>,
        tracker: Arc<dyn UsageTracker>,
        latency: Arc<LatencyTracker>,
        session: Arc<Mutex<SessionState>>,
        gate: Arc<BusyGate>,
        cancel: Arc<AtomicBool>,
        voice_id: String,
        audio_dir: PathBuf,
        summary_max_words: u32,
        context_history_size: usize,
    ) -> Self {
        Self {
            llm,
            tts,
            renderer,
            tracker,
            latency,
            session,
            gate,
            cancel,
            voice_id,
            audio_dir,
            summary_max_words,
            context_history_size,
        }
    }

    /// Run one generation to completion. Never called while holding the
    /// orchestrator lock; every provider call here blocks.
    pub fn generate(&self, request: GenerationRequest) -> Result<Narrative> {
        let _guard = if request.skip_busy_check {
            None
        } else {
            Some(self.gate.try_acquire().ok_or_else(|| {
                SkytaleError::Busy(format!("{} generation already running", request.kind))
            })?)
        };

        let started = Instant::now();
        let predicted = self.latency.average();
        self.check_cancelled()?;

        // Script generation.
        let profile = request.kind.llm_profile();
        let prompt = self.renderer.render(profile, &request.data.to_value())?;
        let llm_request = LlmRequest::new(prompt);
        let response = match &request.image_path {
            Some(image) => self.llm.generate_image_text(profile, &llm_request, image)?,
            None => self.llm.generate_text(profile, &llm_request)?,
        };
        self.tracker.record_success(&response.provider);

        // Markdown emphasis trips up every TTS voice.
        let script = response.text.replace('*', "");
        let (mut title, mut script) = extract_title(&script);
        self.check_cancelled()?;

        let budget = request.data.word_budget;
        if budget > 0 && word_count(&script) > (budget as f64 * RESCUE_TRIGGER_FACTOR) as usize {
            if let Some((rescued_title, rescued)) = self.rescue_script(&script, budget) {
                if !rescued_title.is_empty() {
                    title = rescued_title;
                }
                script = rescued;
            }
        }

        if request.two_pass && !self.tracker.is_free_tier(&response.provider) {
            script = self.second_pass(&script, budget, &response.provider);
        }
        self.check_cancelled()?;

        // Audio synthesis.
        let (audio_path, audio_format) = self.synthesize_with_retry(&script)?;

        let latency = started.elapsed();
        let narrative = Narrative {
            kind: request.kind,
            title,
            script,
            audio_path,
            audio_format,
            requested_words: budget,
            manual: request.manual,
            created_at: chrono::Utc::now(),
            latency,
            predicted_latency: predicted,
            thumbnail_url: request.poi.as_ref().and_then(|p| p.thumbnail_url.clone()),
            poi: request.poi,
            image_path: request.image_path,
            essay_topic: request.essay_topic,
            show_info_panel: request.kind == NarrativeKind::Poi,
        };

        self.latency.record(latency);
        self.record_in_session(&narrative, &request.telemetry);
        self.update_trip_summary(&narrative);

        info!(
            kind = %narrative.kind,
            title = %narrative.title,
            latency_ms = latency.as_millis() as u64,
            "narrative ready"
        );
        Ok(narrative)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(SkytaleError::Cancelled("generation cancelled".to_string()))
        } else {
            Ok(())
        }
    }

    /// Compress an over-length script under the cheap rescue profile.
    /// Returns the (possibly re-titled) replacement, or None to keep the
    /// original.
    fn rescue_script(&self, script: &str, budget: u32) -> Option<(String, String)> {
        let rescue_budget = (budget as f64 * RESCUE_BUDGET_FACTOR) as u32;
        let data = serde_json::json!({
            "script": script,
            "max_words": rescue_budget,
        });
        let prompt = match self.renderer.render("rescue_script", &data) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Rescue render failed: {}", e);
                return None;
            }
        };
        let response = match self.llm.generate_text("script_rescue", &LlmRequest::new(prompt)) {
            Ok(response) => response,
            Err(e) => {
                warn!("Rescue call failed: {}", e);
                return None;
            }
        };
        let text = response.text.replace('*', "");
        if text.trim().is_empty() || text.trim() == RESCUE_FAILED {
            debug!("Rescue declined, keeping original script");
            return None;
        }
        let (title, script) = extract_title(&text);
        Some((title, script))
    }

    /// Optional polish pass. Garbage responses keep the original; a
    /// garbage response from a labelled provider is retried once on a
    /// different provider.
    fn second_pass(&self, script: &str, budget: u32, provider: &str) -> String {
        let input_words = word_count(script);
        let data = serde_json::json!({
            "script": script,
            "max_words": budget,
        });
        let prompt = match self.renderer.render("second_pass", &data) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Second-pass render failed: {}", e);
                return script.to_string();
            }
        };

        let first = self
            .llm
            .generate_text("script_rescue", &LlmRequest::new(prompt.clone()));
        match first {
            Ok(response) if !is_garbage(&response.text, budget, input_words) => {
                return response.text.replace('*', "");
            }
            Ok(response) if !provider.is_empty() => {
                debug!(
                    provider = %response.provider,
                    "Second pass returned garbage, retrying on another provider"
                );
                self.tracker.record_failure(&response.provider);
                let retry_request = LlmRequest::new(prompt).excluding(response.provider);
                if let Ok(retry) = self.llm.generate_text("script_rescue", &retry_request) {
                    if !is_garbage(&retry.text, budget, input_words) {
                        return retry.text.replace('*', "");
                    }
                }
                script.to_string()
            }
            Ok(_) => script.to_string(),
            Err(e) => {
                warn!("Second pass failed: {}", e);
                script.to_string()
            }
        }
    }

    /// Synthesize with up to three attempts, latching the fallback voice
    /// on a fatal primary error.
    fn synthesize_with_retry(&self, script: &str) -> Result<(PathBuf, String)> {
        let mut last_error = String::new();

        for attempt in 1..=TTS_ATTEMPTS {
            self.check_cancelled()?;
            let provider = self.tts.current_provider();
            let stem = self.audio_dir.join(format!("narration-{}", Uuid::new_v4()));

            match provider.synthesize(script, &self.voice_id, &stem) {
                Ok(suffix) => {
                    let path = stem.with_extension(&suffix);
                    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    if size > provider.min_audio_size() {
                        return Ok((path, suffix));
                    }
                    warn!(
                        attempt,
                        size, "Synthesized file below audible threshold, retrying"
                    );
                    let _ = std::fs::remove_file(&path);
                    last_error = format!("audio file too small ({} bytes)", size);
                }
                Err(e) => {
                    warn!(attempt, "TTS attempt failed: {}", e);
                    if provider.is_fatal(&e) {
                        self.tts.activate();
                    }
                    last_error = e.to_string();
                }
            }
        }

        Err(SkytaleError::TtsFailed(format!(
            "{} attempts exhausted: {}",
            TTS_ATTEMPTS, last_error
        )))
    }

    fn record_in_session(&self, narrative: &Narrative, telemetry: &Telemetry) {
        let mut session = self.session.lock();
        session.record_narration(
            narrative,
            telemetry.latitude,
            telemetry.longitude,
            self.context_history_size,
        );
    }

    /// Ask the summary profile to fold the new narration into the rolling
    /// trip summary. Best-effort: the old summary survives any failure.
    fn update_trip_summary(&self, narrative: &Narrative) {
        let current = self.session.lock().trip_summary.clone();
        let data = serde_json::json!({
            "current_summary": current,
            "last_title": narrative.title,
            "last_script": narrative.script,
            "max_words": self.summary_max_words,
        });
        let prompt = match self.renderer.render("summary_update", &data) {
            Ok(prompt) => prompt,
            Err(e) => {
                debug!("Summary render failed: {}", e);
                return;
            }
        };
        match self.llm.generate_text("summary", &LlmRequest::new(prompt)) {
            Ok(response) => {
                let summary = response.text.trim().to_string();
                if !summary.is_empty() {
                    self.session.lock().trip_summary = summary;
                }
            }
            Err(e) => debug!("Summary update failed: {}", e),
        }
    }
}

/// Whitespace-delimited word count, the measure all budgets use.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split a leading `TITLE:` line off a script.
///
/// The first non-empty line is checked case-insensitively after stripping
/// leading `*`, `_` and whitespace; the colon must appear within the first
/// ten characters. Returns (title, remaining script); the title is empty
/// when no line matches.
pub fn extract_title(script: &str) -> (String, String) {
    let mut lines = script.lines();

    for line in lines.by_ref() {
        if line.trim().is_empty() {
            continue;
        }

        let cleaned = line.trim_start_matches(['*', '_', ' ', '\t']);
        if let Some(colon) = cleaned.find(':') {
            if colon < 10 && cleaned[..colon].trim().eq_ignore_ascii_case("TITLE") {
                let title = cleaned[colon + 1..].trim().to_string();
                let rest: Vec<&str> = lines.collect();
                return (title, rest.join("\n").trim().to_string());
            }
        }
        break;
    }

    (String::new(), script.trim().to_string())
}

/// A polish-pass response is garbage when it is empty, the rescue
/// sentinel, or wildly longer than both the budget and its input.
fn is_garbage(text: &str, budget: u32, input_words: usize) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == RESCUE_FAILED {
        return true;
    }
    let limit = ((budget as usize) * 2).max((input_words as f64 * 1.5) as usize);
    word_count(trimmed) > limit
}
