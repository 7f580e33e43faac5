//! Generation latency tracking
//!
//! Rolling window of observed generate-to-ready latencies. The average
//! feeds the telemetry prediction window so the POI selector looks ahead
//! of the aircraft by roughly twice the expected generation time.

use crate::providers::TelemetrySource;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Samples kept in the ring.
const WINDOW: usize = 10;

/// Assumed latency before the first sample, and the prediction-window
/// floor.
const DEFAULT_LATENCY: Duration = Duration::from_secs(60);

pub struct LatencyTracker {
    samples: Mutex<VecDeque<Duration>>,
    telemetry: Arc<dyn TelemetrySource>,
}

impl LatencyTracker {
    pub fn new(telemetry: Arc<dyn TelemetrySource>) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(WINDOW)),
            telemetry,
        }
    }

    /// Record one observed latency and push the updated prediction window
    /// to the telemetry collaborator.
    pub fn record(&self, latency: Duration) {
        let mean = {
            let mut samples = self.samples.lock();
            samples.push_back(latency);
            while samples.len() > WINDOW {
                samples.pop_front();
            }
            mean_of(&samples)
        };

        // Look ahead twice the expected generation time, never under a
        // minute.
        let window = (mean * 2).max(DEFAULT_LATENCY);
        debug!(
            latency_ms = latency.as_millis() as u64,
            mean_ms = mean.as_millis() as u64,
            window_s = window.as_secs(),
            "latency recorded"
        );
        self.telemetry.set_prediction_window(window);
    }

    /// Mean observed latency, or the 60 s default before any sample.
    pub fn average(&self) -> Duration {
        let samples = self.samples.lock();
        if samples.is_empty() {
            DEFAULT_LATENCY
        } else {
            mean_of(&samples)
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

fn mean_of(samples: &VecDeque<Duration>) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = samples.iter().sum();
    total / samples.len() as u32
}
