//! TTS fallback latch
//!
//! Once the primary TTS provider fails fatally (rate limit, 5xx, auth),
//! the session switches to the fallback voice and stays on it until the
//! session is reset. The latch is idempotent: repeated activation keeps
//! the same fallback instance.

use crate::providers::TtsClient;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

type TtsFactory = Box<dyn Fn() -> Arc<dyn TtsClient> + Send + Sync>;

pub struct TtsFallback {
    primary: Arc<dyn TtsClient>,
    factory: TtsFactory,
    latched: AtomicBool,
    fallback: Mutex<Option<Arc<dyn TtsClient>>>,
}

impl TtsFallback {
    pub fn new(primary: Arc<dyn TtsClient>, factory: TtsFactory) -> Self {
        Self {
            primary,
            factory,
            latched: AtomicBool::new(false),
            fallback: Mutex::new(None),
        }
    }

    /// Latch the fallback provider for the rest of the session.
    pub fn activate(&self) {
        let mut fallback = self.fallback.lock();
        if fallback.is_none() {
            warn!("Primary TTS failed fatally, switching to fallback voice");
            *fallback = Some((self.factory)());
        }
        self.latched.store(true, Ordering::SeqCst);
    }

    /// The provider narrations should use right now.
    pub fn current_provider(&self) -> Arc<dyn TtsClient> {
        if self.latched.load(Ordering::SeqCst) {
            if let Some(fallback) = self.fallback.lock().as_ref() {
                return Arc::clone(fallback);
            }
        }
        Arc::clone(&self.primary)
    }

    pub fn is_active(&self) -> bool {
        self.latched.load(Ordering::SeqCst)
    }

    /// Session reset: back to the primary voice.
    pub fn reset(&self) {
        self.latched.store(false, Ordering::SeqCst);
        *self.fallback.lock() = None;
    }
}
