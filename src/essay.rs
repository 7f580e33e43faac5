//! Essay topic rotation
//!
//! Without-replacement selection over the configured topic list: every
//! topic plays once before any repeats.

use crate::{Result, SkytaleError};
use parking_lot::Mutex;
use rand::Rng;

pub struct EssayRotation {
    topics: Vec<String>,
    pool: Mutex<Vec<String>>,
}

impl EssayRotation {
    /// Fails at construction when no topics are configured.
    pub fn new(topics: Vec<String>) -> Result<Self> {
        if topics.is_empty() {
            return Err(SkytaleError::ConfigError(
                "Essay topic list is empty".to_string(),
            ));
        }
        Ok(Self {
            pool: Mutex::new(topics.clone()),
            topics,
        })
    }

    /// Draw the next topic uniformly from the remaining pool, refilling it
    /// once exhausted.
    pub fn select_topic(&self) -> String {
        let mut pool = self.pool.lock();
        if pool.is_empty() {
            pool.extend(self.topics.iter().cloned());
        }
        let idx = rand::thread_rng().gen_range(0..pool.len());
        pool.swap_remove(idx)
    }

    pub fn remaining(&self) -> usize {
        self.pool.lock().len()
    }
}
