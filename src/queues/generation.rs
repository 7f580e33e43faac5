//! Generation queue
//!
//! FIFO of pending generation jobs. A single worker drains it serially;
//! the busy gate on the generator keeps at most one job active.

use crate::model::GenerationJob;
use std::collections::VecDeque;

#[derive(Default)]
pub struct GenerationQueue {
    jobs: VecDeque<GenerationJob>,
}

impl GenerationQueue {
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, job: GenerationJob) {
        self.jobs.push_back(job);
    }

    /// Insert at the head, ahead of everything pending.
    pub fn enqueue_front(&mut self, job: GenerationJob) {
        self.jobs.push_front(job);
    }

    pub fn pop(&mut self) -> Option<GenerationJob> {
        self.jobs.pop_front()
    }

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Whether a manual request is waiting. Automatic work yields to it.
    pub fn has_pending_manual(&self) -> bool {
        self.jobs.iter().any(|j| j.manual)
    }

    /// Whether a job for the given POI is already waiting.
    pub fn has_poi(&self, poi_id: &str) -> bool {
        self.jobs.iter().any(|j| j.poi_id() == Some(poi_id))
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
