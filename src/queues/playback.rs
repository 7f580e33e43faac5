//! Playback queue
//!
//! Bounded FIFO of ready narratives. Capacity is enforced at enqueue time
//! so generation effort is never wasted on audio that could not play
//! before going stale.

use crate::model::{Narrative, NarrativeKind};
use std::collections::VecDeque;
use tracing::debug;

/// Hard cap on queued narratives.
const MAX_QUEUED: usize = 5;

#[derive(Default)]
pub struct PlaybackQueue {
    items: VecDeque<Narrative>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Queue a narrative. High-priority items go to the head and are not
    /// subject to the overall cap; everything is subject to the per-kind
    /// caps. Returns whether the narrative was accepted.
    pub fn enqueue(&mut self, narrative: Narrative, high_priority: bool) -> bool {
        if !high_priority && self.items.len() >= MAX_QUEUED {
            debug!(kind = %narrative.kind, "playback queue full, dropping");
            return false;
        }

        if !self.admits_kind(&narrative) {
            debug!(kind = %narrative.kind, "per-kind cap reached, dropping");
            return false;
        }

        if high_priority {
            self.items.push_front(narrative);
        } else {
            self.items.push_back(narrative);
        }
        true
    }

    /// Per-kind admission rules:
    /// - at most one manual POI narration waiting;
    /// - an automatic POI only enters an empty-of-POIs-and-essays queue;
    /// - screenshots, debriefings, essays and border calls at most once
    ///   each.
    fn admits_kind(&self, narrative: &Narrative) -> bool {
        match narrative.kind {
            NarrativeKind::Poi if narrative.manual => {
                !self
                    .items
                    .iter()
                    .any(|n| n.kind == NarrativeKind::Poi && n.manual)
            }
            NarrativeKind::Poi => !self
                .items
                .iter()
                .any(|n| matches!(n.kind, NarrativeKind::Poi | NarrativeKind::Essay)),
            NarrativeKind::Screenshot
            | NarrativeKind::Debriefing
            | NarrativeKind::Essay
            | NarrativeKind::Border => !self.items.iter().any(|n| n.kind == narrative.kind),
            _ => true,
        }
    }

    pub fn pop(&mut self) -> Option<Narrative> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&Narrative> {
        self.items.front()
    }

    /// Move an already-queued POI narration to the head. Returns whether
    /// it was present.
    pub fn promote(&mut self, poi_id: &str) -> bool {
        let pos = self
            .items
            .iter()
            .position(|n| n.kind == NarrativeKind::Poi && n.poi_id() == Some(poi_id));
        match pos {
            Some(0) => true,
            Some(idx) => {
                if let Some(narrative) = self.items.remove(idx) {
                    self.items.push_front(narrative);
                }
                true
            }
            None => false,
        }
    }

    /// Whether any POI or essay narration is waiting. Automatic POI
    /// admission checks this before spending a generation.
    pub fn has_any_poi_or_essay(&self) -> bool {
        self.items
            .iter()
            .any(|n| matches!(n.kind, NarrativeKind::Poi | NarrativeKind::Essay))
    }

    pub fn has_poi(&self, poi_id: &str) -> bool {
        self.items
            .iter()
            .any(|n| n.kind == NarrativeKind::Poi && n.poi_id() == Some(poi_id))
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
