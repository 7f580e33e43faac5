//! Word budget and skew sampling
//!
//! Decides how many words a narration gets, from the rivalry around the
//! POI, the depth of its sources, and the user's length preference.

use serde::{Deserialize, Serialize};

/// How the word budget skews between the short and long targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominanceStrategy {
    /// Contested area: keep it short so rivals get airtime too.
    MinSkew,
    /// Dominant POI: give it the long treatment.
    MaxSkew,
    Fixed,
    Uniform,
    /// Caller passed no strategy; resolved from the rival count.
    Unset,
}

impl DominanceStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DominanceStrategy::MinSkew => "min_skew",
            DominanceStrategy::MaxSkew => "max_skew",
            DominanceStrategy::Fixed => "fixed",
            DominanceStrategy::Uniform => "uniform",
            DominanceStrategy::Unset => "",
        }
    }
}

impl std::fmt::Display for DominanceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve an unset strategy from the number of rivals the POI store
/// reported within half the winner's score. Two returned rows mean the
/// winner has at least one real rival.
pub fn resolve_strategy(strategy: DominanceStrategy, rival_count: usize) -> DominanceStrategy {
    match strategy {
        DominanceStrategy::Unset => {
            if rival_count >= 2 {
                DominanceStrategy::MinSkew
            } else {
                DominanceStrategy::MaxSkew
            }
        }
        other => other,
    }
}

/// Target word count for a narration.
///
/// `user_length` is the 1..=5 length setting (clamped here); `source_words`
/// is the combined word count of the article prose and any pregrounding.
/// Stub POIs always get zero words.
pub fn word_budget(
    short_words: u32,
    long_words: u32,
    user_length: u32,
    source_words: usize,
    strategy: DominanceStrategy,
    is_stub: bool,
) -> u32 {
    if is_stub {
        return 0;
    }

    let level = user_length.clamp(1, 5);
    let multiplier = 1.0 + (level - 1) as f64 * 0.25;

    let base = match strategy {
        DominanceStrategy::MinSkew => short_words,
        _ => long_words,
    };

    let target_limit = (base as f64 * multiplier).floor() as u32;
    let source_limit = (source_words / 2) as u32;

    target_limit.min(source_limit)
}
