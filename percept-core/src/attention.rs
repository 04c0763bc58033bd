//! Attention — how many of the ranked events the agent actually notices.

use crate::scan::RankedEvent;

/// Keep the `bandwidth` nearest events. Pure truncation, no re-ranking.
#[must_use]
pub fn select(mut ranked: Vec<RankedEvent>, bandwidth: usize) -> Vec<RankedEvent> {
    ranked.truncate(bandwidth);
    ranked
}
