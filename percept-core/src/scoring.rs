//! Poignancy scoring — how important an experience is to the agent.
//!
//! Scores come from an external oracle (usually an LLM, see `percept-llm`).
//! Idle states are never sent to the oracle.

use std::fmt;

/// Marker substring of idle descriptions.
pub const IDLE_MARKER: &str = "is idle";

/// Poignancy assigned to idle experiences without consulting the oracle.
pub const IDLE_POIGNANCY: f32 = 1.0;

/// What is being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoignancyKind {
    /// A perceived event.
    Event,
    /// A conversation.
    Chat,
}

impl fmt::Display for PoignancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Event => "event",
            Self::Chat => "chat",
        })
    }
}

/// Assign an importance score to a description.
///
/// Implementations never fail: retries and fallback values are the
/// implementation's own concern.
pub trait PoignancyOracle: Send + Sync {
    /// Score `text` on the oracle's scale (1–10 for LLM oracles).
    fn score(&self, kind: PoignancyKind, text: &str) -> f32;
}

/// Result of [`poignancy`], telling callers whether the oracle was used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    /// The poignancy value.
    pub value: f32,
    /// `false` when the idle shortcut applied.
    pub oracle_called: bool,
}

/// Score `text`, short-circuiting idle descriptions to [`IDLE_POIGNANCY`].
pub fn poignancy<O: PoignancyOracle + ?Sized>(oracle: &O, kind: PoignancyKind, text: &str) -> Scored {
    if text.contains(IDLE_MARKER) {
        return Scored {
            value: IDLE_POIGNANCY,
            oracle_called: false,
        };
    }
    Scored {
        value: oracle.score(kind, text),
        oracle_called: true,
    }
}

/// Oracle returning a constant, for tests and LLM-less runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPoignancy(pub f32);

impl Default for FixedPoignancy {
    fn default() -> Self {
        Self(4.0)
    }
}

impl PoignancyOracle for FixedPoignancy {
    fn score(&self, _kind: PoignancyKind, _text: &str) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(PoignancyKind, String)>>,
    }

    impl PoignancyOracle for Recording {
        fn score(&self, kind: PoignancyKind, text: &str) -> f32 {
            self.calls.lock().push((kind, text.to_string()));
            7.0
        }
    }

    #[test]
    fn idle_text_skips_oracle() {
        let oracle = Recording::default();
        let scored = poignancy(&oracle, PoignancyKind::Event, "bed is idle");
        assert_eq!(scored.value, 1.0);
        assert!(!scored.oracle_called);
        assert!(oracle.calls.lock().is_empty());
    }

    #[test]
    fn other_text_goes_to_oracle_with_kind() {
        let oracle = Recording::default();
        let scored = poignancy(&oracle, PoignancyKind::Chat, "talking about the party");
        assert_eq!(scored.value, 7.0);
        assert!(scored.oracle_called);
        assert_eq!(
            oracle.calls.lock().as_slice(),
            &[(PoignancyKind::Chat, "talking about the party".to_string())]
        );
    }

    #[test]
    fn kind_display() {
        assert_eq!(PoignancyKind::Event.to_string(), "event");
        assert_eq!(PoignancyKind::Chat.to_string(), "chat");
    }
}
