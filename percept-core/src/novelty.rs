//! Novelty — deciding whether a noticed event is worth remembering.
//!
//! An event is novel if its (subject, predicate, object) triple is absent
//! from the agent's recent memory window. The window slides: once enough
//! newer events are remembered, the same triple is accepted again.

use crate::memory::MemoryStore;
use crate::types::Triple;
use crate::world::TileEvent;

/// Predicate marking an agent's own ongoing conversation.
pub const CHAT_PREDICATE: &str = "chat with";

/// Predicate substituted for events that carry none.
pub const IDLE_PREDICATE: &str = "is";

/// Object and description substituted for events that carry no predicate.
pub const IDLE_OBJECT: &str = "idle";

/// A noticed event, normalized for memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEvent {
    /// Event subject, possibly colon-qualified.
    pub subject: String,
    /// Predicate, `"is"` for idle events.
    pub predicate: String,
    /// Object, `"idle"` for idle events.
    pub object: String,
    /// Free-text description, `"idle"` for idle events.
    pub description: String,
}

impl CandidateEvent {
    /// Normalize a raw tile event.
    ///
    /// Events without a predicate become `is idle`. Events with a predicate
    /// but no object get an empty object, and a missing description is
    /// rebuilt from predicate and object.
    #[must_use]
    pub fn from_tile_event(raw: &TileEvent) -> Self {
        if raw.is_idle() {
            return Self {
                subject: raw.subject.clone(),
                predicate: IDLE_PREDICATE.to_string(),
                object: IDLE_OBJECT.to_string(),
                description: IDLE_OBJECT.to_string(),
            };
        }

        let predicate = raw.predicate.clone().unwrap_or_default();
        let object = raw.object.clone().unwrap_or_default();
        let description = raw
            .description
            .clone()
            .unwrap_or_else(|| format!("{predicate} {object}").trim().to_string());

        Self {
            subject: raw.subject.clone(),
            predicate,
            object,
            description,
        }
    }

    /// `"{short subject} is {description}"`, e.g. `"bed is idle"`.
    #[must_use]
    pub fn display_description(&self) -> String {
        format!("{} is {}", last_segment(&self.subject), self.description)
    }

    /// The (subject, predicate, object) summary.
    #[must_use]
    pub fn triple(&self) -> Triple {
        Triple::new(&self.subject, &self.predicate, &self.object)
    }
}

/// How a perceived event relates to the perceiving agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Anything happening around the agent.
    Ambient,
    /// The agent's own ongoing conversation; recorded with a linked chat node.
    SelfChat,
}

/// Classify an event triple from the point of view of `agent_name`.
#[must_use]
pub fn classify(triple: &Triple, agent_name: &str) -> EventClass {
    if triple.subject == agent_name && triple.predicate == CHAT_PREDICATE {
        EventClass::SelfChat
    } else {
        EventClass::Ambient
    }
}

/// Whether `triple` is absent from the `retention` most recent events.
pub fn is_novel<S: MemoryStore + ?Sized>(store: &S, triple: &Triple, retention: usize) -> bool {
    !store.recent_event_triples(retention).contains(triple)
}

/// The part of a colon-qualified name after the last colon.
#[must_use]
pub fn last_segment(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
