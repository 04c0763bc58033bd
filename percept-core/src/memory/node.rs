//! Memory nodes — the durable unit of associative memory.
//!
//! A node is created once by the store and never mutated afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{ChatLine, NodeId, SimTimestamp, Triple};

/// What kind of experience a node records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Something the agent perceived happening.
    Event,
    /// A conversation the agent took part in.
    Chat,
}

/// Node payload beyond the description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filling {
    /// Event nodes: chat nodes recorded alongside this event.
    Chats(Vec<NodeId>),
    /// Chat nodes: the conversation transcript.
    Transcript(Vec<ChatLine>),
}

impl Default for Filling {
    fn default() -> Self {
        Self::Chats(Vec::new())
    }
}

/// Everything the store needs to create a node; the store assigns the ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    /// When the experience began.
    pub created: SimTimestamp,
    /// When it stops being relevant, if ever.
    pub expires: Option<SimTimestamp>,
    /// (subject, predicate, object) summary.
    pub triple: Triple,
    /// Natural-language description.
    pub description: String,
    /// Keywords for associative lookup.
    pub keywords: BTreeSet<String>,
    /// Importance score.
    pub poignancy: f32,
    /// Key into the agent's embedding cache.
    pub embedding_key: String,
    /// Linked chat nodes or transcript.
    pub filling: Filling,
}

/// A node in the agent's associative memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Store-assigned identifier; increases with creation order.
    pub id: NodeId,
    /// Event or chat.
    pub kind: NodeKind,
    /// Abstraction depth. Perceived events and chats are always 0.
    pub depth: u32,
    /// When the experience began.
    pub created: SimTimestamp,
    /// When it stops being relevant, if ever.
    pub expires: Option<SimTimestamp>,
    /// Last time the node was retrieved. Equal to `created` at creation.
    pub last_accessed: SimTimestamp,
    /// (subject, predicate, object) summary.
    pub triple: Triple,
    /// Natural-language description, e.g. `"Bob is having breakfast"`.
    pub description: String,
    /// Keywords derived from subject and object.
    pub keywords: BTreeSet<String>,
    /// Importance score.
    pub poignancy: f32,
    /// Key into the agent's embedding cache.
    pub embedding_key: String,
    /// Linked chat nodes (events) or transcript (chats).
    pub filling: Filling,
}

impl MemoryNode {
    /// Materialize a draft under the given identity.
    #[must_use]
    pub fn from_draft(id: NodeId, kind: NodeKind, draft: NodeDraft) -> Self {
        Self {
            id,
            kind,
            depth: 0,
            created: draft.created,
            expires: draft.expires,
            last_accessed: draft.created,
            triple: draft.triple,
            description: draft.description,
            keywords: draft.keywords,
            poignancy: draft.poignancy,
            embedding_key: draft.embedding_key,
            filling: draft.filling,
        }
    }

    /// Chat nodes linked to an event node. Empty for chat nodes.
    #[must_use]
    pub fn linked_chats(&self) -> &[NodeId] {
        match &self.filling {
            Filling::Chats(ids) => ids,
            Filling::Transcript(_) => &[],
        }
    }

    /// Transcript of a chat node. Empty for event nodes.
    #[must_use]
    pub fn transcript(&self) -> &[ChatLine] {
        match &self.filling {
            Filling::Transcript(lines) => lines,
            Filling::Chats(_) => &[],
        }
    }
}
