//! Associative memory — the agent's append-only record of experiences.
//!
//! The pipeline talks to memory through the [`MemoryStore`] trait; the
//! [`AssociativeMemory`] type is the default in-process store, with keyword
//! indices used by downstream retrieval.

pub mod node;

pub use node::{Filling, MemoryNode, NodeDraft, NodeKind};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Triple};

/// Capabilities the perception pipeline needs from a memory store.
pub trait MemoryStore {
    /// Triples of the `n` most recent event nodes, most recent first,
    /// with repeats removed.
    fn recent_event_triples(&self, n: usize) -> Vec<Triple>;

    /// Persist an event node and return it as stored.
    fn append_event(&mut self, draft: NodeDraft) -> MemoryNode;

    /// Persist a chat node and return it as stored.
    fn append_chat(&mut self, draft: NodeDraft) -> MemoryNode;
}

/// Default in-process associative memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociativeMemory {
    /// Every node, in creation order. `nodes[i].id == NodeId(i + 1)`.
    nodes: Vec<MemoryNode>,
    /// Event node IDs in creation order.
    seq_event: Vec<NodeId>,
    /// Chat node IDs in creation order.
    seq_chat: Vec<NodeId>,
    /// Lowercased keyword → event nodes carrying it, in creation order.
    kw_to_event: BTreeMap<String, Vec<NodeId>>,
    /// Lowercased keyword → chat nodes carrying it, in creation order.
    kw_to_chat: BTreeMap<String, Vec<NodeId>>,
    /// How often each keyword appeared on a non-idle event.
    kw_strength_event: BTreeMap<String, u32>,
    /// How often each keyword appeared on a chat.
    kw_strength_chat: BTreeMap<String, u32>,
}

impl AssociativeMemory {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of event nodes.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.seq_event.len()
    }

    /// Number of chat nodes.
    #[must_use]
    pub fn chat_count(&self) -> usize {
        self.seq_chat.len()
    }

    /// Look up a node by ID.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        let index = usize::try_from(id.0.checked_sub(1)?).ok()?;
        self.nodes.get(index).filter(|n| n.id == id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &MemoryNode> {
        self.nodes.iter()
    }

    /// Event nodes carrying `keyword`, most recent first.
    #[must_use]
    pub fn events_with_keyword(&self, keyword: &str) -> Vec<&MemoryNode> {
        self.lookup(&self.kw_to_event, keyword)
    }

    /// Chat nodes carrying `keyword`, most recent first.
    #[must_use]
    pub fn chats_with_keyword(&self, keyword: &str) -> Vec<&MemoryNode> {
        self.lookup(&self.kw_to_chat, keyword)
    }

    /// Combined event and chat strength of `keyword`.
    #[must_use]
    pub fn keyword_strength(&self, keyword: &str) -> u32 {
        let kw = keyword.to_lowercase();
        self.kw_strength_event.get(&kw).copied().unwrap_or(0)
            + self.kw_strength_chat.get(&kw).copied().unwrap_or(0)
    }

    /// The most recent chat that mentions `name`.
    #[must_use]
    pub fn last_chat_with(&self, name: &str) -> Option<&MemoryNode> {
        self.chats_with_keyword(name).into_iter().next()
    }

    fn lookup(&self, index: &BTreeMap<String, Vec<NodeId>>, keyword: &str) -> Vec<&MemoryNode> {
        index
            .get(&keyword.to_lowercase())
            .map(|ids| ids.iter().rev().filter_map(|id| self.node(*id)).collect())
            .unwrap_or_default()
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u64 + 1)
    }

    fn push(&mut self, kind: NodeKind, draft: NodeDraft) -> MemoryNode {
        let id = self.next_id();
        let node = MemoryNode::from_draft(id, kind, draft);

        let (seq, index, strength) = match kind {
            NodeKind::Event => (
                &mut self.seq_event,
                &mut self.kw_to_event,
                &mut self.kw_strength_event,
            ),
            NodeKind::Chat => (
                &mut self.seq_chat,
                &mut self.kw_to_chat,
                &mut self.kw_strength_chat,
            ),
        };
        seq.push(id);

        let strengthens = kind == NodeKind::Chat || !is_idle_triple(&node.triple);
        for kw in &node.keywords {
            let kw = kw.to_lowercase();
            index.entry(kw.clone()).or_default().push(id);
            if strengthens {
                *strength.entry(kw).or_default() += 1;
            }
        }

        self.nodes.push(node.clone());
        node
    }
}

impl MemoryStore for AssociativeMemory {
    fn recent_event_triples(&self, n: usize) -> Vec<Triple> {
        let mut out: Vec<Triple> = Vec::with_capacity(n.min(self.seq_event.len()));
        for id in self.seq_event.iter().rev().take(n) {
            if let Some(node) = self.node(*id) {
                if !out.contains(&node.triple) {
                    out.push(node.triple.clone());
                }
            }
        }
        out
    }

    fn append_event(&mut self, draft: NodeDraft) -> MemoryNode {
        self.push(NodeKind::Event, draft)
    }

    fn append_chat(&mut self, draft: NodeDraft) -> MemoryNode {
        self.push(NodeKind::Chat, draft)
    }
}

fn is_idle_triple(triple: &Triple) -> bool {
    triple.predicate == "is" && triple.object == "idle"
}
