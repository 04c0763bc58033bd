//! Property-Based Tests for the perception pipeline
//!
//! Uses `proptest` to verify the pipeline's structural invariants under
//! random worlds and memory histories: idempotent spatial merging, stable
//! distance ranking, locality, deduplication, bandwidth truncation, the
//! novelty window and importance conservation.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use percept_core::attention;
use percept_core::config::{ImportanceConfig, PerceptionConfig};
use percept_core::embedding::StubEmbeddingProvider;
use percept_core::memory::{AssociativeMemory, Filling, MemoryStore, NodeDraft};
use percept_core::novelty;
use percept_core::scan::{self, RankedEvent};
use percept_core::scoring::{PoignancyKind, PoignancyOracle};
use percept_core::{
    Persona, Scratch, SimTimestamp, SpatialMemory, TileCoord, TileEvent, TileObservation, Triple,
    World, perceive,
};

const SIDE: u32 = 8;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// An 8×8 world whose tiles are split between two arenas.
#[derive(Debug, Clone)]
struct RandomWorld {
    tiles: HashMap<TileCoord, TileObservation>,
}

impl World for RandomWorld {
    fn nearby_tiles(&self, position: TileCoord, radius: u32) -> Vec<TileCoord> {
        let mut out = Vec::new();
        for y in position.y.saturating_sub(radius)..=position.y.saturating_add(radius).min(SIDE - 1) {
            for x in position.x.saturating_sub(radius)..=position.x.saturating_add(radius).min(SIDE - 1) {
                out.push(TileCoord::new(x, y));
            }
        }
        out
    }

    fn tile(&self, coord: TileCoord) -> Option<&TileObservation> {
        self.tiles.get(&coord)
    }
}

fn arb_event() -> impl Strategy<Value = TileEvent> {
    (
        prop::sample::select(vec!["Bob", "Ann", "ville:house:kitchen:stove", "Carl"]),
        prop::option::of(prop::sample::select(vec!["eating", "reading", "cooking"])),
        prop::sample::select(vec!["toast", "book", "eggs"]),
    )
        .prop_map(|(subject, predicate, object)| TileEvent {
            subject: subject.to_string(),
            predicate: predicate.map(str::to_string),
            object: Some(object.to_string()),
            description: predicate.map(|p| format!("{p} {object}")),
        })
}

fn arb_tile() -> impl Strategy<Value = TileObservation> {
    (
        prop::sample::select(vec!["kitchen", "bathroom"]),
        prop::sample::select(vec!["", "table", "sink", "stove"]),
        prop::collection::vec(arb_event(), 0..3),
    )
        .prop_map(|(arena, object, events)| TileObservation {
            world: "ville".into(),
            sector: "house".into(),
            arena: arena.into(),
            game_object: object.into(),
            events,
        })
}

fn arb_world() -> impl Strategy<Value = RandomWorld> {
    prop::collection::vec(arb_tile(), (SIDE * SIDE) as usize).prop_map(|tiles| RandomWorld {
        tiles: tiles
            .into_iter()
            .enumerate()
            .map(|(i, t)| (TileCoord::new(i as u32 % SIDE, i as u32 / SIDE), t))
            .collect(),
    })
}

fn arb_position() -> impl Strategy<Value = TileCoord> {
    (0..SIDE, 0..SIDE).prop_map(|(x, y)| TileCoord::new(x, y))
}

fn arb_triple() -> impl Strategy<Value = Triple> {
    (
        prop::sample::select(vec!["A", "B", "C", "D"]),
        prop::sample::select(vec!["p", "q"]),
    )
        .prop_map(|(s, p)| Triple::new(s, p, "o"))
}

fn remember(mem: &mut AssociativeMemory, triple: Triple) {
    mem.append_event(NodeDraft {
        created: SimTimestamp::default(),
        expires: None,
        description: triple.to_string(),
        triple,
        keywords: Default::default(),
        poignancy: 1.0,
        embedding_key: String::new(),
        filling: Filling::default(),
    });
}

/// Scores each text by its length, clamped to the 1–10 scale.
struct LengthScorer;

impl PoignancyOracle for LengthScorer {
    fn score(&self, _kind: PoignancyKind, text: &str) -> f32 {
        (text.len() % 10 + 1) as f32
    }
}

// ---------------------------------------------------------------------------
// Property: merging the same tiles twice equals merging once
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn spatial_merge_is_idempotent(tiles in prop::collection::vec(arb_tile(), 0..40)) {
        let mut once = SpatialMemory::new();
        once.merge_all(&tiles);

        let mut twice = once.clone();
        twice.merge_all(&tiles);

        prop_assert_eq!(once, twice);
    }
}

// ---------------------------------------------------------------------------
// Property: ranking is sorted, local, deduplicated and reproducible
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ranking_is_sorted_and_local(world in arb_world(), pos in arb_position(), radius in 0u32..6) {
        let result = scan::scan(&world, pos, radius);
        let own_arena = world.arena_path(pos).expect("inside world");

        for pair in result.ranked.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
        for r in &result.ranked {
            let path = world.arena_path(r.tile);
            prop_assert_eq!(path.as_ref(), Some(&own_arena));
            prop_assert!((r.distance - pos.distance(&r.tile)).abs() < 1e-12);
        }

        let distinct: HashSet<&TileEvent> = result.ranked.iter().map(|r| &r.event).collect();
        prop_assert_eq!(distinct.len(), result.ranked.len());

        let again = scan::scan(&world, pos, radius);
        prop_assert_eq!(result.ranked, again.ranked);
    }

    #[test]
    fn equal_distances_keep_discovery_order(world in arb_world(), pos in arb_position()) {
        let result = scan::scan(&world, pos, 3);
        let order: HashMap<TileCoord, usize> =
            result.nearby.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        for pair in result.ranked.windows(2) {
            if pair[0].distance == pair[1].distance {
                prop_assert!(order[&pair[0].tile] <= order[&pair[1].tile]);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: attention keeps exactly the min(b, L) nearest events
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn bandwidth_truncation(distances in prop::collection::vec(0.0..20.0f64, 0..30), b in 0usize..40) {
        let mut ranked: Vec<RankedEvent> = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| RankedEvent {
                event: TileEvent::new(format!("e{i}"), "p", "o", "d"),
                tile: TileCoord::new(0, 0),
                distance: d,
            })
            .collect();
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let selected = attention::select(ranked.clone(), b);
        prop_assert_eq!(selected.len(), b.min(ranked.len()));
        prop_assert_eq!(&selected[..], &ranked[..selected.len()]);
    }
}

// ---------------------------------------------------------------------------
// Property: novelty is exactly "absent from the last `retention` events"
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn novelty_matches_window(
        history in prop::collection::vec(arb_triple(), 0..20),
        candidate in arb_triple(),
        retention in 0usize..8,
    ) {
        let mut mem = AssociativeMemory::new();
        for t in &history {
            remember(&mut mem, t.clone());
        }
        let start = history.len().saturating_sub(retention);
        let in_window = history[start..].contains(&candidate);
        prop_assert_eq!(novelty::is_novel(&mem, &candidate, retention), !in_window);
    }

    #[test]
    fn evicted_triple_becomes_novel_again(retention in 1usize..6) {
        let mut mem = AssociativeMemory::new();
        let target = Triple::new("Bob", "eating", "breakfast");
        remember(&mut mem, target.clone());
        prop_assert!(!novelty::is_novel(&mem, &target, retention));

        for i in 0..retention {
            remember(&mut mem, Triple::new(format!("other{i}"), "p", "o"));
        }
        prop_assert!(novelty::is_novel(&mem, &target, retention));
    }
}

// ---------------------------------------------------------------------------
// Property: the importance budget drops by exactly the recorded poignancy
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn importance_is_conserved(world in arb_world(), pos in arb_position(), bandwidth in 0i64..10) {
        let mut scratch = Scratch::new("Dana", pos, &PerceptionConfig::default());
        scratch.att_bandwidth = bandwidth;
        let mut persona = Persona::new(scratch, &ImportanceConfig::default());
        let before = persona.importance;

        let nodes = perceive(&mut persona, &world, &StubEmbeddingProvider::new(4), &LengthScorer)
            .expect("valid limits");

        let spent: f32 = nodes.iter().map(|n| n.poignancy).sum();
        prop_assert!(nodes.len() <= bandwidth as usize);
        prop_assert_eq!(persona.importance.element_count as usize, nodes.len());
        prop_assert!((before.trigger_curr - persona.importance.trigger_curr - spent).abs() < 1e-3);
        for n in &nodes {
            prop_assert!((1.0..=10.0).contains(&n.poignancy));
        }
    }
}
