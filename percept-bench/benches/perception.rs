//! Perception Benchmark Suite
//!
//! Targets for a 40×40 town:
//!   scan_radius_4 ................... < 20μs
//!   spatial_merge_81_tiles .......... < 30μs
//!   perceive_busy_kitchen ........... < 100μs
//!   town_tick_20_personas ........... < 2ms

use chrono::NaiveDateTime;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use percept_core::config::PerceptConfig;
use percept_core::{
    Embedding, EmbeddingOracle, Perceiver, Persona, PoignancyKind, PoignancyOracle, Scratch,
    SpatialMemory, TileCoord, TileEvent, World, scan,
};
use percept_town::{Maze, MazeLayout, Town};

struct ConstOracle;

impl EmbeddingOracle for ConstOracle {
    fn embed(&self, _text: &str) -> Embedding {
        Embedding(vec![0.5; 8])
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "const"
    }
}

impl PoignancyOracle for ConstOracle {
    fn score(&self, _kind: PoignancyKind, _text: &str) -> f32 {
        4.0
    }
}

/// A 40×40 town split into four 20×20 arenas, with an event on every third tile.
fn busy_maze() -> Maze {
    let layout = MazeLayout::from_toml(
        r#"
        world = "bench"
        width = 40
        height = 40

        [[areas]]
        sector = "north"
        arena = "west"
        x = 0
        y = 0
        width = 20
        height = 20

        [[areas]]
        sector = "north"
        arena = "east"
        x = 20
        y = 0
        width = 20
        height = 20

        [[areas]]
        sector = "south"
        arena = "west"
        x = 0
        y = 20
        width = 20
        height = 20

        [[areas]]
        sector = "south"
        arena = "east"
        game_object = "bench"
        x = 20
        y = 20
        width = 20
        height = 20
        "#,
    )
    .expect("bench layout");
    let mut maze = Maze::from_layout(&layout).expect("bench maze");
    for y in 0..40 {
        for x in (y % 3..40).step_by(3) {
            let event = TileEvent::new(format!("thing {x}-{y}"), "is", "busy", "busy");
            maze.add_event(TileCoord::new(x, y), event).expect("in bounds");
        }
    }
    maze
}

fn persona(name: &str, tile: TileCoord) -> Persona {
    let config = PerceptConfig::default();
    Persona::new(Scratch::new(name, tile, &config.perception), &config.importance)
}

/// Benchmark: Scan and rank a radius-4 window (target: < 20μs).
fn bench_scan(c: &mut Criterion) {
    let maze = busy_maze();
    c.bench_function("scan_radius_4", |b| {
        b.iter(|| scan::scan(black_box(&maze), black_box(TileCoord::new(10, 10)), 4));
    });
}

/// Benchmark: Merge a 9×9 window into spatial memory (target: < 30μs).
fn bench_spatial_merge(c: &mut Criterion) {
    let maze = busy_maze();
    let nearby = maze.nearby_tiles(TileCoord::new(20, 20), 4);
    c.bench_function("spatial_merge_81_tiles", |b| {
        b.iter(|| {
            let mut spatial = SpatialMemory::new();
            spatial.merge_all(nearby.iter().filter_map(|&coord| maze.tile(coord)));
            black_box(spatial);
        });
    });
}

/// Benchmark: One full perceive on a fresh persona (target: < 100μs).
fn bench_perceive(c: &mut Criterion) {
    let maze = busy_maze();
    let oracle = ConstOracle;
    let perceiver = Perceiver::new(&oracle, &oracle);
    let template = persona("Bench Walker", TileCoord::new(10, 10));

    c.bench_function("perceive_busy_kitchen", |b| {
        b.iter_batched(
            || template.clone(),
            |mut p| black_box(perceiver.perceive(&mut p, &maze)),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: A town tick with 20 personas (target: < 2ms).
fn bench_town_tick(c: &mut Criterion) {
    let config = PerceptConfig::default();
    let mut town = Town::new(busy_maze(), NaiveDateTime::default(), 10);
    for i in 0..20_u32 {
        let tile = TileCoord::new((i * 7) % 40, (i * 11) % 40);
        town.spawn(&format!("Walker {i}"), tile, &config).expect("spawn");
    }
    let oracle = ConstOracle;
    let perceiver = Perceiver::new(&oracle, &oracle);

    c.bench_function("town_tick_20_personas", |b| {
        b.iter_batched(
            || town.clone(),
            |mut t| black_box(t.tick(&perceiver)),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_scan,
    bench_spatial_merge,
    bench_perceive,
    bench_town_tick,
);
criterion_main!(benches);
