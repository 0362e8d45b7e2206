//! Shared helpers for integration tests

#![allow(dead_code)]

use butterfly_ch::{Directory, Graph, LevelGraphStorage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Install a subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 0 -(5)- 1 -(3)- 2, both directions
pub fn line_graph() -> LevelGraphStorage {
    let mut g = LevelGraphStorage::new(Directory::ram());
    g.create_new(3).unwrap();
    g.edge(0, 1, 5.0, true).unwrap();
    g.edge(1, 2, 3.0, true).unwrap();
    g
}

/// Random connected-ish road graph: a spanning chain plus extra edges,
/// some one-way, with integral distances and varied speeds
pub fn random_graph(seed: u64, nodes: u32, extra_edges: usize) -> LevelGraphStorage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut g = LevelGraphStorage::new(Directory::ram());
    g.create_new(nodes as usize).unwrap();

    let add = |g: &mut LevelGraphStorage, rng: &mut StdRng, a: u32, b: u32| {
        let distance = rng.gen_range(1..100) as f64;
        let speed = rng.gen_range(10..130);
        let both = rng.gen_bool(0.8);
        let flags = butterfly_ch::EdgeFlags::new(butterfly_ch::Mode::all(), speed, true, both);
        g.edge_with_flags(a, b, distance, flags).unwrap();
    };

    for n in 1..nodes {
        let prev = rng.gen_range(0..n);
        add(&mut g, &mut rng, prev, n);
    }
    for _ in 0..extra_edges {
        let a = rng.gen_range(0..nodes);
        let b = rng.gen_range(0..nodes);
        if a != b {
            add(&mut g, &mut rng, a, b);
        }
    }
    g
}
