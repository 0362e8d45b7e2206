//! Randomized agreement between Dijkstra, bidirectional Dijkstra and CH

mod common;

use butterfly_ch::routing::AlgorithmPreparation;
use butterfly_ch::{
    AlgorithmType, Dijkstra, DijkstraBidirection, Graph, LevelGraphStorage, Path,
    RoutingAlgorithm, RoutingConfig, WeightCalculation, Weighting,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Every consecutive node pair must be joined by the listed original edge
fn assert_valid_path(g: &LevelGraphStorage, path: &Path) {
    assert_eq!(path.nodes().len(), path.edges().len() + 1);
    let mut distance = 0.0;
    for (i, &edge) in path.edges().iter().enumerate() {
        let view = g.edge_props(edge, path.nodes()[i + 1]).unwrap();
        assert_eq!(view.base_node(), path.nodes()[i]);
        assert!(view.flags().is_forward(), "edge {edge} traversed against its direction");
        assert!(!view.flags().is_shortcut());
        distance += view.distance();
    }
    assert!((distance - path.distance()).abs() < 1e-6);
}

fn cross_check(seed: u64, nodes: u32, extra: usize, weighting: Weighting) {
    common::init_tracing();
    let mut g = common::random_graph(seed, nodes, extra);
    let clean = g.clone();
    let config = RoutingConfig {
        weighting,
        algorithm: AlgorithmType::DijkstraBidirectionCh,
        ..RoutingConfig::default()
    };
    let stats = config.prepare(&mut g).run().unwrap();
    assert_eq!(stats.nodes, nodes as usize);

    let mut rng = StdRng::seed_from_u64(seed ^ 0xB077_E5F1);
    for _ in 0..100 {
        let s = rng.gen_range(0..nodes);
        let t = rng.gen_range(0..nodes);

        let calc: WeightCalculation = weighting.calculation();
        let reference = Dijkstra::new(&clean)
            .with_weighting(calc.clone())
            .calc_path(s, t)
            .unwrap();
        let bidir = DijkstraBidirection::new(&clean)
            .with_weighting(calc)
            .calc_path(s, t)
            .unwrap();
        let ch = config.create_algo(&g).unwrap().calc_path(s, t).unwrap();

        assert_eq!(reference.found(), bidir.found(), "bidir {s}->{t}");
        assert_eq!(reference.found(), ch.found(), "ch {s}->{t}");
        if !reference.found() {
            continue;
        }

        assert!(
            (reference.weight() - bidir.weight()).abs() < 1e-6,
            "bidir {s}->{t}: {} vs {}",
            reference.weight(),
            bidir.weight()
        );
        assert!(
            (reference.weight() - ch.weight()).abs() < 1e-6,
            "ch {s}->{t}: {} vs {}",
            reference.weight(),
            ch.weight()
        );
        assert_eq!(ch.nodes().first(), Some(&s));
        assert_eq!(ch.nodes().last(), Some(&t));

        assert_valid_path(&clean, &reference);
        assert_valid_path(&clean, &bidir);
        assert_valid_path(&g, &ch);
        let recomputed: f64 = ch
            .edges()
            .iter()
            .zip(&ch.nodes()[1..])
            .map(|(&e, &n)| calc_weight(&g, &weighting.calculation(), e, n))
            .sum();
        assert!((recomputed - ch.weight()).abs() < 1e-9);
    }
}

fn calc_weight(g: &LevelGraphStorage, calc: &WeightCalculation, edge: u32, to: u32) -> f64 {
    calc.weight(&g.edge_props(edge, to).unwrap()).unwrap()
}

#[test]
fn test_shortest_small_graphs() {
    for seed in 0..5 {
        cross_check(seed, 30, 40, Weighting::Shortest);
    }
}

#[test]
fn test_shortest_medium_graph() {
    cross_check(42, 300, 600, Weighting::Shortest);
}

#[test]
fn test_fastest_medium_graph() {
    cross_check(1234, 200, 400, Weighting::Fastest);
}

#[test]
fn test_fastest_many_seeds() {
    for seed in 0..20 {
        cross_check(seed, 80, 120, Weighting::Fastest);
    }
}

#[test]
fn test_plain_searches_skip_shortcuts() {
    let mut g = common::random_graph(3, 80, 120);
    let clean = g.clone();
    let config = RoutingConfig::from_toml_str("weighting = \"fastest\"").unwrap();
    config.prepare(&mut g).run().unwrap();
    assert!(g.edge_count() > clean.edge_count());

    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..200 {
        let s = rng.gen_range(0..80);
        let t = rng.gen_range(0..80);
        let expected = Dijkstra::new(&clean).calc_path(s, t).unwrap();
        let plain = Dijkstra::new(&g).calc_path(s, t).unwrap();
        let bidir = DijkstraBidirection::new(&g).calc_path(s, t).unwrap();

        assert_eq!(expected.found(), plain.found(), "{s}->{t}");
        assert_eq!(expected.found(), bidir.found(), "{s}->{t}");
        if !expected.found() {
            continue;
        }
        assert_eq!(expected.weight(), plain.weight(), "dijkstra {s}->{t}");
        assert!((expected.weight() - bidir.weight()).abs() < 1e-9, "bidir {s}->{t}");
        assert_eq!(expected.distance(), plain.distance());
        assert_valid_path(&g, &plain);
        assert_valid_path(&g, &bidir);
    }
}

#[test]
fn test_tight_witness_limit_still_exact() {
    let mut g = common::random_graph(99, 150, 300);
    let clean = g.clone();
    let mut config = RoutingConfig {
        algorithm: AlgorithmType::DijkstraBidirectionCh,
        ..RoutingConfig::default()
    };
    config.prepare.witness_settled_limit = 1;
    config.prepare(&mut g).do_work().unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..50 {
        let s = rng.gen_range(0..150);
        let t = rng.gen_range(0..150);
        let reference = Dijkstra::new(&clean).calc_path(s, t).unwrap();
        let ch = config.create_algo(&g).unwrap().calc_path(s, t).unwrap();
        assert_eq!(reference.found(), ch.found());
        if reference.found() {
            assert!((reference.weight() - ch.weight()).abs() < 1e-6);
        }
    }
    assert!(g.edge_count() > 0);
}
