//! End-to-end behaviour of the three searches on small hand-built graphs

mod common;

use butterfly_ch::routing::AlgorithmPreparation;
use butterfly_ch::{
    AlgorithmType, Dijkstra, DijkstraBidirection, EdgeFlags, Error, Graph, LevelGraph,
    LevelGraphStorage, Mode, PrepareContractionHierarchies, RoutingAlgorithm, RoutingConfig,
    SearchState, Directory,
};

fn all_algorithms(graph: &mut LevelGraphStorage) -> Vec<Box<dyn RoutingAlgorithm + '_>> {
    PrepareContractionHierarchies::new(graph).do_work().unwrap();
    let graph: &LevelGraphStorage = graph;
    let ch = RoutingConfig {
        algorithm: AlgorithmType::DijkstraBidirectionCh,
        ..RoutingConfig::default()
    };
    vec![
        Box::new(Dijkstra::new(graph)),
        Box::new(DijkstraBidirection::new(graph)),
        ch.create_algo(graph).unwrap(),
    ]
}

#[test]
fn test_line_graph_all_algorithms() {
    common::init_tracing();
    let mut g = common::line_graph();
    for mut algo in all_algorithms(&mut g) {
        let path = algo.calc_path(0, 2).unwrap();
        assert!(path.found(), "{}", algo.name());
        assert_eq!(path.weight(), 8.0, "{}", algo.name());
        assert_eq!(path.distance(), 8.0, "{}", algo.name());
        assert_eq!(path.nodes(), &[0, 1, 2], "{}", algo.name());
        assert_eq!(path.edges(), &[0, 1], "{}", algo.name());
        assert_eq!(algo.state(), SearchState::Found);
        assert!(algo.visited_nodes() > 0);
    }
}

#[test]
fn test_hidden_edge_makes_target_unreachable() {
    let mut g = common::line_graph();
    g.set_flags(1, EdgeFlags::HIDDEN).unwrap();
    for mut algo in all_algorithms(&mut g) {
        let path = algo.calc_path(0, 2).unwrap();
        assert!(!path.found(), "{}", algo.name());
        assert!(path.weight().is_infinite());
        assert_eq!(algo.state(), SearchState::Exhausted);
    }
}

#[test]
fn test_source_equals_target() {
    let mut g = common::line_graph();
    for mut algo in all_algorithms(&mut g) {
        let path = algo.calc_path(1, 1).unwrap();
        assert!(path.found());
        assert_eq!(path.weight(), 0.0);
        assert_eq!(path.nodes(), &[1]);
    }
}

#[test]
fn test_reuse_and_out_of_range() {
    let mut g = common::line_graph();
    for mut algo in all_algorithms(&mut g) {
        assert!(matches!(
            algo.calc_path(0, 7),
            Err(Error::NodeOutOfRange { node: 7, .. })
        ));
        algo.clear();
        algo.calc_path(0, 1).unwrap();
        assert!(matches!(
            algo.calc_path(0, 1),
            Err(Error::AlgorithmAlreadyUsed(_))
        ));
        algo.clear();
        assert_eq!(algo.state(), SearchState::Init);
        assert_eq!(algo.calc_path(2, 0).unwrap().weight(), 8.0);
    }
}

#[test]
fn test_one_way_street() {
    let mut g = LevelGraphStorage::new(Directory::ram());
    g.create_new(4).unwrap();
    g.edge(0, 1, 1.0, false).unwrap();
    g.edge(1, 2, 1.0, false).unwrap();
    g.edge(2, 3, 1.0, false).unwrap();
    g.edge(3, 0, 1.0, false).unwrap();

    for mut algo in all_algorithms(&mut g) {
        let path = algo.calc_path(2, 1).unwrap();
        assert_eq!(path.nodes(), &[2, 3, 0, 1], "{}", algo.name());
        assert_eq!(path.weight(), 3.0);
    }
}

#[test]
fn test_mode_restricted_network() {
    let mut g = LevelGraphStorage::new(Directory::ram());
    g.create_new(4).unwrap();
    // car-only motorway 0-3, foot path 0-1-2-3
    g.edge_with_flags(0, 3, 10.0, EdgeFlags::new(&[Mode::Car], 100, true, true))
        .unwrap();
    g.edge_with_flags(0, 1, 1.0, EdgeFlags::new(&[Mode::Foot], 5, true, true))
        .unwrap();
    g.edge_with_flags(1, 2, 1.0, EdgeFlags::new(&[Mode::Foot], 5, true, true))
        .unwrap();
    g.edge_with_flags(2, 3, 1.0, EdgeFlags::new(&[Mode::Foot], 5, true, true))
        .unwrap();

    let mut car = Dijkstra::new(&g).with_mode(Mode::Car);
    assert_eq!(car.calc_path(0, 3).unwrap().nodes(), &[0, 3]);
    let mut foot = DijkstraBidirection::new(&g).with_mode(Mode::Foot);
    assert_eq!(foot.calc_path(0, 3).unwrap().nodes(), &[0, 1, 2, 3]);

    let config = RoutingConfig::from_toml_str("mode = \"car\"\nalgorithm = \"ch\"").unwrap();
    config.prepare(&mut g).do_work().unwrap();
    let mut ch = config.create_algo(&g).unwrap();
    let path = ch.calc_path(0, 3).unwrap();
    assert_eq!(path.nodes(), &[0, 3]);
    ch.clear();
    assert!(!ch.calc_path(0, 1).unwrap().found());
}

#[test]
fn test_preparation_is_idempotent() {
    let mut g = common::random_graph(7, 60, 90);
    let stats = PrepareContractionHierarchies::new(&mut g).run().unwrap();
    assert_eq!(stats.nodes, 60);
    let edges_after_first = g.edge_count();
    let levels: Vec<_> = (0..60).map(|n| g.level(n).unwrap()).collect();

    let mut again = PrepareContractionHierarchies::new(&mut g);
    assert!(again.is_prepared());
    again.do_work().unwrap();
    assert_eq!(again.stats().shortcuts, 0);

    assert_eq!(g.edge_count(), edges_after_first);
    let levels_after: Vec<_> = (0..60).map(|n| g.level(n).unwrap()).collect();
    assert_eq!(levels, levels_after);
}

#[test]
fn test_levels_are_a_permutation() {
    let mut g = common::random_graph(11, 40, 50);
    PrepareContractionHierarchies::new(&mut g).run().unwrap();
    let mut levels: Vec<_> = (0..40).map(|n| g.level(n).unwrap()).collect();
    levels.sort_unstable();
    assert_eq!(levels, (0..40).collect::<Vec<_>>());
}

#[test]
fn test_ch_on_unprepared_graph_fails() {
    let g = common::line_graph();
    let config = RoutingConfig {
        algorithm: AlgorithmType::DijkstraBidirectionCh,
        ..RoutingConfig::default()
    };
    assert!(matches!(config.create_algo(&g), Err(Error::NotPrepared)));
}

#[test]
fn test_shortcut_unrolls_to_original_distance() {
    let mut g = common::random_graph(3, 80, 120);
    PrepareContractionHierarchies::new(&mut g).run().unwrap();

    let shortcuts: Vec<_> = g
        .get_all_edges()
        .filter(|e| e.flags().is_shortcut())
        .collect();
    assert!(!shortcuts.is_empty());

    let config = RoutingConfig {
        algorithm: AlgorithmType::DijkstraBidirectionCh,
        ..RoutingConfig::default()
    };
    for sc in shortcuts.iter().take(20) {
        let mut algo = config.create_algo(&g).unwrap();
        let path = algo.calc_path(sc.base_node(), sc.adj_node()).unwrap();
        assert!(path.found());
        assert!(path.weight() <= sc.distance() + 1e-9);
        assert!((path.distance() - path.weight()).abs() < 1e-3 * path.edges().len() as f64 + 1e-9);
        for &edge in path.edges() {
            assert!(!g.get_all_edges().nth(edge as usize).unwrap().flags().is_shortcut());
        }
    }
}
