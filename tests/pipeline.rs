use std::collections::BTreeSet;
use std::fs;

use copurchase_analyzer::cluster::metrics::clique_metrics;
use copurchase_analyzer::correlation::Direction;
use copurchase_analyzer::data::{loader, Attribute, AttributeFilter, FilterValue};
use copurchase_analyzer::graph::ego;
use copurchase_analyzer::{AnalysisError, Config, FilterSpec, GraphService};

const NODES: &str = "id,Genre,Number of Pages,Price,Sales Rank,Average Rating,Number of Reviews
1,A,100,10.0,500,4.0,10
2,B,200,20.0,400,4.5,20
3,A,300,30.0,300,3.5,30
4,A,400,40.0,200,5.0,40
";

const EDGES: &str = "Source,Target,Frequency
1,2,5
2,3,3
1,3,1
3,4,2
4,9,6
";

fn service() -> GraphService {
    let tables = loader::load_csv_bytes(NODES.as_bytes(), EDGES.as_bytes()).unwrap();
    GraphService::new(tables, 1000, true)
}

fn genre(value: &str) -> FilterSpec {
    FilterSpec::new()
        .with(
            Attribute::Genre,
            AttributeFilter::Values(vec![FilterValue::Text(value.to_string())]),
        )
        .unwrap()
}

#[test]
fn test_graph_is_closed_over_filtered_nodes() {
    let svc = service();
    let graph = svc.load_graph(&genre("A"));

    let ids: BTreeSet<i64> = graph.products.iter().map(|p| p.id).collect();
    assert_eq!(ids, BTreeSet::from([1, 3, 4]));
    for (a, b, _) in graph.edges() {
        assert!(ids.contains(&graph.id(a)));
        assert!(ids.contains(&graph.id(b)));
    }
    // 1-3 and 3-4 survive; 4-9 dangles in the source data
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn test_empty_filter_keeps_all_resolvable_edges() {
    let svc = service();
    let graph = svc.load_graph(&FilterSpec::new());
    assert_eq!(graph.node_count, 4);
    assert_eq!(graph.edge_count(), 4);

    let degree_sum: usize = (0..graph.node_count).map(|n| graph.degree(n)).sum();
    assert_eq!(degree_sum, 2 * graph.edge_count());
}

#[test]
fn test_triangle_clique_strength() {
    let svc = service();
    let graph = svc.load_graph(&FilterSpec::new().with_node_ids([1, 2, 3]));
    let cliques = clique_metrics(&graph).unwrap();

    let triangles = &cliques[&3];
    assert_eq!(triangles.len(), 1);
    assert_eq!(triangles[0].nodes, vec![1, 2, 3]);
    assert!((triangles[0].intracluster_strength - 3.0).abs() < 1e-12);
    assert!((triangles[0].avg_price - 20.0).abs() < 1e-12);
}

#[test]
fn test_clique_size_filter_narrows_graph() {
    let svc = service();
    let graph = svc.clique_graph(&FilterSpec::new(), 3);
    let ids: BTreeSet<i64> = graph.products.iter().map(|p| p.id).collect();
    assert_eq!(ids, BTreeSet::from([1, 2, 3]));
}

#[test]
fn test_ego_network_of_highest_degree_product() {
    let svc = service();
    let graph = svc.annotated_graph(&FilterSpec::new());
    let network = svc.ego_network(&graph, 1).unwrap();

    // Product 3 touches 1, 2 and 4
    assert_eq!(network.center, 3);
    assert_eq!(network.graph.node_count, 4);
    let flagged: Vec<i64> = ego::members(&network)
        .into_iter()
        .filter(|m| m.is_ego)
        .map(|m| m.id)
        .collect();
    assert_eq!(flagged, vec![3]);

    assert!(matches!(
        svc.ego_network(&graph, 5),
        Err(AnalysisError::RankOutOfRange { rank: 5, node_count: 4 })
    ));
}

#[test]
fn test_annotated_graph_metrics() {
    let svc = service();
    let graph = svc.annotated_graph(&FilterSpec::new());
    let metrics = graph.metrics.as_ref().unwrap();
    let center = graph.index_of(3).unwrap();
    let leaf = graph.index_of(4).unwrap();

    assert!((metrics[center].degree_centrality - 1.0).abs() < 1e-12);
    assert!(metrics[center].betweenness_centrality > metrics[leaf].betweenness_centrality);
    assert_eq!(metrics[leaf].clustering_coefficient, 0.0);
    assert_eq!(metrics[center].num_connections, 3);
}

#[test]
fn test_correlation_network_signs() {
    let svc = service();
    let positive = svc.correlation_network(Direction::Positive).unwrap();
    let negative = svc.correlation_network(Direction::Negative).unwrap();

    assert_eq!(positive.nodes, negative.nodes);
    assert!(positive.edges.iter().all(|e| e.weight >= 0.0));
    assert!(negative.edges.iter().all(|e| e.weight < 0.0));
    // Price rises while sales rank falls
    assert!(negative
        .edges
        .iter()
        .any(|e| e.source == "price" && e.target == "sales_rank"));
}

#[test]
fn test_load_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let nodes = dir.path().join("nodes.csv");
    let edges = dir.path().join("edges.csv");
    fs::write(&nodes, NODES).unwrap();
    fs::write(&edges, EDGES).unwrap();

    let config = Config::new(&nodes, &edges, dir.path().join("out"), 3, 1000, false);
    let svc = GraphService::from_config(&config).unwrap();
    assert_eq!(svc.tables().nodes.len(), 4);
    assert_eq!(svc.tables().edges.len(), 5);
}

#[test]
fn test_filter_spec_from_json() {
    let svc = service();
    let json = r#"{"filters":{"sales_rank":{"ranges":["250 - 450"]}}}"#;
    let spec = FilterSpec::from_json(json).unwrap();
    let graph = svc.load_graph(&spec);
    let ids: BTreeSet<i64> = graph.products.iter().map(|p| p.id).collect();
    assert_eq!(ids, BTreeSet::from([2, 3]));

    assert!(FilterSpec::from_json(r#"{"filters":{"genre":{"deciles":[0,5]}}}"#).is_err());
    assert!(FilterSpec::from_json(r#"{"filters":{"price":{"ranges":["15 - 35"]}}}"#).is_err());
}
