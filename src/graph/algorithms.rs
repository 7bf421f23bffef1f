//! Centrality and clustering metrics over the co-purchase graph

use std::collections::VecDeque;

use rayon::prelude::*;
use serde::Serialize;

use crate::cluster::detection::connected_components;
use crate::graph::compressed::NodeMetrics;
use crate::graph::CoPurchaseGraph;

/// Degree centrality: distinct neighbors / (n - 1), 0 for graphs of at most one node
pub fn degree_centrality(graph: &CoPurchaseGraph) -> Vec<f64> {
    let n = graph.node_count;
    if n <= 1 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    (0..n)
        .map(|v| graph.proper_neighbors(v).count() as f64 * scale)
        .collect()
}

/// Single-source phase of Brandes' algorithm, adding dependencies into `acc`
fn accumulate_dependencies(graph: &CoPurchaseGraph, source: usize, acc: &mut [f64]) {
    let n = graph.node_count;
    let mut stack = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut distance = vec![usize::MAX; n];
    let mut queue = VecDeque::new();

    sigma[source] = 1.0;
    distance[source] = 0;
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for w in graph.proper_neighbors(v) {
            if distance[w] == usize::MAX {
                distance[w] = distance[v] + 1;
                queue.push_back(w);
            }
            if distance[w] == distance[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            acc[w] += delta[w];
        }
    }
}

/// Normalized betweenness centrality (Brandes). Sources are processed in
/// parallel once the graph reaches `parallel_threshold` nodes.
pub fn betweenness_centrality(graph: &CoPurchaseGraph, parallel_threshold: usize) -> Vec<f64> {
    let n = graph.node_count;

    let mut betweenness = if n >= parallel_threshold {
        log::debug!("Computing betweenness over {} sources in parallel", n);
        (0..n)
            .into_par_iter()
            .fold(
                || vec![0.0f64; n],
                |mut acc, source| {
                    accumulate_dependencies(graph, source, &mut acc);
                    acc
                },
            )
            .reduce(
                || vec![0.0f64; n],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    a
                },
            )
    } else {
        let mut acc = vec![0.0f64; n];
        for source in 0..n {
            accumulate_dependencies(graph, source, &mut acc);
        }
        acc
    };

    // Each unordered pair was counted from both ends
    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        betweenness.iter_mut().for_each(|b| *b *= scale);
    }
    betweenness
}

/// BFS hop distances from `source`; unreachable nodes are `None`
pub fn hop_distances(graph: &CoPurchaseGraph, source: usize) -> Vec<Option<usize>> {
    let mut distance = vec![None; graph.node_count];
    let mut queue = VecDeque::new();
    distance[source] = Some(0);
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        let next = distance[v].map_or(0, |d| d + 1);
        for w in graph.proper_neighbors(v) {
            if distance[w].is_none() {
                distance[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    distance
}

fn closeness_of(graph: &CoPurchaseGraph, node: usize) -> f64 {
    let n = graph.node_count;
    let distances = hop_distances(graph, node);
    let (reachable, total) = distances
        .iter()
        .flatten()
        .fold((0usize, 0usize), |(count, sum), &d| (count + 1, sum + d));

    if total == 0 || n <= 1 {
        return 0.0;
    }
    // Reciprocal mean distance within the component, scaled by the
    // fraction of the graph that component covers
    let others = (reachable - 1) as f64;
    (others / total as f64) * (others / (n - 1) as f64)
}

/// Closeness centrality; isolated nodes score 0
pub fn closeness_centrality(graph: &CoPurchaseGraph, parallel_threshold: usize) -> Vec<f64> {
    let n = graph.node_count;
    if n >= parallel_threshold {
        (0..n).into_par_iter().map(|v| closeness_of(graph, v)).collect()
    } else {
        (0..n).map(|v| closeness_of(graph, v)).collect()
    }
}

/// Local clustering coefficient of one node, ignoring weights and self-loops
pub fn clustering_coefficient(graph: &CoPurchaseGraph, node: usize) -> f64 {
    let neighbors: Vec<usize> = graph.proper_neighbors(node).collect();
    if neighbors.len() < 2 {
        return 0.0;
    }

    let mut links = 0usize;
    for (i, &a) in neighbors.iter().enumerate() {
        for &b in &neighbors[i + 1..] {
            if graph.has_edge(a, b) {
                links += 1;
            }
        }
    }

    let possible = neighbors.len() * (neighbors.len() - 1) / 2;
    links as f64 / possible as f64
}

pub fn clustering_coefficients(graph: &CoPurchaseGraph) -> Vec<f64> {
    (0..graph.node_count)
        .map(|v| clustering_coefficient(graph, v))
        .collect()
}

/// Attach centrality, clustering and degree annotations to every node
pub fn annotate(graph: &mut CoPurchaseGraph, parallel_threshold: usize) {
    log::info!("Computing metrics for {} nodes", graph.node_count);

    let degree = degree_centrality(graph);
    let betweenness = betweenness_centrality(graph, parallel_threshold);
    let closeness = closeness_centrality(graph, parallel_threshold);
    let clustering = clustering_coefficients(graph);

    let metrics = (0..graph.node_count)
        .map(|v| NodeMetrics {
            degree_centrality: degree[v],
            betweenness_centrality: betweenness[v],
            closeness_centrality: closeness[v],
            clustering_coefficient: clustering[v],
            num_connections: graph.neighbors(v).len(),
        })
        .collect();

    graph.metrics = Some(metrics);
}

/// Headline numbers for a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_weight: f64,
    pub component_count: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    /// Sum of degrees equals twice the edge count
    pub handshake_holds: bool,
}

pub fn summarize(graph: &CoPurchaseGraph) -> GraphSummary {
    let edge_count = graph.edge_count();
    let degrees: Vec<usize> = (0..graph.node_count).map(|v| graph.degree(v)).collect();
    let degree_sum: usize = degrees.iter().sum();

    GraphSummary {
        node_count: graph.node_count,
        edge_count,
        total_weight: graph.edges().map(|(_, _, w)| w).sum(),
        component_count: connected_components(graph).len(),
        avg_degree: if graph.node_count == 0 {
            0.0
        } else {
            degree_sum as f64 / graph.node_count as f64
        },
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        handshake_holds: degree_sum == 2 * edge_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build;
    use crate::graph::builder::tests::{edge_table, product_table};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn path_graph() -> CoPurchaseGraph {
        // 1 - 2 - 3 - 4
        build(
            &product_table(&[1, 2, 3, 4]),
            &edge_table(&[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)]),
        )
    }

    #[test]
    fn test_num_connections_counts_self_loop_once() {
        let mut graph = build(&product_table(&[1, 2]), &edge_table(&[(1, 2, 1.0), (1, 1, 4.0)]));
        annotate(&mut graph, usize::MAX);
        let metrics = graph.metrics.as_ref().unwrap();
        let looped = graph.index_of(1).unwrap();

        assert_eq!(metrics[looped].num_connections, 2);
        assert_eq!(graph.degree(looped), 3);
        assert!(close(metrics[looped].degree_centrality, 1.0));
    }

    #[test]
    fn test_complete_graph_degree_centrality() {
        let graph = build(
            &product_table(&[1, 2, 3, 4]),
            &edge_table(&[
                (1, 2, 1.0),
                (1, 3, 1.0),
                (1, 4, 1.0),
                (2, 3, 1.0),
                (2, 4, 1.0),
                (3, 4, 1.0),
            ]),
        );
        assert!(degree_centrality(&graph).iter().all(|&d| close(d, 1.0)));
        assert!(clustering_coefficients(&graph).iter().all(|&c| close(c, 1.0)));
        assert!(betweenness_centrality(&graph, usize::MAX).iter().all(|&b| close(b, 0.0)));
    }

    #[test]
    fn test_degenerate_graphs() {
        let single = build(&product_table(&[1]), &edge_table(&[]));
        assert_eq!(degree_centrality(&single), vec![0.0]);
        assert_eq!(closeness_centrality(&single, usize::MAX), vec![0.0]);
        assert_eq!(betweenness_centrality(&single, usize::MAX), vec![0.0]);

        let empty = build(&product_table(&[]), &edge_table(&[]));
        assert!(degree_centrality(&empty).is_empty());
    }

    #[test]
    fn test_path_betweenness_and_closeness() {
        let graph = path_graph();
        let b = betweenness_centrality(&graph, usize::MAX);
        // Inner nodes each sit on 2 of the 3 pairs that do not include them
        assert!(close(b[0], 0.0));
        assert!(close(b[1], 2.0 / 3.0));
        assert!(close(b[2], 2.0 / 3.0));

        let c = closeness_centrality(&graph, usize::MAX);
        assert!(close(c[0], 3.0 / 6.0));
        assert!(close(c[1], 3.0 / 4.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let graph = path_graph();
        let sequential = betweenness_centrality(&graph, usize::MAX);
        let parallel = betweenness_centrality(&graph, 0);
        for (a, b) in sequential.iter().zip(&parallel) {
            assert!(close(*a, *b));
        }
        assert_eq!(
            closeness_centrality(&graph, usize::MAX),
            closeness_centrality(&graph, 0)
        );
    }

    #[test]
    fn test_disconnected_closeness() {
        // 1 - 2   3 (isolated)
        let graph = build(&product_table(&[1, 2, 3]), &edge_table(&[(1, 2, 4.0)]));
        let c = closeness_centrality(&graph, usize::MAX);
        assert!(close(c[0], 0.5));
        assert!(close(c[2], 0.0));
    }

    #[test]
    fn test_annotate_and_summary() {
        let mut graph = build(
            &product_table(&[1, 2, 3]),
            &edge_table(&[(1, 2, 5.0), (2, 3, 3.0)]),
        );
        annotate(&mut graph, usize::MAX);
        let metrics = graph.metrics.as_ref().unwrap();
        assert_eq!(metrics[1].num_connections, 2);
        assert!(close(metrics[1].betweenness_centrality, 1.0));
        assert!(close(metrics[0].clustering_coefficient, 0.0));
        assert!(metrics
            .iter()
            .all(|m| (0.0..=1.0).contains(&m.degree_centrality)));

        let summary = summarize(&graph);
        assert_eq!(summary.edge_count, 2);
        assert_eq!(summary.component_count, 1);
        assert!(summary.handshake_holds);
        assert!(close(summary.total_weight, 8.0));
    }
}
