//! Clique statistics and cohesion metrics

use std::collections::BTreeMap;

use itertools::Itertools;
use statrs::statistics::Statistics;

use crate::cluster::detection::cliques_by_size;
use crate::cluster::CliqueRecord;
use crate::error::{AnalysisError, Result};
use crate::graph::CoPurchaseGraph;

/// Sum of edge weights over all distinct unordered member pairs, divided by
/// the number of members (not the number of pairs).
///
/// Every pair must be directly connected; a missing edge means the clique
/// and the graph disagree and is reported as [`AnalysisError::MissingEdge`].
pub fn intracluster_strength(graph: &CoPurchaseGraph, nodes: &[i64]) -> Result<f64> {
    let members: Vec<i64> = nodes.iter().copied().unique().collect();
    if members.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for (first, second) in members.iter().copied().tuple_combinations() {
        let weight = match (graph.index_of(first), graph.index_of(second)) {
            (Some(a), Some(b)) => graph.edge_weight(a, b),
            _ => None,
        };
        total += weight.ok_or(AnalysisError::MissingEdge { first, second })?;
    }

    Ok(total / members.len() as f64)
}

/// Annotate one clique with member averages and intracluster strength
pub fn clique_record(graph: &CoPurchaseGraph, nodes: Vec<i64>) -> Result<CliqueRecord> {
    let products = nodes
        .iter()
        .map(|&id| {
            graph
                .index_of(id)
                .map(|n| graph.product(n))
                .ok_or(AnalysisError::UnknownNode(id))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CliqueRecord {
        size: nodes.len(),
        avg_price: products.iter().map(|p| p.price).mean(),
        avg_rating: products.iter().map(|p| p.avg_rating).mean(),
        avg_review: products.iter().map(|p| p.num_reviews as f64).mean(),
        intracluster_strength: intracluster_strength(graph, &nodes)?,
        nodes,
    })
}

/// Maximal cliques grouped by size, each annotated
pub fn clique_metrics(graph: &CoPurchaseGraph) -> Result<BTreeMap<usize, Vec<CliqueRecord>>> {
    cliques_by_size(graph)
        .into_iter()
        .map(|(size, cliques)| {
            let records = cliques
                .into_iter()
                .map(|nodes| clique_record(graph, nodes))
                .collect::<Result<Vec<_>>>()?;
            Ok((size, records))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build;
    use crate::graph::builder::tests::{edge_table, product_table, triangle_edges};

    #[test]
    fn test_triangle_strength() {
        let graph = build(&product_table(&[1, 2, 3]), &triangle_edges());
        let metrics = clique_metrics(&graph).unwrap();
        let record = &metrics[&3][0];
        assert_eq!(record.nodes, vec![1, 2, 3]);
        assert!((record.intracluster_strength - 3.0).abs() < 1e-12);
        assert!((record.avg_price - 20.0).abs() < 1e-12);
        assert!((record.avg_review - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_singleton_strength_is_zero() {
        let graph = build(&product_table(&[7]), &edge_table(&[]));
        assert_eq!(intracluster_strength(&graph, &[7]).unwrap(), 0.0);
        let metrics = clique_metrics(&graph).unwrap();
        assert_eq!(metrics[&1][0].intracluster_strength, 0.0);
    }

    #[test]
    fn test_repeated_member_is_not_a_pair() {
        let graph = build(&product_table(&[1, 2]), &edge_table(&[(1, 2, 4.0)]));
        assert_eq!(intracluster_strength(&graph, &[1, 2, 2]).unwrap(), 2.0);
    }

    #[test]
    fn test_missing_edge_is_error() {
        let graph = build(&product_table(&[1, 2, 3]), &edge_table(&[(1, 2, 1.0)]));
        let err = intracluster_strength(&graph, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingEdge { first: 1, second: 3 }));
    }
}
