//! Ego network extraction around the highest-degree products

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::graph::CoPurchaseGraph;

/// Radius-one neighborhood of a center product
#[derive(Debug, Clone)]
pub struct EgoNetwork {
    /// 1-based degree rank of the center
    pub rank: usize,

    /// Product id of the center
    pub center: i64,

    /// Center, its neighbors, and every edge among them
    pub graph: CoPurchaseGraph,
}

impl EgoNetwork {
    pub fn is_ego(&self, id: i64) -> bool {
        id == self.center
    }
}

/// Node indices ordered by degree descending, ties by ascending product id
pub fn degree_ranking(graph: &CoPurchaseGraph) -> Vec<usize> {
    let mut order: Vec<usize> = (0..graph.node_count).collect();
    order.sort_by(|&a, &b| {
        graph
            .degree(b)
            .cmp(&graph.degree(a))
            .then_with(|| graph.id(a).cmp(&graph.id(b)))
    });
    order
}

fn extract(graph: &CoPurchaseGraph, center: usize, rank: usize) -> EgoNetwork {
    let mut members: Vec<usize> = graph.neighbors(center).iter().map(|&n| n as usize).collect();
    members.push(center);

    let ego = EgoNetwork {
        rank,
        center: graph.id(center),
        graph: graph.induced_subgraph(&members),
    };
    log::debug!(
        "Ego network of rank {} around {} has {} nodes",
        rank,
        ego.center,
        ego.graph.node_count
    );
    ego
}

/// Ego network of the `rank`-th highest-degree product (rank 1 = highest)
pub fn ego_network(graph: &CoPurchaseGraph, rank: usize) -> Result<EgoNetwork> {
    let out_of_range = AnalysisError::RankOutOfRange {
        rank,
        node_count: graph.node_count,
    };
    if rank == 0 {
        return Err(out_of_range);
    }
    let ranking = degree_ranking(graph);
    let &center = ranking.get(rank - 1).ok_or(out_of_range)?;
    Ok(extract(graph, center, rank))
}

/// Ego networks for ranks 1..=count
pub fn top_ego_networks(graph: &CoPurchaseGraph, count: usize) -> Result<Vec<EgoNetwork>> {
    if count > graph.node_count {
        return Err(AnalysisError::RankOutOfRange {
            rank: count,
            node_count: graph.node_count,
        });
    }
    let ranking = degree_ranking(graph);
    Ok(ranking
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, &center)| extract(graph, center, i + 1))
        .collect())
}

/// Serializable membership view with the ego flag per node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EgoMember {
    pub id: i64,
    pub is_ego: bool,
}

pub fn members(ego: &EgoNetwork) -> Vec<EgoMember> {
    ego.graph
        .products
        .iter()
        .map(|p| EgoMember {
            id: p.id,
            is_ego: ego.is_ego(p.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build;
    use crate::graph::builder::tests::{edge_table, product_table};

    fn star_with_tail() -> CoPurchaseGraph {
        // 1 is the hub of 2, 3, 4; 4 - 5 is a tail; 2 - 3 closes a triangle
        build(
            &product_table(&[1, 2, 3, 4, 5]),
            &edge_table(&[
                (1, 2, 1.0),
                (1, 3, 1.0),
                (1, 4, 1.0),
                (2, 3, 2.0),
                (4, 5, 1.0),
            ]),
        )
    }

    #[test]
    fn test_rank_one_is_max_degree() {
        let graph = star_with_tail();
        let ego = ego_network(&graph, 1).unwrap();
        assert_eq!(ego.center, 1);
        assert_eq!(ego.graph.node_count, 4);
        // 1-2, 1-3, 1-4 and the 2-3 edge among neighbors
        assert_eq!(ego.graph.edge_count(), 4);

        let center = ego.graph.index_of(ego.center).unwrap();
        for node in 0..ego.graph.node_count {
            assert!(node == center || ego.graph.has_edge(center, node));
        }
    }

    #[test]
    fn test_ties_break_by_id() {
        let graph = star_with_tail();
        // 2, 3 and 4 all have degree 2
        assert_eq!(ego_network(&graph, 2).unwrap().center, 2);
        assert_eq!(ego_network(&graph, 4).unwrap().center, 4);
    }

    #[test]
    fn test_rank_out_of_range() {
        let graph = star_with_tail();
        assert!(matches!(
            ego_network(&graph, 6),
            Err(AnalysisError::RankOutOfRange { rank: 6, node_count: 5 })
        ));
        assert!(ego_network(&graph, 0).is_err());
        assert!(top_ego_networks(&graph, 9).is_err());
    }

    #[test]
    fn test_top_ego_networks_flag_center() {
        let graph = star_with_tail();
        let egos = top_ego_networks(&graph, 2).unwrap();
        assert_eq!(egos.len(), 2);
        let flagged: Vec<i64> = members(&egos[1])
            .into_iter()
            .filter(|m| m.is_ego)
            .map(|m| m.id)
            .collect();
        assert_eq!(flagged, vec![egos[1].center]);
    }
}
