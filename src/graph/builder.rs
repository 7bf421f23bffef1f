//! Graph construction from node and edge tables

use std::collections::HashMap;

use crate::data::{CoPurchase, EdgeTable, NodeTable, Product};
use crate::graph::CoPurchaseGraph;

/// Builder for incrementally constructing a CoPurchaseGraph
pub struct GraphBuilder {
    /// Mapping from product ids to node indices
    id_to_index: HashMap<i64, u32>,

    /// Node attributes by index
    products: Vec<Product>,

    /// Undirected edges keyed by (low index, high index)
    edges: HashMap<(u32, u32), f64>,

    /// Edge rows dropped because an endpoint is not in the node set
    dropped_edges: usize,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(nodes),
            products: Vec::with_capacity(nodes),
            edges: HashMap::with_capacity(edges),
            dropped_edges: 0,
        }
    }

    /// Add a product node. A repeated id overwrites the earlier attributes.
    pub fn add_product(&mut self, product: Product) -> u32 {
        if let Some(&idx) = self.id_to_index.get(&product.id) {
            self.products[idx as usize] = product;
            return idx;
        }

        let idx = self.products.len() as u32;
        self.id_to_index.insert(product.id, idx);
        self.products.push(product);
        idx
    }

    /// Add an undirected edge if both endpoints are known. A repeated pair
    /// keeps the last weight.
    pub fn add_edge(&mut self, edge: &CoPurchase) -> bool {
        let (Some(&a), Some(&b)) = (
            self.id_to_index.get(&edge.source),
            self.id_to_index.get(&edge.target),
        ) else {
            self.dropped_edges += 1;
            return false;
        };

        let key = (a.min(b), a.max(b));
        if self.edges.insert(key, edge.weight).is_some() {
            log::debug!(
                "Duplicate co-purchase {} - {}, keeping last weight",
                edge.source,
                edge.target
            );
        }
        true
    }

    /// Build the compressed graph
    pub fn build(self) -> CoPurchaseGraph {
        let node_count = self.products.len();
        let mut adjacency: Vec<Vec<(u32, f64)>> = vec![Vec::new(); node_count];

        for (&(a, b), &weight) in &self.edges {
            adjacency[a as usize].push((b, weight));
            if a != b {
                adjacency[b as usize].push((a, weight));
            }
        }

        // Create offsets array
        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        let total: usize = adjacency.iter().map(Vec::len).sum();
        let mut neighbors = Vec::with_capacity(total);
        let mut weights = Vec::with_capacity(total);

        for list in &mut adjacency {
            // Sort for binary search efficiency
            list.sort_unstable_by_key(|&(n, _)| n);
            for &(n, w) in list.iter() {
                neighbors.push(n);
                weights.push(w);
            }
            offsets.push(neighbors.len() as u32);
        }

        if self.dropped_edges > 0 {
            log::debug!(
                "Dropped {} co-purchase rows referencing filtered-out products",
                self.dropped_edges
            );
        }

        CoPurchaseGraph::from_parts(offsets, neighbors, weights, self.products)
    }
}

/// One node per table row, one edge per row whose endpoints are both present
pub fn build(nodes: &NodeTable, edges: &EdgeTable) -> CoPurchaseGraph {
    let mut builder = GraphBuilder::with_capacity(nodes.len(), edges.len());
    for product in &nodes.rows {
        builder.add_product(product.clone());
    }
    for edge in &edges.rows {
        builder.add_edge(edge);
    }
    let graph = builder.build();

    log::info!(
        "Built graph with {} nodes and {} edges",
        graph.node_count,
        graph.edge_count()
    );
    graph
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: i64, genre: &str, price: f64) -> Product {
        Product {
            id,
            genre: genre.to_string(),
            num_pages: 100 + id,
            price,
            sales_rank: id * 10,
            avg_rating: 4.0,
            num_reviews: id,
        }
    }

    pub(crate) fn product_table(ids: &[i64]) -> NodeTable {
        NodeTable::new(ids.iter().map(|&id| product(id, "A", 10.0 * id as f64)).collect())
    }

    pub(crate) fn edge_table(edges: &[(i64, i64, f64)]) -> EdgeTable {
        EdgeTable::new(
            edges
                .iter()
                .map(|&(source, target, weight)| CoPurchase {
                    source,
                    target,
                    weight,
                })
                .collect(),
        )
    }

    /// (1,2,5), (2,3,3), (1,3,1)
    pub(crate) fn triangle_edges() -> EdgeTable {
        edge_table(&[(1, 2, 5.0), (2, 3, 3.0), (1, 3, 1.0)])
    }

    #[test]
    fn test_build_drops_dangling_edges() {
        let graph = build(&product_table(&[1, 3]), &triangle_edges());
        assert_eq!(graph.node_count, 2);
        assert_eq!(graph.edge_count(), 1);
        let edges: Vec<_> = graph
            .edges()
            .map(|(a, b, w)| (graph.id(a), graph.id(b), w))
            .collect();
        assert_eq!(edges, vec![(1, 3, 1.0)]);
    }

    #[test]
    fn test_handshake_lemma() {
        let graph = build(
            &product_table(&[1, 2, 3, 4]),
            &edge_table(&[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 2.0), (4, 4, 1.0)]),
        );
        let degree_sum: usize = (0..graph.node_count).map(|n| graph.degree(n)).sum();
        assert_eq!(degree_sum, 2 * graph.edge_count());
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_duplicate_pair_keeps_last_weight() {
        let graph = build(&product_table(&[1, 2]), &edge_table(&[(1, 2, 1.0), (2, 1, 9.0)]));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_weight(0, 1), Some(9.0));
    }
}
