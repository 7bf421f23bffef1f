//! Weighted undirected co-purchase graph in compressed sparse row form

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::Product;

/// Per-node annotations computed by the metrics pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub closeness_centrality: f64,
    pub clustering_coefficient: f64,
    pub num_connections: usize,
}

/// Compressed sparse representation of an undirected weighted graph.
/// Every undirected edge appears in both endpoints' adjacency ranges,
/// except self-loops which appear once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoPurchaseGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] is the adjacency range of node i
    pub offsets: Vec<u32>,

    /// Concatenated sorted neighbor lists
    pub neighbors: Vec<u32>,

    /// Edge weights, parallel to `neighbors`
    pub weights: Vec<f64>,

    /// Node attributes, indexed like the adjacency ranges
    pub products: Vec<Product>,

    /// Metrics, present once the graph has been annotated
    pub metrics: Option<Vec<NodeMetrics>>,

    #[serde(skip)]
    id_to_index: HashMap<i64, u32>,
}

impl CoPurchaseGraph {
    /// Assemble a graph from pre-built CSR arrays
    pub(crate) fn from_parts(
        offsets: Vec<u32>,
        neighbors: Vec<u32>,
        weights: Vec<f64>,
        products: Vec<Product>,
    ) -> Self {
        let id_to_index = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i as u32))
            .collect();
        Self {
            node_count: products.len(),
            offsets,
            neighbors,
            weights,
            products,
            metrics: None,
            id_to_index,
        }
    }

    /// Neighbors of a node (sorted, may include the node itself for a self-loop)
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.neighbors[start..end]
    }

    /// Weights of the edges returned by [`neighbors`](Self::neighbors)
    pub fn neighbor_weights(&self, node: usize) -> &[f64] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.weights[start..end]
    }

    /// Neighbors excluding a self-loop
    pub fn proper_neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors(node)
            .iter()
            .map(|&n| n as usize)
            .filter(move |&n| n != node)
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.has_edge(node, node)
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.neighbors(a).binary_search(&(b as u32)).is_ok()
    }

    pub fn edge_weight(&self, a: usize, b: usize) -> Option<f64> {
        self.neighbors(a)
            .binary_search(&(b as u32))
            .ok()
            .map(|pos| self.neighbor_weights(a)[pos])
    }

    /// Degree counting a self-loop twice
    pub fn degree(&self, node: usize) -> usize {
        let len = self.neighbors(node).len();
        if self.has_self_loop(node) {
            len + 1
        } else {
            len
        }
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        let loops = (0..self.node_count).filter(|&n| self.has_self_loop(n)).count();
        (self.neighbors.len() - loops) / 2 + loops
    }

    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.id_to_index.get(&id).map(|&i| i as usize)
    }

    pub fn product(&self, node: usize) -> &Product {
        &self.products[node]
    }

    pub fn id(&self, node: usize) -> i64 {
        self.products[node].id
    }

    /// Each undirected edge once as `(low index, high index, weight)`
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.node_count).flat_map(move |a| {
            self.neighbors(a)
                .iter()
                .zip(self.neighbor_weights(a))
                .filter(move |(&b, _)| b as usize >= a)
                .map(move |(&b, &w)| (a, b as usize, w))
        })
    }

    /// Induced subgraph over the given node indices, keeping attributes and metrics
    pub fn induced_subgraph(&self, nodes: &[usize]) -> CoPurchaseGraph {
        let mut sorted = nodes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut orig_to_sub = vec![u32::MAX; self.node_count];
        for (i, &node) in sorted.iter().enumerate() {
            orig_to_sub[node] = i as u32;
        }

        let mut offsets = Vec::with_capacity(sorted.len() + 1);
        let mut neighbors = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);

        for &node in &sorted {
            for (&target, &weight) in self.neighbors(node).iter().zip(self.neighbor_weights(node)) {
                let mapped = orig_to_sub[target as usize];
                // Only include edges where both endpoints are in the subgraph
                if mapped != u32::MAX {
                    neighbors.push(mapped);
                    weights.push(weight);
                }
            }
            offsets.push(neighbors.len() as u32);
        }

        let products = sorted.iter().map(|&n| self.products[n].clone()).collect();
        let mut sub = CoPurchaseGraph::from_parts(offsets, neighbors, weights, products);
        sub.metrics = self
            .metrics
            .as_ref()
            .map(|m| sorted.iter().map(|&n| m[n]).collect());
        sub
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::builder::tests::{product_table, triangle_edges};
    use crate::graph::builder::build;

    #[test]
    fn test_adjacency_queries() {
        let graph = build(&product_table(&[1, 2, 3]), &triangle_edges());
        let a = graph.index_of(1).unwrap();
        let b = graph.index_of(2).unwrap();
        assert!(graph.has_edge(a, b));
        assert_eq!(graph.edge_weight(a, b), Some(5.0));
        assert_eq!(graph.degree(a), 2);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edges().count(), 3);
    }

    #[test]
    fn test_induced_subgraph() {
        let graph = build(&product_table(&[1, 2, 3]), &triangle_edges());
        let sub = graph.induced_subgraph(&[graph.index_of(1).unwrap(), graph.index_of(3).unwrap()]);
        assert_eq!(sub.node_count, 2);
        assert_eq!(sub.edge_count(), 1);
        let (a, b, w) = sub.edges().next().unwrap();
        assert_eq!((sub.id(a), sub.id(b), w), (1, 3, 1.0));
    }
}
