//! Plain node/edge lists handed to the presentation layer

use serde::Serialize;

use crate::data::Product;
use crate::graph::compressed::NodeMetrics;
use crate::graph::ego::EgoNetwork;
use crate::graph::CoPurchaseGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    #[serde(flatten)]
    pub product: Product,

    #[serde(flatten)]
    pub metrics: Option<NodeMetrics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ego: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub source: i64,
    pub target: i64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphExport {
    pub fn from_graph(graph: &CoPurchaseGraph) -> Self {
        let nodes = graph
            .products
            .iter()
            .enumerate()
            .map(|(i, product)| NodeRecord {
                product: product.clone(),
                metrics: graph.metrics.as_ref().map(|m| m[i]),
                is_ego: None,
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(a, b, weight)| EdgeRecord {
                source: graph.id(a),
                target: graph.id(b),
                weight,
            })
            .collect();

        Self { nodes, edges }
    }

    /// Same as [`from_graph`](Self::from_graph) with every node flagged
    pub fn from_ego(ego: &EgoNetwork) -> Self {
        let mut export = Self::from_graph(&ego.graph);
        for node in &mut export.nodes {
            node.is_ego = Some(ego.is_ego(node.product.id));
        }
        export
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build;
    use crate::graph::builder::tests::{product_table, triangle_edges};
    use crate::graph::ego::ego_network;

    #[test]
    fn test_export_json_shape() {
        let graph = build(&product_table(&[1, 2, 3]), &triangle_edges());
        let export = GraphExport::from_ego(&ego_network(&graph, 1).unwrap());
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["edges"].as_array().unwrap().len(), 3);
        assert!(json["nodes"][0].get("genre").is_some());
        assert!(json["nodes"][0].get("degree_centrality").is_none());
        assert!(json["nodes"][0].get("is_ego").is_some());
    }
}
