//! Product and co-purchase tables

pub mod filter;
pub mod insights;
pub mod loader;
pub mod quantiles;
pub mod query;

use serde::{Deserialize, Serialize};

pub use filter::{Attribute, AttributeFilter, FilterSpec, FilterValue};
pub use quantiles::AttributeQuantiles;

/// One product (book) row of the node table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub genre: String,
    pub num_pages: i64,
    pub price: f64,
    pub sales_rank: i64,
    pub avg_rating: f64,
    pub num_reviews: i64,
}

/// One co-purchase row of the edge table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoPurchase {
    pub source: i64,
    pub target: i64,
    pub weight: f64,
}

/// Typed node table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTable {
    pub rows: Vec<Product>,
}

impl NodeTable {
    pub fn new(rows: Vec<Product>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ids of the retained rows, in table order
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.iter().map(|p| p.id)
    }

    /// Values of a numeric attribute as `f64`
    pub fn numeric_column(&self, attribute: Attribute) -> Option<Vec<f64>> {
        if !attribute.is_numeric() {
            return None;
        }
        Some(
            self.rows
                .iter()
                .filter_map(|p| attribute.numeric_value(p))
                .collect(),
        )
    }
}

/// Typed edge table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeTable {
    pub rows: Vec<CoPurchase>,
}

impl EdgeTable {
    pub fn new(rows: Vec<CoPurchase>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The immutable tables loaded at startup, plus the quantile helpers derived
/// from the unfiltered node table
#[derive(Debug, Clone)]
pub struct BaseTables {
    pub nodes: NodeTable,
    pub edges: EdgeTable,
    pub quantiles: AttributeQuantiles,
}

impl BaseTables {
    pub fn new(nodes: NodeTable, edges: EdgeTable) -> Self {
        let quantiles = AttributeQuantiles::from_table(&nodes);
        Self {
            nodes,
            edges,
            quantiles,
        }
    }
}
