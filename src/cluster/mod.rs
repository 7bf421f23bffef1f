//! Maximal clique analysis module

pub mod detection;
pub mod metrics;

use serde::{Deserialize, Serialize};

/// A maximal clique annotated with member averages and cohesion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliqueRecord {
    /// Number of members
    pub size: usize,

    /// Member product ids, ascending
    pub nodes: Vec<i64>,

    /// Mean price of the members
    pub avg_price: f64,

    /// Mean average rating of the members
    pub avg_rating: f64,

    /// Mean review count of the members
    pub avg_review: f64,

    /// Total pairwise co-purchase weight divided by member count
    pub intracluster_strength: f64,
}
