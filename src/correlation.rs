//! Feature correlation network over numeric product attributes

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::filter::Attribute;
use crate::data::NodeTable;
use crate::error::{AnalysisError, Result};

/// Which signed sub-network to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Drop edges with weight below zero
    Positive,
    /// Drop edges with weight zero or above
    Negative,
}

impl Direction {
    pub fn keeps(self, weight: f64) -> bool {
        match self {
            Direction::Positive => weight >= 0.0,
            Direction::Negative => weight < 0.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Positive => f.write_str("positive"),
            Direction::Negative => f.write_str("negative"),
        }
    }
}

impl FromStr for Direction {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "positive" => Ok(Direction::Positive),
            "negative" => Ok(Direction::Negative),
            _ => Err(AnalysisError::InvalidFilter {
                attribute: "direction".to_string(),
                reason: format!("expected positive or negative, got `{}`", s),
            }),
        }
    }
}

/// Symmetric feature-by-feature correlation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub features: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn new(features: Vec<String>, values: Array2<f64>) -> Self {
        Self { features, values }
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[[a, b]]
    }
}

/// 1-based ranks with ties sharing their average rank
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Pearson correlation; NaN when either side has no variance
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    x.iter().covariance(y.iter()) / (x.iter().std_dev() * y.iter().std_dev())
}

/// Spearman rank correlation across the numeric attributes (id excluded)
pub fn spearman_matrix(table: &NodeTable) -> Result<CorrelationMatrix> {
    if table.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            operation: "correlation network",
            rows: table.len(),
        });
    }

    let ranked: Vec<Vec<f64>> = Attribute::NUMERIC
        .iter()
        .map(|&attribute| average_ranks(&table.numeric_column(attribute).unwrap_or_default()))
        .collect();

    let k = ranked.len();
    let values = Array2::from_shape_fn((k, k), |(a, b)| {
        if a == b {
            1.0
        } else {
            pearson(&ranked[a], &ranked[b])
        }
    });

    Ok(CorrelationMatrix::new(
        Attribute::NUMERIC.iter().map(|a| a.name().to_string()).collect(),
        values,
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Graph whose nodes are feature names and whose edges are correlations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureGraph {
    pub direction: Direction,
    pub nodes: Vec<String>,
    pub edges: Vec<FeatureEdge>,
}

/// Complete graph over the features with correlation weights, reduced to one
/// sign. Self-correlations never become edges; undefined correlations are dropped.
pub fn signed_network(matrix: &CorrelationMatrix, direction: Direction) -> FeatureGraph {
    let k = matrix.features.len();
    let mut edges = Vec::new();
    for a in 0..k {
        for b in a + 1..k {
            let weight = matrix.get(a, b);
            if weight.is_nan() {
                log::debug!(
                    "Correlation of {} and {} is undefined, skipping",
                    matrix.features[a],
                    matrix.features[b]
                );
                continue;
            }
            if direction.keeps(weight) {
                edges.push(FeatureEdge {
                    source: matrix.features[a].clone(),
                    target: matrix.features[b].clone(),
                    weight,
                });
            }
        }
    }

    FeatureGraph {
        direction,
        nodes: matrix.features.clone(),
        edges,
    }
}

pub fn correlation_network(table: &NodeTable, direction: Direction) -> Result<FeatureGraph> {
    let matrix = spearman_matrix(table)?;
    let graph = signed_network(&matrix, direction);
    log::info!(
        "Correlation network ({}) has {} edges over {} features",
        direction,
        graph.edges.len(),
        graph.nodes.len()
    );
    Ok(graph)
}
