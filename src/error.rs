//! Error taxonomy for the co-purchase analytics core

use thiserror::Error;

/// Errors raised by loading, filtering and analysing the co-purchase graph
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A source table is missing a required column or holds an unparsable cell
    #[error("data format error in {table} table, column `{column}`: {reason}")]
    DataFormat {
        table: &'static str,
        column: String,
        reason: String,
    },

    /// A `"low - high"` range string could not be parsed
    #[error("malformed range `{range}` for attribute `{attribute}`")]
    FilterRange { attribute: String, range: String },

    /// A filter specification is structurally wrong for its attribute
    #[error("invalid filter for `{attribute}`: {reason}")]
    InvalidFilter { attribute: String, reason: String },

    /// Ego network requested beyond the number of available nodes
    #[error("ego network rank {rank} is out of range for a graph with {node_count} nodes")]
    RankOutOfRange { rank: usize, node_count: usize },

    /// A clique member pair has no edge in the graph
    #[error("clique members {first} and {second} are not connected")]
    MissingEdge { first: i64, second: i64 },

    /// Not enough rows to compute the requested statistic
    #[error("insufficient data for {operation}: {rows} rows available")]
    InsufficientData { operation: &'static str, rows: usize },

    /// A product id that is not present in the graph
    #[error("product {0} is not in the graph")]
    UnknownNode(i64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
