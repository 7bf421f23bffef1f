//! Configuration management for the co-purchase analyzer

use std::path::PathBuf;

/// Default configuration for the co-purchase analyzer
#[derive(Debug, Clone)]
pub struct Config {
    /// Node table (CSV or Parquet)
    pub nodes_path: PathBuf,

    /// Edge table (CSV or Parquet)
    pub edges_path: PathBuf,

    /// Output directory for JSON results
    pub output_dir: PathBuf,

    /// Number of top ego networks to emit
    pub ego_networks: usize,

    /// Graphs with at least this many nodes run centrality passes in parallel
    pub parallel_threshold: usize,

    /// Cache annotated graphs by filter specification
    pub cache_graphs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes_path: PathBuf::from("data/nodes.csv"),
            edges_path: PathBuf::from("data/edges.csv"),
            output_dir: PathBuf::from("copurchase_results"),
            ego_networks: 3,
            parallel_threshold: 1000,
            cache_graphs: true,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(
        nodes_path: impl Into<PathBuf>,
        edges_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        ego_networks: usize,
        parallel_threshold: usize,
        cache_graphs: bool,
    ) -> Self {
        Self {
            nodes_path: nodes_path.into(),
            edges_path: edges_path.into(),
            output_dir: output_dir.into(),
            ego_networks,
            parallel_threshold,
            cache_graphs,
        }
    }
}
