//! Request-level API over the immutable base tables

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::cluster::detection::{clique_members, clique_size_options};
use crate::cluster::{detection, metrics as clique_stats, CliqueRecord};
use crate::config::Config;
use crate::correlation::{self, Direction, FeatureGraph};
use crate::data::insights::{self, Insights};
use crate::data::query::TableQuery;
use crate::data::{filter, loader, BaseTables, FilterSpec, NodeTable};
use crate::error::Result;
use crate::graph::algorithms::{self, GraphSummary};
use crate::graph::ego::{self, EgoNetwork};
use crate::graph::topology::{self, TopologyReport};
use crate::graph::{builder, CoPurchaseGraph};

/// Owns the base tables loaded at startup. Every graph is rebuilt from them
/// per request; the only shared mutable state is the optional cache of
/// annotated graphs keyed by filter specification.
pub struct GraphService {
    tables: BaseTables,
    parallel_threshold: usize,
    cache: Option<DashMap<String, Arc<CoPurchaseGraph>>>,
}

impl GraphService {
    pub fn new(tables: BaseTables, parallel_threshold: usize, cache_graphs: bool) -> Self {
        Self {
            tables,
            parallel_threshold,
            cache: cache_graphs.then(DashMap::new),
        }
    }

    /// Load the base tables named by the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let tables = loader::load(&config.nodes_path, &config.edges_path)?;
        Ok(Self::new(tables, config.parallel_threshold, config.cache_graphs))
    }

    pub fn tables(&self) -> &BaseTables {
        &self.tables
    }

    /// Node table reduced by the filter specification
    pub fn filter_nodes(&self, spec: &FilterSpec) -> NodeTable {
        filter::apply(&self.tables.nodes, spec, &self.tables.quantiles)
    }

    /// Unannotated graph over the filtered products
    pub fn load_graph(&self, spec: &FilterSpec) -> CoPurchaseGraph {
        let nodes = if spec.is_empty() {
            self.tables.nodes.clone()
        } else {
            self.filter_nodes(spec)
        };
        builder::build(&nodes, &self.tables.edges)
    }

    /// Attach centrality, clustering and degree annotations
    pub fn compute_metrics(&self, mut graph: CoPurchaseGraph) -> CoPurchaseGraph {
        algorithms::annotate(&mut graph, self.parallel_threshold);
        graph
    }

    /// Filtered and annotated graph, served from the cache when enabled
    pub fn annotated_graph(&self, spec: &FilterSpec) -> Arc<CoPurchaseGraph> {
        let Some(cache) = &self.cache else {
            return Arc::new(self.compute_metrics(self.load_graph(spec)));
        };

        let key = spec.cache_key();
        if let Some(hit) = cache.get(&key) {
            log::debug!("Graph cache hit for {}", key);
            return Arc::clone(hit.value());
        }

        let graph = Arc::new(self.compute_metrics(self.load_graph(spec)));
        cache.insert(key, Arc::clone(&graph));
        graph
    }

    pub fn summarize(&self, graph: &CoPurchaseGraph) -> GraphSummary {
        algorithms::summarize(graph)
    }

    pub fn cliques_by_size(&self, graph: &CoPurchaseGraph) -> BTreeMap<usize, Vec<Vec<i64>>> {
        detection::cliques_by_size(graph)
    }

    pub fn clique_metrics(
        &self,
        graph: &CoPurchaseGraph,
    ) -> Result<BTreeMap<usize, Vec<CliqueRecord>>> {
        clique_stats::clique_metrics(graph)
    }

    pub fn clique_sizes(&self, graph: &CoPurchaseGraph) -> Vec<usize> {
        clique_size_options(graph)
    }

    /// Rebuild the filtered graph restricted to members of maximal cliques of `size`
    pub fn clique_graph(&self, spec: &FilterSpec, size: usize) -> CoPurchaseGraph {
        let members: BTreeSet<i64> = clique_members(&self.load_graph(spec), size);
        let narrowed = spec.clone().with_node_ids(members);
        self.load_graph(&narrowed)
    }

    pub fn ego_network(&self, graph: &CoPurchaseGraph, rank: usize) -> Result<EgoNetwork> {
        ego::ego_network(graph, rank)
    }

    pub fn top_ego_networks(
        &self,
        graph: &CoPurchaseGraph,
        count: usize,
    ) -> Result<Vec<EgoNetwork>> {
        ego::top_ego_networks(graph, count)
    }

    /// Correlation network over the full base node table
    pub fn correlation_network(&self, direction: Direction) -> Result<FeatureGraph> {
        correlation::correlation_network(&self.tables.nodes, direction)
    }

    pub fn insights(&self, spec: &FilterSpec) -> Result<Insights> {
        insights::insights(&self.filter_nodes(spec))
    }

    pub fn query(&self, expression: &str) -> Result<NodeTable> {
        Ok(TableQuery::parse(expression)?.apply(&self.tables.nodes))
    }

    pub fn topology(&self, graph: &CoPurchaseGraph) -> TopologyReport {
        topology::topology_report(graph)
    }

    pub fn shortest_path(
        &self,
        graph: &CoPurchaseGraph,
        from: i64,
        to: i64,
    ) -> Result<Option<Vec<i64>>> {
        topology::shortest_path(graph, from, to)
    }
}
