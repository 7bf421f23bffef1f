//! Structural analysis: cut vertices, bridges, biconnected components,
//! degree mixing and shortest paths

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::data::Product;
use crate::error::{AnalysisError, Result};
use crate::graph::CoPurchaseGraph;

/// Copy into a petgraph graph; node `i` keeps index `i`
pub fn to_petgraph(graph: &CoPurchaseGraph) -> UnGraph<Product, f64> {
    let mut pg = UnGraph::with_capacity(graph.node_count, graph.edge_count());
    for product in &graph.products {
        pg.add_node(product.clone());
    }
    for (a, b, w) in graph.edges() {
        pg.add_edge(NodeIndex::new(a), NodeIndex::new(b), w);
    }
    pg
}

/// Unweighted shortest path between two products, as product ids.
/// `Ok(None)` when they are in different components.
pub fn shortest_path(graph: &CoPurchaseGraph, from: i64, to: i64) -> Result<Option<Vec<i64>>> {
    let start = graph.index_of(from).ok_or(AnalysisError::UnknownNode(from))?;
    let goal = graph.index_of(to).ok_or(AnalysisError::UnknownNode(to))?;

    let pg = to_petgraph(graph);
    let path = astar(
        &pg,
        NodeIndex::new(start),
        |n| n.index() == goal,
        |_| 1usize,
        |_| 0usize,
    );

    Ok(path.map(|(_, nodes)| nodes.into_iter().map(|n| graph.id(n.index())).collect()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiconnectedComponent {
    pub nodes: Vec<i64>,
    pub edges: Vec<(i64, i64)>,
}

/// Result of one depth-first lowpoint pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CutStructure {
    pub articulation_points: Vec<i64>,
    pub bridges: Vec<(i64, i64)>,
    pub biconnected_components: Vec<BiconnectedComponent>,
}

/// Hopcroft–Tarjan lowpoint search, iterative to avoid deep recursion
pub fn cut_structure(graph: &CoPurchaseGraph) -> CutStructure {
    let n = graph.node_count;
    let mut discovery = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut time = 0usize;

    let mut articulation: BTreeSet<usize> = BTreeSet::new();
    let mut bridges: Vec<(usize, usize)> = Vec::new();
    let mut components: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut edge_stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if discovery[root] != usize::MAX {
            continue;
        }
        discovery[root] = time;
        low[root] = time;
        time += 1;

        let mut root_children = 0usize;
        // (node, parent, next neighbor offset)
        let mut frames: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];

        loop {
            let Some(frame) = frames.last_mut() else {
                break;
            };
            let (v, parent) = (frame.0, frame.1);
            let next = graph.neighbors(v).get(frame.2).map(|&w| w as usize);
            frame.2 += 1;

            match next {
                Some(w) if w == v || Some(w) == parent => {}
                Some(w) if discovery[w] == usize::MAX => {
                    edge_stack.push((v, w));
                    discovery[w] = time;
                    low[w] = time;
                    time += 1;
                    if v == root {
                        root_children += 1;
                    }
                    frames.push((w, Some(v), 0));
                }
                Some(w) => {
                    if discovery[w] < discovery[v] {
                        low[v] = low[v].min(discovery[w]);
                        edge_stack.push((v, w));
                    }
                }
                None => {
                    frames.pop();
                    let Some(p) = parent else {
                        continue;
                    };
                    low[p] = low[p].min(low[v]);
                    if low[v] > discovery[p] {
                        bridges.push((p, v));
                    }
                    if low[v] >= discovery[p] {
                        if p != root {
                            articulation.insert(p);
                        }
                        let mut component = Vec::new();
                        while let Some(edge) = edge_stack.pop() {
                            component.push(edge);
                            if edge == (p, v) {
                                break;
                            }
                        }
                        components.push(component);
                    }
                }
            }
        }

        if root_children > 1 {
            articulation.insert(root);
        }
    }

    let ordered = |a: usize, b: usize| {
        let (x, y) = (graph.id(a), graph.id(b));
        (x.min(y), x.max(y))
    };

    let mut bridges: Vec<(i64, i64)> = bridges.into_iter().map(|(a, b)| ordered(a, b)).collect();
    bridges.sort_unstable();

    let mut biconnected_components: Vec<BiconnectedComponent> = components
        .into_iter()
        .map(|edges| {
            let nodes: BTreeSet<i64> = edges
                .iter()
                .flat_map(|&(a, b)| [graph.id(a), graph.id(b)])
                .collect();
            let mut edges: Vec<(i64, i64)> =
                edges.into_iter().map(|(a, b)| ordered(a, b)).collect();
            edges.sort_unstable();
            BiconnectedComponent {
                nodes: nodes.into_iter().collect(),
                edges,
            }
        })
        .collect();
    biconnected_components.sort_by(|a, b| a.nodes.cmp(&b.nodes));

    let mut articulation_points: Vec<i64> = articulation.into_iter().map(|n| graph.id(n)).collect();
    articulation_points.sort_unstable();

    CutStructure {
        articulation_points,
        bridges,
        biconnected_components,
    }
}

/// Pearson correlation of the degrees at either end of every edge.
/// `None` when undefined (fewer than two edges or no degree variance).
pub fn degree_assortativity(graph: &CoPurchaseGraph) -> Option<f64> {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (a, b, _) in graph.edges().filter(|&(a, b, _)| a != b) {
        let (da, db) = (graph.degree(a) as f64, graph.degree(b) as f64);
        xs.extend([da, db]);
        ys.extend([db, da]);
    }
    if xs.len() < 2 {
        return None;
    }

    let r = xs.iter().covariance(ys.iter()) / (xs.iter().std_dev() * ys.iter().std_dev());
    r.is_finite().then_some(r)
}

/// Mean neighbor degree, grouped by node degree
pub fn average_degree_connectivity(graph: &CoPurchaseGraph) -> BTreeMap<usize, f64> {
    let mut sums: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
    for v in 0..graph.node_count {
        let k = graph.proper_neighbors(v).count();
        let neighbor_degrees: usize = graph.proper_neighbors(v).map(|w| graph.degree(w)).sum();
        let entry = sums.entry(k).or_insert((0.0, 0.0));
        entry.0 += neighbor_degrees as f64;
        entry.1 += k as f64;
    }
    sums.into_iter()
        .map(|(k, (total, norm))| (k, if norm > 0.0 { total / norm } else { 0.0 }))
        .collect()
}

/// Unnormalized rich-club coefficient: for each k, the edge density among
/// nodes of degree greater than k. Stops once fewer than two such nodes remain.
pub fn rich_club_coefficient(graph: &CoPurchaseGraph) -> BTreeMap<usize, f64> {
    let degrees: Vec<usize> = (0..graph.node_count)
        .map(|v| graph.proper_neighbors(v).count())
        .collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0);

    let mut coefficients = BTreeMap::new();
    for k in 0..max_degree {
        let rich = degrees.iter().filter(|&&d| d > k).count();
        if rich <= 1 {
            break;
        }
        let links = graph
            .edges()
            .filter(|&(a, b, _)| a != b && degrees[a] > k && degrees[b] > k)
            .count();
        coefficients.insert(k, 2.0 * links as f64 / (rich * (rich - 1)) as f64);
    }
    coefficients
}

/// Structural report bundled for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologyReport {
    #[serde(flatten)]
    pub cuts: CutStructure,
    pub degree_assortativity: Option<f64>,
    pub average_degree_connectivity: BTreeMap<usize, f64>,
    pub rich_club_coefficient: BTreeMap<usize, f64>,
}

pub fn topology_report(graph: &CoPurchaseGraph) -> TopologyReport {
    TopologyReport {
        cuts: cut_structure(graph),
        degree_assortativity: degree_assortativity(graph),
        average_degree_connectivity: average_degree_connectivity(graph),
        rich_club_coefficient: rich_club_coefficient(graph),
    }
}
