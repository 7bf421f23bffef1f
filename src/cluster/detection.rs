//! Maximal clique enumeration and connected components

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::graph::CoPurchaseGraph;

/// Union-Find over node indices for connected component analysis
pub struct DisjointSets {
    /// Parent pointers (parent[i] = parent of node i)
    parent: Vec<usize>,

    /// Size of the set rooted at each node
    size: Vec<usize>,
}

impl DisjointSets {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            size: vec![1; size],
        }
    }

    /// Find the root of the set containing x, halving the path on the way
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Union the sets containing x and y by size
    pub fn union(&mut self, x: usize, y: usize) {
        let (mut root_x, mut root_y) = (self.find(x), self.find(y));
        if root_x == root_y {
            return;
        }
        if self.size[root_x] < self.size[root_y] {
            std::mem::swap(&mut root_x, &mut root_y);
        }
        self.parent[root_y] = root_x;
        self.size[root_x] += self.size[root_y];
    }

    /// Get the size of the set containing x
    pub fn set_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}

/// Connected components as ascending node index lists, largest first
pub fn connected_components(graph: &CoPurchaseGraph) -> Vec<Vec<usize>> {
    let mut sets = DisjointSets::new(graph.node_count);
    for (a, b, _) in graph.edges() {
        sets.union(a, b);
    }

    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for node in 0..graph.node_count {
        by_root.entry(sets.find(node)).or_default().push(node);
    }

    let mut components: Vec<Vec<usize>> = by_root.into_values().collect();
    components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
    components
}

/// Node indices in degeneracy order: repeatedly remove a node of minimum
/// remaining degree. Self-loops do not count towards degree.
fn degeneracy_order(graph: &CoPurchaseGraph) -> Vec<usize> {
    let n = graph.node_count;
    let mut degree: Vec<usize> = (0..n).map(|v| graph.proper_neighbors(v).count()).collect();
    let max_degree = degree.iter().copied().max().unwrap_or(0);

    // Buckets hold stale entries; an entry is live only while it matches `degree`
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); max_degree + 1];
    for (v, &d) in degree.iter().enumerate() {
        buckets[d].push(v);
    }

    let mut removed = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut d = 0;
    while order.len() < n {
        match buckets[d].pop() {
            Some(v) if !removed[v] && degree[v] == d => {
                removed[v] = true;
                order.push(v);
                for w in graph.proper_neighbors(v) {
                    if !removed[w] {
                        degree[w] -= 1;
                        buckets[degree[w]].push(w);
                    }
                }
                d = d.saturating_sub(1);
            }
            Some(_) => {}
            None => d += 1,
        }
    }
    order
}

/// Bron–Kerbosch with Tomita pivoting. `r` is the growing clique, `p` the
/// candidates and `x` the already-explored nodes. Set intersections walk
/// adjacency lists, so each step costs the degrees involved rather than |P|.
fn expand(
    graph: &CoPurchaseGraph,
    r: &mut Vec<usize>,
    mut p: HashSet<usize>,
    mut x: HashSet<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if p.is_empty() {
        if x.is_empty() {
            out.push(r.clone());
        }
        return;
    }

    let pivot = p
        .iter()
        .chain(x.iter())
        .copied()
        .max_by_key(|&u| graph.proper_neighbors(u).filter(|w| p.contains(w)).count());

    let candidates: Vec<usize> = match pivot {
        Some(u) => {
            let covered: HashSet<usize> = graph.proper_neighbors(u).collect();
            p.iter().copied().filter(|v| !covered.contains(v)).collect()
        }
        None => p.iter().copied().collect(),
    };

    for v in candidates {
        let next_p = graph.proper_neighbors(v).filter(|w| p.contains(w)).collect();
        let next_x = graph.proper_neighbors(v).filter(|w| x.contains(w)).collect();
        r.push(v);
        expand(graph, r, next_p, next_x, out);
        r.pop();
        p.remove(&v);
        x.insert(v);
    }
}

/// All maximal cliques as ascending product id lists, sorted. Isolated
/// products form cliques of size one; self-loops are ignored.
///
/// The outer level follows a degeneracy ordering (Eppstein, Löffler and
/// Strash), so sparse graphs are enumerated in time near-linear in their size.
pub fn maximal_cliques(graph: &CoPurchaseGraph) -> Vec<Vec<i64>> {
    let order = degeneracy_order(graph);
    let mut position = vec![0; graph.node_count];
    for (i, &v) in order.iter().enumerate() {
        position[v] = i;
    }

    let mut found = Vec::new();
    for (i, &v) in order.iter().enumerate() {
        let (later, earlier): (HashSet<usize>, HashSet<usize>) =
            graph.proper_neighbors(v).partition(|&w| position[w] > i);
        expand(graph, &mut vec![v], later, earlier, &mut found);
    }

    let mut cliques: Vec<Vec<i64>> = found
        .into_iter()
        .map(|clique| {
            let mut ids: Vec<i64> = clique.into_iter().map(|n| graph.id(n)).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    cliques.sort();

    log::info!("Found {} maximal cliques", cliques.len());
    cliques
}

/// Maximal cliques grouped by size
pub fn cliques_by_size(graph: &CoPurchaseGraph) -> BTreeMap<usize, Vec<Vec<i64>>> {
    let mut grouped: BTreeMap<usize, Vec<Vec<i64>>> = BTreeMap::new();
    for clique in maximal_cliques(graph) {
        grouped.entry(clique.len()).or_default().push(clique);
    }
    grouped
}

/// Clique sizes present in the graph, ascending
pub fn clique_size_options(graph: &CoPurchaseGraph) -> Vec<usize> {
    cliques_by_size(graph).into_keys().collect()
}

/// Union of members over all maximal cliques of the given size
pub fn clique_members(graph: &CoPurchaseGraph, size: usize) -> BTreeSet<i64> {
    cliques_by_size(graph)
        .remove(&size)
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::build;
    use crate::graph::builder::tests::{edge_table, product_table, triangle_edges};

    fn is_strict_subset(a: &[i64], b: &[i64]) -> bool {
        a.len() < b.len() && a.iter().all(|x| b.contains(x))
    }

    #[test]
    fn test_triangle_has_one_maximal_clique() {
        let graph = build(&product_table(&[1, 2, 3]), &triangle_edges());
        let grouped = cliques_by_size(&graph);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[&3], vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_cliques_are_maximal() {
        // Two triangles sharing edge 2-3, a pendant 5 and an isolated 6
        let graph = build(
            &product_table(&[1, 2, 3, 4, 5, 6]),
            &edge_table(&[
                (1, 2, 1.0),
                (1, 3, 1.0),
                (2, 3, 1.0),
                (2, 4, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (5, 5, 1.0),
            ]),
        );
        let cliques = maximal_cliques(&graph);
        assert_eq!(cliques, vec![vec![1, 2, 3], vec![2, 3, 4], vec![4, 5], vec![6]]);
        for a in &cliques {
            for b in &cliques {
                assert!(!is_strict_subset(a, b));
            }
        }
        assert_eq!(clique_size_options(&graph), vec![1, 2, 3]);
        assert_eq!(
            clique_members(&graph, 3).into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_long_path_yields_one_clique_per_edge() {
        let ids: Vec<i64> = (1..=5000).collect();
        let edges: Vec<(i64, i64, f64)> = ids.windows(2).map(|w| (w[0], w[1], 1.0)).collect();
        let graph = build(&product_table(&ids), &edge_table(&edges));

        let cliques = maximal_cliques(&graph);
        assert_eq!(cliques.len(), 4999);
        assert!(cliques.iter().all(|c| c.len() == 2 && c[1] == c[0] + 1));
    }

    #[test]
    fn test_overlapping_cliques_in_dense_block() {
        // K4 on 1..=4 minus edge 1-4, plus a star around 5
        let graph = build(
            &product_table(&[1, 2, 3, 4, 5, 6, 7]),
            &edge_table(&[
                (1, 2, 1.0),
                (1, 3, 1.0),
                (2, 3, 1.0),
                (2, 4, 1.0),
                (3, 4, 1.0),
                (5, 6, 1.0),
                (5, 7, 1.0),
            ]),
        );
        assert_eq!(
            maximal_cliques(&graph),
            vec![vec![1, 2, 3], vec![2, 3, 4], vec![5, 6], vec![5, 7]]
        );
    }

    #[test]
    fn test_degeneracy_order_covers_every_node() {
        let graph = build(&product_table(&[1, 2, 3, 4, 5]), &triangle_edges());
        let mut order = degeneracy_order(&graph);
        // Isolated products come out first
        assert!(order[..2].iter().all(|&v| graph.id(v) > 3));
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_connected_components() {
        let graph = build(&product_table(&[1, 2, 3, 4]), &edge_table(&[(1, 2, 1.0), (3, 3, 1.0)]));
        let components = connected_components(&graph);
        assert_eq!(components, vec![vec![0, 1], vec![2], vec![3]]);

        let mut sets = DisjointSets::new(3);
        sets.union(0, 2);
        assert_eq!(sets.set_size(2), 2);
        assert_eq!(sets.set_size(1), 1);
    }
}
