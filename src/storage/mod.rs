//! Results persistence module

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use petgraph::dot::{Config, Dot};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use serde_json::{json, to_string_pretty};

use crate::cluster::CliqueRecord;
use crate::correlation::FeatureGraph;
use crate::data::insights::Insights;
use crate::data::{AttributeQuantiles, Product};
use crate::graph::algorithms::GraphSummary;
use crate::graph::ego::EgoNetwork;
use crate::graph::topology::{to_petgraph, TopologyReport};
use crate::graph::{CoPurchaseGraph, GraphExport};

/// Write any serializable value as pretty JSON
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

/// Save the (annotated) graph and its summary
pub fn save_graph(
    graph: &CoPurchaseGraph,
    summary: &GraphSummary,
    output_dir: &Path,
) -> Result<()> {
    log::info!("Saving graph with {} nodes to {}", graph.node_count, output_dir.display());

    write_json(&output_dir.join("graph.json"), &GraphExport::from_graph(graph))?;
    write_json(&output_dir.join("summary.json"), summary)?;
    save_dot(graph, &output_dir.join("graph.dot"))?;

    Ok(())
}

/// Escape text for use inside a quoted DOT attribute
fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn dot_label(product: &Product) -> String {
    format!(
        "label=\"{}: {} ({})\"",
        product.id,
        dot_escape(&product.genre),
        product.price
    )
}

/// Save a Graphviz rendering input labelled with genre and price
pub fn save_dot(graph: &CoPurchaseGraph, path: &Path) -> Result<()> {
    let pg = to_petgraph(graph);
    let viz = Dot::with_attr_getters(
        &pg,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, edge| format!("weight={}", edge.weight()),
        &|_, (_, product)| dot_label(product),
    );
    fs::write(path, format!("{:?}", viz))?;
    Ok(())
}

/// Save annotated cliques, one file per size plus an overview
pub fn save_cliques(cliques: &BTreeMap<usize, Vec<CliqueRecord>>, output_dir: &Path) -> Result<()> {
    log::info!("Saving cliques of {} distinct sizes", cliques.len());

    let cliques_dir = output_dir.join("cliques");
    for (size, records) in cliques {
        write_json(&cliques_dir.join(format!("size_{}.json", size)), records)?;
    }

    let overview = json!({
        "sizes": cliques.iter().map(|(size, records)| {
            let strongest = records
                .iter()
                .map(|r| r.intracluster_strength)
                .fold(0.0f64, f64::max);
            json!({
                "size": size,
                "count": records.len(),
                "max_intracluster_strength": strongest,
            })
        }).collect::<Vec<_>>()
    });
    write_json(&output_dir.join("cliques.json"), &overview)
}

/// Save ego networks, one file per rank
pub fn save_ego_networks(egos: &[EgoNetwork], output_dir: &Path) -> Result<()> {
    log::info!("Saving {} ego networks", egos.len());

    let ego_dir = output_dir.join("ego_networks");
    for ego in egos {
        let document = json!({
            "rank": ego.rank,
            "center": ego.center,
            "graph": GraphExport::from_ego(ego),
        });
        write_json(&ego_dir.join(format!("rank_{}.json", ego.rank)), &document)?;
    }
    Ok(())
}

pub fn save_correlation(network: &FeatureGraph, output_dir: &Path) -> Result<()> {
    write_json(
        &output_dir.join(format!("correlation_{}.json", network.direction)),
        network,
    )
}

/// Save dataset insights alongside the filter options derived from the base table
pub fn save_insights(
    insights: &Insights,
    quantiles: &AttributeQuantiles,
    output_dir: &Path,
) -> Result<()> {
    let document = json!({
        "insights": insights,
        "options": {
            "genres": quantiles.unique_genres(),
            "ratings": quantiles.unique_ratings(),
            "sales_rank_buckets": quantiles.sales_rank_buckets(),
            "review_buckets": quantiles.review_buckets(),
            "num_pages_deciles": quantiles.num_pages_deciles(),
            "price_deciles": quantiles.price_deciles(),
        }
    });
    write_json(&output_dir.join("insights.json"), &document)
}

pub fn save_topology(report: &TopologyReport, output_dir: &Path) -> Result<()> {
    write_json(&output_dir.join("topology.json"), report)
}
