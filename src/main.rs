use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use copurchase_analyzer::correlation::Direction;
use copurchase_analyzer::data::FilterSpec;
use copurchase_analyzer::graph::ego;
use copurchase_analyzer::{storage, Config, GraphService};

#[derive(Parser, Debug)]
#[clap(
    name = "copurchase-analyzer",
    about = "Network analysis of product co-purchase data"
)]
struct Cli {
    #[clap(flatten)]
    common: CommonArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Node table (CSV or Parquet)
    #[clap(long, default_value = "data/nodes.csv")]
    nodes: PathBuf,

    /// Edge table (CSV or Parquet)
    #[clap(long, default_value = "data/edges.csv")]
    edges: PathBuf,

    /// JSON filter document, e.g. {"filters":{"genre":{"values":["Fiction"]}}}
    #[clap(long)]
    filters: Option<PathBuf>,

    /// Output directory for results
    #[clap(long, default_value = "copurchase_results")]
    output_dir: PathBuf,

    /// Nodes at which centrality passes switch to parallel execution
    #[clap(long, default_value = "1000")]
    parallel_threshold: usize,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the filtered graph and annotate every node with centrality metrics
    Graph,

    /// Enumerate maximal cliques and their aggregate statistics
    Cliques {
        /// Only keep products belonging to cliques of this size
        #[clap(long)]
        size: Option<usize>,
    },

    /// Extract ego networks around the highest-degree products
    Ego {
        /// Single rank to extract (1 = highest degree)
        #[clap(long)]
        rank: Option<usize>,

        /// Number of top ranks to extract when no rank is given
        #[clap(long)]
        count: Option<usize>,
    },

    /// Signed correlation network over numeric attributes
    Correlation {
        #[clap(long, value_enum, default_value = "positive")]
        direction: Direction,
    },

    /// Summary statistics and filter options for the dataset
    Insights,

    /// Cut vertices, bridges, assortativity and rich-club structure
    Topology,

    /// Apply a table query such as "{price} > 10 && {genre} = Fiction"
    Query {
        expression: String,
    },

    /// Shortest path between two products in the filtered graph
    Path {
        from: i64,
        to: i64,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();
    let common = &args.common;

    // Configure logging
    let log_level = if common.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if common.threads > 0 {
        common.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let config = Config {
        nodes_path: common.nodes.clone(),
        edges_path: common.edges.clone(),
        output_dir: common.output_dir.clone(),
        parallel_threshold: common.parallel_threshold,
        ..Config::default()
    };

    let spec = match &common.filters {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            FilterSpec::from_json(&json)
                .with_context(|| format!("invalid filter document {}", path.display()))?
        }
        None => FilterSpec::new(),
    };

    log::info!("Starting co-purchase analysis");
    log::info!("Nodes: {}", config.nodes_path.display());
    log::info!("Edges: {}", config.edges_path.display());
    log::info!("Output: {}", config.output_dir.display());

    std::fs::create_dir_all(&config.output_dir)?;

    let service = GraphService::from_config(&config)
        .with_context(|| format!("failed to load tables from {}", config.nodes_path.display()))?;

    log::info!(
        "Loaded {} products and {} co-purchase edges",
        service.tables().nodes.len(),
        service.tables().edges.len()
    );

    match args.command {
        Command::Graph => {
            let graph = service.annotated_graph(&spec);
            let summary = service.summarize(&graph);
            if !summary.handshake_holds {
                log::warn!("Degree sum does not match twice the edge count");
            }
            storage::save_graph(&graph, &summary, &config.output_dir)?;
        }
        Command::Cliques { size } => {
            let graph = match size {
                Some(size) => service.clique_graph(&spec, size),
                None => service.load_graph(&spec),
            };
            log::info!("Available clique sizes: {:?}", service.clique_sizes(&graph));
            let cliques = service.clique_metrics(&graph)?;
            storage::save_cliques(&cliques, &config.output_dir)?;
        }
        Command::Ego { rank, count } => {
            let graph = service.annotated_graph(&spec);
            let egos = match rank {
                Some(rank) => vec![service.ego_network(&graph, rank)?],
                None => service.top_ego_networks(&graph, count.unwrap_or(config.ego_networks))?,
            };
            for network in &egos {
                let centers = ego::members(network).iter().filter(|m| m.is_ego).count();
                log::info!(
                    "Ego network rank {} around {} has {} members ({} center)",
                    network.rank,
                    network.center,
                    network.graph.node_count,
                    centers
                );
            }
            storage::save_ego_networks(&egos, &config.output_dir)?;
        }
        Command::Correlation { direction } => {
            let network = service.correlation_network(direction)?;
            storage::save_correlation(&network, &config.output_dir)?;
        }
        Command::Insights => {
            let insights = service.insights(&spec)?;
            storage::save_insights(&insights, &service.tables().quantiles, &config.output_dir)?;
        }
        Command::Topology => {
            let graph = service.load_graph(&spec);
            let report = service.topology(&graph);
            log::info!(
                "Found {} articulation points and {} bridges",
                report.cuts.articulation_points.len(),
                report.cuts.bridges.len()
            );
            storage::save_topology(&report, &config.output_dir)?;
        }
        Command::Query { expression } => {
            let table = service.query(&expression)?;
            log::info!("Query matched {} products", table.len());
            for product in &table.rows {
                println!("{}", serde_json::to_string(product)?);
            }
        }
        Command::Path { from, to } => {
            let graph = service.load_graph(&spec);
            match service.shortest_path(&graph, from, to)? {
                Some(path) => println!("{:?}", path),
                None => log::info!("No path between {} and {}", from, to),
            }
        }
    }

    log::info!("Analysis complete. Results saved to {}", config.output_dir.display());

    Ok(())
}
