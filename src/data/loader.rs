//! Node and edge table loading

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;

use crate::data::{BaseTables, CoPurchase, EdgeTable, NodeTable, Product};
use crate::error::{AnalysisError, Result};

/// Source header to canonical field name for the node table
pub const NODE_COLUMNS: [(&str, &str); 7] = [
    ("id", "id"),
    ("Genre", "genre"),
    ("Number of Pages", "num_pages"),
    ("Price", "price"),
    ("Sales Rank", "sales_rank"),
    ("Average Rating", "avg_rating"),
    ("Number of Reviews", "num_reviews"),
];

/// Source header to canonical field name for the edge table
pub const EDGE_COLUMNS: [(&str, &str); 3] = [
    ("Source", "source"),
    ("Target", "target"),
    ("Frequency", "weight"),
];

/// Load both tables from disk and derive the quantile helpers
pub fn load(nodes_path: &Path, edges_path: &Path) -> Result<BaseTables> {
    let nodes = load_nodes(nodes_path)?;
    let edges = load_edges(edges_path)?;
    log::info!(
        "Loaded {} products and {} co-purchase rows",
        nodes.len(),
        edges.len()
    );
    Ok(BaseTables::new(nodes, edges))
}

/// Load both tables from in-memory CSV text
pub fn load_csv_bytes(nodes_csv: &[u8], edges_csv: &[u8]) -> Result<BaseTables> {
    let nodes = node_table(&read_csv(nodes_csv)?)?;
    let edges = edge_table(&read_csv(edges_csv)?)?;
    Ok(BaseTables::new(nodes, edges))
}

pub fn load_nodes(path: &Path) -> Result<NodeTable> {
    log::info!("Reading node table: {}", path.display());
    node_table(&read_frame(path)?)
}

pub fn load_edges(path: &Path) -> Result<EdgeTable> {
    log::info!("Reading edge table: {}", path.display());
    edge_table(&read_frame(path)?)
}

/// Read a CSV or Parquet file, chosen by extension
fn read_frame(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalysisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }

    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    let df = if is_parquet {
        ParquetReader::new(File::open(path)?).finish()?
    } else {
        csv_options()
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?
    };

    log::debug!("File schema: {:?}", df.schema());
    Ok(df)
}

/// Every CSV column is read as text. Typing happens in the column helpers,
/// so a malformed cell anywhere in the file surfaces as a `DataFormat` error.
fn csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
}

fn read_csv(bytes: &[u8]) -> Result<DataFrame> {
    let df = csv_options()
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

/// Resolve the header actually present for a canonical field. Either the
/// source header or the canonical name is accepted.
fn resolve_header<'a>(
    df: &DataFrame,
    table: &'static str,
    (source, canonical): (&'a str, &'a str),
) -> Result<&'a str> {
    if df.get_column_index(source).is_some() {
        Ok(source)
    } else if df.get_column_index(canonical).is_some() {
        Ok(canonical)
    } else {
        Err(AnalysisError::DataFormat {
            table,
            column: source.to_string(),
            reason: "required column is missing".to_string(),
        })
    }
}

fn cell_error(table: &'static str, column: &str, reason: impl ToString) -> AnalysisError {
    AnalysisError::DataFormat {
        table,
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

fn int_column(df: &DataFrame, table: &'static str, column: &str) -> Result<Vec<i64>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .strict_cast(&DataType::Int64)
        .map_err(|e| cell_error(table, column, e))?;

    series
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| cell_error(table, column, format!("empty cell at row {}", row)))
        })
        .collect()
}

fn float_column(df: &DataFrame, table: &'static str, column: &str) -> Result<Vec<f64>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|e| cell_error(table, column, e))?;

    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| cell_error(table, column, format!("empty cell at row {}", row)))
        })
        .collect()
}

fn text_column(df: &DataFrame, table: &'static str, column: &str) -> Result<Vec<String>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;

    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| cell_error(table, column, format!("empty cell at row {}", row)))
        })
        .collect()
}

fn node_table(df: &DataFrame) -> Result<NodeTable> {
    const TABLE: &str = "node";
    let [id, genre, pages, price, rank, rating, reviews] =
        NODE_COLUMNS.map(|pair| resolve_header(df, TABLE, pair));

    let ids = int_column(df, TABLE, id?)?;
    let genres = text_column(df, TABLE, genre?)?;
    let num_pages = int_column(df, TABLE, pages?)?;
    let prices = float_column(df, TABLE, price?)?;
    let sales_ranks = int_column(df, TABLE, rank?)?;
    let ratings = float_column(df, TABLE, rating?)?;
    let num_reviews = int_column(df, TABLE, reviews?)?;

    let rows = ids
        .into_iter()
        .zip(genres)
        .zip(num_pages)
        .zip(prices)
        .zip(sales_ranks)
        .zip(ratings)
        .zip(num_reviews)
        .map(
            |((((((id, genre), num_pages), price), sales_rank), avg_rating), num_reviews)| Product {
                id,
                genre,
                num_pages,
                price,
                sales_rank,
                avg_rating,
                num_reviews,
            },
        )
        .collect();

    Ok(NodeTable::new(rows))
}

fn edge_table(df: &DataFrame) -> Result<EdgeTable> {
    const TABLE: &str = "edge";
    let [source, target, weight] = EDGE_COLUMNS.map(|pair| resolve_header(df, TABLE, pair));

    let sources = int_column(df, TABLE, source?)?;
    let targets = int_column(df, TABLE, target?)?;
    let weights = float_column(df, TABLE, weight?)?;

    let rows = sources
        .into_iter()
        .zip(targets)
        .zip(weights)
        .map(|((source, target), weight)| CoPurchase {
            source,
            target,
            weight,
        })
        .collect();

    Ok(EdgeTable::new(rows))
}
