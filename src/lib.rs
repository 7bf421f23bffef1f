//! Core library functions for the co-purchase network analyzer

pub mod cluster;
pub mod config;
pub mod correlation;
pub mod data;
pub mod error;
pub mod graph;
pub mod service;
pub mod storage;

pub use config::Config;
pub use correlation::Direction;
pub use data::{BaseTables, FilterSpec};
pub use error::{AnalysisError, Result};
pub use graph::CoPurchaseGraph;
pub use service::GraphService;
