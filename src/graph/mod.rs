//! Graph representation and algorithms module

pub mod algorithms;
pub mod builder;
pub mod compressed;
pub mod ego;
pub mod export;
pub mod topology;

pub use compressed::{CoPurchaseGraph, NodeMetrics};
pub use export::GraphExport;
