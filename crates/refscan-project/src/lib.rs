//! Host implementations for RefScan backed by in-memory graphs.

pub mod graph;
pub mod snapshot;

pub use graph::*;
pub use snapshot::*;
