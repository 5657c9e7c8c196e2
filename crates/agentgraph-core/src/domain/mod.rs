//! Domain layer
//!
//! Contains the graph schema and the repository contract.

pub mod graph;
