//! Graph-aware workspace analysis
//!
//! Built on cargo_metadata for direct control and minimal abstraction;
//! we own our domain types and queries.

pub mod workspace_graph;

pub use workspace_graph::{DepSection, InternalDep, WorkspaceCrate, WorkspaceGraph};
