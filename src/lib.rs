//! Lading is a workspace-level release orchestrator: it propagates semantic
//! version bumps across every manifest, internal dependency requirement and
//! documentation TOML fence of a Cargo workspace, and plans, stages,
//! validates and executes ordered crate publication.

pub mod cargo;
pub mod commands;
pub mod core;
pub mod graph;
pub mod process;
pub mod release;
