//! Treeglass: live component-tree mirroring
//!
//! An in-process agent that walks a host's component tree after every
//! commit, assigns each node a stable id, and streams compact integer
//! operations to an external inspector that keeps a mirror of the tree.

pub mod bridge;
pub mod cli;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod logging;
pub mod mirror;
pub mod ops;
pub mod provider;
pub mod registry;
pub mod session;
pub mod ticker;
pub mod types;
pub mod walker;
