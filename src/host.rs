//! Host tree model
//!
//! The component tree is owned and mutated by the host framework. The agent
//! only ever reads it through [`HostTree`], synchronously, inside a host
//! callback.

pub mod arena;
pub mod kinds;
pub mod tree;

pub use arena::{ArenaBackend, HostArena};
pub use kinds::{ElementType, KindTable, NodeKind, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};
pub use tree::{set_value_at, value_at, HostBackend, HostTree, NodeDurations, PathSegment};
