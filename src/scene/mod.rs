//! Scene Graph Module
//!
//! The owning arena for all scene nodes plus the deterministic name
//! generator. Everything above this layer holds opaque `NodeId` handles;
//! the arena is the single owner of node data.

pub mod graph;
pub mod naming;

pub use graph::{AttrValue, Connection, NodeId, NodeKind, Plug, SceneGraph};
pub use naming::{GeneratedName, NameBuilder, NodeRole, Position};
