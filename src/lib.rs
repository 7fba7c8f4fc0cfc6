//! Rigforge - Procedural Rig Construction Engine
//!
//! Rigforge turns a small set of named bind joints into a full animation
//! control hierarchy through a reproducible, staged build:
//!
//! # Architecture
//!
//! - `scene`: the owning arena scene graph plus deterministic naming;
//!   everything above it holds opaque node handles
//! - `rig`: persisted Units, the two-phase construction lifecycle
//!   (Joint phase, Rig phase), hook injection for extensions, and the host
//!   orchestrator
//! - `layers`: the layer orchestration engine that duplicates a source
//!   hierarchy per layer and chains the copies into a linear deformation
//!   pipeline
//! - `config` / `cli`: JSON build descriptions and the command-line surface
//!
//! Everything is single-threaded and synchronous; a failed build leaves
//! whatever nodes it already created in the scene, with recovery delegated
//! to the host application's undo.

pub mod cli;
pub mod config;
pub mod error;
pub mod layers;
pub mod rig;
pub mod scene;

pub use error::{Result, RigError};
