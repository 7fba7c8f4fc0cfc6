//! Rig Construction Module
//!
//! The staged construction lifecycle and its extension surface:
//! - Persisted Units bridging the Joint and Rig phases
//! - The two-phase lifecycle state machine and proxy helpers
//! - Hook injection for independent extensions
//! - The per-run build context threaded through every stage

pub mod context;
pub mod hooks;
pub mod lifecycle;
pub mod orchestrator;
pub mod recipes;
pub mod unit;

pub use context::BuildContext;
pub use hooks::{Extension, ExtensionRegistry, PanelSpec};
pub use lifecycle::{
    create_proxy, create_proxy_chain, JointRecipe, JointStage, RigBuilder, RigRecipe, RigStage,
    Stage,
};
pub use orchestrator::Rig;
pub use recipes::ChainRecipe;
pub use unit::Unit;
