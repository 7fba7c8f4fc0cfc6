//! Layer Orchestration Module
//!
//! Duplicates a source hierarchy once per configured layer (plus one implicit
//! terminal "skinned" copy), wires the copies into a strict linear
//! deformation chain, and fans a shared lifecycle out across every layer.

pub mod extension;
pub mod manager;
pub mod operator;
pub mod recipes;

pub use extension::DeformStackExtension;
pub use manager::{CopiedHierarchy, LayerManager, LayerSetupArgs, LEAF_IN, LEAF_OUT};
pub use operator::{LayerCtor, LayerOperator, LayerState};
pub use recipes::{DeformLayer, TweakLayer};

/// Resolve a layer class by its configuration name.
pub fn layer_ctor(name: &str) -> Option<LayerCtor> {
    match name {
        "deform" => Some(DeformLayer::boxed as LayerCtor),
        "tweak" => Some(TweakLayer::boxed as LayerCtor),
        _ => None,
    }
}
