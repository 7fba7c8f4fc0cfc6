//! Build context
//!
//! One `BuildContext` is threaded as `&mut` through every lifecycle stage and
//! every extension hook of a single construction run. It replaces ad hoc
//! side-channel state on the orchestrator: anything one stage produces for a
//! later stage (or for another extension) goes through here, either in a
//! typed slot or in the string-keyed export table.

use std::collections::BTreeMap;

use crate::scene::{AttrValue, NodeId};

/// Per-run shared state, never persisted.
#[derive(Debug, Default)]
pub struct BuildContext {
    /// Source geometry group the deformation layer stack duplicates from.
    pub deform_source: Option<NodeId>,
    /// Animation set controls get added to during the Rig phase.
    pub anim_set: Option<NodeId>,
    /// Free-form extension-to-extension values.
    exports: BTreeMap<String, AttrValue>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value for later stages or other extensions.
    pub fn set_export(&mut self, key: &str, value: AttrValue) {
        self.exports.insert(key.to_string(), value);
    }

    /// Read back a published value.
    pub fn export(&self, key: &str) -> Option<&AttrValue> {
        self.exports.get(key)
    }

    /// Keys published so far, in sorted order.
    pub fn export_keys(&self) -> Vec<&str> {
        self.exports.keys().map(|k| k.as_str()).collect()
    }
}
