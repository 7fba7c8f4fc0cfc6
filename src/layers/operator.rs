//! Layer operators
//!
//! A layer is one stage of the chained deformation pipeline, backed by a
//! duplicated copy of the source hierarchy. Operators are transient: bound at
//! setup time, alive for one construction run, never persisted. All scene
//! references they hold are opaque handles into the rig's arena.

use crate::error::Result;
use crate::rig::context::BuildContext;
use crate::rig::orchestrator::Rig;
use crate::scene::NodeId;

/// Mutable per-run state every layer operator accumulates.
#[derive(Debug, Clone, Default)]
pub struct LayerState {
    /// The layer's duplicated leaves, positionally aligned with every other
    /// layer's copy of the same source.
    pub target_objects: Vec<NodeId>,
    /// Root of this layer's duplicated hierarchy.
    pub root_group: Option<NodeId>,
    /// Parent for controls this layer creates.
    pub ctrl_parent: Option<NodeId>,
    /// Animation set controls get registered to.
    pub anim_set: Option<NodeId>,
    /// Source hierarchy the copy was taken from.
    pub source_group: Option<NodeId>,
    /// Controls whose visibility is driven by the shared visibility plug.
    hidden_controls: Vec<NodeId>,
}

impl LayerState {
    /// Register a control for the later visibility fan-out. Duplicate
    /// registrations are kept out here so the fan-out can connect blindly.
    pub fn add_hidden_control(&mut self, ctrl: NodeId) {
        if !self.hidden_controls.contains(&ctrl) {
            self.hidden_controls.push(ctrl);
        }
    }

    pub fn hidden_controls(&self) -> &[NodeId] {
        &self.hidden_controls
    }
}

/// One stage of the deformation pipeline.
///
/// Stage methods default to no-ops; concrete layers override what they need.
/// By the time any stage method runs, duplication for ALL layers has already
/// completed, so a later layer may rely on an earlier layer's copied
/// geometry existing.
pub trait LayerOperator {
    /// Layer name; doubles as the rename prefix for its duplicated
    /// hierarchy.
    fn name(&self) -> &str;

    fn state(&self) -> &LayerState;

    fn state_mut(&mut self) -> &mut LayerState;

    fn pre_setup(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn post_pre_setup(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn setup(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }

    fn post_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        Ok(())
    }
}

/// Layer "class": a constructor producing a fresh boxed operator.
/// `LayerManager` holds these, not instances; instantiation happens at setup
/// time.
pub type LayerCtor = fn() -> Box<dyn LayerOperator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeKind, SceneGraph};

    #[test]
    fn test_hidden_control_registration_is_idempotent() {
        let mut scene = SceneGraph::new();
        let ctrl = scene.create_node(NodeKind::Transform, "tweak_C_ctl", None);

        let mut state = LayerState::default();
        state.add_hidden_control(ctrl);
        state.add_hidden_control(ctrl);
        assert_eq!(state.hidden_controls(), &[ctrl]);
    }
}
