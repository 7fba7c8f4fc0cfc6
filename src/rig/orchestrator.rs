//! Host orchestrator
//!
//! `Rig` owns the scene arena plus the standard top-level groups every build
//! hangs off: model (source geometry), setup (internal plumbing), and control
//! (animator-facing nodes). It also acts as the animation-set factory.
//!
//! `Rig` is deliberately dumb about lifecycle: stage sequencing and hook
//! dispatch live in [`crate::rig::lifecycle::RigBuilder`].

use crate::scene::{
    AttrValue, NameBuilder, NodeId, NodeKind, NodeRole, Position, SceneGraph,
};

/// The host object every recipe, extension, and layer operates against.
#[derive(Debug)]
pub struct Rig {
    pub scene: SceneGraph,
    name: String,
    root: NodeId,
    model_group: NodeId,
    setup_group: NodeId,
    ctrl_group: NodeId,
}

impl Rig {
    /// Create a fresh rig scene with the standard group skeleton.
    pub fn new(name: &str) -> Self {
        let mut scene = SceneGraph::new();
        let root = scene.create_node(NodeKind::Transform, name, None);
        let model_group = scene.create_node(NodeKind::Transform, "model_grp", Some(root));
        let setup_group = scene.create_node(NodeKind::Transform, "setup_grp", Some(root));
        let ctrl_group = scene.create_node(NodeKind::Transform, "ctrl_grp", Some(root));
        Self {
            scene,
            name: name.to_string(),
            root,
            model_group,
            setup_group,
            ctrl_group,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level rig transform.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Where source geometry lives.
    pub fn model_group(&self) -> NodeId {
        self.model_group
    }

    /// Where internal plumbing (skeletons, layer copies, cages) lives.
    pub fn setup_group(&self) -> NodeId {
        self.setup_group
    }

    /// Where animator-facing controls live.
    pub fn ctrl_group(&self) -> NodeId {
        self.ctrl_group
    }

    /// Create a named group under a parent.
    pub fn create_group(&mut self, name: &str, parent: NodeId) -> NodeId {
        self.scene.create_node(NodeKind::Transform, name, Some(parent))
    }

    /// Animation-set factory. Sets are parked under the rig root and start
    /// out empty.
    pub fn create_anim_set(&mut self, base: &str, position: Position) -> NodeId {
        let name = NameBuilder::new(base)
            .with_position(position)
            .with_role(NodeRole::Set)
            .compose();
        let set = self
            .scene
            .create_node(NodeKind::ObjectSet, &name, Some(self.root));
        self.scene
            .set_attr(set, "setMembers", AttrValue::NodeList(Vec::new()));
        set
    }

    /// Add a node to an animation set. Membership is idempotent.
    pub fn add_to_set(&mut self, set: NodeId, node: NodeId) {
        let mut members = self
            .scene
            .attr_node_list(set, "setMembers")
            .unwrap_or_default();
        if !members.contains(&node) {
            members.push(node);
            self.scene
                .set_attr(set, "setMembers", AttrValue::NodeList(members));
        }
    }

    /// Current membership of an animation set.
    pub fn set_members(&self, set: NodeId) -> Vec<NodeId> {
        self.scene.attr_node_list(set, "setMembers").unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_standard_groups() {
        let rig = Rig::new("biped");
        assert_eq!(rig.scene.name(rig.root()), "biped");
        assert_eq!(rig.scene.parent(rig.model_group()), Some(rig.root()));
        assert_eq!(rig.scene.parent(rig.setup_group()), Some(rig.root()));
        assert_eq!(rig.scene.parent(rig.ctrl_group()), Some(rig.root()));
    }

    #[test]
    fn test_anim_set_factory_and_membership() {
        let mut rig = Rig::new("biped");
        let set = rig.create_anim_set("arm", Position::Left);
        assert_eq!(rig.scene.name(set), "arm_L_set");
        assert_eq!(rig.scene.kind(set), NodeKind::ObjectSet);

        let ctrl = rig.create_group("arm_L_ctl", rig.ctrl_group());
        rig.add_to_set(set, ctrl);
        rig.add_to_set(set, ctrl); // no duplicate membership
        assert_eq!(rig.set_members(set), vec![ctrl]);
    }
}
