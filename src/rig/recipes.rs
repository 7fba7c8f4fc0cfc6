//! Demonstration recipe
//!
//! `ChainRecipe` is a thin call site over the framework: Joint phase records
//! an existing bind-joint chain on a Unit, Rig phase builds proxies and
//! controls from the recorded members. Real productions layer many of these
//! per limb; the framework below is what carries the weight.

use crate::error::{Result, RigError};
use crate::rig::context::BuildContext;
use crate::rig::lifecycle::{create_proxy_chain, JointRecipe, RigRecipe};
use crate::rig::orchestrator::Rig;
use crate::rig::unit::Unit;
use crate::scene::{GeneratedName, NameBuilder, NodeId, NodeKind, NodeRole, Position, SceneGraph};

const ROLE_ROOT_JOINT: &str = "root_joint";
const ROLE_JOINTS: &str = "joints";

/// Builds a control chain over an existing named joint chain.
#[derive(Debug)]
pub struct ChainRecipe {
    base: String,
    position: Position,
    /// Names of the bind joints, root first. Resolved at Joint-phase time;
    /// a missing joint is a user-facing precondition failure.
    joint_names: Vec<String>,
}

impl ChainRecipe {
    pub fn new(base: &str, position: Position, joint_names: Vec<String>) -> Self {
        Self {
            base: base.to_string(),
            position,
            joint_names,
        }
    }

    fn resolve_joints(&self, scene: &SceneGraph) -> Result<Vec<NodeId>> {
        if self.joint_names.is_empty() {
            return Err(RigError::PreconditionFailed {
                reason: format!("chain '{}' has no joints configured", self.base),
            });
        }
        self.joint_names
            .iter()
            .map(|name| scene.require(name))
            .collect()
    }
}

impl JointRecipe for ChainRecipe {
    fn name(&self) -> &str {
        &self.base
    }

    fn create_unit(&mut self, rig: &mut Rig, _ctx: &mut BuildContext) -> Result<Unit> {
        Ok(Unit::create(
            &mut rig.scene,
            &self.base,
            "chain",
            self.position,
            None,
            &[ROLE_ROOT_JOINT, ROLE_JOINTS],
            None,
        ))
    }

    fn process(&mut self, rig: &mut Rig, _ctx: &mut BuildContext, unit: &Unit) -> Result<()> {
        let joints = self.resolve_joints(&rig.scene)?;
        unit.register_members(&mut rig.scene, ROLE_JOINTS, &joints)?;
        Ok(())
    }

    fn finalize(&mut self, rig: &mut Rig, _ctx: &mut BuildContext, unit: &Unit) -> Result<()> {
        let root = unit.members(&rig.scene, ROLE_JOINTS)?[0];
        unit.register_member(&mut rig.scene, ROLE_ROOT_JOINT, root)?;
        Ok(())
    }
}

impl RigRecipe for ChainRecipe {
    fn name(&self) -> &str {
        &self.base
    }

    fn locate_unit(&self, scene: &SceneGraph) -> Result<Unit> {
        Unit::find(scene, &self.base, self.position, None)
    }

    fn pre_process(&mut self, rig: &mut Rig, ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        // per-chain control parent and the run's animation set
        let grp_name = NameBuilder::new(&self.base)
            .with_position(self.position)
            .with_role(NodeRole::Group)
            .compose();
        let ctrl_parent = rig.create_group(&grp_name, rig.ctrl_group());
        ctx.set_export(
            &format!("{}_ctrl_parent", self.base),
            crate::scene::AttrValue::Node(ctrl_parent),
        );
        if ctx.anim_set.is_none() {
            ctx.anim_set = Some(rig.create_anim_set(&self.base, self.position));
        }
        Ok(())
    }

    fn process(&mut self, rig: &mut Rig, ctx: &mut BuildContext, unit: &Unit) -> Result<()> {
        let root_joint = unit.member(&rig.scene, ROLE_ROOT_JOINT)?;
        let ctrl_parent = match ctx.export(&format!("{}_ctrl_parent", self.base)) {
            Some(crate::scene::AttrValue::Node(n)) => *n,
            _ => rig.ctrl_group(),
        };

        let proxies = create_proxy_chain(rig, root_joint, ctrl_parent)?;

        // one control per proxy, parented as a chain
        let mut parent = ctrl_parent;
        let mut ctrls = Vec::with_capacity(proxies.len());
        for proxy in &proxies {
            let mut name = GeneratedName::parse(rig.scene.name(*proxy))?;
            name.role = NodeRole::Ctrl;
            let ctrl = rig
                .scene
                .create_node(NodeKind::Transform, &name.compose(), Some(parent));
            ctrls.push(ctrl);
            parent = ctrl;
        }
        ctx.set_export(
            &format!("{}_ctrls", self.base),
            crate::scene::AttrValue::NodeList(ctrls),
        );
        Ok(())
    }

    fn post_process(&mut self, rig: &mut Rig, ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        let ctrls = match ctx.export(&format!("{}_ctrls", self.base)) {
            Some(crate::scene::AttrValue::NodeList(l)) => l.clone(),
            _ => Vec::new(),
        };
        if let Some(set) = ctx.anim_set {
            for ctrl in ctrls {
                rig.add_to_set(set, ctrl);
            }
        }
        Ok(())
    }
}
