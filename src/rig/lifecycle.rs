//! Construction lifecycle
//!
//! Two independent, non-reentrant staged sequences every rig recipe
//! implements by overriding stage methods with no-op defaults:
//!
//! - Joint phase: `Uninitialized -> create_unit -> Created -> process ->
//!   Processed -> finalize -> Finalized`
//! - Rig phase: `Bound -> pre_process -> PreProcessed -> create_rig ->
//!   Processed -> post_process -> Done`
//!
//! `RigBuilder` drives both sequences and dispatches extension hooks around
//! every stage. Re-invoking a phase on an already-advanced builder is a
//! caller-contract violation: nothing guards against it, and it will
//! duplicate scene nodes.

use std::fmt;

use log::debug;

use crate::error::Result;
use crate::rig::context::BuildContext;
use crate::rig::hooks::{Extension, ExtensionRegistry};
use crate::rig::orchestrator::Rig;
use crate::rig::unit::Unit;
use crate::scene::{GeneratedName, NodeId, NodeKind, NodeRole, Plug, Position, SceneGraph};

/// Host lifecycle stages, used as hook-dispatch keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    // Joint phase
    CreateUnit,
    Process,
    Finalize,
    // Rig phase
    PreProcess,
    CreateRig,
    PostProcess,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CreateUnit => "create_unit",
            Stage::Process => "process",
            Stage::Finalize => "finalize",
            Stage::PreProcess => "pre_process",
            Stage::CreateRig => "create_rig",
            Stage::PostProcess => "post_process",
        };
        write!(f, "{}", name)
    }
}

/// Joint-phase progress marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointStage {
    #[default]
    Uninitialized,
    Created,
    Processed,
    Finalized,
}

/// Rig-phase progress marker. `None` on the builder until the Unit has been
/// located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigStage {
    Bound,
    PreProcessed,
    Processed,
    Done,
}

/// Joint-phase recipe: creates the Unit and registers members on it.
pub trait JointRecipe {
    fn name(&self) -> &str;

    /// Create this run's Unit. Called exactly once.
    fn create_unit(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<Unit>;

    /// Main Joint-phase body; registers members on the Unit.
    fn process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        Ok(())
    }

    /// Last Joint-phase stage.
    fn finalize(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        Ok(())
    }
}

/// Rig-phase recipe: reads the Unit's members and builds the control rig.
/// The Unit is never mutated here.
pub trait RigRecipe {
    fn name(&self) -> &str;

    /// Resolve this recipe's Unit. A missing Unit is immediately fatal.
    fn locate_unit(&self, scene: &SceneGraph) -> Result<Unit>;

    fn pre_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        Ok(())
    }

    /// Main Rig-phase body. The host stage wrapping this is `create_rig`.
    fn process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        Ok(())
    }

    fn post_process(&mut self, _rig: &mut Rig, _ctx: &mut BuildContext, _unit: &Unit) -> Result<()> {
        Ok(())
    }
}

/// Drives the two lifecycle phases and fans extension hooks around each
/// stage.
#[derive(Debug)]
pub struct RigBuilder {
    pub rig: Rig,
    pub ctx: BuildContext,
    extensions: ExtensionRegistry,
    joint_stage: JointStage,
    rig_stage: Option<RigStage>,
}

impl RigBuilder {
    pub fn new(rig: Rig) -> Self {
        Self {
            rig,
            ctx: BuildContext::new(),
            extensions: ExtensionRegistry::new(),
            joint_stage: JointStage::Uninitialized,
            rig_stage: None,
        }
    }

    /// Install an extension; see [`ExtensionRegistry::install`].
    pub fn install(&mut self, extension: Box<dyn Extension>) -> Result<()> {
        self.extensions.install(extension)
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn joint_stage(&self) -> JointStage {
        self.joint_stage
    }

    pub fn rig_stage(&self) -> Option<RigStage> {
        self.rig_stage
    }

    /// Consume the builder, handing the rig back.
    pub fn finish(self) -> Rig {
        self.rig
    }

    /// Run the whole Joint phase for one recipe.
    pub fn run_joint_phase(&mut self, recipe: &mut dyn JointRecipe) -> Result<Unit> {
        debug!("joint phase: {}", recipe.name());

        self.extensions
            .dispatch_before(Stage::CreateUnit, &mut self.rig, &mut self.ctx)?;
        let unit = recipe.create_unit(&mut self.rig, &mut self.ctx)?;
        self.joint_stage = JointStage::Created;
        self.extensions
            .dispatch_after(Stage::CreateUnit, &mut self.rig, &mut self.ctx)?;

        self.extensions
            .dispatch_before(Stage::Process, &mut self.rig, &mut self.ctx)?;
        recipe.process(&mut self.rig, &mut self.ctx, &unit)?;
        self.joint_stage = JointStage::Processed;
        self.extensions
            .dispatch_after(Stage::Process, &mut self.rig, &mut self.ctx)?;

        self.extensions
            .dispatch_before(Stage::Finalize, &mut self.rig, &mut self.ctx)?;
        recipe.finalize(&mut self.rig, &mut self.ctx, &unit)?;
        self.joint_stage = JointStage::Finalized;
        self.extensions
            .dispatch_after(Stage::Finalize, &mut self.rig, &mut self.ctx)?;

        Ok(unit)
    }

    /// Run the whole Rig phase for one recipe.
    ///
    /// Locating the Unit happens first; failure there aborts before any hook
    /// fires. The recipe's `process` runs inside the host stage named
    /// `create_rig`.
    pub fn run_rig_phase(&mut self, recipe: &mut dyn RigRecipe) -> Result<Unit> {
        debug!("rig phase: {}", recipe.name());

        let unit = recipe.locate_unit(&self.rig.scene)?;
        self.rig_stage = Some(RigStage::Bound);

        self.extensions
            .dispatch_before(Stage::PreProcess, &mut self.rig, &mut self.ctx)?;
        recipe.pre_process(&mut self.rig, &mut self.ctx, &unit)?;
        self.rig_stage = Some(RigStage::PreProcessed);
        self.extensions
            .dispatch_after(Stage::PreProcess, &mut self.rig, &mut self.ctx)?;

        self.extensions
            .dispatch_before(Stage::CreateRig, &mut self.rig, &mut self.ctx)?;
        recipe.process(&mut self.rig, &mut self.ctx, &unit)?;
        self.rig_stage = Some(RigStage::Processed);
        self.extensions
            .dispatch_after(Stage::CreateRig, &mut self.rig, &mut self.ctx)?;

        self.extensions
            .dispatch_before(Stage::PostProcess, &mut self.rig, &mut self.ctx)?;
        recipe.post_process(&mut self.rig, &mut self.ctx, &unit)?;
        self.rig_stage = Some(RigStage::Done);
        self.extensions
            .dispatch_after(Stage::PostProcess, &mut self.rig, &mut self.ctx)?;

        unit.mark_setup(&mut self.rig.scene);
        Ok(unit)
    }
}

// ============================================================================
// Proxy helpers
// ============================================================================

/// Create a proxy transform mirroring a bind joint.
///
/// The proxy copies the joint's local translate/rotate and is parented under
/// `parent` rather than the skeleton, decoupling the control rig from the
/// bind hierarchy. A live data-flow dependency back to the bind ancestor
/// chain is kept by wiring the joint parent's world matrix through a
/// decompose utility into the proxy. This is a connection, not a parenting
/// relationship.
pub fn create_proxy(rig: &mut Rig, bind_joint: NodeId, parent: NodeId) -> Result<NodeId> {
    let proxy_name = proxy_name_for(&rig.scene, bind_joint, NodeRole::Proxy);
    let proxy = rig
        .scene
        .create_node(NodeKind::Transform, &proxy_name, Some(parent));

    for attr in ["translate", "rotate"] {
        if let Some(value) = rig.scene.attr(bind_joint, attr).cloned() {
            rig.scene.set_attr(proxy, attr, value);
        }
    }

    if let Some(bind_parent) = rig.scene.parent(bind_joint) {
        if rig.scene.kind(bind_parent) == NodeKind::Joint {
            let decompose_name = proxy_name_for(&rig.scene, bind_joint, NodeRole::Util);
            let decompose = rig
                .scene
                .create_node(NodeKind::Network, &decompose_name, None);
            rig.scene.connect(
                Plug::new(bind_parent, "worldMatrix"),
                Plug::new(decompose, "inputMatrix"),
            );
            rig.scene.connect(
                Plug::new(decompose, "outputTranslate"),
                Plug::new(proxy, "translate"),
            );
            rig.scene.connect(
                Plug::new(decompose, "outputRotate"),
                Plug::new(proxy, "rotate"),
            );
        }
    }

    Ok(proxy)
}

/// Create one proxy per joint in the chain rooted at `chain_root`, parented
/// as a flat list under `parent`. Order matches a pre-order walk of the
/// chain.
pub fn create_proxy_chain(
    rig: &mut Rig,
    chain_root: NodeId,
    parent: NodeId,
) -> Result<Vec<NodeId>> {
    let mut joints = vec![chain_root];
    joints.extend(
        rig.scene
            .descendants(chain_root)
            .into_iter()
            .filter(|n| rig.scene.kind(*n) == NodeKind::Joint),
    );

    let mut proxies = Vec::with_capacity(joints.len());
    for joint in joints {
        proxies.push(create_proxy(rig, joint, parent)?);
    }
    Ok(proxies)
}

/// Proxy/utility name derived from the bind node's own name. Parseable bind
/// names keep their base/position/suffix; anything else falls back to the
/// raw name as base.
fn proxy_name_for(scene: &SceneGraph, bind: NodeId, role: NodeRole) -> String {
    match GeneratedName::parse(scene.name(bind)) {
        Ok(mut parsed) => {
            parsed.role = role;
            parsed.compose()
        }
        Err(_) => GeneratedName {
            base: scene.name(bind).to_string(),
            position: Position::Center,
            role,
            suffix: None,
        }
        .compose(),
    }
}
