//! Layer-stack extension
//!
//! The one extension that drives the layer orchestration engine from inside
//! its own hook implementations. Work is spread across the Rig phase:
//!
//! - before `create_rig`: build the layer/cage groups, duplicate everything
//!   (`LayerManager::setup`), then run the pre-setup fan-outs
//! - after `create_rig`: run each layer's own `setup`
//! - after `post_process`: run the post-process fan-out and broadcast the
//!   shared visibility plug to every registered hidden control

use crate::error::{Result, RigError};
use crate::layers::manager::{LayerManager, LayerSetupArgs};
use crate::layers::operator::LayerCtor;
use crate::layers::recipes::{DeformLayer, TweakLayer};
use crate::rig::context::BuildContext;
use crate::rig::hooks::{Extension, PanelSpec};
use crate::rig::orchestrator::Rig;
use crate::scene::{AttrValue, Plug, Position};

/// Name of the boolean visibility plug added to the rig root.
pub const VIS_ATTR: &str = "layerVis";

/// Drives a [`LayerManager`] through the host lifecycle.
///
/// The lifecycle runs once per recipe, but the stack is built once per run:
/// each phase of the stack rides the first rig-phase invocation that reaches
/// it and ignores the rest.
pub struct DeformStackExtension {
    manager: LayerManager,
    built: bool,
    layers_setup: bool,
    finished: bool,
}

impl DeformStackExtension {
    pub fn new(ctors: Vec<LayerCtor>) -> Self {
        Self {
            manager: LayerManager::new(ctors),
            built: false,
            layers_setup: false,
            finished: false,
        }
    }

    /// The standard production stack: primary deformer, then tweaks.
    pub fn standard() -> Self {
        Self::new(vec![DeformLayer::boxed as LayerCtor, TweakLayer::boxed as LayerCtor])
    }

    pub fn manager(&self) -> &LayerManager {
        &self.manager
    }
}

impl Extension for DeformStackExtension {
    fn name(&self) -> &str {
        "deform_stack"
    }

    fn panel(&self) -> Option<PanelSpec> {
        Some(PanelSpec {
            title: "Deformation Layers".to_string(),
            entry: "deform_stack::open_panel".to_string(),
        })
    }

    fn before_create_rig(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        if self.built {
            return Ok(());
        }
        let source_group = ctx
            .deform_source
            .ok_or_else(|| RigError::PreconditionFailed {
                reason: "no deform source group published on the build context".to_string(),
            })?;

        let root_group = rig.create_group("layers_grp", rig.setup_group());
        let cage_group = rig.create_group("cage_grp", rig.setup_group());
        let ctrl_parent = rig.create_group("layerCtl_grp", rig.ctrl_group());
        let anim_set = match ctx.anim_set {
            Some(set) => set,
            None => {
                let set = rig.create_anim_set("layers", Position::Center);
                ctx.anim_set = Some(set);
                set
            }
        };

        let args = LayerSetupArgs {
            source_group,
            root_group,
            cage_group,
            ctrl_parent,
            anim_set,
        };
        self.manager.setup(rig, ctx, args, None)?;
        self.manager.pre_setup_layers(rig, ctx)?;
        self.manager.post_pre_setup_layers(rig, ctx)?;
        self.built = true;
        Ok(())
    }

    fn after_create_rig(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        if !self.built || self.layers_setup {
            return Ok(());
        }
        self.manager.setup_layers(rig, ctx)?;
        self.layers_setup = true;
        Ok(())
    }

    fn after_post_process(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        if !self.layers_setup || self.finished {
            return Ok(());
        }
        self.finished = true;
        self.manager.post_process_layers(rig, ctx)?;

        let root = rig.root();
        rig.scene.set_attr(root, VIS_ATTR, AttrValue::Bool(true));
        let connected = self
            .manager
            .connect_visibility(&mut rig.scene, &Plug::new(root, VIS_ATTR));
        log::debug!("visibility fan-out drives {} control(s)", connected);
        Ok(())
    }
}

impl std::fmt::Debug for DeformStackExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeformStackExtension")
            .field("manager", &self.manager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::lifecycle::{JointRecipe, RigBuilder, RigRecipe};
    use crate::rig::unit::Unit;
    use crate::scene::{NodeKind, SceneGraph};
    use pretty_assertions::assert_eq;

    struct StubRecipe;

    impl JointRecipe for StubRecipe {
        fn name(&self) -> &str {
            "stub"
        }

        fn create_unit(
            &mut self,
            rig: &mut Rig,
            _ctx: &mut BuildContext,
        ) -> crate::error::Result<Unit> {
            Ok(Unit::create(
                &mut rig.scene,
                "stub",
                "stub",
                Position::Center,
                None,
                &[],
                None,
            ))
        }
    }

    impl RigRecipe for StubRecipe {
        fn name(&self) -> &str {
            "stub"
        }

        fn locate_unit(&self, scene: &SceneGraph) -> crate::error::Result<Unit> {
            Unit::find(scene, "stub", Position::Center, None)
        }
    }

    #[test]
    fn test_extension_runs_stack_through_lifecycle() {
        let mut rig = Rig::new("test");
        let source = rig.create_group("geo_grp", rig.model_group());
        let meshes = rig.create_group("meshes_grp", source);
        rig.scene
            .create_node(NodeKind::Mesh, "body_C_msh", Some(meshes));

        let mut builder = RigBuilder::new(rig);
        builder.ctx.deform_source = Some(source);
        builder
            .install(Box::new(DeformStackExtension::standard()))
            .unwrap();

        builder.run_joint_phase(&mut StubRecipe).unwrap();
        builder.run_rig_phase(&mut StubRecipe).unwrap();

        let rig = builder.finish();
        // two layer copies plus the terminal skinned copy
        let layers_grp = rig.scene.require("layers_grp").unwrap();
        assert_eq!(rig.scene.children(layers_grp).len(), 2);
        let cage_grp = rig.scene.require("cage_grp").unwrap();
        assert_eq!(rig.scene.children(cage_grp).len(), 1);

        // visibility source drives the deform layer ctrl
        let ctrl = rig.scene.require("deform_C_ctl").unwrap();
        assert!(rig.scene.is_connected(
            &Plug::new(rig.root(), VIS_ATTR),
            &Plug::new(ctrl, "visibility")
        ));
    }

    #[test]
    fn test_extension_requires_deform_source() {
        let mut builder = RigBuilder::new(Rig::new("test"));
        builder
            .install(Box::new(DeformStackExtension::standard()))
            .unwrap();
        builder.run_joint_phase(&mut StubRecipe).unwrap();

        let err = builder.run_rig_phase(&mut StubRecipe).unwrap_err();
        assert!(matches!(err, RigError::PreconditionFailed { .. }));
    }
}
