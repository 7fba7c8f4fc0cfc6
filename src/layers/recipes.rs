//! Concrete deformation layers
//!
//! Two thin layers over the orchestration engine. Their error policies differ
//! on purpose, matching long-observed production behavior:
//!
//! - `TweakLayer` treats a missing source sub-group as "nothing to do": it
//!   logs and skips itself.
//! - `DeformLayer` treats a badly named source mesh as a contract breach: it
//!   validates everything first, then raises one aggregate error naming every
//!   offender, creating no bindings at all.

use log::{info, warn};

use crate::error::{Result, RigError};
use crate::layers::operator::{LayerOperator, LayerState};
use crate::rig::context::BuildContext;
use crate::rig::orchestrator::Rig;
use crate::scene::{GeneratedName, NodeId, NodeKind, NodeRole, Plug, Position, SceneGraph};

/// Sub-group `TweakLayer` expects under the source hierarchy.
const TWEAK_GROUP: &str = "tweak_grp";

fn source_meshes(scene: &SceneGraph, group: NodeId) -> Vec<NodeId> {
    scene
        .descendants(group)
        .into_iter()
        .filter(|n| scene.kind(*n) == NodeKind::Mesh)
        .collect()
}

fn ctrl_name_for(scene: &SceneGraph, node: NodeId, suffix: &str) -> String {
    match GeneratedName::parse(scene.name(node)) {
        Ok(mut parsed) => {
            parsed.role = NodeRole::Ctrl;
            parsed.suffix = Some(suffix.to_string());
            parsed.compose()
        }
        Err(_) => GeneratedName {
            base: scene.name(node).to_string(),
            position: Position::Center,
            role: NodeRole::Ctrl,
            suffix: Some(suffix.to_string()),
        }
        .compose(),
    }
}

// ============================================================================
// DeformLayer
// ============================================================================

/// Primary deformer layer.
///
/// Every source mesh name must parse as a generated mesh name. Violations are
/// collected across the whole source before a single aggregate error is
/// raised; on failure no deformer binding exists for ANY mesh, valid or not.
#[derive(Debug, Default)]
pub struct DeformLayer {
    state: LayerState,
}

impl DeformLayer {
    pub fn boxed() -> Box<dyn LayerOperator> {
        Box::<DeformLayer>::default()
    }
}

impl LayerOperator for DeformLayer {
    fn name(&self) -> &str {
        "deform"
    }

    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn setup(&mut self, rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        let source = self.state.source_group.ok_or(RigError::LayerError {
            reason: "deform layer was not bound to a source group".to_string(),
        })?;

        // validate every mesh before touching the scene
        let meshes = source_meshes(&rig.scene, source);
        let mut parsed = Vec::with_capacity(meshes.len());
        let mut violations = Vec::new();
        for mesh in &meshes {
            let mesh_name = rig.scene.name(*mesh);
            match GeneratedName::parse(mesh_name) {
                Ok(name) if name.role == NodeRole::Mesh => parsed.push(name),
                _ => violations.push(mesh_name.to_string()),
            }
        }
        if !violations.is_empty() {
            for bad in &violations {
                warn!("deform layer: badly named source mesh '{}'", bad);
            }
            return Err(RigError::NamingViolations {
                group: rig.scene.name(source).to_string(),
                violations,
            });
        }

        // one binding per duplicated leaf, index-aligned with the source walk
        for (target, name) in self.state.target_objects.iter().zip(parsed) {
            let binding_name = GeneratedName {
                base: name.base,
                position: name.position,
                role: NodeRole::Deformer,
                suffix: None,
            }
            .compose();
            let binding = rig.scene.create_node(NodeKind::Network, &binding_name, None);
            rig.scene.connect(
                Plug::new(*target, "worldMesh"),
                Plug::new(binding, "input"),
            );
        }

        // one layer-level control, hidden behind the shared visibility plug
        if let Some(ctrl_parent) = self.state.ctrl_parent {
            let ctrl = rig
                .scene
                .create_node(NodeKind::Transform, "deform_C_ctl", Some(ctrl_parent));
            self.state.add_hidden_control(ctrl);
            if let Some(set) = self.state.anim_set {
                rig.add_to_set(set, ctrl);
            }
        }

        info!(
            "deform layer bound {} mesh(es)",
            self.state.target_objects.len()
        );
        Ok(())
    }
}

// ============================================================================
// TweakLayer
// ============================================================================

/// Per-region tweak layer.
///
/// Looks for the `tweak_grp` sub-group in the source; when it is absent the
/// layer logs and skips itself. Non-fatal by long-standing behavior.
#[derive(Debug, Default)]
pub struct TweakLayer {
    state: LayerState,
}

impl TweakLayer {
    pub fn boxed() -> Box<dyn LayerOperator> {
        Box::<TweakLayer>::default()
    }
}

impl LayerOperator for TweakLayer {
    fn name(&self) -> &str {
        "tweak"
    }

    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn setup(&mut self, rig: &mut Rig, _ctx: &mut BuildContext) -> Result<()> {
        let source = self.state.source_group.ok_or(RigError::LayerError {
            reason: "tweak layer was not bound to a source group".to_string(),
        })?;

        let tweak_group = match rig.scene.child_by_name(source, TWEAK_GROUP) {
            Some(group) => group,
            None => {
                warn!(
                    "{}",
                    RigError::MissingSubGroup {
                        group: TWEAK_GROUP.to_string(),
                        parent: rig.scene.name(source).to_string(),
                    }
                );
                return Ok(());
            }
        };

        // one tweak control per mesh in the sub-group
        let ctrl_parent = self.state.ctrl_parent.unwrap_or_else(|| rig.ctrl_group());
        for mesh in source_meshes(&rig.scene, tweak_group) {
            let name = ctrl_name_for(&rig.scene, mesh, "twk");
            let ctrl = rig
                .scene
                .create_node(NodeKind::Transform, &name, Some(ctrl_parent));
            rig.scene
                .connect(Plug::new(ctrl, "translate"), Plug::new(mesh, "tweak"));
            self.state.add_hidden_control(ctrl);
            if let Some(set) = self.state.anim_set {
                rig.add_to_set(set, ctrl);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::manager::{LayerManager, LayerSetupArgs};
    use crate::layers::operator::LayerCtor;
    use pretty_assertions::assert_eq;

    fn rig_with_meshes(names: &[&str], with_tweak_group: bool) -> (Rig, LayerSetupArgs) {
        let mut rig = Rig::new("test");
        let source = rig.create_group("geo_grp", rig.model_group());
        let meshes = rig.create_group("meshes_grp", source);
        for name in names {
            rig.scene.create_node(NodeKind::Mesh, name, Some(meshes));
        }
        if with_tweak_group {
            let tweak = rig.create_group(TWEAK_GROUP, source);
            rig.scene
                .create_node(NodeKind::Mesh, "cheek_L_msh", Some(tweak));
        }
        let root_group = rig.create_group("layers_grp", rig.setup_group());
        let cage_group = rig.create_group("cage_grp", rig.setup_group());
        let ctrl_parent = rig.create_group("layerCtl_grp", rig.ctrl_group());
        let anim_set = rig.create_anim_set("layers", Position::Center);
        (
            rig,
            LayerSetupArgs {
                source_group: source,
                root_group,
                cage_group,
                ctrl_parent,
                anim_set,
            },
        )
    }

    fn binding_count(scene: &SceneGraph) -> usize {
        scene
            .node_ids()
            .filter(|n| {
                scene.kind(*n) == NodeKind::Network
                    && GeneratedName::parse(scene.name(*n))
                        .map(|g| g.role == NodeRole::Deformer)
                        .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_deform_layer_binds_valid_meshes() {
        let (mut rig, args) = rig_with_meshes(&["body_C_msh", "head_C_msh"], false);
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![DeformLayer::boxed as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();
        manager.setup_layers(&mut rig, &mut ctx).unwrap();

        assert_eq!(binding_count(&rig.scene), 2);
        assert!(rig.scene.find("body_C_def").is_some());
        assert!(rig.scene.find("deform_C_ctl").is_some());
        assert_eq!(manager.operators()[0].state().hidden_controls().len(), 1);
    }

    #[test]
    fn test_deform_layer_aggregates_all_violations() {
        let (mut rig, args) = rig_with_meshes(
            &[
                "body_C_msh",
                "badMesh",
                "head_C_msh",
                "alsoBad",
                "hand_L_msh",
            ],
            false,
        );
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![DeformLayer::boxed as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();

        let err = manager.setup_layers(&mut rig, &mut ctx).unwrap_err();
        match err {
            RigError::NamingViolations { violations, .. } => {
                assert_eq!(violations, vec!["badMesh".to_string(), "alsoBad".to_string()]);
            }
            other => panic!("expected NamingViolations, got {:?}", other),
        }
        // zero bindings, including for the three valid meshes
        assert_eq!(binding_count(&rig.scene), 0);
    }

    #[test]
    fn test_tweak_layer_skips_when_sub_group_missing() {
        let (mut rig, args) = rig_with_meshes(&["body_C_msh"], false);
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![TweakLayer::boxed as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();

        // missing tweak_grp: non-fatal, layer just skips
        manager.setup_layers(&mut rig, &mut ctx).unwrap();
        assert!(manager.operators()[0].state().hidden_controls().is_empty());
    }

    #[test]
    fn test_tweak_layer_builds_ctrls_when_sub_group_present() {
        let (mut rig, args) = rig_with_meshes(&["body_C_msh"], true);
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![TweakLayer::boxed as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();
        manager.setup_layers(&mut rig, &mut ctx).unwrap();

        let ctrl = rig.scene.require("cheek_L_ctl_twk").unwrap();
        assert_eq!(rig.scene.parent(ctrl), Some(args.ctrl_parent));
        assert_eq!(manager.operators()[0].state().hidden_controls(), &[ctrl]);
        assert_eq!(rig.set_members(args.anim_set), vec![ctrl]);
    }
}
