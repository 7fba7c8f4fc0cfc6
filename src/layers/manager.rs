//! Layer orchestration engine
//!
//! `LayerManager` owns an ordered list of layer constructors plus one
//! implicit terminal "skinned" copy. `setup` instantiates one operator per
//! constructor, duplicates the source hierarchy once per layer, and wires
//! consecutive copies into a strict linear deformation chain. The lifecycle
//! fan-out methods then drive every instantiated operator in registration
//! order; no stage hook fires before every layer's duplication is done.

use log::debug;

use crate::error::Result;
use crate::layers::operator::{LayerCtor, LayerOperator};
use crate::rig::context::BuildContext;
use crate::rig::orchestrator::Rig;
use crate::scene::{NodeId, NodeKind, Plug, SceneGraph};

/// Attribute carrying a leaf's deformed output downstream.
pub const LEAF_OUT: &str = "outMesh";
/// Attribute receiving a leaf's upstream input.
pub const LEAF_IN: &str = "inMesh";
/// Rename prefix for the terminal skinned copy.
const SKINNED_PREFIX: &str = "skinned";

/// One duplicated hierarchy, positionally stable: `leaves[i]` denotes the
/// same logical source leaf in every layer's copy.
#[derive(Debug, Clone)]
pub struct CopiedHierarchy {
    /// The renamed root group of the copy.
    pub root: NodeId,
    /// Renamed container groups, in traversal order.
    pub groups: Vec<NodeId>,
    /// Deep-copied geometry leaves, in traversal order.
    pub leaves: Vec<NodeId>,
}

/// Inputs `setup` needs from the caller.
#[derive(Debug, Clone, Copy)]
pub struct LayerSetupArgs {
    /// Hierarchy to duplicate from.
    pub source_group: NodeId,
    /// Parent for every non-terminal layer copy.
    pub root_group: NodeId,
    /// Parent for the terminal skinned copy.
    pub cage_group: NodeId,
    /// Control parent handed to every operator.
    pub ctrl_parent: NodeId,
    /// Animation set handed to every operator.
    pub anim_set: NodeId,
}

/// Open extension point run against each freshly instantiated operator
/// before its hierarchy is copied.
pub type LayerInitializer<'a> = &'a mut dyn FnMut(&mut dyn LayerOperator);

/// Orchestrates N layers plus the implicit terminal skinned copy.
pub struct LayerManager {
    ctors: Vec<LayerCtor>,
    operators: Vec<Box<dyn LayerOperator>>,
    collected_leaves: Vec<NodeId>,
    skinned_targets: Vec<NodeId>,
    skinned_root: Option<NodeId>,
}

impl LayerManager {
    /// A manager for an ordered list of layer classes. Instances are not
    /// created here; `setup` does that.
    pub fn new(ctors: Vec<LayerCtor>) -> Self {
        Self {
            ctors,
            operators: Vec::new(),
            collected_leaves: Vec::new(),
            skinned_targets: Vec::new(),
            skinned_root: None,
        }
    }

    /// Number of configured layer classes (the terminal skinned copy is not
    /// one of them).
    pub fn layer_count(&self) -> usize {
        self.ctors.len()
    }

    /// Instantiated operators, in registration order. Empty before `setup`.
    pub fn operators(&self) -> &[Box<dyn LayerOperator>] {
        &self.operators
    }

    /// Original source leaves recorded across every copy; each appears
    /// exactly once no matter how many layers copied it.
    pub fn collected_leaves(&self) -> &[NodeId] {
        &self.collected_leaves
    }

    /// Leaves of the terminal skinned copy.
    pub fn skinned_targets(&self) -> &[NodeId] {
        &self.skinned_targets
    }

    pub fn skinned_root(&self) -> Option<NodeId> {
        self.skinned_root
    }

    // ========================================================================
    // Duplication
    // ========================================================================

    /// Recursively copy `source_group` under `dest_parent`.
    ///
    /// Container nodes are recreated as renamed empty groups; geometry
    /// leaves are deep-copied under the renamed parent. Every *original*
    /// source leaf is appended to `collected` exactly once across the whole
    /// run, even though every layer walks the same source. Traversal order
    /// is child insertion order, so the returned leaf list is positionally
    /// stable across layers.
    pub fn copy_hierarchy(
        scene: &mut SceneGraph,
        source_group: NodeId,
        dest_parent: NodeId,
        role_prefix: &str,
        collected: &mut Vec<NodeId>,
    ) -> Result<CopiedHierarchy> {
        let root_name = format!("{}_{}", role_prefix, scene.name(source_group));
        let root = scene.create_node(NodeKind::Transform, &root_name, Some(dest_parent));

        let mut groups = Vec::new();
        let mut leaves = Vec::new();
        Self::copy_children(
            scene,
            source_group,
            root,
            role_prefix,
            &mut groups,
            &mut leaves,
            collected,
        );

        debug!(
            "copied '{}' as '{}': {} group(s), {} leaf(s)",
            scene.name(source_group),
            root_name,
            groups.len(),
            leaves.len()
        );

        Ok(CopiedHierarchy {
            root,
            groups,
            leaves,
        })
    }

    fn copy_children(
        scene: &mut SceneGraph,
        source: NodeId,
        dest: NodeId,
        prefix: &str,
        groups: &mut Vec<NodeId>,
        leaves: &mut Vec<NodeId>,
        collected: &mut Vec<NodeId>,
    ) {
        for child in scene.children(source).to_vec() {
            match scene.kind(child) {
                NodeKind::Transform => {
                    let name = format!("{}_{}", prefix, scene.name(child));
                    let group = scene.create_node(NodeKind::Transform, &name, Some(dest));
                    groups.push(group);
                    Self::copy_children(scene, child, group, prefix, groups, leaves, collected);
                }
                NodeKind::Mesh => {
                    let copy = scene.duplicate(child, Some(dest));
                    let name = format!("{}_{}", prefix, scene.name(child));
                    scene.rename(copy, &name);
                    leaves.push(copy);
                    // idempotent membership across all layers of the run
                    if !collected.contains(&child) {
                        collected.push(child);
                    }
                }
                // units, sets, and utility nodes never ride along
                _ => {}
            }
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Instantiate every layer, duplicate the source once per layer plus the
    /// terminal skinned copy, and chain consecutive copies leaf-by-leaf.
    ///
    /// N configured classes always yield N+1 duplicated hierarchies. The
    /// optional `initializer` runs against each fresh instance before its
    /// hierarchy is copied.
    pub fn setup(
        &mut self,
        rig: &mut Rig,
        _ctx: &mut BuildContext,
        args: LayerSetupArgs,
        mut initializer: Option<LayerInitializer<'_>>,
    ) -> Result<()> {
        // instantiate + duplicate, one pass per configured class
        for ctor in self.ctors.clone() {
            let mut op = ctor();
            {
                let state = op.state_mut();
                state.source_group = Some(args.source_group);
                state.ctrl_parent = Some(args.ctrl_parent);
                state.anim_set = Some(args.anim_set);
            }
            if let Some(init) = initializer.as_deref_mut() {
                init(op.as_mut());
            }

            let copied = Self::copy_hierarchy(
                &mut rig.scene,
                args.source_group,
                args.root_group,
                op.name(),
                &mut self.collected_leaves,
            )?;
            let state = op.state_mut();
            state.root_group = Some(copied.root);
            state.target_objects = copied.leaves;
            self.operators.push(op);
        }

        // implicit terminal skinned copy, parented under the cage
        let skinned = Self::copy_hierarchy(
            &mut rig.scene,
            args.source_group,
            args.cage_group,
            SKINNED_PREFIX,
            &mut self.collected_leaves,
        )?;
        self.skinned_root = Some(skinned.root);
        self.skinned_targets = skinned.leaves;

        self.wire_chain(&mut rig.scene);
        Ok(())
    }

    /// Connect leaf i of each copy to leaf i of the next: a strict linear
    /// chain with no branching and no cycles.
    fn wire_chain(&self, scene: &mut SceneGraph) {
        let mut rows: Vec<&[NodeId]> = self
            .operators
            .iter()
            .map(|op| op.state().target_objects.as_slice())
            .collect();
        rows.push(&self.skinned_targets);

        for pair in rows.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            for (prev_leaf, cur_leaf) in prev.iter().zip(cur.iter()) {
                scene.connect(Plug::new(*prev_leaf, LEAF_OUT), Plug::new(*cur_leaf, LEAF_IN));
            }
        }
    }

    // ========================================================================
    // Lifecycle fan-out
    // ========================================================================
    // Each method walks the instantiated operators in registration order.
    // Duplication for all layers finished inside `setup`, before any of
    // these run.

    pub fn pre_setup_layers(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        for op in &mut self.operators {
            op.pre_setup(rig, ctx)?;
        }
        Ok(())
    }

    pub fn post_pre_setup_layers(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        for op in &mut self.operators {
            op.post_pre_setup(rig, ctx)?;
        }
        Ok(())
    }

    pub fn setup_layers(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        for op in &mut self.operators {
            op.setup(rig, ctx)?;
        }
        Ok(())
    }

    pub fn post_process_layers(&mut self, rig: &mut Rig, ctx: &mut BuildContext) -> Result<()> {
        for op in &mut self.operators {
            op.post_process(rig, ctx)?;
        }
        Ok(())
    }

    // ========================================================================
    // Visibility fan-out
    // ========================================================================

    /// Broadcast (not chain) one visibility source plug to every control any
    /// layer registered. Returns the number of live connections afterwards;
    /// duplicate registrations or repeat calls never double-connect.
    pub fn connect_visibility(&self, scene: &mut SceneGraph, source: &Plug) -> usize {
        let mut count = 0;
        for op in &self.operators {
            for ctrl in op.state().hidden_controls() {
                let dst = Plug::new(*ctrl, "visibility");
                scene.connect(source.clone(), dst.clone());
                if scene.is_connected(source, &dst) {
                    count += 1;
                }
            }
        }
        count
    }
}

impl std::fmt::Debug for LayerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerManager")
            .field("classes", &self.ctors.len())
            .field(
                "operators",
                &self.operators.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .field("collected_leaves", &self.collected_leaves.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::operator::LayerState;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    struct PlainLayer {
        name: &'static str,
        state: LayerState,
    }

    impl LayerOperator for PlainLayer {
        fn name(&self) -> &str {
            self.name
        }
        fn state(&self) -> &LayerState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut LayerState {
            &mut self.state
        }
    }

    fn bend_ctor() -> Box<dyn LayerOperator> {
        Box::new(PlainLayer {
            name: "bend",
            state: LayerState::default(),
        })
    }

    fn twist_ctor() -> Box<dyn LayerOperator> {
        Box::new(PlainLayer {
            name: "twist",
            state: LayerState::default(),
        })
    }

    /// geo_grp > meshes_grp > [body_C_msh, head_C_msh]
    fn rig_with_source() -> (Rig, LayerSetupArgs, Vec<NodeId>) {
        let mut rig = Rig::new("test");
        let source = rig.create_group("geo_grp", rig.model_group());
        let meshes = rig.create_group("meshes_grp", source);
        let body = rig
            .scene
            .create_node(NodeKind::Mesh, "body_C_msh", Some(meshes));
        let head = rig
            .scene
            .create_node(NodeKind::Mesh, "head_C_msh", Some(meshes));
        let root_group = rig.create_group("layers_grp", rig.setup_group());
        let cage_group = rig.create_group("cage_grp", rig.setup_group());
        let ctrl_parent = rig.create_group("layerCtl_grp", rig.ctrl_group());
        let anim_set = rig.create_anim_set("layers", crate::scene::Position::Center);
        let args = LayerSetupArgs {
            source_group: source,
            root_group,
            cage_group,
            ctrl_parent,
            anim_set,
        };
        (rig, args, vec![body, head])
    }

    #[test]
    fn test_copy_hierarchy_shape() {
        let (mut rig, args, source_leaves) = rig_with_source();
        let mut collected = Vec::new();
        let copied = LayerManager::copy_hierarchy(
            &mut rig.scene,
            args.source_group,
            args.root_group,
            "bend",
            &mut collected,
        )
        .unwrap();

        assert_eq!(rig.scene.name(copied.root), "bend_geo_grp");
        assert_eq!(copied.groups.len(), 1);
        assert_eq!(rig.scene.name(copied.groups[0]), "bend_meshes_grp");
        assert_eq!(copied.leaves.len(), 2);
        assert_eq!(rig.scene.name(copied.leaves[0]), "bend_body_C_msh");
        assert_eq!(rig.scene.name(copied.leaves[1]), "bend_head_C_msh");
        // originals collected, not the copies
        assert_eq!(collected, source_leaves);
    }

    #[test]
    fn test_collected_leaves_idempotent_across_copies() {
        let (mut rig, args, source_leaves) = rig_with_source();
        let mut collected = Vec::new();
        for prefix in ["bend", "twist", "skinned"] {
            LayerManager::copy_hierarchy(
                &mut rig.scene,
                args.source_group,
                args.root_group,
                prefix,
                &mut collected,
            )
            .unwrap();
        }
        assert_eq!(collected, source_leaves);
    }

    #[test_case(0; "no layer classes")]
    #[test_case(1; "one layer class")]
    #[test_case(2; "two layer classes")]
    fn test_setup_yields_n_plus_one_hierarchies(n: usize) {
        let ctors: Vec<LayerCtor> = [bend_ctor as LayerCtor, twist_ctor as LayerCtor][..n].to_vec();
        let (mut rig, args, _) = rig_with_source();
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(ctors);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();

        // N operator hierarchies under the layer root...
        assert_eq!(rig.scene.children(args.root_group).len(), n);
        // ...plus the implicit terminal copy under the cage
        assert_eq!(rig.scene.children(args.cage_group).len(), 1);
        assert_eq!(manager.operators().len(), n);
        assert_eq!(manager.collected_leaves().len(), 2);
    }

    #[test]
    fn test_chain_wiring_is_index_aligned() {
        let (mut rig, args, _) = rig_with_source();
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![bend_ctor as LayerCtor, twist_ctor as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();

        let bend = &manager.operators()[0].state().target_objects;
        let twist = &manager.operators()[1].state().target_objects;
        let skinned = manager.skinned_targets();

        for k in 0..2 {
            assert!(rig.scene.is_connected(
                &Plug::new(bend[k], LEAF_OUT),
                &Plug::new(twist[k], LEAF_IN)
            ));
            assert!(rig.scene.is_connected(
                &Plug::new(twist[k], LEAF_OUT),
                &Plug::new(skinned[k], LEAF_IN)
            ));
        }
        // never cross-index
        assert!(!rig.scene.is_connected(
            &Plug::new(bend[0], LEAF_OUT),
            &Plug::new(twist[1], LEAF_IN)
        ));
        // chain length: exactly N connections per leaf column
        assert_eq!(rig.scene.connections().len(), 4);
    }

    #[test]
    fn test_layer_initializer_runs_per_instance() {
        let (mut rig, args, _) = rig_with_source();
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![bend_ctor as LayerCtor, twist_ctor as LayerCtor]);
        let mut seen = Vec::new();
        let mut init = |op: &mut dyn LayerOperator| {
            seen.push(op.name().to_string());
        };
        manager
            .setup(&mut rig, &mut ctx, args, Some(&mut init))
            .unwrap();
        assert_eq!(seen, vec!["bend", "twist"]);
    }

    #[test]
    fn test_visibility_fan_out_counts_and_dedup() {
        let (mut rig, args, _) = rig_with_source();
        let mut ctx = BuildContext::new();
        let mut manager = LayerManager::new(vec![bend_ctor as LayerCtor, twist_ctor as LayerCtor]);
        manager.setup(&mut rig, &mut ctx, args, None).unwrap();

        let c1 = rig.create_group("a_C_ctl", args.ctrl_parent);
        let c2 = rig.create_group("b_C_ctl", args.ctrl_parent);
        let c3 = rig.create_group("c_C_ctl", args.ctrl_parent);
        manager.operators[0].state_mut().add_hidden_control(c1);
        manager.operators[0].state_mut().add_hidden_control(c2);
        manager.operators[1].state_mut().add_hidden_control(c3);

        let source = Plug::new(rig.root(), "layerVis");
        let connected = manager.connect_visibility(&mut rig.scene, &source);
        assert_eq!(connected, 3);

        // repeat fan-out adds nothing
        let before = rig.scene.connections().len();
        manager.connect_visibility(&mut rig.scene, &source);
        assert_eq!(rig.scene.connections().len(), before);
    }
}
