//! Persisted Unit nodes
//!
//! A Unit is a `Network` node recording named references ("members") created
//! during the Joint phase, read back during the Rig phase. It is owned by the
//! scene itself; `Unit` values are only transient handles to it, so the member
//! table survives scene save/reload.
//!
//! Member roles are declared up front at creation time. Registering a member
//! under an undeclared role is an error, which keeps the member table a closed
//! contract between a recipe's Joint and Rig phases.

use crate::error::{Result, RigError};
use crate::scene::{AttrValue, NameBuilder, NodeId, NodeKind, NodeRole, Position, SceneGraph};

const ATTR_UNIT_TYPE: &str = "unitType";
const ATTR_POSITION: &str = "position";
const ATTR_SUFFIX: &str = "suffix";
const ATTR_IS_SETUP: &str = "isSetup";
const ATTR_ROLES: &str = "memberRoles";
const MEMBER_PREFIX: &str = "member_";

/// Transient handle to a persisted Unit node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    node: NodeId,
}

impl Unit {
    /// Create the Unit node for a construction run.
    ///
    /// Called exactly once per run, during the Joint phase. Declares the
    /// closed set of member roles later stages may register against.
    pub fn create(
        scene: &mut SceneGraph,
        base: &str,
        unit_type: &str,
        position: Position,
        suffix: Option<&str>,
        roles: &[&str],
        parent: Option<NodeId>,
    ) -> Self {
        let name = Self::unit_name(base, position, suffix);
        let node = scene.create_node(NodeKind::Network, &name, parent);
        scene.set_attr(node, ATTR_UNIT_TYPE, AttrValue::Str(unit_type.to_string()));
        scene.set_attr(node, ATTR_POSITION, AttrValue::Int(position.index()));
        scene.set_attr(
            node,
            ATTR_SUFFIX,
            AttrValue::Str(suffix.unwrap_or_default().to_string()),
        );
        scene.set_attr(node, ATTR_IS_SETUP, AttrValue::Bool(false));
        scene.set_attr(
            node,
            ATTR_ROLES,
            AttrValue::StrList(roles.iter().map(|r| r.to_string()).collect()),
        );
        Self { node }
    }

    /// Look up an existing Unit by its composed name.
    ///
    /// This is the Rig-phase entry point; a missing Unit is immediately
    /// fatal and never retried.
    pub fn find(
        scene: &SceneGraph,
        base: &str,
        position: Position,
        suffix: Option<&str>,
    ) -> Result<Self> {
        let name = Self::unit_name(base, position, suffix);
        let node = scene
            .find(&name)
            .filter(|n| scene.kind(*n) == NodeKind::Network)
            .ok_or(RigError::UnitNotFound { name })?;
        Ok(Self { node })
    }

    fn unit_name(base: &str, position: Position, suffix: Option<&str>) -> String {
        let mut builder = NameBuilder::new(base)
            .with_position(position)
            .with_role(NodeRole::Unit);
        if let Some(suffix) = suffix {
            builder = builder.with_suffix(suffix);
        }
        builder.compose()
    }

    /// Wrap a node already known to be a Unit (e.g. while walking a loaded
    /// scene). No validation happens here.
    pub fn from_node(node: NodeId) -> Self {
        Self { node }
    }

    /// The underlying scene node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name<'a>(&self, scene: &'a SceneGraph) -> &'a str {
        scene.name(self.node)
    }

    pub fn unit_type(&self, scene: &SceneGraph) -> Result<String> {
        Ok(scene.attr_str(self.node, ATTR_UNIT_TYPE)?.to_string())
    }

    pub fn position(&self, scene: &SceneGraph) -> Result<Position> {
        let index = scene.attr_int(self.node, ATTR_POSITION)?;
        Position::from_index(index).ok_or_else(|| RigError::AttributeType {
            node: self.name(scene).to_string(),
            attr: ATTR_POSITION.to_string(),
            expected: "position index",
        })
    }

    pub fn suffix(&self, scene: &SceneGraph) -> Result<String> {
        Ok(scene.attr_str(self.node, ATTR_SUFFIX)?.to_string())
    }

    /// Roles declared at creation, in declaration order.
    pub fn declared_roles(&self, scene: &SceneGraph) -> Result<Vec<String>> {
        scene.attr_str_list(self.node, ATTR_ROLES)
    }

    fn check_role(&self, scene: &SceneGraph, role: &str) -> Result<()> {
        let declared = self.declared_roles(scene)?;
        if declared.iter().any(|r| r == role) {
            Ok(())
        } else {
            Err(RigError::UndeclaredMember {
                unit: self.name(scene).to_string(),
                role: role.to_string(),
            })
        }
    }

    /// Register a single node under a declared role.
    ///
    /// Re-registering a role overwrites the previous reference.
    pub fn register_member(&self, scene: &mut SceneGraph, role: &str, node: NodeId) -> Result<()> {
        self.check_role(scene, role)?;
        let attr = format!("{}{}", MEMBER_PREFIX, role);
        scene.set_attr(self.node, &attr, AttrValue::Node(node));
        Ok(())
    }

    /// Register a list of nodes under a declared role.
    pub fn register_members(
        &self,
        scene: &mut SceneGraph,
        role: &str,
        nodes: &[NodeId],
    ) -> Result<()> {
        self.check_role(scene, role)?;
        let attr = format!("{}{}", MEMBER_PREFIX, role);
        scene.set_attr(self.node, &attr, AttrValue::NodeList(nodes.to_vec()));
        Ok(())
    }

    /// Look up a single-node member.
    pub fn member(&self, scene: &SceneGraph, role: &str) -> Result<NodeId> {
        let attr = format!("{}{}", MEMBER_PREFIX, role);
        match scene.attr(self.node, &attr) {
            Some(AttrValue::Node(n)) => Ok(*n),
            _ => Err(RigError::MemberNotFound {
                unit: self.name(scene).to_string(),
                role: role.to_string(),
            }),
        }
    }

    /// Look up a member as a list; a single reference yields a one-element
    /// list.
    pub fn members(&self, scene: &SceneGraph, role: &str) -> Result<Vec<NodeId>> {
        let attr = format!("{}{}", MEMBER_PREFIX, role);
        match scene.attr(self.node, &attr) {
            Some(AttrValue::Node(n)) => Ok(vec![*n]),
            Some(AttrValue::NodeList(l)) => Ok(l.clone()),
            _ => Err(RigError::MemberNotFound {
                unit: self.name(scene).to_string(),
                role: role.to_string(),
            }),
        }
    }

    /// True once rig construction actually ran against this Unit.
    pub fn is_setup(&self, scene: &SceneGraph) -> Result<bool> {
        scene.attr_bool(self.node, ATTR_IS_SETUP)
    }

    /// Flag the Unit as having been through the Rig phase.
    pub fn mark_setup(&self, scene: &mut SceneGraph) {
        scene.set_attr(self.node, ATTR_IS_SETUP, AttrValue::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scene_with_unit() -> (SceneGraph, Unit, NodeId) {
        let mut scene = SceneGraph::new();
        let joint = scene.create_node(NodeKind::Joint, "arm_L_jnt", None);
        let unit = Unit::create(
            &mut scene,
            "arm",
            "chain",
            Position::Left,
            None,
            &["joints", "root_joint"],
            None,
        );
        (scene, unit, joint)
    }

    #[test]
    fn test_create_and_find() {
        let (scene, unit, _) = scene_with_unit();
        assert_eq!(unit.name(&scene), "arm_L_unit");
        assert_eq!(unit.unit_type(&scene).unwrap(), "chain");
        assert_eq!(unit.position(&scene).unwrap(), Position::Left);
        assert!(!unit.is_setup(&scene).unwrap());

        let found = Unit::find(&scene, "arm", Position::Left, None).unwrap();
        assert_eq!(found.node(), unit.node());
    }

    #[test]
    fn test_find_missing_is_fatal() {
        let scene = SceneGraph::new();
        let err = Unit::find(&scene, "leg", Position::Right, None).unwrap_err();
        assert!(matches!(err, RigError::UnitNotFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_member_registration_and_lookup() {
        let (mut scene, unit, joint) = scene_with_unit();
        unit.register_member(&mut scene, "root_joint", joint).unwrap();
        unit.register_members(&mut scene, "joints", &[joint]).unwrap();

        assert_eq!(unit.member(&scene, "root_joint").unwrap(), joint);
        assert_eq!(unit.members(&scene, "joints").unwrap(), vec![joint]);
        // single member reads back as a one-element list too
        assert_eq!(unit.members(&scene, "root_joint").unwrap(), vec![joint]);
    }

    #[test]
    fn test_undeclared_role_rejected() {
        let (mut scene, unit, joint) = scene_with_unit();
        let err = unit
            .register_member(&mut scene, "ctrls", joint)
            .unwrap_err();
        assert!(matches!(err, RigError::UndeclaredMember { .. }));
    }

    #[test]
    fn test_missing_member_lookup() {
        let (scene, unit, _) = scene_with_unit();
        let err = unit.member(&scene, "root_joint").unwrap_err();
        assert!(matches!(err, RigError::MemberNotFound { .. }));
    }

    #[test]
    fn test_members_survive_save_load() {
        let (mut scene, unit, joint) = scene_with_unit();
        unit.register_members(&mut scene, "joints", &[joint]).unwrap();
        unit.mark_setup(&mut scene);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        scene.save(&path).unwrap();

        let loaded = SceneGraph::load(&path).unwrap();
        let found = Unit::find(&loaded, "arm", Position::Left, None).unwrap();
        assert_eq!(found.members(&loaded, "joints").unwrap(), vec![joint]);
        assert!(found.is_setup(&loaded).unwrap());
    }
}
