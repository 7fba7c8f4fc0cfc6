//! Arena scene graph
//!
//! The scene is the single owning store for every node; all other components
//! hold opaque `NodeId` handles into it. Nodes are never deleted, so a handle
//! stays valid for the lifetime of the graph it came from.
//!
//! The whole arena serializes to JSON, which is how a build's persisted state
//! (Unit member tables included) survives save/reload.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Opaque handle to a node in a [`SceneGraph`] arena.
///
/// Handles are plain indices: cheap to copy, meaningless outside the graph
/// that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw index, for display only.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of node types the construction pipeline works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Plain transform / group container
    Transform,
    /// Bind-skeleton joint
    Joint,
    /// Geometry-bearing leaf
    Mesh,
    /// Non-DAG utility node (units, decompose helpers, deformer bindings)
    Network,
    /// Animation set
    ObjectSet,
}

/// Attribute values storable on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vec3([f64; 3]),
    Node(NodeId),
    NodeList(Vec<NodeId>),
    StrList(Vec<String>),
}

/// One end of a directed attribute connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plug {
    pub node: NodeId,
    pub attr: String,
}

impl Plug {
    pub fn new(node: NodeId, attr: &str) -> Self {
        Self {
            node,
            attr: attr.to_string(),
        }
    }
}

/// A directed source → destination attribute connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub src: Plug,
    pub dst: Plug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    kind: NodeKind,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: BTreeMap<String, AttrValue>,
}

/// Owning arena for the whole scene.
///
/// Names are NOT identities: two nodes may carry the same name, and lookups
/// by name return the first match in creation order. Rebuilding with the same
/// inputs produces colliding names, not idempotent updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl SceneGraph {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Node creation and hierarchy
    // ========================================================================

    /// Create a node, optionally parented. Returns its handle.
    pub fn create_node(&mut self, kind: NodeKind, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            attrs: BTreeMap::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.index()].children.push(id);
        }
        id
    }

    /// Move a node under a new parent (or to the root when `None`).
    pub fn reparent(&mut self, node: NodeId, new_parent: Option<NodeId>) -> NodeId {
        if let Some(old) = self.nodes[node.index()].parent {
            let siblings = &mut self.nodes[old.index()].children;
            siblings.retain(|c| *c != node);
        }
        self.nodes[node.index()].parent = new_parent;
        if let Some(p) = new_parent {
            self.nodes[p.index()].children.push(node);
        }
        node
    }

    /// Deep-copy `node` and its whole subtree under `parent`.
    ///
    /// Attributes are copied verbatim; connections are not. The copy keeps
    /// the source names (callers rename afterwards if they care).
    pub fn duplicate(&mut self, node: NodeId, parent: Option<NodeId>) -> NodeId {
        let source = self.nodes[node.index()].clone();
        let copy = self.create_node(source.kind, &source.name, parent);
        self.nodes[copy.index()].attrs = source.attrs;
        for child in source.children {
            self.duplicate(child, Some(copy));
        }
        copy
    }

    /// Rename a node in place.
    pub fn rename(&mut self, node: NodeId, name: &str) {
        self.nodes[node.index()].name = name.to_string();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.index()].name
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.index()].kind
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    /// Children in creation/insertion order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Children filtered down to one node kind, order preserved.
    pub fn children_of_kind(&self, node: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| self.kind(*c) == kind)
            .collect()
    }

    /// First node with this name, in creation order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u32))
    }

    /// Like [`find`](Self::find) but failing to find the node is an error.
    pub fn require(&self, name: &str) -> Result<NodeId> {
        self.find(name).ok_or_else(|| RigError::NodeNotFound {
            name: name.to_string(),
        })
    }

    /// Direct child of `parent` with the given name.
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.name(*c) == name)
    }

    /// Pre-order traversal of the subtree below `node` (excluding `node`).
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            for c in self.children(n).iter().rev() {
                stack.push(*c);
            }
        }
        out
    }

    /// Pipe-delimited path from the root, e.g. `|rig|geo_grp|body_C_msh`.
    pub fn path(&self, node: NodeId) -> String {
        let mut parts = vec![self.name(node).to_string()];
        let mut cur = node;
        while let Some(p) = self.parent(cur) {
            parts.push(self.name(p).to_string());
            cur = p;
        }
        parts.reverse();
        format!("|{}", parts.join("|"))
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles to every node, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Set (or overwrite) an attribute value.
    pub fn set_attr(&mut self, node: NodeId, attr: &str, value: AttrValue) {
        self.nodes[node.index()]
            .attrs
            .insert(attr.to_string(), value);
    }

    /// Raw attribute lookup.
    pub fn attr(&self, node: NodeId, attr: &str) -> Option<&AttrValue> {
        self.nodes[node.index()].attrs.get(attr)
    }

    fn require_attr(&self, node: NodeId, attr: &str) -> Result<&AttrValue> {
        self.attr(node, attr)
            .ok_or_else(|| RigError::AttributeMissing {
                node: self.name(node).to_string(),
                attr: attr.to_string(),
            })
    }

    fn attr_type_err(&self, node: NodeId, attr: &str, expected: &'static str) -> RigError {
        RigError::AttributeType {
            node: self.name(node).to_string(),
            attr: attr.to_string(),
            expected,
        }
    }

    pub fn attr_bool(&self, node: NodeId, attr: &str) -> Result<bool> {
        match self.require_attr(node, attr)? {
            AttrValue::Bool(b) => Ok(*b),
            _ => Err(self.attr_type_err(node, attr, "bool")),
        }
    }

    pub fn attr_int(&self, node: NodeId, attr: &str) -> Result<i64> {
        match self.require_attr(node, attr)? {
            AttrValue::Int(i) => Ok(*i),
            _ => Err(self.attr_type_err(node, attr, "int")),
        }
    }

    pub fn attr_str(&self, node: NodeId, attr: &str) -> Result<&str> {
        match self.require_attr(node, attr)? {
            AttrValue::Str(s) => Ok(s.as_str()),
            _ => Err(self.attr_type_err(node, attr, "string")),
        }
    }

    pub fn attr_vec3(&self, node: NodeId, attr: &str) -> Result<[f64; 3]> {
        match self.require_attr(node, attr)? {
            AttrValue::Vec3(v) => Ok(*v),
            _ => Err(self.attr_type_err(node, attr, "vec3")),
        }
    }

    pub fn attr_node(&self, node: NodeId, attr: &str) -> Result<NodeId> {
        match self.require_attr(node, attr)? {
            AttrValue::Node(n) => Ok(*n),
            _ => Err(self.attr_type_err(node, attr, "node reference")),
        }
    }

    pub fn attr_node_list(&self, node: NodeId, attr: &str) -> Result<Vec<NodeId>> {
        match self.require_attr(node, attr)? {
            AttrValue::NodeList(l) => Ok(l.clone()),
            _ => Err(self.attr_type_err(node, attr, "node reference list")),
        }
    }

    pub fn attr_str_list(&self, node: NodeId, attr: &str) -> Result<Vec<String>> {
        match self.require_attr(node, attr)? {
            AttrValue::StrList(l) => Ok(l.clone()),
            _ => Err(self.attr_type_err(node, attr, "string list")),
        }
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Connect a source plug to a destination plug.
    ///
    /// Re-connecting an identical pair is a no-op, so broadcast fan-outs can
    /// call this blindly without producing duplicate edges.
    pub fn connect(&mut self, src: Plug, dst: Plug) {
        if self.is_connected(&src, &dst) {
            return;
        }
        self.connections.push(Connection { src, dst });
    }

    pub fn is_connected(&self, src: &Plug, dst: &Plug) -> bool {
        self.connections
            .iter()
            .any(|c| &c.src == src && &c.dst == dst)
    }

    /// Plugs feeding into `dst`.
    pub fn inputs_of(&self, dst: &Plug) -> Vec<&Plug> {
        self.connections
            .iter()
            .filter(|c| &c.dst == dst)
            .map(|c| &c.src)
            .collect()
    }

    /// Plugs driven by `src`.
    pub fn outputs_of(&self, src: &Plug) -> Vec<&Plug> {
        self.connections
            .iter()
            .filter(|c| &c.src == src)
            .map(|c| &c.dst)
            .collect()
    }

    /// All connections, in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save the whole arena as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load an arena previously written by [`save`](Self::save).
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let scene = serde_json::from_reader(BufReader::new(file))?;
        Ok(scene)
    }
}
