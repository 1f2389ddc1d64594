use std::collections::{HashMap, HashSet, VecDeque};

use refscan_core::{
    FieldEnumerable, FieldKind, GraphAttachment, GraphNode, ObjectGraph, ObjectId, RefScanError,
    Result, TemplateLink,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotField {
    pub name: String,
    pub kind: FieldKind,
    pub target: ObjectId,
    /// Whether `target` resolved to a live object when links were last resolved.
    pub live: bool,
}

impl SnapshotField {
    /// An object reference whose liveness is decided by [`SnapshotGraph::resolve_links`].
    pub fn reference(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ObjectReference,
            target,
            live: false,
        }
    }

    pub fn resolved(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            live: true,
            ..Self::reference(name, target)
        }
    }

    pub fn dangling(name: impl Into<String>, target: ObjectId) -> Self {
        Self::reference(name, target)
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self::reference(name, ObjectId::NIL)
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Value,
            target: ObjectId::NIL,
            live: false,
        }
    }
}

impl FieldEnumerable for SnapshotField {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn identifier(&self) -> ObjectId {
        self.target
    }

    fn live_handle_is_null(&self) -> bool {
        !self.live
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotComponent {
    pub id: ObjectId,
    pub type_name: String,
    pub resolvable: bool,
    pub fields: Vec<SnapshotField>,
}

impl SnapshotComponent {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::NIL,
            type_name: type_name.into(),
            resolvable: true,
            fields: Vec::new(),
        }
    }

    /// A component slot whose script or type no longer exists.
    pub fn missing() -> Self {
        Self {
            resolvable: false,
            ..Self::new("")
        }
    }

    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = id;
        self
    }

    pub fn with_field(mut self, field: SnapshotField) -> Self {
        self.fields.push(field);
        self
    }
}

impl GraphAttachment for SnapshotComponent {
    type Field = SnapshotField;

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn is_resolvable(&self) -> bool {
        self.resolvable
    }

    fn fields(&self) -> &[SnapshotField] {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    pub id: ObjectId,
    pub name: String,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub template: TemplateLink,
    pub asset_path: Option<String>,
    pub components: Vec<SnapshotComponent>,
}

impl SnapshotNode {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            template: TemplateLink::none(),
            asset_path: None,
            components: Vec::new(),
        }
    }
}

impl GraphNode for SnapshotNode {
    type Attachment = SnapshotComponent;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    fn children(&self) -> &[ObjectId] {
        &self.children
    }

    fn template(&self) -> &TemplateLink {
        &self.template
    }

    fn asset_path(&self) -> Option<&str> {
        self.asset_path.as_deref()
    }

    fn attachment_count(&self) -> usize {
        self.components.len()
    }

    fn attachment(&self, index: usize) -> Option<&SnapshotComponent> {
        self.components.get(index)
    }
}

/// Arena of nodes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SnapshotGraph {
    nodes: HashMap<ObjectId, SnapshotNode>,
    next_id: u64,
}

impl SnapshotGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node with a fresh id, appended to `parent`'s children.
    pub fn add_node(&mut self, parent: Option<ObjectId>, name: impl Into<String>) -> ObjectId {
        let id = ObjectId(self.next_id.max(1));
        let mut node = SnapshotNode::new(id, name);
        node.parent = parent;
        self.next_id = id.0 + 1;
        self.nodes.insert(id, node);
        if let Some(parent) = parent {
            self.link_child(parent, id);
        }
        id
    }

    /// Inserts a node as-is. Children lists are not touched.
    pub fn insert_node(&mut self, node: SnapshotNode) -> Result<()> {
        if node.id.is_nil() {
            return Err(RefScanError::Host(format!(
                "node {:?} has the nil identifier",
                node.name
            )));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(RefScanError::Host(format!(
                "duplicate object id {}",
                node.id
            )));
        }
        self.next_id = self.next_id.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Appends `child` to `parent`'s children, whether or not `child` exists.
    pub fn link_child(&mut self, parent: ObjectId, child: ObjectId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    /// Drops a node from the arena, leaving references to it dangling.
    pub fn remove_node(&mut self, id: ObjectId) -> Option<SnapshotNode> {
        self.nodes.remove(&id)
    }

    pub fn node_mut(&mut self, id: ObjectId) -> Option<&mut SnapshotNode> {
        self.nodes.get_mut(&id)
    }

    pub fn add_component(&mut self, node: ObjectId, component: SnapshotComponent) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.components.push(component);
        }
    }

    pub fn set_template(&mut self, node: ObjectId, template: TemplateLink) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.template = template;
        }
    }

    pub fn set_asset_path(&mut self, node: ObjectId, path: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.asset_path = Some(path.into());
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.nodes.keys().copied()
    }

    /// Node ids plus the ids of every component that carries one.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.nodes.values().flat_map(|node| {
            std::iter::once(node.id).chain(
                node.components
                    .iter()
                    .map(|c| c.id)
                    .filter(|id| !id.is_nil()),
            )
        })
    }

    /// Marks reference fields live when their target is in `live`, and
    /// template links resolved when their source is in `templates`.
    pub fn resolve_links(&mut self, live: &HashSet<ObjectId>, templates: &HashSet<String>) {
        for node in self.nodes.values_mut() {
            if let Some(source) = &node.template.source {
                node.template.resolved = templates.contains(source);
            }
            for component in &mut node.components {
                for field in &mut component.fields {
                    if field.kind == FieldKind::ObjectReference {
                        field.live = !field.target.is_nil() && live.contains(&field.target);
                    }
                }
            }
        }
    }

    /// Copies the subtree under `root` into a new graph with `root` detached.
    pub fn subtree(&self, root: ObjectId) -> Option<SnapshotGraph> {
        let mut copy = SnapshotGraph::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let mut node = node.clone();
            if id == root {
                node.parent = None;
            }
            queue.extend(node.children.iter().copied());
            copy.next_id = copy.next_id.max(id.0 + 1);
            copy.nodes.insert(id, node);
        }
        if copy.nodes.contains_key(&root) {
            Some(copy)
        } else {
            None
        }
    }
}

impl ObjectGraph for SnapshotGraph {
    type Node = SnapshotNode;

    fn node(&self, id: ObjectId) -> Option<&SnapshotNode> {
        self.nodes.get(&id)
    }
}
