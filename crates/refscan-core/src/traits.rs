use crate::{FieldKind, FieldState, ObjectId, Result, SceneEntry, TemplateLink};

/// A serialized slot on an attachment, as exposed by the host's property iteration.
pub trait FieldEnumerable {
    fn name(&self) -> &str;
    fn kind(&self) -> FieldKind;
    /// Stored identifier. `ObjectId::NIL` when the slot was never assigned.
    fn identifier(&self) -> ObjectId;
    fn live_handle_is_null(&self) -> bool;

    fn state(&self) -> FieldState {
        if !self.live_handle_is_null() {
            FieldState::Resolved
        } else if self.identifier().is_nil() {
            FieldState::Unset
        } else {
            FieldState::Dangling
        }
    }
}

/// A typed unit hosted by exactly one node (a component).
pub trait GraphAttachment {
    type Field: FieldEnumerable;

    fn type_name(&self) -> &str;
    /// False when the slot is occupied at the storage level but has no live instance.
    fn is_resolvable(&self) -> bool;
    fn fields(&self) -> &[Self::Field];
}

pub trait GraphNode {
    type Attachment: GraphAttachment;

    fn id(&self) -> ObjectId;
    fn name(&self) -> &str;
    fn parent(&self) -> Option<ObjectId>;
    /// Children in declared sibling order.
    fn children(&self) -> &[ObjectId];
    fn template(&self) -> &TemplateLink;
    /// Path of the asset the node is stored in, if any.
    fn asset_path(&self) -> Option<&str>;
    fn attachment_count(&self) -> usize;
    fn attachment(&self, index: usize) -> Option<&Self::Attachment>;
}

/// Read-only access to a host object graph.
pub trait ObjectGraph {
    type Node: GraphNode;

    /// `None` when the node is absent or no longer loaded.
    fn node(&self, id: ObjectId) -> Option<&Self::Node>;

    fn root_of(&self, id: ObjectId) -> Option<&Self::Node> {
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent().and_then(|p| self.node(p)) {
            current = parent;
        }
        Some(current)
    }

    /// `<rootName>/<path below root>` for nested nodes, the bare name for roots.
    fn full_path(&self, id: ObjectId) -> Option<String> {
        let mut segments = vec![self.node(id)?.name().to_string()];
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent().and_then(|p| self.node(p)) {
            segments.push(parent.name().to_string());
            current = parent;
        }
        segments.reverse();
        Some(segments.join("/"))
    }
}

/// Receives progress updates. `fraction` is in `0.0..=1.0`.
pub trait ProgressSink {
    fn report(&mut self, label: &str, detail: &str, fraction: f32);
}

/// Headless progress sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _label: &str, _detail: &str, _fraction: f32) {}
}

/// Interactive channel for per-occurrence diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl DiagnosticSink for NoDiagnostics {
    fn emit(&mut self, _message: &str) {}
}

/// An opened scene: the graph that owns it and its top-level nodes in order.
pub struct OpenScene<'a, G> {
    pub path: String,
    pub graph: &'a G,
    pub roots: Vec<ObjectId>,
}

/// A loaded node asset.
pub struct AssetTree<'a, G> {
    pub path: String,
    pub graph: &'a G,
    pub root: ObjectId,
}

/// A scan-local copy of a template asset. Must be handed back through
/// [`ProjectHost::release_instance`].
pub struct Instantiated<G> {
    pub source: String,
    pub graph: G,
    pub root: ObjectId,
}

/// Root enumeration and loading, supplied by the host environment.
pub trait ProjectHost {
    type Graph: ObjectGraph;

    fn build_scenes(&self) -> Vec<SceneEntry>;
    fn active_scene(&self) -> Option<String>;
    fn open_scene(&self, path: &str) -> Result<OpenScene<'_, Self::Graph>>;
    fn asset_paths(&self) -> Vec<String>;
    /// `Ok(None)` when the asset exists but is not a node asset.
    fn load_asset(&self, path: &str) -> Result<Option<AssetTree<'_, Self::Graph>>>;
    fn instantiate_template(&self, path: &str) -> Result<Instantiated<Self::Graph>>;
    fn release_instance(&self, instance: Instantiated<Self::Graph>);
}
