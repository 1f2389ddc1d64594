//! JSON project snapshots and the [`ProjectHost`] backed by them.
//!
//! A snapshot captures the scenes, build settings and assets of a project as
//! plain data. Liveness is decided once at load time: a reference resolves when
//! its target id belongs to any node, any component that carries an id, or the
//! `external_objects` list. A template link resolves when its source names an
//! asset with a root node.

use std::cell::Cell;
use std::collections::HashSet;
use std::path::Path;

use refscan_core::{
    AssetTree, FieldKind, Instantiated, ObjectId, OpenScene, ProjectHost, RefScanError, Result,
    SceneEntry, TemplateLink,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::{SnapshotComponent, SnapshotField, SnapshotGraph, SnapshotNode};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub active_scene: Option<String>,
    #[serde(default)]
    pub build_scenes: Vec<SceneEntry>,
    #[serde(default)]
    pub scenes: Vec<SceneDocument>,
    #[serde(default)]
    pub assets: Vec<AssetDocument>,
    /// Ids of live objects that are not part of any node tree.
    #[serde(default)]
    pub external_objects: Vec<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub path: String,
    #[serde(default)]
    pub roots: Vec<NodeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDocument {
    pub path: String,
    /// Absent for assets that are not node trees.
    #[serde(default)]
    pub root: Option<NodeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub template: Option<TemplateDocument>,
    #[serde(default)]
    pub components: Vec<ComponentDocument>,
    #[serde(default)]
    pub children: Vec<NodeDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub disconnected: bool,
    #[serde(default = "default_instance_root")]
    pub instance_root: bool,
}

fn default_instance_root() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDocument {
    #[serde(default)]
    pub id: Option<ObjectId>,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDocument {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub target: ObjectId,
}

struct LoadedScene {
    path: String,
    graph: SnapshotGraph,
    roots: Vec<ObjectId>,
}

/// A project loaded from a JSON snapshot.
pub struct ProjectSnapshot {
    active_scene: Option<String>,
    build_scenes: Vec<SceneEntry>,
    scenes: Vec<LoadedScene>,
    /// Every asset tree lives in one shared graph.
    assets: SnapshotGraph,
    asset_roots: Vec<(String, Option<ObjectId>)>,
    live_instances: Cell<usize>,
}

impl ProjectSnapshot {
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading project snapshot from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let document: ProjectDocument = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    pub fn from_document(document: ProjectDocument) -> Result<Self> {
        let templates: HashSet<String> = document
            .assets
            .iter()
            .filter(|asset| asset.root.is_some())
            .map(|asset| asset.path.clone())
            .collect();

        let mut scenes = Vec::with_capacity(document.scenes.len());
        for scene in &document.scenes {
            let mut graph = SnapshotGraph::new();
            let mut roots = Vec::with_capacity(scene.roots.len());
            for root in &scene.roots {
                insert_tree(&mut graph, root, None, None)?;
                roots.push(root.id);
            }
            scenes.push(LoadedScene {
                path: scene.path.clone(),
                graph,
                roots,
            });
        }

        let mut assets = SnapshotGraph::new();
        let mut asset_roots = Vec::with_capacity(document.assets.len());
        for asset in &document.assets {
            if let Some(root) = &asset.root {
                insert_tree(&mut assets, root, None, Some(asset.path.as_str()))?;
            }
            asset_roots.push((asset.path.clone(), asset.root.as_ref().map(|r| r.id)));
        }

        let mut live: HashSet<ObjectId> = document.external_objects.iter().copied().collect();
        for scene in &scenes {
            live.extend(scene.graph.object_ids());
        }
        live.extend(assets.object_ids());

        for scene in &mut scenes {
            scene.graph.resolve_links(&live, &templates);
        }
        assets.resolve_links(&live, &templates);

        debug!(
            "Snapshot loaded: {} scenes, {} assets, {} live objects",
            scenes.len(),
            asset_roots.len(),
            live.len()
        );

        Ok(Self {
            active_scene: document.active_scene,
            build_scenes: document.build_scenes,
            scenes,
            assets,
            asset_roots,
            live_instances: Cell::new(0),
        })
    }

    /// Template instances handed out and not yet released.
    pub fn live_instances(&self) -> usize {
        self.live_instances.get()
    }

    pub fn scene_paths(&self) -> Vec<String> {
        self.scenes.iter().map(|s| s.path.clone()).collect()
    }
}

fn insert_tree(
    graph: &mut SnapshotGraph,
    doc: &NodeDocument,
    parent: Option<ObjectId>,
    owner: Option<&str>,
) -> Result<()> {
    let mut node = SnapshotNode::new(doc.id, doc.name.clone());
    node.parent = parent;
    node.asset_path = owner.map(str::to_string);
    node.children = doc.children.iter().map(|c| c.id).collect();
    if let Some(template) = &doc.template {
        node.template = TemplateLink {
            source: template.source.clone(),
            resolved: false,
            disconnected: template.disconnected,
            instance_root: template.instance_root,
        };
    }
    node.components = doc.components.iter().map(component_from_doc).collect();
    graph.insert_node(node)?;

    for child in &doc.children {
        insert_tree(graph, child, Some(doc.id), owner)?;
    }
    Ok(())
}

fn component_from_doc(doc: &ComponentDocument) -> SnapshotComponent {
    if doc.missing {
        return SnapshotComponent::missing().with_id(doc.id.unwrap_or_default());
    }
    let mut component =
        SnapshotComponent::new(doc.type_name.clone()).with_id(doc.id.unwrap_or_default());
    component.fields = doc
        .fields
        .iter()
        .map(|field| match field.kind {
            FieldKind::ObjectReference => SnapshotField::reference(field.name.clone(), field.target),
            FieldKind::Value => SnapshotField::value(field.name.clone()),
        })
        .collect();
    component
}

impl ProjectHost for ProjectSnapshot {
    type Graph = SnapshotGraph;

    fn build_scenes(&self) -> Vec<SceneEntry> {
        self.build_scenes.clone()
    }

    fn active_scene(&self) -> Option<String> {
        self.active_scene.clone()
    }

    fn open_scene(&self, path: &str) -> Result<OpenScene<'_, SnapshotGraph>> {
        let scene = self
            .scenes
            .iter()
            .find(|s| s.path == path)
            .ok_or_else(|| RefScanError::SceneOpen {
                path: path.to_string(),
                reason: "scene is not part of the project snapshot".to_string(),
            })?;
        Ok(OpenScene {
            path: scene.path.clone(),
            graph: &scene.graph,
            roots: scene.roots.clone(),
        })
    }

    fn asset_paths(&self) -> Vec<String> {
        self.asset_roots.iter().map(|(path, _)| path.clone()).collect()
    }

    fn load_asset(&self, path: &str) -> Result<Option<AssetTree<'_, SnapshotGraph>>> {
        let (path, root) = self
            .asset_roots
            .iter()
            .find(|(p, _)| p == path)
            .ok_or_else(|| RefScanError::AssetLoad {
                path: path.to_string(),
                reason: "asset is not part of the project snapshot".to_string(),
            })?;
        Ok(root.map(|root| AssetTree {
            path: path.clone(),
            graph: &self.assets,
            root,
        }))
    }

    fn instantiate_template(&self, path: &str) -> Result<Instantiated<SnapshotGraph>> {
        let root = self
            .load_asset(path)?
            .map(|asset| asset.root)
            .ok_or_else(|| RefScanError::AssetLoad {
                path: path.to_string(),
                reason: "asset has no node tree to instantiate".to_string(),
            })?;
        let graph = self.assets.subtree(root).ok_or_else(|| RefScanError::AssetLoad {
            path: path.to_string(),
            reason: "template root is not loaded".to_string(),
        })?;

        self.live_instances.set(self.live_instances.get() + 1);
        Ok(Instantiated {
            source: path.to_string(),
            graph,
            root,
        })
    }

    fn release_instance(&self, instance: Instantiated<SnapshotGraph>) {
        debug!("Destroying instance of {}", instance.source);
        self.live_instances
            .set(self.live_instances.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refscan_core::{FieldEnumerable, GraphAttachment, GraphNode, ObjectGraph};

    const PROJECT: &str = r#"{
        "active_scene": "Assets/Scenes/Main.unity",
        "build_scenes": [
            {"path": "Assets/Scenes/Main.unity"},
            {"path": "Assets/Scenes/Old.unity", "enabled": false}
        ],
        "scenes": [{
            "path": "Assets/Scenes/Main.unity",
            "roots": [{
                "id": 1,
                "name": "Player",
                "components": [{
                    "id": 2,
                    "type": "Health",
                    "fields": [
                        {"name": "m_Bar", "kind": "object_reference", "target": 30},
                        {"name": "m_Icon", "kind": "object_reference", "target": 900},
                        {"name": "m_Max"}
                    ]
                }],
                "children": [{"id": 3, "name": "Lamp", "template": {"source": "Assets/Lamp.prefab"}}]
            }]
        }],
        "assets": [
            {"path": "Assets/Lamp.prefab", "root": {"id": 30, "name": "Lamp"}},
            {"path": "Assets/readme.txt"}
        ],
        "external_objects": [900]
    }"#;

    #[test]
    fn loads_scenes_and_resolves_links() {
        let project = ProjectSnapshot::from_json(PROJECT).unwrap();
        assert_eq!(project.active_scene().as_deref(), Some("Assets/Scenes/Main.unity"));
        assert_eq!(project.build_scenes().len(), 2);
        assert!(!project.build_scenes()[1].enabled);

        let scene = project.open_scene("Assets/Scenes/Main.unity").unwrap();
        assert_eq!(scene.roots, vec![ObjectId(1)]);

        let player = scene.graph.node(ObjectId(1)).unwrap();
        let fields = player.attachment(0).unwrap().fields();
        assert!(!fields[0].live_handle_is_null());
        assert!(!fields[1].live_handle_is_null());
        assert_eq!(fields[2].kind(), FieldKind::Value);

        let lamp = scene.graph.node(ObjectId(3)).unwrap();
        assert!(lamp.template().resolved);
        assert!(lamp.template().instance_root);
        // Scene objects are not stored in an asset of their own.
        assert_eq!(lamp.asset_path(), None);
    }

    #[test]
    fn unknown_scene_fails_to_open() {
        let project = ProjectSnapshot::from_json(PROJECT).unwrap();
        let err = project.open_scene("Assets/Scenes/Gone.unity").err().unwrap();
        assert!(matches!(err, RefScanError::SceneOpen { .. }));
        assert!(err.to_string().contains("Assets/Scenes/Gone.unity"));
    }

    #[test]
    fn non_node_assets_load_as_none() {
        let project = ProjectSnapshot::from_json(PROJECT).unwrap();
        assert!(project.load_asset("Assets/readme.txt").unwrap().is_none());
        assert!(project.load_asset("Assets/Lamp.prefab").unwrap().is_some());
        assert!(project.load_asset("Assets/nope.prefab").is_err());
    }

    #[test]
    fn instances_are_counted_until_released() {
        let project = ProjectSnapshot::from_json(PROJECT).unwrap();
        let instance = project.instantiate_template("Assets/Lamp.prefab").unwrap();
        assert_eq!(project.live_instances(), 1);
        assert_eq!(instance.graph.node(instance.root).unwrap().name(), "Lamp");

        project.release_instance(instance);
        assert_eq!(project.live_instances(), 0);
        assert!(project.instantiate_template("Assets/readme.txt").is_err());
        assert_eq!(project.live_instances(), 0);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = ProjectSnapshot::from_json("{ \"scenes\": 3 }").err().unwrap();
        assert!(matches!(err, RefScanError::Serialization(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"{"scenes": [{"path": "A.unity", "roots": [
            {"id": 1, "name": "A"}, {"id": 1, "name": "B"}
        ]}]}"#;
        assert!(matches!(
            ProjectSnapshot::from_json(json),
            Err(RefScanError::Host(_))
        ));
    }
}
