use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host-assigned object identifier. Zero is the nil identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const NIL: ObjectId = ObjectId(0);

    pub fn is_nil(self) -> bool {
        self == Self::NIL
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ObjectId {
    fn from(raw: u64) -> Self {
        ObjectId(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ObjectReference,
    Value,
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Value
    }
}

/// Resolution state of a reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    Unset,
    Resolved,
    Dangling,
}

/// A node's connection to the template it was instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateLink {
    /// Label of the source template, when the node is an instance of one.
    pub source: Option<String>,
    /// Whether `source` still resolves to a template asset.
    pub resolved: bool,
    /// Host reports the instance as structurally disconnected from its template.
    pub disconnected: bool,
    /// The node is the root of a (possibly nested) template instance.
    pub instance_root: bool,
}

impl TemplateLink {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn instance_of(source: impl Into<String>, resolved: bool) -> Self {
        Self {
            source: Some(source.into()),
            resolved,
            disconnected: false,
            instance_root: true,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.source.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    BreadthFirst,
    DepthFirst,
}

impl Default for TraversalOrder {
    fn default() -> Self {
        TraversalOrder::BreadthFirst
    }
}

impl fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraversalOrder::BreadthFirst => "breadth_first",
            TraversalOrder::DepthFirst => "depth_first",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TraversalOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bfs" | "breadth" | "breadth_first" | "breadth-first" => Ok(TraversalOrder::BreadthFirst),
            "dfs" | "depth" | "depth_first" | "depth-first" => Ok(TraversalOrder::DepthFirst),
            other => Err(format!("unknown traversal order: {}", other)),
        }
    }
}

/// A scene listed in the project's build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub path: String,
    #[serde(default = "SceneEntry::default_enabled")]
    pub enabled: bool,
}

impl SceneEntry {
    fn default_enabled() -> bool {
        true
    }
}
