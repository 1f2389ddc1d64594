use refscan_core::{GraphNode, ObjectGraph, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node, copied out of the host graph at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: ObjectId,
    pub name: String,
    pub full_path: String,
    pub asset_path: String,
    pub root_asset_path: String,
}

impl NodeSnapshot {
    pub fn capture<G: ObjectGraph>(graph: &G, node: &G::Node) -> Self {
        let id = node.id();
        let root_asset_path = graph
            .root_of(id)
            .and_then(|root| root.asset_path())
            .unwrap_or_default()
            .to_string();

        Self {
            id,
            name: node.name().to_string(),
            full_path: graph
                .full_path(id)
                .unwrap_or_else(|| node.name().to_string()),
            asset_path: node.asset_path().unwrap_or_default().to_string(),
            root_asset_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorRecord {
    MissingTemplate {
        node: NodeSnapshot,
        template_label: String,
    },
    MissingAttachment {
        node: NodeSnapshot,
        context: String,
    },
    MissingFieldReference {
        node: NodeSnapshot,
        attachment_type: String,
        field_name: String,
        context: String,
    },
}

impl ErrorRecord {
    pub fn node(&self) -> &NodeSnapshot {
        match self {
            ErrorRecord::MissingTemplate { node, .. }
            | ErrorRecord::MissingAttachment { node, .. }
            | ErrorRecord::MissingFieldReference { node, .. } => node,
        }
    }

    /// Label of the root the record was captured under.
    pub fn context(&self) -> &str {
        match self {
            ErrorRecord::MissingTemplate { template_label, .. } => template_label,
            ErrorRecord::MissingAttachment { context, .. }
            | ErrorRecord::MissingFieldReference { context, .. } => context,
        }
    }

    /// Tab-separated report line.
    pub fn to_line(&self) -> String {
        match self {
            ErrorRecord::MissingTemplate {
                node,
                template_label,
            } => format!("{}\tMissing prefab {}\t", template_label, node.name),
            ErrorRecord::MissingAttachment { node, .. } => format!(
                "{}\tMissing Component in GameObject {} in {}",
                node.asset_path, node.full_path, node.root_asset_path
            ),
            ErrorRecord::MissingFieldReference {
                node,
                attachment_type,
                field_name,
                ..
            } => format!(
                "{}\tMissing Reference in GameObject {} Component: {}, Property: {} in {}",
                node.asset_path, node.full_path, attachment_type, field_name, node.root_asset_path
            ),
        }
    }

    /// Message for the interactive diagnostic channel.
    pub fn message(&self) -> String {
        match self {
            ErrorRecord::MissingTemplate {
                node,
                template_label,
            } => format!("{} has missing prefab {}", template_label, node.name),
            ErrorRecord::MissingAttachment { node, context } => format!(
                "Missing Component in GameObject: {} in {}",
                node.full_path, context
            ),
            ErrorRecord::MissingFieldReference {
                node,
                attachment_type,
                field_name,
                context,
            } => format!(
                "Missing REFERENCE: [{}]{}. Component: {}, Property: {}",
                context, node.full_path, attachment_type, field_name
            ),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> NodeSnapshot {
        NodeSnapshot {
            id: ObjectId(4),
            name: "Handle".into(),
            full_path: "Door/Frame/Handle".into(),
            asset_path: "Assets/Door.prefab".into(),
            root_asset_path: "Assets/Door.prefab".into(),
        }
    }

    #[test]
    fn missing_template_line_keeps_trailing_tab() {
        let record = ErrorRecord::MissingTemplate {
            node: snapshot(),
            template_label: "Assets/Door.prefab".into(),
        };
        assert_eq!(record.to_line(), "Assets/Door.prefab\tMissing prefab Handle\t");
        assert_eq!(
            record.message(),
            "Assets/Door.prefab has missing prefab Handle"
        );
    }

    #[test]
    fn missing_attachment_line() {
        let record = ErrorRecord::MissingAttachment {
            node: snapshot(),
            context: "Project".into(),
        };
        assert_eq!(
            record.to_line(),
            "Assets/Door.prefab\tMissing Component in GameObject Door/Frame/Handle in Assets/Door.prefab"
        );
        assert_eq!(record.context(), "Project");
    }

    #[test]
    fn missing_field_reference_line() {
        let record = ErrorRecord::MissingFieldReference {
            node: snapshot(),
            attachment_type: "Hinge".into(),
            field_name: "Connected Body".into(),
            context: "Assets/Scenes/Main.unity".into(),
        };
        assert_eq!(
            record.to_line(),
            "Assets/Door.prefab\tMissing Reference in GameObject Door/Frame/Handle Component: Hinge, Property: Connected Body in Assets/Door.prefab"
        );
        assert_eq!(
            record.message(),
            "Missing REFERENCE: [Assets/Scenes/Main.unity]Door/Frame/Handle. Component: Hinge, Property: Connected Body"
        );
    }
}
