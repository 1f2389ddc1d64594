use std::collections::VecDeque;

use refscan_core::{
    nicify_variable_name, FieldEnumerable, GraphAttachment, GraphNode, ObjectGraph, ObjectId,
    ProgressSink, RefScanError, Result, TraversalOrder,
};
use tracing::{debug, trace};

use crate::predicates::{
    is_dangling_reference, is_missing_template, is_template_boundary, is_unresolvable_attachment,
};
use crate::{CancelToken, ErrorAggregator, ErrorRecord, NodeSnapshot};

/// Which predicates the walker applies to each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeChecks {
    /// Missing-template detection, including the nested-instance boundary rule.
    pub templates: bool,
    pub attachments: bool,
    pub fields: bool,
}

impl NodeChecks {
    pub fn all() -> Self {
        Self {
            templates: true,
            attachments: true,
            fields: true,
        }
    }

    pub fn templates_only() -> Self {
        Self {
            templates: true,
            attachments: false,
            fields: false,
        }
    }

    pub fn references_only() -> Self {
        Self {
            templates: false,
            attachments: true,
            fields: true,
        }
    }
}

impl Default for NodeChecks {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone)]
pub struct WalkerOptions {
    pub order: TraversalOrder,
    /// When false only the root nodes' own attachments are inspected.
    pub recurse: bool,
    pub checks: NodeChecks,
    pub missing_template_marker: String,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::BreadthFirst,
            recurse: true,
            checks: NodeChecks::all(),
            missing_template_marker: "Missing Prefab".to_string(),
        }
    }
}

impl WalkerOptions {
    pub fn with_order(mut self, order: TraversalOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_checks(mut self, checks: NodeChecks) -> Self {
        self.checks = checks;
        self
    }

    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn with_missing_template_marker(mut self, marker: impl Into<String>) -> Self {
        self.missing_template_marker = marker.into();
        self
    }
}

/// One independently scannable root: a single tree or a forest of top-level nodes.
#[derive(Debug, Clone)]
pub struct WalkRoot {
    /// Label carried into every record captured under this root.
    pub context: String,
    pub nodes: Vec<ObjectId>,
    /// Share of the overall progress bar allotted to this root.
    pub weight: f32,
    /// Progress already reported before this root starts.
    pub offset: f32,
}

impl WalkRoot {
    pub fn tree(context: impl Into<String>, node: ObjectId) -> Self {
        Self::forest(context, vec![node])
    }

    pub fn forest(context: impl Into<String>, nodes: Vec<ObjectId>) -> Self {
        Self {
            context: context.into(),
            nodes,
            weight: 1.0,
            offset: 0.0,
        }
    }

    pub fn with_progress(mut self, offset: f32, weight: f32) -> Self {
        self.offset = offset;
        self.weight = weight;
        self
    }
}

/// Result of one walker pass. Partial when `cancelled` is set.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    pub errors: ErrorAggregator,
    pub cancelled: bool,
    pub progress: f32,
    pub nodes_visited: usize,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    id: ObjectId,
    share: f32,
    is_root: bool,
}

/// Stack for depth-first, queue for breadth-first.
enum WorkList {
    Stack(Vec<Pending>),
    Queue(VecDeque<Pending>),
}

impl WorkList {
    fn new(order: TraversalOrder) -> Self {
        match order {
            TraversalOrder::DepthFirst => WorkList::Stack(Vec::new()),
            TraversalOrder::BreadthFirst => WorkList::Queue(VecDeque::new()),
        }
    }

    /// Siblings come back out in declared order for either discipline.
    fn push_siblings(&mut self, siblings: Vec<Pending>) {
        match self {
            WorkList::Stack(stack) => stack.extend(siblings.into_iter().rev()),
            WorkList::Queue(queue) => queue.extend(siblings),
        }
    }

    fn pop(&mut self) -> Option<Pending> {
        match self {
            WorkList::Stack(stack) => stack.pop(),
            WorkList::Queue(queue) => queue.pop_front(),
        }
    }
}

pub struct GraphWalker<'a, G: ObjectGraph> {
    graph: &'a G,
    options: &'a WalkerOptions,
}

impl<'a, G: ObjectGraph> GraphWalker<'a, G> {
    pub fn new(graph: &'a G, options: &'a WalkerOptions) -> Self {
        Self { graph, options }
    }

    pub fn traverse(
        &self,
        root: &WalkRoot,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Traversal> {
        let label = format!("Searching missing references in {}", root.context);
        let checks = self.options.checks;
        let mut result = Traversal {
            progress: root.offset,
            ..Traversal::default()
        };

        let mut work = WorkList::new(self.options.order);
        let per_root = if root.nodes.is_empty() {
            0.0
        } else {
            root.weight / root.nodes.len() as f32
        };
        work.push_siblings(
            root.nodes
                .iter()
                .map(|&id| Pending {
                    id,
                    share: per_root,
                    is_root: true,
                })
                .collect(),
        );

        while let Some(item) = work.pop() {
            let Some(node) = self.graph.node(item.id) else {
                debug!("Skipping unresolved node {} in {}", item.id, root.context);
                continue;
            };
            result.nodes_visited += 1;

            if checks.templates {
                if is_missing_template(node, &self.options.missing_template_marker) {
                    result.errors.capture(ErrorRecord::MissingTemplate {
                        node: NodeSnapshot::capture(self.graph, node),
                        template_label: root.context.clone(),
                    });
                    continue;
                }
                if !item.is_root && is_template_boundary(node) {
                    trace!("Nested instance {} left to its own scan", node.name());
                    continue;
                }
            }

            let attachment_count = node.attachment_count();
            let children: &[ObjectId] = if self.options.recurse {
                node.children()
            } else {
                &[]
            };
            let slots = attachment_count + children.len();
            let share_each = if slots == 0 {
                0.0
            } else {
                item.share / slots as f32
            };

            for index in 0..attachment_count {
                if cancel.is_cancelled() {
                    result.cancelled = true;
                    return Ok(result);
                }
                result.progress += share_each;
                progress.report(&label, node.name(), result.progress.clamp(0.0, 1.0));

                let attachment = node.attachment(index).ok_or_else(|| {
                    RefScanError::ContractViolation(format!(
                        "node {} declares {} attachments but has none at index {}",
                        node.id(),
                        attachment_count,
                        index
                    ))
                })?;

                if is_unresolvable_attachment(attachment) {
                    if checks.attachments {
                        result.errors.capture(ErrorRecord::MissingAttachment {
                            node: NodeSnapshot::capture(self.graph, node),
                            context: root.context.clone(),
                        });
                    }
                    continue;
                }

                if checks.fields {
                    for field in attachment.fields() {
                        if is_dangling_reference(field) {
                            result.errors.capture(ErrorRecord::MissingFieldReference {
                                node: NodeSnapshot::capture(self.graph, node),
                                attachment_type: attachment.type_name().to_string(),
                                field_name: nicify_variable_name(field.name()),
                                context: root.context.clone(),
                            });
                        }
                    }
                }
            }

            let node_id = node.id();
            work.push_siblings(
                children
                    .iter()
                    .filter(|&&child| child != node_id)
                    .map(|&child| Pending {
                        id: child,
                        share: share_each,
                        is_root: false,
                    })
                    .collect(),
            );
        }

        Ok(result)
    }
}
