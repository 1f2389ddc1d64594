//! Classification rules for broken templates, attachments and fields.

use refscan_core::{FieldEnumerable, FieldKind, FieldState, GraphAttachment, GraphNode};

/// A template instance whose source no longer resolves, whose name carries
/// the host's missing marker, or which the host reports as disconnected.
pub fn is_missing_template<N: GraphNode>(node: &N, missing_marker: &str) -> bool {
    let template = node.template();
    let dangling_source = template.source.is_some() && !template.resolved;

    dangling_source
        || (!missing_marker.is_empty() && node.name().contains(missing_marker))
        || template.disconnected
}

/// Whether the node roots a template instance of its own. Non-root nodes
/// matching this are left to their instance's independent scan.
pub fn is_template_boundary<N: GraphNode>(node: &N) -> bool {
    node.template().instance_root
}

pub fn is_unresolvable_attachment<A: GraphAttachment>(attachment: &A) -> bool {
    !attachment.is_resolvable()
}

/// Stored identifier is set but the live handle is gone.
pub fn is_dangling_field<F: FieldEnumerable>(field: &F) -> bool {
    !field.identifier().is_nil() && field.live_handle_is_null()
}

/// Only object-reference fields can dangle.
pub fn is_dangling_reference<F: FieldEnumerable>(field: &F) -> bool {
    field.kind() == FieldKind::ObjectReference && is_dangling_field(field)
}

pub fn field_state<F: FieldEnumerable>(field: &F) -> FieldState {
    field.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use refscan_core::ObjectId;

    struct Slot {
        kind: FieldKind,
        id: u64,
        live: bool,
    }

    impl FieldEnumerable for Slot {
        fn name(&self) -> &str {
            "slot"
        }
        fn kind(&self) -> FieldKind {
            self.kind
        }
        fn identifier(&self) -> ObjectId {
            ObjectId(self.id)
        }
        fn live_handle_is_null(&self) -> bool {
            !self.live
        }
    }

    #[test]
    fn unset_is_not_dangling() {
        let slot = Slot {
            kind: FieldKind::ObjectReference,
            id: 0,
            live: false,
        };
        assert!(!is_dangling_reference(&slot));
        assert_eq!(field_state(&slot), FieldState::Unset);
    }

    #[test]
    fn set_identifier_without_target_dangles() {
        let slot = Slot {
            kind: FieldKind::ObjectReference,
            id: 42,
            live: false,
        };
        assert!(is_dangling_reference(&slot));
        assert_eq!(field_state(&slot), FieldState::Dangling);
    }

    #[test]
    fn resolved_reference() {
        let slot = Slot {
            kind: FieldKind::ObjectReference,
            id: 42,
            live: true,
        };
        assert!(!is_dangling_reference(&slot));
        assert_eq!(field_state(&slot), FieldState::Resolved);
    }

    #[test]
    fn value_fields_never_dangle() {
        let slot = Slot {
            kind: FieldKind::Value,
            id: 42,
            live: false,
        };
        assert!(is_dangling_field(&slot));
        assert!(!is_dangling_reference(&slot));
    }
}
