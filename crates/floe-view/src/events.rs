//! Events emitted toward the embedding host.
//!
//! The view never performs host-side effects itself (dialogs, persistence,
//! external tooling); it reports what happened and lets the host react.

use floe_model::ElementUuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionChangeKind {
    ManualMove,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The selection set changed. `multi_selection_changed` is true when a
    /// multi-element selection was involved on either side of the change.
    SelectionChanged { multi_selection_changed: bool },
    /// An element (or everything, when `all`) was collapsed or expanded.
    CollapseStateChanged { collapsed: bool, all: bool },
    PositionChanged { kind: PositionChangeKind },
    /// Add-mode placement was validated; the host performs the actual
    /// insertion and hands back an updated document.
    AddGraphElement {
        kind: String,
        parent: ElementUuid,
        from: Option<ElementUuid>,
    },
    /// A cutout preview was left; the original document is restored.
    ExitPreview,
}
