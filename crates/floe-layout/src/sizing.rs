//! Intrinsic element sizing.
//!
//! Sizes are estimated from label text (monospace-ish advance via
//! `unicode-width`), connector count and kind-specific shape padding; the
//! renderer's adaptive text fit absorbs the estimation error. Anything that
//! would come out degenerate falls back to the minimum placeholder size so a
//! missing label never fails a layout.

use floe_model::{Node, NodeKind, State};
use unicode_width::UnicodeWidthStr;

pub const FONT_SIZE: f64 = 16.0;
pub const CHAR_WIDTH: f64 = FONT_SIZE * 0.55;
pub const LABEL_HEIGHT: f64 = FONT_SIZE + 4.0;

pub const MIN_NODE_WIDTH: f64 = 48.0;
pub const MIN_NODE_HEIGHT: f64 = 28.0;

pub const CONNECTOR_WIDTH: f64 = 10.0;
pub const CONNECTOR_SPACING: f64 = 6.0;

/// Horizontal inset of the slanted sides of scope trapezoids.
pub const SCOPE_SLANT: f64 = 18.0;
/// Corner cut of the tasklet octagon.
pub const OCTAGON_CUT: f64 = 10.0;

pub const NESTED_MARGIN: f64 = 24.0;
pub const STATE_PADDING: f64 = 24.0;
pub const STATE_LABEL_STRIP: f64 = LABEL_HEIGHT + 4.0;

pub fn label_width(text: &str) -> f64 {
    text.width() as f64 * CHAR_WIDTH
}

/// Width demanded by a connector row on one side of a node.
fn connector_row_width(count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    count as f64 * (CONNECTOR_WIDTH + CONNECTOR_SPACING) + CONNECTOR_SPACING
}

/// Intrinsic (width, height) of a node. `nested_size` is the recursively
/// laid-out size of an expanded nested document, if this node owns one.
pub fn node_size(node: &Node, nested_size: Option<(f64, f64)>) -> (f64, f64) {
    let text_w = label_width(&node.label);
    let conn_w = connector_row_width(node.in_connectors.len())
        .max(connector_row_width(node.out_connectors.len()));

    let (pad_w, pad_h) = match &node.kind {
        NodeKind::Tasklet => (2.0 * OCTAGON_CUT + 12.0, 14.0),
        // Ellipse circumscribing the label needs extra advance.
        NodeKind::Access { .. } => (text_w * 0.4 + 16.0, 12.0),
        NodeKind::MapEntry { .. } | NodeKind::MapExit { .. } => (2.0 * SCOPE_SLANT + 12.0, 12.0),
        NodeKind::NestedGraph { .. } => (2.0 * NESTED_MARGIN, 2.0 * NESTED_MARGIN + LABEL_HEIGHT),
        NodeKind::Library { .. } => (20.0, 14.0),
        NodeKind::Reduce { .. } => (2.0 * SCOPE_SLANT + 12.0, 16.0),
    };

    let (mut w, mut h) = match (&node.kind, nested_size) {
        (NodeKind::NestedGraph { .. }, Some((iw, ih))) if !node.is_collapsed => {
            (iw.max(text_w) + pad_w, ih + pad_h)
        }
        // Collapsed compounds and everything else: label-driven box.
        _ => (text_w + pad_w, LABEL_HEIGHT + pad_h),
    };

    // Scope entries widen to their iteration-range label.
    if let NodeKind::MapEntry { params, ranges } = &node.kind {
        let range_text: String = params
            .iter()
            .zip(ranges)
            .map(|(p, r)| format!("{p}={r}"))
            .collect::<Vec<_>>()
            .join(", ");
        w = w.max(label_width(&range_text) + 2.0 * SCOPE_SLANT);
    }

    w = w.max(conn_w).max(MIN_NODE_WIDTH);
    h = h.max(MIN_NODE_HEIGHT);
    if !w.is_finite() || !h.is_finite() {
        return (MIN_NODE_WIDTH, MIN_NODE_HEIGHT);
    }
    (w, h)
}

/// Size of a state in the top-level pass: content plus padding and a label
/// strip, or label-only when collapsed (or genuinely empty).
pub fn state_size(state: &State, content: Option<(f64, f64)>) -> (f64, f64) {
    let label_w = label_width(&state.label) + 2.0 * STATE_PADDING;
    match content {
        Some((cw, ch)) if !state.is_collapsed && cw > 0.0 && ch > 0.0 => (
            (cw + 2.0 * STATE_PADDING).max(label_w),
            ch + 2.0 * STATE_PADDING + STATE_LABEL_STRIP,
        ),
        _ => (label_w.max(MIN_NODE_WIDTH * 2.0), STATE_LABEL_STRIP + LABEL_HEIGHT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wider_labels_make_wider_nodes() {
        let narrow = Node::new("a", NodeKind::Tasklet);
        let wide = Node::new("a_very_long_tasklet_label", NodeKind::Tasklet);
        assert!(node_size(&wide, None).0 > node_size(&narrow, None).0);
    }

    #[test]
    fn connector_rows_set_a_width_floor() {
        let mut n = Node::new("t", NodeKind::Tasklet);
        n.in_connectors = (0..12).map(|i| format!("in{i}")).collect();
        let (w, _) = node_size(&n, None);
        assert!(w >= connector_row_width(12));
    }

    #[test]
    fn empty_labels_fall_back_to_minimum_width() {
        let n = Node::new("", NodeKind::Access { data: String::new() });
        let (w, h) = node_size(&n, None);
        assert_eq!(w, MIN_NODE_WIDTH);
        assert!(h >= MIN_NODE_HEIGHT);
    }

    #[test]
    fn collapsed_nested_graphs_ignore_inner_size() {
        let mut n = Node::new(
            "nested",
            NodeKind::NestedGraph {
                document: Box::default(),
                symbol_mapping: Default::default(),
            },
        );
        n.is_collapsed = true;
        let collapsed = node_size(&n, Some((500.0, 400.0)));
        assert!(collapsed.0 < 500.0 && collapsed.1 < 400.0);
    }
}
