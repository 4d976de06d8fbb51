//! Per-kind element drawing with level-of-detail.
//!
//! Every kind has a full path (shape, connectors, fitted label) and a simple
//! path (flat box) selected against a kind-specific on-screen size threshold.
//! All thresholds compare device pixels, i.e. logical extent divided by
//! points-per-pixel.

use floe_layout::PositionedNode;
use floe_layout::sizing::{CONNECTOR_WIDTH, FONT_SIZE, OCTAGON_CUT, SCOPE_SLANT, STATE_LABEL_STRIP};
use floe_model::geom::{LayoutInfo, Point, Rect, Vector, point};
use floe_model::{Node, NodeKind, State};
use unicode_width::UnicodeWidthStr;

use crate::canvas::{Canvas, Color, Stroke, TextAlign};
use crate::transform::ViewTransform;

pub const BACKGROUND: Color = Color::WHITE;
pub const STATE_FILL: Color = Color::rgb(0xde, 0xeb, 0xf7);
pub const NODE_FILL: Color = Color::WHITE;
pub const SCOPE_FILL: Color = Color::rgb(0xf0, 0xf0, 0xf0);
pub const OUTLINE: Color = Color::BLACK;
pub const TEXT_COLOR: Color = Color::BLACK;
pub const EDGE_COLOR: Color = Color::rgb(0x41, 0x41, 0x41);
pub const SELECTED_COLOR: Color = Color::rgb(0xcc, 0x00, 0x00);
pub const HOVERED_COLOR: Color = Color::rgb(0x00, 0x80, 0x00);
pub const HIGHLIGHTED_COLOR: Color = Color::rgb(0xff, 0x8c, 0x00);

/// Device font size below which labels are dropped entirely.
const MIN_TEXT_PX: f64 = 9.0;
/// Connector dots disappear below this device radius.
const MIN_CONNECTOR_PX: f64 = 1.5;
const ARROW_PX: f64 = 8.0;

/// Visual states compose, but stroke styling is keyed by fixed precedence:
/// selected beats hovered beats highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VisualState {
    Default,
    Highlighted,
    Hovered,
    Selected,
}

impl VisualState {
    pub fn resolve(selected: bool, hovered: bool, highlighted: bool) -> Self {
        if selected {
            VisualState::Selected
        } else if hovered {
            VisualState::Hovered
        } else if highlighted {
            VisualState::Highlighted
        } else {
            VisualState::Default
        }
    }

    fn stroke(self) -> Stroke {
        match self {
            VisualState::Default => Stroke::solid(OUTLINE, 1.0),
            VisualState::Highlighted => Stroke::solid(HIGHLIGHTED_COLOR, 2.0),
            VisualState::Hovered => Stroke::solid(HOVERED_COLOR, 2.0),
            VisualState::Selected => Stroke::solid(SELECTED_COLOR, 2.0),
        }
    }

    fn edge_color(self) -> Color {
        match self {
            VisualState::Default => EDGE_COLOR,
            VisualState::Highlighted => HIGHLIGHTED_COLOR,
            VisualState::Hovered => HOVERED_COLOR,
            VisualState::Selected => SELECTED_COLOR,
        }
    }
}

/// On-screen extent (device px) below which a node kind takes the simple
/// drawing path.
pub fn simple_threshold(kind: &NodeKind) -> f64 {
    match kind {
        NodeKind::Tasklet | NodeKind::Library { .. } => 20.0,
        NodeKind::Access { .. } => 16.0,
        NodeKind::MapEntry { .. } | NodeKind::MapExit { .. } | NodeKind::Reduce { .. } => 24.0,
        NodeKind::NestedGraph { .. } => 32.0,
    }
}

pub const STATE_SIMPLE_THRESHOLD: f64 = 48.0;
pub const EDGE_DRAW_THRESHOLD: f64 = 4.0;

pub struct DrawContext<'a> {
    pub view: &'a ViewTransform,
    /// Logical units per device pixel.
    pub ppp: f64,
    /// When false, LOD simplification and culling are disabled.
    pub lod: bool,
    /// Visible logical rectangle, used for culling.
    pub visible: Rect,
}

impl DrawContext<'_> {
    pub fn culled(&self, layout: &LayoutInfo) -> bool {
        self.lod && !layout.intersects(&self.visible)
    }

    pub fn dp(&self, x: f64, y: f64) -> Point {
        self.view.to_device(point(x, y))
    }

    pub fn device_rect(&self, layout: &LayoutInfo) -> Rect {
        let r = layout.rect();
        let a = self.dp(r.min_x(), r.min_y());
        let b = self.dp(r.max_x(), r.max_y());
        Rect::new(point(a.x.min(b.x), a.y.min(b.y)), euclid::size2((b.x - a.x).abs(), (b.y - a.y).abs()))
    }

    pub fn px(&self, logical: f64) -> f64 {
        logical / self.ppp
    }
}

pub fn draw_state(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    state: &State,
    layout: &LayoutInfo,
    visual: VisualState,
) {
    if ctx.culled(layout) {
        return;
    }
    let rect = ctx.device_rect(layout);
    canvas.fill_rect(rect, STATE_FILL);
    canvas.stroke_rect(rect, visual.stroke());

    let extent = ctx.px(layout.width.min(layout.height));
    if ctx.lod && extent < STATE_SIMPLE_THRESHOLD {
        return;
    }
    let strip_px = ctx.px(STATE_LABEL_STRIP);
    draw_fitted_text(
        canvas,
        ctx,
        &state.label,
        point(rect.min_x() + 6.0, rect.min_y() + strip_px * 0.75),
        rect.width() - 12.0,
        TextAlign::Left,
    );
}

pub fn draw_node(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    node: &Node,
    pos: &PositionedNode,
    offset: Vector,
    visual: VisualState,
) {
    if pos.hidden {
        return;
    }
    let layout = LayoutInfo::new(
        pos.layout.x + offset.x,
        pos.layout.y + offset.y,
        pos.layout.width,
        pos.layout.height,
    );
    if ctx.culled(&layout) {
        return;
    }

    let extent = ctx.px(layout.width.min(layout.height));
    if ctx.lod && extent < simple_threshold(&node.kind) {
        canvas.fill_rect(ctx.device_rect(&layout), node_fill(&node.kind));
        canvas.stroke_rect(ctx.device_rect(&layout), Stroke::solid(OUTLINE, 1.0));
        return;
    }

    draw_node_shape(canvas, ctx, node, &layout, visual);
    draw_connectors(canvas, ctx, pos, offset);

    let center = ctx.dp(layout.x, layout.y);
    let width_px = ctx.px(layout.width) - 8.0;
    draw_fitted_text(canvas, ctx, &node.label, center, width_px, TextAlign::Center);
}

fn node_fill(kind: &NodeKind) -> Color {
    match kind {
        NodeKind::MapEntry { .. } | NodeKind::MapExit { .. } | NodeKind::Reduce { .. } => SCOPE_FILL,
        _ => NODE_FILL,
    }
}

fn draw_node_shape(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    node: &Node,
    layout: &LayoutInfo,
    visual: VisualState,
) {
    let r = layout.rect();
    let (l, t, rt, b) = (r.min_x(), r.min_y(), r.max_x(), r.max_y());
    let cy = layout.y;
    let stroke = visual.stroke();
    let fill = node_fill(&node.kind);

    let poly = |pts: &[(f64, f64)]| -> Vec<Point> {
        pts.iter().map(|&(x, y)| ctx.dp(x, y)).collect()
    };

    match &node.kind {
        NodeKind::Tasklet => {
            let cut = OCTAGON_CUT.min(layout.width / 3.0).min(layout.height / 3.0);
            let pts = poly(&[
                (l + cut, t),
                (rt - cut, t),
                (rt, t + cut),
                (rt, b - cut),
                (rt - cut, b),
                (l + cut, b),
                (l, b - cut),
                (l, t + cut),
            ]);
            canvas.fill_polygon(&pts, fill);
            canvas.stroke_path(&pts, stroke, true);
        }
        NodeKind::Access { .. } => {
            let c = ctx.dp(layout.x, layout.y);
            let rx = ctx.px(layout.width / 2.0);
            let ry = ctx.px(layout.height / 2.0);
            canvas.fill_ellipse(c, rx, ry, fill);
            canvas.stroke_ellipse(c, rx, ry, stroke);
        }
        NodeKind::MapEntry { .. } => {
            let s = SCOPE_SLANT.min(layout.width / 3.0);
            let pts = poly(&[(l + s, t), (rt - s, t), (rt, b), (l, b)]);
            canvas.fill_polygon(&pts, fill);
            canvas.stroke_path(&pts, stroke, true);
        }
        NodeKind::MapExit { .. } => {
            let s = SCOPE_SLANT.min(layout.width / 3.0);
            let pts = poly(&[(l, t), (rt, t), (rt - s, b), (l + s, b)]);
            canvas.fill_polygon(&pts, fill);
            canvas.stroke_path(&pts, stroke, true);
        }
        NodeKind::Reduce { .. } => {
            let s = SCOPE_SLANT.min(layout.width / 3.0);
            let pts = poly(&[
                (l + s, t),
                (rt - s, t),
                (rt, cy),
                (rt - s, b),
                (l + s, b),
                (l, cy),
            ]);
            canvas.fill_polygon(&pts, fill);
            canvas.stroke_path(&pts, stroke, true);
        }
        NodeKind::NestedGraph { .. } => {
            let outer = ctx.device_rect(layout);
            canvas.fill_rect(outer, fill);
            canvas.stroke_rect(outer, stroke);
            let inset = ctx.px(4.0);
            let inner = Rect::new(
                point(outer.min_x() + inset, outer.min_y() + inset),
                euclid::size2(
                    (outer.width() - 2.0 * inset).max(0.0),
                    (outer.height() - 2.0 * inset).max(0.0),
                ),
            );
            canvas.stroke_rect(inner, Stroke::solid(OUTLINE, 1.0));
        }
        NodeKind::Library { .. } => {
            let rect = ctx.device_rect(layout);
            canvas.fill_rect(rect, fill);
            canvas.stroke_rect(rect, stroke);
            // Folded-corner mark.
            let fold = ctx.px(10.0);
            let pts = vec![
                point(rect.max_x() - fold, rect.min_y()),
                point(rect.max_x() - fold, rect.min_y() + fold),
                point(rect.max_x(), rect.min_y() + fold),
            ];
            canvas.stroke_path(&pts, Stroke::solid(OUTLINE, 1.0), false);
        }
    }
}

fn draw_connectors(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    pos: &PositionedNode,
    offset: Vector,
) {
    let radius = ctx.px(CONNECTOR_WIDTH / 2.0);
    if radius < MIN_CONNECTOR_PX {
        return;
    }
    for &(x, y) in pos
        .in_connector_points
        .iter()
        .chain(pos.out_connector_points.iter())
    {
        let c = ctx.dp(x + offset.x, y + offset.y);
        canvas.fill_ellipse(c, radius, radius, NODE_FILL);
        canvas.stroke_ellipse(c, radius, radius, Stroke::solid(OUTLINE, 1.0));
    }
}

pub fn draw_edge(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    points: &[(f64, f64)],
    visual: VisualState,
    dashed: bool,
) {
    if points.len() < 2 {
        return;
    }
    let bounds = path_bounds(points);
    if ctx.culled(&bounds) {
        return;
    }
    if ctx.lod && ctx.px(bounds.width.max(bounds.height)) < EDGE_DRAW_THRESHOLD {
        return;
    }

    let device: Vec<Point> = points.iter().map(|&(x, y)| ctx.dp(x, y)).collect();
    let color = visual.edge_color();
    let stroke = if dashed {
        Stroke::dashed(color, 1.0)
    } else {
        Stroke::solid(color, 1.0)
    };
    canvas.stroke_path(&device, stroke, false);
    draw_arrowhead(canvas, &device, color);
}

fn draw_arrowhead(canvas: &mut dyn Canvas, device: &[Point], color: Color) {
    let tip = device[device.len() - 1];
    let prev = device[device.len() - 2];
    let dir = tip - prev;
    let len = (dir.x * dir.x + dir.y * dir.y).sqrt();
    if len < f64::EPSILON {
        return;
    }
    let (ux, uy) = (dir.x / len, dir.y / len);
    let (px, py) = (-uy, ux);
    let base = point(tip.x - ux * ARROW_PX, tip.y - uy * ARROW_PX);
    let half = ARROW_PX * 0.4;
    canvas.fill_polygon(
        &[
            tip,
            point(base.x + px * half, base.y + py * half),
            point(base.x - px * half, base.y - py * half),
        ],
        color,
    );
}

fn path_bounds(points: &[(f64, f64)]) -> LayoutInfo {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min.0 = min.0.min(x);
        min.1 = min.1.min(y);
        max.0 = max.0.max(x);
        max.1 = max.1.max(y);
    }
    LayoutInfo::new(
        (min.0 + max.0) / 2.0,
        (min.1 + max.1) / 2.0,
        max.0 - min.0,
        max.1 - min.1,
    )
}

/// Adaptive font sizing: zoom-proportional when zoomed out, capped at the
/// base size when zoomed in, shrunk further to fit the available width, and
/// dropped entirely once illegible.
fn draw_fitted_text(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    text: &str,
    origin: Point,
    max_width_px: f64,
    align: TextAlign,
) {
    if text.is_empty() || max_width_px <= 0.0 {
        return;
    }
    let mut size = (FONT_SIZE / ctx.ppp).min(FONT_SIZE);
    let est = text.width() as f64 * 0.55 * size;
    if est > max_width_px {
        size *= max_width_px / est;
    }
    if size < MIN_TEXT_PX {
        return;
    }
    canvas.text(text, origin, size, TEXT_COLOR, align);
}
