//! Overlay layer: extra information painted on top of the graph.
//!
//! Overlays are registered on the session and get a refresh pass when the
//! document, layout or symbol values change, plus a draw pass per frame after
//! the base graph. Pointer events are offered to overlays first; returning
//! true consumes the event.

use floe_layout::{PositionedGraph, PositionedNode};
use floe_model::expr::SymbolMap;
use floe_model::geom::{LayoutInfo, Point};
use floe_model::{ElementUuid, Expr, GraphDocument};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::canvas::{Canvas, Color};
use crate::draw::DrawContext;
use crate::symbols::graph_symbol_maps;

pub struct OverlayContext<'a> {
    pub doc: &'a GraphDocument,
    pub layout: &'a PositionedGraph,
    pub symbols: &'a SymbolMap,
}

pub trait Overlay {
    fn name(&self) -> &str;
    /// Recomputes cached per-element data. Called on document, layout or
    /// symbol changes, never per frame.
    fn refresh(&mut self, ctx: &OverlayContext<'_>);
    fn draw(&self, ctx: &OverlayContext<'_>, draw: &DrawContext<'_>, canvas: &mut dyn Canvas);
    /// True consumes the event.
    fn on_pointer_event(&mut self, _ctx: &OverlayContext<'_>, _logical: Point) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadnessCenter {
    #[default]
    Mean,
    Median,
}

/// Tint applied to elements whose metric could not be resolved.
pub const UNKNOWN_SHADE: Color = Color::rgba(128, 128, 128, 90);
const HEAT_ALPHA: u8 = 110;

/// `min(1, max(0, m / (2 * center)))`: the badness center maps to 0.5.
pub fn heat_ratio(metric: f64, center: f64) -> f64 {
    if center <= 0.0 {
        return 0.0;
    }
    (metric / (2.0 * center)).clamp(0.0, 1.0)
}

/// Fixed green-to-red scale.
pub fn heat_color(ratio: f64) -> Color {
    let t = ratio.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Color::rgba(lerp(0, 220), lerp(180, 0), 0, HEAT_ALPHA)
}

/// Heat-maps per-element runtime metrics supplied as symbolic expressions
/// (profiler metadata keyed by element UUID).
#[derive(Default)]
pub struct RuntimeMetricsOverlay {
    expressions: FxHashMap<ElementUuid, String>,
    pub metric_of: FxHashMap<ElementUuid, f64>,
    unknown: FxHashSet<ElementUuid>,
    center_kind: BadnessCenter,
    center: f64,
}

impl RuntimeMetricsOverlay {
    pub fn new(expressions: FxHashMap<ElementUuid, String>, center_kind: BadnessCenter) -> Self {
        Self {
            expressions,
            center_kind,
            ..Default::default()
        }
    }

    pub fn badness_center(&self) -> f64 {
        self.center
    }

    fn color_for(&self, uuid: &ElementUuid) -> Option<Color> {
        if let Some(metric) = self.metric_of.get(uuid) {
            return Some(heat_color(heat_ratio(*metric, self.center)));
        }
        if self.unknown.contains(uuid) {
            return Some(UNKNOWN_SHADE);
        }
        None
    }
}

impl Overlay for RuntimeMetricsOverlay {
    fn name(&self) -> &str {
        "runtime-metrics"
    }

    fn refresh(&mut self, ctx: &OverlayContext<'_>) {
        self.metric_of.clear();
        self.unknown.clear();
        let maps = graph_symbol_maps(ctx.doc, ctx.symbols);

        for (uuid, text) in &self.expressions {
            let symbols = maps.get(&uuid.graph);
            let value = Expr::parse(text)
                .ok()
                .and_then(|e| symbols.and_then(|s| e.evaluate(s)));
            match value {
                Some(v) => {
                    self.metric_of.insert(*uuid, v);
                }
                None => {
                    self.unknown.insert(*uuid);
                }
            }
        }

        let mut values: Vec<f64> = self.metric_of.values().copied().collect();
        self.center = match self.center_kind {
            _ if values.is_empty() => 0.0,
            BadnessCenter::Mean => values.iter().sum::<f64>() / values.len() as f64,
            BadnessCenter::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                values[values.len() / 2]
            }
        };
    }

    fn draw(&self, ctx: &OverlayContext<'_>, draw: &DrawContext<'_>, canvas: &mut dyn Canvas) {
        for_each_element(ctx.doc, ctx.layout, &mut |uuid, layout| {
            if let Some(color) = self.color_for(&uuid) {
                canvas.fill_rect(draw.device_rect(layout), color);
            }
        });
    }
}

/// Visits every visible state and node (including nested documents) with its
/// UUID and geometry.
pub fn for_each_element(
    doc: &GraphDocument,
    layout: &PositionedGraph,
    f: &mut impl FnMut(ElementUuid, &LayoutInfo),
) {
    let gid = doc.graph_id;
    for (sid, (state, positioned)) in doc.states.iter().zip(&layout.states).enumerate() {
        f(ElementUuid::state(gid, sid as i64), &positioned.layout);
        for (nid, (node, pos)) in state.nodes.iter().zip(&positioned.nodes).enumerate() {
            if pos.hidden {
                continue;
            }
            f(ElementUuid::node(gid, sid as i64, nid as i64), &pos.layout);
            if let floe_model::NodeKind::NestedGraph { document, .. } = &node.kind
                && let Some(nested) = nested_layout(pos)
            {
                for_each_element(document, nested, f);
            }
        }
    }
}

fn nested_layout(pos: &PositionedNode) -> Option<&PositionedGraph> {
    pos.nested.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_scale_is_clamped_and_centered() {
        assert_eq!(heat_ratio(0.0, 10.0), 0.0);
        assert_eq!(heat_ratio(10.0, 10.0), 0.5);
        assert_eq!(heat_ratio(40.0, 10.0), 1.0);
        assert_eq!(heat_ratio(-5.0, 10.0), 0.0);
        assert_eq!(heat_ratio(5.0, 0.0), 0.0);
    }

    #[test]
    fn heat_color_runs_green_to_red() {
        let cold = heat_color(0.0);
        let hot = heat_color(1.0);
        assert!(cold.g > cold.r);
        assert!(hot.r > hot.g);
    }
}
