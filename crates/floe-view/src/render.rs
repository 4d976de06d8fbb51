//! Render session: the single owner of view state.
//!
//! One session per displayed document. It owns the document, its layout, the
//! view transform and animation, manual position overrides, selection and
//! hover state, overlays, the symbol resolver and the error banner. The host
//! drives it: `on_frame(now)` once per animation frame, pointer/key entry
//! points through the interaction machine, prompt completions through the
//! resolver.

use floe_layout::{ElementRef, LayoutOptions, PositionedGraph, layout_document};
use floe_model::geom::{LayoutInfo, Point, PositionOverride, Rect, Size, Vector, point, vector};
use floe_model::{DocumentError, ElementUuid, GraphDocument, NodeKind, traverse};
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::canvas::{Canvas, Color, TextAlign};
use crate::draw::{self, DrawContext, VisualState};
use crate::events::{HostEvent, PositionChangeKind};
use crate::overlay::{Overlay, OverlayContext};
use crate::symbols::SymbolResolver;
use crate::transform::{ViewAnimation, ViewTransform};

const BANNER_HEIGHT: f64 = 28.0;
const BANNER_FILL: Color = Color::rgba(200, 40, 40, 230);
const TOOLTIP_FILL: Color = Color::rgba(40, 40, 40, 230);
/// Device-pixel pick tolerance around edge paths.
const EDGE_PICK_PX: f64 = 6.0;

pub struct RenderSession {
    doc: GraphDocument,
    layout: PositionedGraph,
    options: LayoutOptions,
    transform: ViewTransform,
    animation: Option<ViewAnimation>,
    viewport: Size,
    lod: bool,
    overrides: FxHashMap<ElementRef, PositionOverride>,
    selected: IndexSet<ElementRef>,
    hovered: Option<ElementRef>,
    highlighted: FxHashSet<ElementRef>,
    overlays: Vec<Box<dyn Overlay>>,
    resolver: SymbolResolver,
    banner: Option<DocumentError>,
    preview_original: Option<GraphDocument>,
    in_frame: bool,
    frame_requested: bool,
    dropped_draws: u32,
}

impl RenderSession {
    pub fn new(doc: GraphDocument, options: LayoutOptions, viewport: Size) -> Self {
        let layout = layout_document(&doc, &options);
        let resolver = SymbolResolver::new(&doc);
        let banner = doc.error.clone();
        let mut session = Self {
            doc,
            layout,
            options,
            transform: ViewTransform::default(),
            animation: None,
            viewport,
            lod: true,
            overrides: FxHashMap::default(),
            selected: IndexSet::new(),
            hovered: None,
            highlighted: FxHashSet::default(),
            overlays: Vec::new(),
            resolver,
            banner,
            preview_original: None,
            in_frame: false,
            frame_requested: true,
            dropped_draws: 0,
        };
        session.transform = ViewTransform::fit(session.content_bounds(), viewport);
        session
    }

    /// Saved per-element positions from the input document.
    pub fn apply_saved_overrides(&mut self, saved: &[(ElementUuid, PositionOverride)]) {
        for (uuid, ov) in saved {
            if let Some(element) = self.find_element(uuid) {
                self.overrides.insert(element, ov.clone());
            }
        }
        self.request_draw();
    }

    pub fn document(&self) -> &GraphDocument {
        &self.doc
    }

    pub fn layout(&self) -> &PositionedGraph {
        &self.layout
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut SymbolResolver {
        &mut self.resolver
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Applies a document edit, then re-lays-out and refreshes overlays.
    pub fn edit(&mut self, apply: impl FnOnce(&mut GraphDocument)) {
        apply(&mut self.doc);
        self.relayout();
    }

    pub fn set_layout_options(&mut self, options: LayoutOptions) {
        self.options = options;
        self.relayout();
    }

    pub fn relayout(&mut self) {
        self.layout = layout_document(&self.doc, &self.options);
        tracing::debug!(states = self.doc.states.len(), "document re-laid out");
        self.overrides.retain(|r, _| element_exists(&self.doc, r));
        self.selected.retain(|r| element_exists(&self.doc, r));
        if self.hovered.is_some_and(|r| !element_exists(&self.doc, &r)) {
            self.hovered = None;
        }
        self.highlighted.retain(|r| element_exists(&self.doc, r));
        self.refresh_overlays();
        self.request_draw();
    }

    // ----- frame loop ------------------------------------------------------

    /// Schedules a redraw. Requests arriving while a frame is being drawn are
    /// dropped and counted, never queued.
    pub fn request_draw(&mut self) {
        if self.in_frame {
            self.dropped_draws += 1;
        } else {
            self.frame_requested = true;
        }
    }

    pub fn dropped_draws(&self) -> u32 {
        self.dropped_draws
    }

    /// True when something changed since the last frame and a draw is due.
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.request_draw();
    }

    pub fn set_lod(&mut self, enabled: bool) {
        self.lod = enabled;
        self.request_draw();
    }

    /// Draws one frame. Returns true while a view animation is still running
    /// (the host keeps the frame callback scheduled).
    pub fn on_frame(&mut self, now: f64, canvas: &mut dyn Canvas) -> bool {
        if self.in_frame {
            self.dropped_draws += 1;
            return false;
        }
        self.in_frame = true;
        self.frame_requested = false;

        if let Some(anim) = self.animation {
            let (matrix, done) = anim.sample(now);
            self.transform = ViewTransform::from_matrix(matrix);
            if done {
                self.animation = None;
            }
        }

        canvas.clear(draw::BACKGROUND);
        let ctx = DrawContext {
            view: &self.transform,
            ppp: self.transform.points_per_pixel(),
            lod: self.lod,
            visible: self.transform.visible_rect(self.viewport),
        };

        self.draw_graph(canvas, &ctx);
        self.draw_overlays(canvas, &ctx);
        self.draw_banner(canvas);
        self.draw_tooltip(canvas, &ctx);

        self.in_frame = false;
        self.animation.is_some()
    }

    fn draw_graph(&self, canvas: &mut dyn Canvas, ctx: &DrawContext<'_>) {
        for (i, routed) in self.layout.interstate_edges.iter().enumerate() {
            let Some(routed) = routed else { continue };
            let element = ElementRef::InterstateEdge(i);
            let points = self.offset_points(&routed.points, element);
            draw::draw_edge(canvas, ctx, &points, self.visual_of(element), true);
        }

        for (sid, (state, positioned)) in
            self.doc.states.iter().zip(&self.layout.states).enumerate()
        {
            let element = ElementRef::State(sid);
            let state_offset = self.offset_of(element);
            let layout = shifted(&positioned.layout, state_offset);
            draw::draw_state(canvas, ctx, state, &layout, self.visual_of(element));
            if state.is_collapsed {
                continue;
            }

            for (eid, routed) in positioned.edges.iter().enumerate() {
                let Some(routed) = routed else { continue };
                let element = ElementRef::Edge(sid, eid);
                let points = self.edge_points(&routed.points, element, state_offset);
                draw::draw_edge(canvas, ctx, &points, self.visual_of(element), false);
            }
            for (i, shortcut) in positioned.shortcuts.iter().enumerate() {
                let element = ElementRef::Shortcut(sid, i);
                let points = self.offset_points(&shortcut.edge.points, ElementRef::State(sid));
                draw::draw_edge(canvas, ctx, &points, self.visual_of(element), true);
            }

            for (nid, (node, pos)) in state.nodes.iter().zip(&positioned.nodes).enumerate() {
                let element = ElementRef::Node(sid, nid);
                let offset = state_offset + self.own_offset(element);
                draw::draw_node(canvas, ctx, node, pos, offset, self.visual_of(element));
                if let NodeKind::NestedGraph { document, .. } = &node.kind
                    && !node.is_collapsed
                    && let Some(nested) = pos.nested.as_deref()
                {
                    draw_nested(canvas, ctx, document, nested, offset);
                }
            }
        }
    }

    fn draw_overlays(&self, canvas: &mut dyn Canvas, ctx: &DrawContext<'_>) {
        let overlay_ctx = OverlayContext {
            doc: &self.doc,
            layout: &self.layout,
            symbols: self.resolver.symbols(),
        };
        for overlay in &self.overlays {
            overlay.draw(&overlay_ctx, ctx, canvas);
        }
    }

    fn draw_banner(&self, canvas: &mut dyn Canvas) {
        let Some(error) = &self.banner else { return };
        let rect = Rect::new(point(0.0, 0.0), euclid::size2(self.viewport.width, BANNER_HEIGHT));
        canvas.fill_rect(rect, BANNER_FILL);
        canvas.text(
            &format!("{} (at {})", error.message, error.uuid),
            point(8.0, BANNER_HEIGHT * 0.7),
            13.0,
            Color::WHITE,
            TextAlign::Left,
        );
    }

    fn draw_tooltip(&self, canvas: &mut dyn Canvas, ctx: &DrawContext<'_>) {
        let Some(element) = self.hovered else { return };
        let Some(text) = self.tooltip_text(element) else {
            return;
        };
        let Some(layout) = self.effective_layout(element) else {
            return;
        };
        let anchor = ctx.dp(layout.x, layout.y - layout.height / 2.0);
        let width = text.chars().count() as f64 * 7.0 + 12.0;
        let rect = Rect::new(
            point(anchor.x - width / 2.0, anchor.y - 26.0),
            euclid::size2(width, 20.0),
        );
        canvas.fill_rect(rect, TOOLTIP_FILL);
        canvas.text(
            &text,
            point(anchor.x, anchor.y - 12.0),
            12.0,
            Color::WHITE,
            TextAlign::Center,
        );
    }

    fn tooltip_text(&self, element: ElementRef) -> Option<String> {
        match element {
            ElementRef::State(s) => Some(self.doc.states.get(s)?.label.clone()),
            ElementRef::Node(s, n) => {
                let node = self.doc.states.get(s)?.node(n)?;
                match &node.kind {
                    NodeKind::MapEntry { params, ranges } => {
                        let header: Vec<String> = params
                            .iter()
                            .zip(ranges)
                            .map(|(p, r)| format!("{p}={r}"))
                            .collect();
                        Some(format!("{} [{}]", node.label, header.join(", ")))
                    }
                    _ => Some(node.label.clone()),
                }
            }
            ElementRef::Edge(s, e) => {
                let edge = self.doc.states.get(s)?.edges.get(e)?;
                let memlet = &edge.memlet;
                let data = memlet.data.as_deref()?;
                match &memlet.subset {
                    Some(subset) => Some(format!("{data}[{subset}]")),
                    None => Some(data.to_string()),
                }
            }
            ElementRef::InterstateEdge(e) => Some(self.doc.edges.get(e)?.condition.clone()),
            ElementRef::Shortcut(..) => None,
        }
    }

    // ----- view ------------------------------------------------------------

    pub fn content_bounds(&self) -> Rect {
        Rect::new(
            point(0.0, 0.0),
            euclid::size2(self.layout.width.max(1.0), self.layout.height.max(1.0)),
        )
    }

    /// Moves the view to fit `bbox`, optionally animated. Re-requesting a
    /// target the current animation already heads for is a no-op.
    pub fn set_view(&mut self, bbox: Rect, animate: bool, now: f64) {
        let target = ViewTransform::fit(bbox, self.viewport);
        if animate {
            if self
                .animation
                .is_some_and(|anim| anim.targets(target.matrix()))
            {
                return;
            }
            self.animation = Some(ViewAnimation::new(&self.transform, *target.matrix(), now));
        } else {
            self.animation = None;
            self.transform = target;
        }
        self.request_draw();
    }

    pub fn zoom_to_fit(&mut self, animate: bool, now: f64) {
        self.set_view(self.content_bounds(), animate, now);
    }

    /// Manual pan; cancels any running view animation.
    pub fn pan(&mut self, delta_device: Vector) {
        self.animation = None;
        self.transform.pan(delta_device);
        self.request_draw();
    }

    pub fn zoom_at(&mut self, factor: f64, anchor_device: Point) {
        self.animation = None;
        self.transform.scale_at(factor, anchor_device);
        self.request_draw();
    }

    // ----- geometry / hit-testing ------------------------------------------

    fn base_layout(&self, element: ElementRef) -> Option<LayoutInfo> {
        match element {
            ElementRef::State(s) => Some(self.layout.states.get(s)?.layout),
            ElementRef::Node(s, n) => {
                let pos = self.layout.states.get(s)?.nodes.get(n)?;
                (!pos.hidden).then_some(pos.layout)
            }
            ElementRef::Edge(s, e) => Some(
                self.layout
                    .states
                    .get(s)?
                    .edges
                    .get(e)?
                    .as_ref()?
                    .bounds(),
            ),
            ElementRef::InterstateEdge(e) => {
                Some(self.layout.interstate_edges.get(e)?.as_ref()?.bounds())
            }
            ElementRef::Shortcut(s, i) => {
                Some(self.layout.states.get(s)?.shortcuts.get(i)?.edge.bounds())
            }
        }
    }

    fn own_offset(&self, element: ElementRef) -> Vector {
        self.overrides
            .get(&element)
            .map_or_else(|| vector(0.0, 0.0), |ov| vector(ov.dx, ov.dy))
    }

    /// Total displacement of an element: its own override plus the override
    /// of its owning state, so moving a state carries its content along.
    pub fn offset_of(&self, element: ElementRef) -> Vector {
        let own = self.own_offset(element);
        match element {
            ElementRef::Node(s, _) | ElementRef::Edge(s, _) | ElementRef::Shortcut(s, _) => {
                own + self.own_offset(ElementRef::State(s))
            }
            _ => own,
        }
    }

    /// Override-adjusted geometry, `None` for hidden or dropped elements.
    pub fn effective_layout(&self, element: ElementRef) -> Option<LayoutInfo> {
        Some(shifted(&self.base_layout(element)?, self.offset_of(element)))
    }

    fn offset_points(&self, points: &[(f64, f64)], element: ElementRef) -> Vec<(f64, f64)> {
        let d = self.offset_of(element);
        points.iter().map(|&(x, y)| (x + d.x, y + d.y)).collect()
    }

    /// Edge path with the owning-state shift, the edge's own shift, and its
    /// per-interior-point deltas applied.
    fn edge_points(
        &self,
        points: &[(f64, f64)],
        element: ElementRef,
        state_offset: Vector,
    ) -> Vec<(f64, f64)> {
        let ov = self.overrides.get(&element);
        let (dx, dy) = ov.map_or((0.0, 0.0), |o| (o.dx, o.dy));
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                // Per-point deltas address interior points only.
                let (px, py) = match (i, ov) {
                    (0, _) => (0.0, 0.0),
                    (i, Some(o)) if i < points.len() - 1 => {
                        o.points.get(i - 1).copied().unwrap_or((0.0, 0.0))
                    }
                    _ => (0.0, 0.0),
                };
                (
                    x + state_offset.x + dx + px,
                    y + state_offset.y + dy + py,
                )
            })
            .collect()
    }

    /// Topmost element under a logical point: smallest bounding-box area
    /// among the hit candidates, checked in precedence order (states,
    /// inter-state edges, nodes, edges). Later, more specific categories win
    /// area ties.
    pub fn hit_test(&self, logical: Point) -> Option<ElementRef> {
        let ppp = self.transform.points_per_pixel();
        let tol = if ppp.is_finite() { EDGE_PICK_PX * ppp } else { EDGE_PICK_PX };

        let mut best: Option<(f64, ElementRef)> = None;
        let consider = |area: f64, element: ElementRef, best: &mut Option<(f64, ElementRef)>| {
            if best.is_none_or(|(a, _)| area <= a) {
                *best = Some((area, element));
            }
        };

        for sid in 0..self.doc.states.len() {
            let element = ElementRef::State(sid);
            if let Some(layout) = self.effective_layout(element)
                && layout.contains(logical)
            {
                consider(layout.area(), element, &mut best);
            }
        }

        for (i, routed) in self.layout.interstate_edges.iter().enumerate() {
            let Some(routed) = routed else { continue };
            let element = ElementRef::InterstateEdge(i);
            let points = self.offset_points(&routed.points, element);
            if near_path(&points, logical, tol) {
                consider(path_area(&points), element, &mut best);
            }
        }

        for (sid, state) in self.doc.states.iter().enumerate() {
            if state.is_collapsed {
                continue;
            }
            for nid in 0..state.nodes.len() {
                let element = ElementRef::Node(sid, nid);
                if let Some(layout) = self.effective_layout(element)
                    && layout.contains(logical)
                {
                    consider(layout.area(), element, &mut best);
                }
            }
        }

        for (sid, (state, positioned)) in
            self.doc.states.iter().zip(&self.layout.states).enumerate()
        {
            if state.is_collapsed {
                continue;
            }
            let state_offset = self.offset_of(ElementRef::State(sid));
            for (eid, routed) in positioned.edges.iter().enumerate() {
                let Some(routed) = routed else { continue };
                let element = ElementRef::Edge(sid, eid);
                let points = self.edge_points(&routed.points, element, state_offset);
                if near_path(&points, logical, tol) {
                    consider(path_area(&points), element, &mut best);
                }
            }
        }

        best.map(|(_, element)| element)
    }

    // ----- selection / hover -----------------------------------------------

    pub fn selected(&self) -> &IndexSet<ElementRef> {
        &self.selected
    }

    pub fn is_selected(&self, element: ElementRef) -> bool {
        self.selected.contains(&element)
    }

    fn selection_event(&mut self, old_len: usize) -> Option<HostEvent> {
        self.request_draw();
        Some(HostEvent::SelectionChanged {
            multi_selection_changed: old_len > 1 || self.selected.len() > 1,
        })
    }

    pub fn select_only(&mut self, element: Option<ElementRef>) -> Option<HostEvent> {
        let old_len = self.selected.len();
        let same = match element {
            Some(e) => old_len == 1 && self.selected.contains(&e),
            None => old_len == 0,
        };
        if same {
            return None;
        }
        self.selected.clear();
        if let Some(e) = element {
            self.selected.insert(e);
        }
        self.selection_event(old_len)
    }

    pub fn toggle_selected(&mut self, element: ElementRef) -> Option<HostEvent> {
        let old_len = self.selected.len();
        if !self.selected.shift_remove(&element) {
            self.selected.insert(element);
        }
        self.selection_event(old_len)
    }

    pub fn extend_selection(
        &mut self,
        elements: impl IntoIterator<Item = ElementRef>,
        subtract: bool,
    ) -> Option<HostEvent> {
        let old_len = self.selected.len();
        let mut changed = false;
        for e in elements {
            changed |= if subtract {
                self.selected.shift_remove(&e)
            } else {
                self.selected.insert(e)
            };
        }
        if !changed {
            return None;
        }
        self.selection_event(old_len)
    }

    pub fn clear_selection(&mut self) -> Option<HostEvent> {
        self.select_only(None)
    }

    /// Hovering a memlet edge highlights the rest of its multi-hop chain
    /// through scope entry/exit connectors.
    pub fn set_hovered(&mut self, element: Option<ElementRef>) {
        if self.hovered == element {
            return;
        }
        self.hovered = element;
        self.highlighted.clear();
        if let Some(ElementRef::Edge(s, e)) = element
            && let Some(state) = self.doc.states.get(s)
        {
            for idx in traverse::memlet_path(state, e) {
                if idx != e {
                    self.highlighted.insert(ElementRef::Edge(s, idx));
                }
            }
        }
        self.request_draw();
    }

    pub fn hovered(&self) -> Option<ElementRef> {
        self.hovered
    }

    pub fn set_highlighted(&mut self, elements: impl IntoIterator<Item = ElementRef>) {
        self.highlighted = elements.into_iter().collect();
        self.request_draw();
    }

    pub fn highlighted(&self) -> &FxHashSet<ElementRef> {
        &self.highlighted
    }

    fn visual_of(&self, element: ElementRef) -> VisualState {
        VisualState::resolve(
            self.selected.contains(&element),
            self.hovered == Some(element),
            self.highlighted.contains(&element),
        )
    }

    // ----- position overrides ----------------------------------------------

    pub fn override_of(&self, element: ElementRef) -> Option<&PositionOverride> {
        self.overrides.get(&element)
    }

    pub fn set_override(&mut self, element: ElementRef, ov: PositionOverride) {
        if ov.is_noop() {
            self.overrides.remove(&element);
        } else {
            self.overrides.insert(element, ov);
        }
        self.request_draw();
    }

    /// Adds a displacement on top of whatever override the element carries.
    pub fn nudge(&mut self, element: ElementRef, delta: Vector) {
        let ov = self.overrides.entry(element).or_default();
        ov.dx += delta.x;
        ov.dy += delta.y;
        self.request_draw();
    }

    pub fn reset_positions(&mut self) -> Option<HostEvent> {
        if self.overrides.is_empty() {
            return None;
        }
        self.overrides.clear();
        self.request_draw();
        Some(HostEvent::PositionChanged {
            kind: PositionChangeKind::Reset,
        })
    }

    // ----- collapse --------------------------------------------------------

    /// Double-click semantics: toggles the collapse flag of the hit element.
    /// A scope exit redirects to its paired entry.
    pub fn toggle_collapse(&mut self, element: ElementRef) -> Option<HostEvent> {
        let collapsed = match element {
            ElementRef::State(s) => {
                let state = self.doc.states.get_mut(s)?;
                state.is_collapsed = !state.is_collapsed;
                state.is_collapsed
            }
            ElementRef::Node(s, n) => {
                let state = self.doc.states.get_mut(s)?;
                let target = match state.nodes.get(n)?.kind {
                    NodeKind::MapExit { scope_entry } => scope_entry,
                    _ => n,
                };
                let node = state.nodes.get_mut(target)?;
                if !node.is_compound() {
                    return None;
                }
                node.is_collapsed = !node.is_collapsed;
                node.is_collapsed
            }
            _ => return None,
        };
        self.relayout();
        Some(HostEvent::CollapseStateChanged {
            collapsed,
            all: false,
        })
    }

    pub fn set_all_collapsed(&mut self, collapsed: bool) -> HostEvent {
        for state in &mut self.doc.states {
            state.is_collapsed = collapsed;
            for node in &mut state.nodes {
                if node.is_compound() {
                    node.is_collapsed = collapsed;
                }
            }
        }
        self.relayout();
        HostEvent::CollapseStateChanged {
            collapsed,
            all: true,
        }
    }

    // ----- error banner ----------------------------------------------------

    pub fn error_banner(&self) -> Option<&DocumentError> {
        self.banner.as_ref()
    }

    /// Clears the banner without touching document content.
    pub fn dismiss_error(&mut self) {
        self.banner = None;
        self.request_draw();
    }

    /// Animates the view to the element the banner points at.
    pub fn focus_error(&mut self, now: f64) {
        let Some(uuid) = self.banner.as_ref().map(|e| e.uuid) else {
            return;
        };
        let Some(layout) = self
            .find_element(&uuid)
            .and_then(|element| self.effective_layout(element))
        else {
            return;
        };
        let r = layout.rect();
        self.set_view(r.inflate(r.width(), r.height()), true, now);
    }

    // ----- uuids -----------------------------------------------------------

    pub fn uuid_of(&self, element: ElementRef) -> ElementUuid {
        let gid = self.doc.graph_id;
        match element {
            ElementRef::State(s) => ElementUuid::state(gid, s as i64),
            ElementRef::Node(s, n) => ElementUuid::node(gid, s as i64, n as i64),
            ElementRef::Edge(s, e) => ElementUuid::edge(gid, s as i64, e as i64),
            ElementRef::InterstateEdge(e) => ElementUuid::interstate_edge(gid, e as i64),
            ElementRef::Shortcut(s, _) => ElementUuid::state(gid, s as i64),
        }
    }

    /// Top-level element for a UUID; elements inside nested documents have no
    /// top-level ref and resolve to `None`.
    pub fn find_element(&self, uuid: &ElementUuid) -> Option<ElementRef> {
        if uuid.graph != self.doc.graph_id {
            return None;
        }
        if uuid.is_node() {
            let (s, n) = (uuid.state as usize, uuid.node as usize);
            (s < self.doc.states.len() && n < self.doc.states[s].nodes.len())
                .then_some(ElementRef::Node(s, n))
        } else if uuid.is_edge() {
            if uuid.state >= 0 {
                let (s, e) = (uuid.state as usize, uuid.edge as usize);
                (s < self.doc.states.len() && e < self.doc.states[s].edges.len())
                    .then_some(ElementRef::Edge(s, e))
            } else {
                let e = uuid.edge as usize;
                (e < self.doc.edges.len()).then_some(ElementRef::InterstateEdge(e))
            }
        } else if uuid.is_state() {
            let s = uuid.state as usize;
            (s < self.doc.states.len()).then_some(ElementRef::State(s))
        } else {
            None
        }
    }

    // ----- overlays --------------------------------------------------------

    pub fn register_overlay(&mut self, overlay: Box<dyn Overlay>) {
        self.overlays.push(overlay);
        self.refresh_overlays();
        self.request_draw();
    }

    pub fn deregister_overlay(&mut self, name: &str) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.name() != name);
        self.request_draw();
        before != self.overlays.len()
    }

    pub fn refresh_overlays(&mut self) {
        let mut overlays = std::mem::take(&mut self.overlays);
        let ctx = OverlayContext {
            doc: &self.doc,
            layout: &self.layout,
            symbols: self.resolver.symbols(),
        };
        for overlay in &mut overlays {
            overlay.refresh(&ctx);
        }
        self.overlays = overlays;
    }

    /// Offers a pointer event to overlays, topmost-registered first.
    pub fn overlay_pointer_event(&mut self, logical: Point) -> bool {
        let mut overlays = std::mem::take(&mut self.overlays);
        let ctx = OverlayContext {
            doc: &self.doc,
            layout: &self.layout,
            symbols: self.resolver.symbols(),
        };
        let consumed = overlays
            .iter_mut()
            .rev()
            .any(|o| o.on_pointer_event(&ctx, logical));
        self.overlays = overlays;
        consumed
    }

    // ----- cutout preview --------------------------------------------------

    pub fn in_preview(&self) -> bool {
        self.preview_original.is_some()
    }

    /// Replaces the document with a derived reduction, keeping the original
    /// for restore. Entering a preview from a preview keeps the outermost
    /// original.
    pub fn enter_preview(&mut self, reduced: GraphDocument) {
        if self.preview_original.is_none() {
            self.preview_original = Some(self.doc.clone());
        }
        self.doc = reduced;
        self.selected.clear();
        self.relayout();
    }

    pub fn exit_preview(&mut self) -> Option<HostEvent> {
        let original = self.preview_original.take()?;
        self.doc = original;
        self.selected.clear();
        self.relayout();
        Some(HostEvent::ExitPreview)
    }
}

fn shifted(layout: &LayoutInfo, d: Vector) -> LayoutInfo {
    LayoutInfo::new(layout.x + d.x, layout.y + d.y, layout.width, layout.height)
}

fn element_exists(doc: &GraphDocument, element: &ElementRef) -> bool {
    match *element {
        ElementRef::State(s) => s < doc.states.len(),
        ElementRef::InterstateEdge(e) => e < doc.edges.len(),
        ElementRef::Node(s, n) => doc.states.get(s).is_some_and(|st| n < st.nodes.len()),
        ElementRef::Edge(s, e) => doc.states.get(s).is_some_and(|st| e < st.edges.len()),
        ElementRef::Shortcut(s, _) => s < doc.states.len(),
    }
}

fn draw_nested(
    canvas: &mut dyn Canvas,
    ctx: &DrawContext<'_>,
    doc: &GraphDocument,
    layout: &PositionedGraph,
    offset: Vector,
) {
    for routed in layout.interstate_edges.iter().flatten() {
        let points: Vec<(f64, f64)> = routed
            .points
            .iter()
            .map(|&(x, y)| (x + offset.x, y + offset.y))
            .collect();
        draw::draw_edge(canvas, ctx, &points, VisualState::Default, true);
    }
    for (state, positioned) in doc.states.iter().zip(&layout.states) {
        let shifted_layout = shifted(&positioned.layout, offset);
        draw::draw_state(canvas, ctx, state, &shifted_layout, VisualState::Default);
        if state.is_collapsed {
            continue;
        }
        for routed in positioned.edges.iter().flatten() {
            let points: Vec<(f64, f64)> = routed
                .points
                .iter()
                .map(|&(x, y)| (x + offset.x, y + offset.y))
                .collect();
            draw::draw_edge(canvas, ctx, &points, VisualState::Default, false);
        }
        for (node, pos) in state.nodes.iter().zip(&positioned.nodes) {
            draw::draw_node(canvas, ctx, node, pos, offset, VisualState::Default);
            if let NodeKind::NestedGraph { document, .. } = &node.kind
                && !node.is_collapsed
                && let Some(nested) = pos.nested.as_deref()
            {
                draw_nested(canvas, ctx, document, nested, offset);
            }
        }
    }
}

fn near_path(points: &[(f64, f64)], p: Point, tol: f64) -> bool {
    points.windows(2).any(|seg| {
        segment_distance(seg[0], seg[1], (p.x, p.y)) <= tol
    })
}

fn segment_distance(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let len2 = abx * abx + aby * aby;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + abx * t, a.1 + aby * t);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

fn path_area(points: &[(f64, f64)]) -> f64 {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min.0 = min.0.min(x);
        min.1 = min.1.min(y);
        max.0 = max.0.max(x);
        max.1 = max.1.max(y);
    }
    (max.0 - min.0).max(0.0) * (max.1 - min.1).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use floe_model::{Edge, Node, State};

    fn session() -> RenderSession {
        let mut state = State {
            label: "s0".into(),
            ..Default::default()
        };
        state.nodes = vec![
            Node::new("a", NodeKind::Tasklet),
            Node::new("b", NodeKind::Tasklet),
        ];
        state.scope_of = vec![None, None];
        state.edges = vec![Edge {
            src: 0,
            dst: 1,
            ..Default::default()
        }];
        let doc = GraphDocument {
            states: vec![state],
            ..Default::default()
        };
        RenderSession::new(doc, LayoutOptions::default(), euclid::size2(800.0, 600.0))
    }

    #[test]
    fn hit_testing_prefers_the_node_over_its_state() {
        let s = session();
        let center = s.layout().states[0].nodes[0].layout.center();
        assert_eq!(s.hit_test(center), Some(ElementRef::Node(0, 0)));
    }

    #[test]
    fn hit_testing_misses_empty_space() {
        let s = session();
        assert_eq!(s.hit_test(point(-500.0, -500.0)), None);
    }

    #[test]
    fn moving_a_state_carries_its_nodes() {
        let mut s = session();
        s.nudge(ElementRef::State(0), vector(100.0, 50.0));
        let base = s.layout().states[0].nodes[0].layout;
        let moved = s.effective_layout(ElementRef::Node(0, 0)).unwrap();
        assert_eq!((moved.x, moved.y), (base.x + 100.0, base.y + 50.0));
    }

    #[test]
    fn reset_positions_clears_overrides_and_reports_it() {
        let mut s = session();
        s.nudge(ElementRef::Node(0, 0), vector(10.0, 10.0));
        let event = s.reset_positions();
        assert_eq!(
            event,
            Some(HostEvent::PositionChanged {
                kind: PositionChangeKind::Reset
            })
        );
        assert!(s.override_of(ElementRef::Node(0, 0)).is_none());
        assert!(s.reset_positions().is_none());
    }

    #[test]
    fn selection_events_track_multi_involvement() {
        let mut s = session();
        let e = s.select_only(Some(ElementRef::Node(0, 0))).unwrap();
        assert_eq!(e, HostEvent::SelectionChanged { multi_selection_changed: false });
        let e = s.toggle_selected(ElementRef::Node(0, 1)).unwrap();
        assert_eq!(e, HostEvent::SelectionChanged { multi_selection_changed: true });
        // Re-selecting the current selection is not a change.
        assert!(s.select_only(None).is_some());
        assert!(s.select_only(None).is_none());
    }

    #[test]
    fn frames_render_and_animations_finish() {
        let mut s = session();
        s.zoom_to_fit(true, 0.0);
        let mut canvas = RecordingCanvas::new();
        assert!(s.on_frame(0.5, &mut canvas));
        assert!(!canvas.ops.is_empty());
        assert!(!s.on_frame(2.0, &mut canvas));
    }

    #[test]
    fn dismissing_the_banner_keeps_the_document() {
        let mut state = State::default();
        state.nodes.push(Node::new("a", NodeKind::Tasklet));
        state.scope_of.push(None);
        let doc = GraphDocument {
            states: vec![state],
            error: Some(DocumentError {
                message: "invalid memlet".into(),
                uuid: ElementUuid::node(0, 0, 0),
            }),
            ..Default::default()
        };
        let mut s = RenderSession::new(doc, LayoutOptions::default(), euclid::size2(400.0, 300.0));
        assert!(s.error_banner().is_some());
        s.dismiss_error();
        assert!(s.error_banner().is_none());
        assert_eq!(s.document().states.len(), 1);
    }

    #[test]
    fn preview_round_trips_the_original_document() {
        let mut s = session();
        let reduced = GraphDocument::default();
        s.enter_preview(reduced);
        assert!(s.in_preview());
        assert!(s.document().states.is_empty());
        let event = s.exit_preview();
        assert_eq!(event, Some(HostEvent::ExitPreview));
        assert_eq!(s.document().states.len(), 1);
        assert!(s.exit_preview().is_none());
    }
}
