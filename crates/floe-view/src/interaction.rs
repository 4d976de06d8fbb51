//! Pointer/keyboard interaction state machine.
//!
//! Modes: pan (default), move, box-select, and add. While panning, a held
//! Shift or Ctrl temporarily switches to select/move and reverts on key-up;
//! inside add mode the same modifiers keep the mode armed across
//! insertions. A drag record
//! opens on pointer-down and closes on pointer-up or Escape; Escape also
//! cancels add mode, leaves a cutout preview, and clears the selection, in
//! that priority order.

use floe_layout::ElementRef;
use floe_model::geom::{LayoutInfo, Point, PositionOverride, Rect, point, vector};
use floe_model::{GraphDocument, NodeKind, Selection, cutout, edit};

use crate::events::{HostEvent, PositionChangeKind};
use crate::render::RenderSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddKind {
    State,
    Tasklet,
    AccessNode,
    MapScope,
    NestedGraph,
    LibraryNode,
    Reduce,
    Edge,
}

impl AddKind {
    pub fn tag(self) -> &'static str {
        match self {
            AddKind::State => "state",
            AddKind::Tasklet => "tasklet",
            AddKind::AccessNode => "access",
            AddKind::MapScope => "map_scope",
            AddKind::NestedGraph => "nested_graph",
            AddKind::LibraryNode => "library",
            AddKind::Reduce => "reduce",
            AddKind::Edge => "edge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pan,
    Move,
    Select,
    Add {
        kind: AddKind,
        /// First endpoint of a two-click edge insertion.
        source: Option<ElementRef>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Shift,
    Ctrl,
    Escape,
    Delete,
}

#[derive(Debug)]
struct Drag {
    last_device: Point,
    moved: bool,
    /// Pressed element, used for click selection when the pointer never moves.
    hit: Option<ElementRef>,
    /// Elements displaced in move mode; empty while panning.
    targets: Vec<ElementRef>,
    /// Pre-drag overrides, restored when the drag is cancelled.
    originals: Vec<(ElementRef, PositionOverride)>,
}

#[derive(Debug, Default)]
pub struct Interaction {
    mode: Option<Mode>,
    /// Mode to restore when a temporary modifier override ends.
    resume: Option<Mode>,
    drag: Option<Drag>,
    /// Rubber-band corners in logical space.
    band: Option<(Point, Point)>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Pan)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = Some(mode);
        self.resume = None;
        self.band = None;
    }

    // ----- pointer ---------------------------------------------------------

    pub fn pointer_down(
        &mut self,
        session: &mut RenderSession,
        device: Point,
        _mods: Modifiers,
    ) -> Vec<HostEvent> {
        let logical = session.transform().to_logical(device);
        if session.overlay_pointer_event(logical) {
            return Vec::new();
        }
        let hit = session.hit_test(logical);

        match self.mode() {
            Mode::Pan => {
                self.drag = Some(Drag {
                    last_device: device,
                    moved: false,
                    hit,
                    targets: Vec::new(),
                    originals: Vec::new(),
                });
            }
            Mode::Move => {
                let targets = match hit {
                    Some(h) if session.is_selected(h) => move_targets(session),
                    Some(h) => vec![h],
                    None => Vec::new(),
                };
                let originals = targets
                    .iter()
                    .map(|&t| (t, session.override_of(t).cloned().unwrap_or_default()))
                    .collect();
                self.drag = Some(Drag {
                    last_device: device,
                    moved: false,
                    hit,
                    targets,
                    originals,
                });
            }
            Mode::Select => {
                self.band = Some((logical, logical));
            }
            Mode::Add { .. } => {}
        }
        Vec::new()
    }

    pub fn pointer_move(
        &mut self,
        session: &mut RenderSession,
        device: Point,
        _mods: Modifiers,
    ) -> Vec<HostEvent> {
        let logical = session.transform().to_logical(device);

        if let Some(mut drag) = self.drag.take() {
            if drag.targets.is_empty() {
                session.pan(device - drag.last_device);
            } else {
                let delta = logical - session.transform().to_logical(drag.last_device);
                for target in &drag.targets {
                    session.nudge(*target, delta);
                }
                for target in &drag.targets {
                    clamp_to_parent(session, *target);
                }
            }
            drag.last_device = device;
            drag.moved = true;
            self.drag = Some(drag);
            return Vec::new();
        }

        if let Some(band) = &mut self.band {
            band.1 = logical;
            session.request_draw();
            return Vec::new();
        }

        session.set_hovered(session.hit_test(logical));
        Vec::new()
    }

    pub fn pointer_up(
        &mut self,
        session: &mut RenderSession,
        device: Point,
        mods: Modifiers,
    ) -> Vec<HostEvent> {
        let logical = session.transform().to_logical(device);
        let mut events = Vec::new();

        if let Some(drag) = self.drag.take() {
            if drag.moved {
                if !drag.targets.is_empty() {
                    events.push(HostEvent::PositionChanged {
                        kind: PositionChangeKind::ManualMove,
                    });
                }
            } else {
                // A press without movement is a click-select.
                let event = if mods.shift {
                    drag.hit.and_then(|h| session.toggle_selected(h))
                } else {
                    session.select_only(drag.hit)
                };
                events.extend(event);
            }
            return events;
        }

        if let Some((a, b)) = self.band.take() {
            let rect = corners_rect(a, b);
            let contained = elements_in_band(session, &rect);
            let event = if mods.shift || mods.ctrl {
                session.extend_selection(contained, mods.ctrl)
            } else {
                let old_len = session.selected().len();
                session.select_only(None);
                let e = session.extend_selection(contained, false);
                if e.is_none() && old_len > 0 {
                    Some(HostEvent::SelectionChanged {
                        multi_selection_changed: old_len > 1,
                    })
                } else {
                    e
                }
            };
            events.extend(event);
            return events;
        }

        if let Mode::Add { kind, source } = self.mode() {
            events.extend(self.add_click(session, kind, source, logical, mods));
        }
        events
    }

    pub fn double_click(
        &mut self,
        session: &mut RenderSession,
        device: Point,
    ) -> Vec<HostEvent> {
        let logical = session.transform().to_logical(device);
        session
            .hit_test(logical)
            .and_then(|hit| session.toggle_collapse(hit))
            .into_iter()
            .collect()
    }

    pub fn wheel(&mut self, session: &mut RenderSession, delta_y: f64, device: Point) {
        let factor = (-delta_y * 0.002).exp();
        session.zoom_at(factor, device);
    }

    // ----- keys ------------------------------------------------------------

    pub fn key_down(&mut self, session: &mut RenderSession, key: Key) -> Vec<HostEvent> {
        match key {
            Key::Shift => {
                self.begin_override(Mode::Select);
                Vec::new()
            }
            Key::Ctrl => {
                self.begin_override(Mode::Move);
                Vec::new()
            }
            Key::Escape => self.escape(session),
            Key::Delete => self.delete_selection(session),
        }
    }

    pub fn key_up(&mut self, _session: &mut RenderSession, key: Key) -> Vec<HostEvent> {
        let temporary = match key {
            Key::Shift => Mode::Select,
            Key::Ctrl => Mode::Move,
            _ => return Vec::new(),
        };
        if self.mode() == temporary
            && let Some(previous) = self.resume.take()
        {
            self.mode = Some(previous);
        }
        Vec::new()
    }

    /// Modifier overrides apply while panning only; modifiers have their own
    /// meanings inside the other modes.
    fn begin_override(&mut self, temporary: Mode) {
        if self.mode() == Mode::Pan {
            self.resume = Some(Mode::Pan);
            self.mode = Some(temporary);
        }
    }

    fn escape(&mut self, session: &mut RenderSession) -> Vec<HostEvent> {
        if let Some(drag) = self.drag.take() {
            // Put every dragged element back where it started.
            for (target, original) in drag.originals {
                session.set_override(target, original);
            }
            return Vec::new();
        }
        if self.band.take().is_some() {
            session.request_draw();
            return Vec::new();
        }
        if matches!(self.mode(), Mode::Add { .. }) {
            self.mode = Some(Mode::Pan);
            return Vec::new();
        }
        if session.in_preview() {
            return session.exit_preview().into_iter().collect();
        }
        session.clear_selection().into_iter().collect()
    }

    // ----- operations ------------------------------------------------------

    /// Deletes everything selected, highest ids first so the remaining ids
    /// stay valid while processing.
    pub fn delete_selection(&mut self, session: &mut RenderSession) -> Vec<HostEvent> {
        let selected: Vec<ElementRef> = session.selected().iter().copied().collect();
        if selected.is_empty() {
            return Vec::new();
        }

        let mut interstate: Vec<usize> = Vec::new();
        let mut states: Vec<usize> = Vec::new();
        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut nodes: Vec<(usize, usize)> = Vec::new();
        for element in selected {
            match element {
                ElementRef::InterstateEdge(e) => interstate.push(e),
                ElementRef::State(s) => states.push(s),
                ElementRef::Edge(s, e) => edges.push((s, e)),
                ElementRef::Node(s, n) => nodes.push((s, n)),
                ElementRef::Shortcut(..) => {}
            }
        }
        interstate.sort_unstable_by(|a, b| b.cmp(a));
        states.sort_unstable_by(|a, b| b.cmp(a));
        edges.sort_unstable_by(|a, b| b.cmp(a));
        nodes.sort_unstable_by(|a, b| b.cmp(a));

        session.edit(|doc| {
            for (s, e) in edges {
                if states.contains(&s) {
                    continue;
                }
                if let Some(state) = doc.state_mut(s) {
                    edit::remove_edge(state, e);
                }
            }
            for (s, n) in nodes {
                if states.contains(&s) {
                    continue;
                }
                if let Some(state) = doc.state_mut(s) {
                    edit::remove_node(state, n);
                }
            }
            for e in interstate {
                edit::remove_interstate_edge(doc, e);
            }
            for s in states {
                edit::remove_state(doc, s);
            }
        });
        session.clear_selection().into_iter().collect()
    }

    /// Replaces the document with the cutout of the current selection,
    /// entering preview. Escape restores the original.
    pub fn cutout_selection(&mut self, session: &mut RenderSession) -> Vec<HostEvent> {
        let mut selection = Selection::default();
        for element in session.selected() {
            match *element {
                ElementRef::State(s) => {
                    selection.states.insert(s);
                }
                ElementRef::Node(s, n) => {
                    selection.nodes.insert((s, n));
                }
                _ => {}
            }
        }
        if selection.is_empty() {
            return Vec::new();
        }
        let reduced = cutout(session.document(), &selection);
        session.enter_preview(reduced);
        Vec::new()
    }

    fn add_click(
        &mut self,
        session: &mut RenderSession,
        kind: AddKind,
        source: Option<ElementRef>,
        logical: Point,
        mods: Modifiers,
    ) -> Vec<HostEvent> {
        let hit = session.hit_test(logical);

        if kind == AddKind::Edge {
            let Some(node @ ElementRef::Node(..)) = hit else {
                // Clicking away cancels a half-built edge.
                self.mode = Some(Mode::Add { kind, source: None });
                return Vec::new();
            };
            match source {
                None => {
                    self.mode = Some(Mode::Add {
                        kind,
                        source: Some(node),
                    });
                    Vec::new()
                }
                Some(src) => {
                    self.mode = Some(Mode::Add { kind, source: None });
                    if src == node {
                        return Vec::new();
                    }
                    let ElementRef::Node(src_state, _) = src else {
                        return Vec::new();
                    };
                    let ElementRef::Node(dst_state, _) = node else {
                        return Vec::new();
                    };
                    // Both endpoints must live in the same state graph.
                    if src_state != dst_state {
                        return Vec::new();
                    }
                    self.finish_add(kind, mods);
                    vec![HostEvent::AddGraphElement {
                        kind: kind.tag().to_string(),
                        parent: session.uuid_of(ElementRef::State(dst_state)),
                        from: Some(session.uuid_of(src)),
                    }]
                }
            }
        } else if kind == AddKind::State {
            // States go at top level or inside a nested graph node.
            let parent_graph = match hit {
                None => session.document().graph_id,
                Some(ElementRef::Node(s, n)) => {
                    match nested_graph_id(session.document(), s, n) {
                        Some(id) => id,
                        None => return Vec::new(),
                    }
                }
                Some(_) => return Vec::new(),
            };
            self.finish_add(kind, mods);
            vec![HostEvent::AddGraphElement {
                kind: kind.tag().to_string(),
                parent: floe_model::ElementUuid::graph(parent_graph),
                from: None,
            }]
        } else {
            // Node kinds need an enclosing state.
            let parent_state = match hit {
                Some(ElementRef::State(s)) | Some(ElementRef::Node(s, _)) => s,
                _ => return Vec::new(),
            };
            self.finish_add(kind, mods);
            vec![HostEvent::AddGraphElement {
                kind: kind.tag().to_string(),
                parent: session.uuid_of(ElementRef::State(parent_state)),
                from: None,
            }]
        }
    }

    /// A held modifier keeps add mode armed for repeated insertion; a plain
    /// click reverts to panning after the placement is emitted.
    fn finish_add(&mut self, kind: AddKind, mods: Modifiers) {
        self.mode = Some(if mods.shift || mods.ctrl {
            Mode::Add { kind, source: None }
        } else {
            Mode::Pan
        });
    }
}

/// Selection members to displace as a group: descendants of a selected state
/// are dropped so they are not moved twice.
fn move_targets(session: &RenderSession) -> Vec<ElementRef> {
    session
        .selected()
        .iter()
        .copied()
        .filter(|element| match element {
            ElementRef::Node(s, _) | ElementRef::Edge(s, _) | ElementRef::Shortcut(s, _) => {
                !session.is_selected(ElementRef::State(*s))
            }
            _ => true,
        })
        .collect()
}

/// Keeps a dragged node inside its owning state's box.
fn clamp_to_parent(session: &mut RenderSession, element: ElementRef) {
    let ElementRef::Node(s, _) = element else {
        return;
    };
    let Some(parent) = session.effective_layout(ElementRef::State(s)) else {
        return;
    };
    let Some(node) = session.effective_layout(element) else {
        return;
    };
    let pr = parent.rect();
    let clamped_x = node
        .x
        .clamp(pr.min_x() + node.width / 2.0, pr.max_x() - node.width / 2.0);
    let clamped_y = node
        .y
        .clamp(pr.min_y() + node.height / 2.0, pr.max_y() - node.height / 2.0);
    let dx = clamped_x - node.x;
    let dy = clamped_y - node.y;
    if dx != 0.0 || dy != 0.0 {
        session.nudge(element, vector(dx, dy));
    }
}

fn corners_rect(a: Point, b: Point) -> Rect {
    Rect::new(
        point(a.x.min(b.x), a.y.min(b.y)),
        euclid::size2((a.x - b.x).abs(), (a.y - b.y).abs()),
    )
}

/// The inner document's graph id when `(s, n)` is a nested graph node.
fn nested_graph_id(doc: &GraphDocument, s: usize, n: usize) -> Option<i64> {
    match &doc.states.get(s)?.nodes.get(n)?.kind {
        NodeKind::NestedGraph { document, .. } => Some(document.graph_id),
        _ => None,
    }
}

/// States and nodes lying entirely inside the rubber band. Grazing the band
/// is not membership.
fn elements_in_band(session: &RenderSession, rect: &Rect) -> Vec<ElementRef> {
    let band = LayoutInfo::new(
        rect.origin.x + rect.size.width / 2.0,
        rect.origin.y + rect.size.height / 2.0,
        rect.size.width,
        rect.size.height,
    );
    let mut out = Vec::new();
    for sid in 0..session.document().states.len() {
        let element = ElementRef::State(sid);
        if let Some(layout) = session.effective_layout(element)
            && layout.contained_in(&band)
        {
            out.push(element);
        }
        for nid in 0..session.document().states[sid].nodes.len() {
            let element = ElementRef::Node(sid, nid);
            if let Some(layout) = session.effective_layout(element)
                && layout.contained_in(&band)
            {
                out.push(element);
            }
        }
    }
    out
}
