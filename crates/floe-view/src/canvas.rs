//! Backend-neutral drawing surface.
//!
//! The host supplies the actual backend (HTML canvas, skia, a test recorder);
//! the view expresses every frame as a flat sequence of fill/stroke/text ops
//! in device coordinates.

use floe_model::geom::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub dashed: bool,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: false,
        }
    }

    pub fn dashed(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dashed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

/// One frame's worth of drawing. All coordinates are device pixels; the
/// session applies the view transform before issuing ops.
pub trait Canvas {
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke);
    fn fill_polygon(&mut self, points: &[Point], color: Color);
    /// Open polyline when `closed` is false.
    fn stroke_path(&mut self, points: &[Point], stroke: Stroke, closed: bool);
    fn fill_ellipse(&mut self, center: Point, rx: f64, ry: f64, color: Color);
    fn stroke_ellipse(&mut self, center: Point, rx: f64, ry: f64, stroke: Stroke);
    /// `size` is the device font size; `origin` is the baseline anchor.
    fn text(&mut self, text: &str, origin: Point, size: f64, color: Color, align: TextAlign);
}

/// Canvas that records ops instead of rasterizing. Used by tests and by hosts
/// that serialize frames.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    FillRect(Rect, Color),
    StrokeRect(Rect, Stroke),
    FillPolygon(Vec<(f64, f64)>, Color),
    StrokePath(Vec<(f64, f64)>, Stroke, bool),
    FillEllipse((f64, f64), f64, f64, Color),
    StrokeEllipse((f64, f64), f64, f64, Stroke),
    Text(String, (f64, f64), f64, Color, TextAlign),
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(text, ..) => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self, color: Color) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect(rect, color));
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.ops.push(DrawOp::StrokeRect(rect, stroke));
    }

    fn fill_polygon(&mut self, points: &[Point], color: Color) {
        self.ops.push(DrawOp::FillPolygon(
            points.iter().map(|p| (p.x, p.y)).collect(),
            color,
        ));
    }

    fn stroke_path(&mut self, points: &[Point], stroke: Stroke, closed: bool) {
        self.ops.push(DrawOp::StrokePath(
            points.iter().map(|p| (p.x, p.y)).collect(),
            stroke,
            closed,
        ));
    }

    fn fill_ellipse(&mut self, center: Point, rx: f64, ry: f64, color: Color) {
        self.ops
            .push(DrawOp::FillEllipse((center.x, center.y), rx, ry, color));
    }

    fn stroke_ellipse(&mut self, center: Point, rx: f64, ry: f64, stroke: Stroke) {
        self.ops
            .push(DrawOp::StrokeEllipse((center.x, center.y), rx, ry, stroke));
    }

    fn text(&mut self, text: &str, origin: Point, size: f64, color: Color, align: TextAlign) {
        self.ops.push(DrawOp::Text(
            text.to_string(),
            (origin.x, origin.y),
            size,
            color,
            align,
        ));
    }
}
