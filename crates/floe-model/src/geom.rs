#![forbid(unsafe_code)]

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// Center-based geometry record attached to every laid-out element.
///
/// Produced exclusively by the layout engine and replaced wholesale on each
/// re-layout; everything else reads it (interaction applies additive position
/// overrides on top rather than mutating it).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct LayoutInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutInfo {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        point(self.x, self.y)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(
            point(self.x - self.width / 2.0, self.y - self.height / 2.0),
            euclid::size2(self.width, self.height),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        let r = self.rect();
        p.x >= r.min_x() && p.x <= r.max_x() && p.y >= r.min_y() && p.y <= r.max_y()
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when `self` lies entirely inside `outer`.
    pub fn contained_in(&self, outer: &LayoutInfo) -> bool {
        let a = self.rect();
        let b = outer.rect();
        a.min_x() >= b.min_x()
            && a.max_x() <= b.max_x()
            && a.min_y() >= b.min_y()
            && a.max_y() <= b.max_y()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.rect().intersects(other)
    }
}

/// Manual displacement applied on top of [`LayoutInfo`] by drag interaction.
///
/// Kept separate from the layout record so a deterministic re-layout never
/// destroys (or is corrupted by) user positioning. `points` carries one delta
/// per interior path point for edges; it is empty for nodes and states.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PositionOverride {
    pub dx: f64,
    pub dy: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<(f64, f64)>,
}

impl PositionOverride {
    pub fn translated(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            points: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0 && self.points.iter().all(|&(x, y)| x == 0.0 && y == 0.0)
    }
}
