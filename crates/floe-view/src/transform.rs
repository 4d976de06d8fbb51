//! Pan/zoom view transform and animated view changes.
//!
//! The transform maps logical (document) coordinates to device pixels. View
//! animations interpolate in decomposed form (translation / rotation / skew /
//! scale) so intermediate frames never shear through degenerate matrices.

use floe_model::geom::{Point, Rect, Size, Transform, Vector, point};

pub const VIEW_ANIMATION_DURATION: f64 = 1.0;
pub const FIT_PADDING: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    matrix: Transform,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            matrix: Transform::identity(),
        }
    }
}

impl ViewTransform {
    pub fn from_matrix(matrix: Transform) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Transform {
        &self.matrix
    }

    fn inverse(&self) -> Transform {
        self.matrix.inverse().unwrap_or_else(Transform::identity)
    }

    pub fn to_device(&self, p: Point) -> Point {
        self.matrix.transform_point(p)
    }

    pub fn to_logical(&self, p: Point) -> Point {
        self.inverse().transform_point(p)
    }

    /// Uniform scale factor (device pixels per logical unit).
    pub fn scale(&self) -> f64 {
        decompose(&self.matrix).sx
    }

    /// Logical units covered by one device pixel. Drives LOD decisions.
    pub fn points_per_pixel(&self) -> f64 {
        let s = self.scale();
        if s.abs() < f64::EPSILON { f64::INFINITY } else { 1.0 / s }
    }

    /// Translates the view by a device-space delta.
    pub fn pan(&mut self, delta_device: Vector) {
        self.matrix = self.matrix.then_translate(delta_device);
    }

    /// Scales the view keeping the logical point under `anchor_device` fixed.
    pub fn scale_at(&mut self, factor: f64, anchor_device: Point) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let a = anchor_device.to_vector();
        self.matrix = self
            .matrix
            .then_translate(-a)
            .then_scale(factor, factor)
            .then_translate(a);
    }

    /// Logical rectangle currently covered by the viewport.
    pub fn visible_rect(&self, viewport: Size) -> Rect {
        let a = self.to_logical(point(0.0, 0.0));
        let b = self.to_logical(point(viewport.width, viewport.height));
        Rect::new(
            point(a.x.min(b.x), a.y.min(b.y)),
            euclid::size2((a.x - b.x).abs(), (a.y - b.y).abs()),
        )
    }

    /// Transform that fits `bbox` centered in `viewport` with padding.
    pub fn fit(bbox: Rect, viewport: Size) -> Self {
        let avail_w = (viewport.width - 2.0 * FIT_PADDING).max(1.0);
        let avail_h = (viewport.height - 2.0 * FIT_PADDING).max(1.0);
        let mut scale = (avail_w / bbox.width()).min(avail_h / bbox.height());
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }
        let center = bbox.center();
        let matrix = Transform::translation(-center.x, -center.y)
            .then_scale(scale, scale)
            .then_translate(euclid::vec2(viewport.width / 2.0, viewport.height / 2.0));
        Self { matrix }
    }
}

/// Affine decomposition: `M = rotate(r) * skew * scale(sx, sy)` plus a
/// translation. Pan/zoom views are rotation- and skew-free, so interpolating
/// these components reduces to translation/scale easing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub tx: f64,
    pub ty: f64,
    pub rotation: f64,
    pub skew: f64,
    pub sx: f64,
    pub sy: f64,
}

pub fn decompose(m: &Transform) -> Decomposed {
    let (mut a, mut b, mut c, mut d) = (m.m11, m.m12, m.m21, m.m22);
    let sx = (a * a + b * b).sqrt();
    if sx != 0.0 {
        a /= sx;
        b /= sx;
    }
    let mut skew = a * c + b * d;
    c -= a * skew;
    d -= b * skew;
    let sy = (c * c + d * d).sqrt();
    if sy != 0.0 {
        skew /= sy;
    }
    Decomposed {
        tx: m.m31,
        ty: m.m32,
        rotation: b.atan2(a),
        skew,
        sx,
        sy,
    }
}

impl Decomposed {
    pub fn recompose(&self) -> Transform {
        let (sin, cos) = self.rotation.sin_cos();
        Transform::new(
            cos * self.sx,
            sin * self.sx,
            (cos * self.skew - sin) * self.sy,
            (sin * self.skew + cos) * self.sy,
            self.tx,
            self.ty,
        )
    }

    pub fn lerp(&self, other: &Decomposed, t: f64) -> Decomposed {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Decomposed {
            tx: mix(self.tx, other.tx),
            ty: mix(self.ty, other.ty),
            rotation: mix(self.rotation, other.rotation),
            skew: mix(self.skew, other.skew),
            sx: mix(self.sx, other.sx),
            sy: mix(self.sy, other.sy),
        }
    }
}

fn ease_out(t: f64) -> f64 {
    let u = 1.0 - t;
    1.0 - u * u * u
}

fn approx_eq(a: &Transform, b: &Transform) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() < 1e-6;
    close(a.m11, b.m11)
        && close(a.m12, b.m12)
        && close(a.m21, b.m21)
        && close(a.m22, b.m22)
        && close(a.m31, b.m31)
        && close(a.m32, b.m32)
}

/// In-flight animated view change. Re-requesting the same target while one is
/// running is a no-op (idempotent retarget).
#[derive(Debug, Clone, Copy)]
pub struct ViewAnimation {
    from: Decomposed,
    to: Decomposed,
    target: Transform,
    start: f64,
}

impl ViewAnimation {
    pub fn new(from: &ViewTransform, target: Transform, now: f64) -> Self {
        Self {
            from: decompose(from.matrix()),
            to: decompose(&target),
            target,
            start: now,
        }
    }

    pub fn targets(&self, target: &Transform) -> bool {
        approx_eq(&self.target, target)
    }

    /// Transform at time `now` plus a finished flag.
    pub fn sample(&self, now: f64) -> (Transform, bool) {
        let t = ((now - self.start) / VIEW_ANIMATION_DURATION).clamp(0.0, 1.0);
        if t >= 1.0 {
            return (self.target, true);
        }
        (self.from.lerp(&self.to, ease_out(t)).recompose(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floe_model::geom::vector;

    #[test]
    fn decompose_recompose_round_trips_pan_zoom() {
        let mut view = ViewTransform::default();
        view.scale_at(2.5, point(100.0, 60.0));
        view.pan(vector(-30.0, 12.0));
        let back = decompose(view.matrix()).recompose();
        assert!(approx_eq(view.matrix(), &back));
    }

    #[test]
    fn scale_at_keeps_the_anchor_fixed() {
        let mut view = ViewTransform::default();
        view.pan(vector(40.0, -10.0));
        let anchor = point(200.0, 150.0);
        let logical_before = view.to_logical(anchor);
        view.scale_at(3.0, anchor);
        let logical_after = view.to_logical(anchor);
        assert!((logical_before.x - logical_after.x).abs() < 1e-9);
        assert!((logical_before.y - logical_after.y).abs() < 1e-9);
    }

    #[test]
    fn to_logical_inverts_to_device() {
        let mut view = ViewTransform::default();
        view.scale_at(0.5, point(10.0, 10.0));
        view.pan(vector(7.0, 3.0));
        let p = point(123.0, -45.0);
        let round = view.to_logical(view.to_device(p));
        assert!((round.x - p.x).abs() < 1e-9 && (round.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn fit_centers_the_box_in_the_viewport() {
        let bbox = Rect::new(point(0.0, 0.0), euclid::size2(200.0, 100.0));
        let viewport = euclid::size2(800.0, 600.0);
        let view = ViewTransform::fit(bbox, viewport);
        let c = view.to_device(bbox.center());
        assert!((c.x - 400.0).abs() < 1e-6);
        assert!((c.y - 300.0).abs() < 1e-6);
        // The whole box lands inside the viewport.
        let tl = view.to_device(bbox.origin);
        assert!(tl.x >= 0.0 && tl.y >= 0.0);
    }

    #[test]
    fn animation_eases_toward_the_target_and_finishes() {
        let from = ViewTransform::default();
        let target = ViewTransform::fit(
            Rect::new(point(0.0, 0.0), euclid::size2(100.0, 100.0)),
            euclid::size2(500.0, 500.0),
        );
        let anim = ViewAnimation::new(&from, *target.matrix(), 10.0);

        let (mid, done) = anim.sample(10.0 + VIEW_ANIMATION_DURATION / 2.0);
        assert!(!done);
        // Ease-out covers more than half the distance by the midpoint.
        let mid_d = decompose(&mid);
        let to_d = decompose(target.matrix());
        assert!(mid_d.sx > 1.0 + (to_d.sx - 1.0) * 0.5);

        let (end, done) = anim.sample(10.0 + VIEW_ANIMATION_DURATION + 0.1);
        assert!(done);
        assert!(approx_eq(&end, target.matrix()));
    }

    #[test]
    fn retargeting_the_same_view_is_detected() {
        let from = ViewTransform::default();
        let target = Transform::translation(5.0, 5.0);
        let anim = ViewAnimation::new(&from, target, 0.0);
        assert!(anim.targets(&Transform::translation(5.0, 5.0)));
        assert!(!anim.targets(&Transform::translation(6.0, 5.0)));
    }
}
