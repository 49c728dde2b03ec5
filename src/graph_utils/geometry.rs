use serde::{Deserialize, Serialize};

/// Below this magnitude a ray component counts as zero.
pub const RAY_EPSILON: f64 = 1e-6;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

pub const fn point(x: f64, y: f64) -> Point { Point { x, y } }
pub const fn vec2(x: f64, y: f64) -> Vec2 { Vec2 { x, y } }

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn to_local(self, origin: Point) -> Vec2 {
        vec2(self.x - origin.x, self.y - origin.y)
    }

    pub fn offset(self, v: Vec2) -> Point {
        point(self.x + v.x, self.y + v.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        point((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    pub fn distance(self, other: Point) -> f64 {
        self.to_local(other).length()
    }
}

impl Vec2 {
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Axis-aligned rectangle, normalised so `min <= max`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Rect {
            min: point(a.x.min(b.x), a.y.min(b.y)),
            max: point(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_center_size(center: Point, width: f64, height: f64) -> Self {
        Rect {
            min: point(center.x - width / 2.0, center.y - height / 2.0),
            max: point(center.x + width / 2.0, center.y + height / 2.0),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self { Segment { a, b } }

    pub fn length(&self) -> f64 { self.a.distance(self.b) }

    pub fn midpoint(&self) -> Point { self.a.midpoint(self.b) }

    pub fn distance_to(&self, p: Point) -> f64 {
        let d = self.b.to_local(self.a);
        let len2 = d.x * d.x + d.y * d.y;
        if len2 <= RAY_EPSILON * RAY_EPSILON {
            return p.distance(self.a);
        }
        let w = p.to_local(self.a);
        let t = ((w.x * d.x + w.y * d.y) / len2).clamp(0.0, 1.0);
        p.distance(self.a.offset(vec2(d.x * t, d.y * t)))
    }

    /// Liang-Barsky clip test against `rect`.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        if rect.contains(self.a) || rect.contains(self.b) {
            return true;
        }
        let d = self.b.to_local(self.a);
        let checks = [
            (-d.x, self.a.x - rect.min.x),
            (d.x, rect.max.x - self.a.x),
            (-d.y, self.a.y - rect.min.y),
            (d.y, rect.max.y - self.a.y),
        ];
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        for (p, q) in checks {
            if p.abs() < RAY_EPSILON {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

/// Point where a ray from the center of an axis-aligned ellipse leaves its border.
///
/// `dir` is expressed in the ellipse's local frame (origin at the center). The
/// returned point is local too. A zero-length ray (coincident centers) yields the
/// origin; a vertical ray snaps to the top or bottom apex.
pub fn ellipse_intersection(rx: f64, ry: f64, dir: Vec2) -> Vec2 {
    if dir.x.abs() < RAY_EPSILON && dir.y.abs() < RAY_EPSILON {
        return Vec2::default();
    }
    if dir.x.abs() < RAY_EPSILON {
        return vec2(0.0, if dir.y > 0.0 { ry } else { -ry });
    }

    // (x/rx)^2 + (m*x/ry)^2 = 1
    let m = dir.y / dir.x;
    let x_squared = 1.0 / (1.0 / (rx * rx) + (m * m) / (ry * ry));
    let mut x = x_squared.sqrt();
    if dir.x < 0.0 {
        x = -x;
    }
    vec2(x, m * x)
}

/// True when `local` (relative to the ellipse center) lies inside or on the border.
pub fn ellipse_contains(rx: f64, ry: f64, local: Vec2) -> bool {
    let nx = local.x / rx;
    let ny = local.y / ry;
    nx * nx + ny * ny <= 1.0
}
