use super::geometry::{point, Point};

// Approximate node footprint for collision checks, looser than the drawn 90x30 ellipse
pub const COLLISION_DX: f64 = 120.0;
pub const COLLISION_DY: f64 = 50.0;

pub const START_RADIUS: f64 = 150.0;
pub const RADIUS_STEP: f64 = 10.0;
pub const ANGLE_STEP_DEG: u32 = 30;

pub fn collides(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < COLLISION_DX && (a.y - b.y).abs() < COLLISION_DY
}

/// Centroid of the distinct positions in `occupied`, or the origin when empty.
///
/// Exactly coincident positions count once.
pub fn centroid(occupied: &[Point]) -> Point {
    let mut unique: Vec<Point> = Vec::with_capacity(occupied.len());
    for p in occupied {
        if !unique.contains(p) {
            unique.push(*p);
        }
    }
    if unique.is_empty() {
        return Point::ORIGIN;
    }
    // running mean, so huge coordinates cannot overflow to infinity
    let mut mean = Point::ORIGIN;
    for (i, p) in unique.iter().enumerate() {
        let k = (i + 1) as f64;
        mean = point(mean.x + p.x / k - mean.x / k, mean.y + p.y / k - mean.y / k);
    }
    mean
}

/// First spiral point around `center` that collides with nothing in `occupied`.
///
/// Walks 30 degree steps starting at radius 150; every full turn widens the
/// radius by 10. There is no iteration cap: the swept ring keeps growing, so
/// any finite `occupied` set is eventually cleared.
pub fn find_next_available(occupied: &[Point], center: Point) -> Point {
    let mut r = START_RADIUS;
    let mut theta: u32 = 0;
    loop {
        let rad = f64::from(theta).to_radians();
        let candidate = point(center.x + r * rad.cos(), center.y + r * rad.sin());
        if !occupied.iter().any(|p| collides(*p, candidate)) {
            return candidate;
        }
        theta += ANGLE_STEP_DEG;
        if theta >= 360 {
            theta = 0;
            r += RADIUS_STEP;
        }
    }
}

/// Place every name in `pending` around the centroid of `occupied`.
///
/// Names are laid out in lexicographic order; each placed position joins the
/// collision set before the next search, so a batch never overlaps itself. The
/// spiral center is computed once from the positions occupied before the batch.
pub fn place_batch<S: AsRef<str>>(occupied: &[Point], pending: &[S]) -> Vec<(String, Point)> {
    let center = centroid(occupied);
    let mut names: Vec<&str> = pending.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.dedup();

    let mut taken = occupied.to_vec();
    let mut placed = Vec::with_capacity(names.len());
    for name in names {
        let pos = find_next_available(&taken, center);
        taken.push(pos);
        placed.push((name.to_string(), pos));
    }
    placed
}
