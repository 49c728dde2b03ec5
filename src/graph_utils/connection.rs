use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{point, Point, Rect, Segment};
use super::item::{SceneItem, Shape};
use super::node::TagNode;

// Estimated label metrics, in scene units
pub const LABEL_CHAR_WIDTH: f64 = 7.0;
pub const LABEL_LINE_HEIGHT: f64 = 14.0;
/// How close (scene units) a click must land to a connection line to pick it.
pub const LINE_HIT_TOLERANCE: f64 = 4.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self { ConnectionId(Uuid::now_v7()) }
}

impl Default for ConnectionId {
    fn default() -> Self { Self::new() }
}

/// Rendered geometry of a connection, in scene coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConnectionGeometry {
    pub line: Segment,
    /// Top-left corner of the label box, centred on the line midpoint.
    pub label_origin: Point,
    pub label_width: f64,
    pub label_height: f64,
}

impl ConnectionGeometry {
    /// Centre of the label box; always the line midpoint.
    pub fn label_center(&self) -> Point { self.line.midpoint() }

    pub fn label_rect(&self) -> Rect {
        Rect::from_corners(
            self.label_origin,
            point(self.label_origin.x + self.label_width, self.label_origin.y + self.label_height),
        )
    }
}

/// Undirected, labelled edge between two distinct tag nodes.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    start: String,
    end: String,
    label: String,
    selected: bool,
    geometry: ConnectionGeometry,
}

impl Connection {
    /// Build the edge and compute its first geometry. Registration on the
    /// endpoints' incident sets is done by the scene, which owns both.
    pub(crate) fn new(start: &TagNode, end: &TagNode, label: impl Into<String>) -> Self {
        let label = label.into();
        let mut conn = Connection {
            id: ConnectionId::new(),
            start: start.name().to_string(),
            end: end.name().to_string(),
            geometry: ConnectionGeometry {
                line: Segment::new(start.position(), end.position()),
                label_origin: start.position(),
                label_width: 0.0,
                label_height: 0.0,
            },
            label,
            selected: false,
        };
        conn.update_position(start, end);
        conn
    }

    pub fn id(&self) -> ConnectionId { self.id }
    pub fn start(&self) -> &str { &self.start }
    pub fn end(&self) -> &str { &self.end }
    pub fn label(&self) -> &str { &self.label }
    pub fn geometry(&self) -> &ConnectionGeometry { &self.geometry }

    /// Same unordered endpoint pair; labels are ignored.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }

    /// Clip the line to both node borders and re-centre the label.
    pub fn update_position(&mut self, start: &TagNode, end: &TagNode) {
        let a = start.boundary_toward(end.position());
        let b = end.boundary_toward(start.position());
        let line = Segment::new(a, b);

        let label_width = self.label.chars().count() as f64 * LABEL_CHAR_WIDTH;
        let label_height = if self.label.is_empty() { 0.0 } else { LABEL_LINE_HEIGHT };
        let mid = line.midpoint();
        self.geometry = ConnectionGeometry {
            line,
            label_origin: point(mid.x - label_width / 2.0, mid.y - label_height / 2.0),
            label_width,
            label_height,
        };
    }
}

impl SceneItem for Connection {
    fn hit_test(&self, p: Point) -> bool {
        self.geometry.line.distance_to(p) <= LINE_HIT_TOLERANCE
            || (!self.label.is_empty() && self.geometry.label_rect().contains(p))
    }

    fn shape(&self) -> Shape {
        Shape::Line { segment: self.geometry.line, label_origin: self.geometry.label_origin }
    }

    fn is_selected(&self) -> bool { self.selected }

    fn set_selected(&mut self, selected: bool) { self.selected = selected; }

    fn picked_by(&self, rect: &Rect) -> bool { self.geometry.line.intersects_rect(rect) }

    fn z_order(&self) -> u8 { 0 }
}
