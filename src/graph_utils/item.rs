use super::connection::ConnectionId;
use super::geometry::{Point, Rect, Segment};

/// What a scene item looks like once laid out, in scene coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Ellipse { center: Point, rx: f64, ry: f64 },
    Line { segment: Segment, label_origin: Point },
}

/// Handle to an item living in a `GraphScene`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Node(String),
    Connection(ConnectionId),
}

// Capabilities the scene dispatches pointer input through. Implemented by
// nodes and connections.
pub trait SceneItem {
    fn hit_test(&self, p: Point) -> bool;

    fn shape(&self) -> Shape;

    fn is_selected(&self) -> bool;

    fn set_selected(&mut self, selected: bool);

    /// Whether a pointer drag may move this item.
    fn is_movable(&self) -> bool { false }

    /// Whether `rect` picks this item during a rubber-band selection.
    fn picked_by(&self, rect: &Rect) -> bool;

    /// Stacking order for overlapping hits; higher wins.
    fn z_order(&self) -> u8;
}
