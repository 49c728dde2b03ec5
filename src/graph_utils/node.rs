use std::collections::BTreeSet;

use super::connection::ConnectionId;
use super::geometry::{ellipse_contains, ellipse_intersection, Point, Rect};
use super::item::{SceneItem, Shape};

// Node footprint: a 90x30 ellipse centred on the node position
pub const NODE_RX: f64 = 45.0;
pub const NODE_RY: f64 = 15.0;

/// A draggable vertex standing for one tag.
///
/// Incident edges are kept as connection ids only; the owning scene resolves
/// them. Position writes go through `GraphScene::set_node_position` so edge
/// geometry never lags behind a move.
#[derive(Clone, Debug)]
pub struct TagNode {
    name: String,
    position: Point,
    selected: bool,
    highlighted: bool,
    edges: BTreeSet<ConnectionId>,
}

impl TagNode {
    pub fn new(name: impl Into<String>) -> Self {
        TagNode {
            name: name.into(),
            position: Point::ORIGIN,
            selected: false,
            highlighted: false,
            edges: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn position(&self) -> Point { self.position }
    pub fn is_highlighted(&self) -> bool { self.highlighted }

    pub fn incident_edges(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.edges.iter().copied()
    }

    pub fn has_edge(&self, id: ConnectionId) -> bool { self.edges.contains(&id) }

    pub fn degree(&self) -> usize { self.edges.len() }

    pub(crate) fn set_position(&mut self, p: Point) -> bool {
        if self.position == p {
            return false;
        }
        self.position = p;
        true
    }

    pub(crate) fn add_edge(&mut self, id: ConnectionId) {
        self.edges.insert(id);
    }

    pub(crate) fn remove_edge(&mut self, id: ConnectionId) {
        self.edges.remove(&id);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.edges.clear();
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    /// Border point (scene coordinates) on the line from this node toward `target`.
    pub fn boundary_toward(&self, target: Point) -> Point {
        let local = ellipse_intersection(NODE_RX, NODE_RY, target.to_local(self.position));
        self.position.offset(local)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center_size(self.position, NODE_RX * 2.0, NODE_RY * 2.0)
    }
}

impl SceneItem for TagNode {
    fn hit_test(&self, p: Point) -> bool {
        ellipse_contains(NODE_RX, NODE_RY, p.to_local(self.position))
    }

    fn shape(&self) -> Shape {
        Shape::Ellipse { center: self.position, rx: NODE_RX, ry: NODE_RY }
    }

    fn is_selected(&self) -> bool { self.selected }

    fn set_selected(&mut self, selected: bool) { self.selected = selected; }

    fn is_movable(&self) -> bool { true }

    fn picked_by(&self, rect: &Rect) -> bool { rect.contains(self.position) }

    fn z_order(&self) -> u8 { 1 }
}
