use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};

use super::connection::{Connection, ConnectionId};
use super::geometry::{Point, Rect};
use super::item::{ItemRef, SceneItem};
use super::layout;
use super::node::TagNode;
use crate::persistence::layout_doc::{ConnectionRecord, LayoutDocument, NodePosition};

/// Pointer travel (scene units) separating a click from a drag.
pub const DEFAULT_DRAG_THRESHOLD: f64 = 3.0;

/// Two-click connection gesture.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    PendingStart { node: String },
}

/// Supplies the label for a connection being created; `None` aborts it.
pub trait LabelPrompt {
    fn prompt_label(&mut self, start: &str, end: &str) -> Option<String>;
}

impl<F> LabelPrompt for F
where
    F: FnMut(&str, &str) -> Option<String>,
{
    fn prompt_label(&mut self, start: &str, end: &str) -> Option<String> {
        self(start, end)
    }
}

/// A prompt whose answer is already known, e.g. from a dialog the host ran itself.
#[derive(Clone, Debug, Default)]
pub struct PresetLabel(pub Option<String>);

impl LabelPrompt for PresetLabel {
    fn prompt_label(&mut self, _start: &str, _end: &str) -> Option<String> {
        self.0.take()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    GestureStarted(String),
    GestureCancelled,
    Connected(ConnectionId),
    DuplicateIgnored,
    PromptCancelled,
    Selected(ItemRef),
    SelectionCleared,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerRelease {
    /// Press and release without moving past the drag threshold.
    Click(Option<ItemRef>),
    /// A node was dragged to a new place.
    Moved(String),
    /// Rubber-band selection finished; carries the number of picked items.
    RubberBand(usize),
    /// Drag on something that cannot move, or a release with no press.
    Nothing,
}

/// Primary button state sampled once per frame by the host.
///
/// A fast tap can report `pressed` and `released` in the same frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PointerFrame {
    pub pressed: bool,
    pub released: bool,
    pub down: bool,
}

#[derive(Clone, Debug)]
enum PointerState {
    Released,
    Pressed { origin: Point, last: Point, target: Option<ItemRef>, dragging: bool },
}

/// Owns every node and connection of the tag map plus the interaction state.
///
/// Nodes are keyed by tag name and connections by `ConnectionId`; the two
/// refer to each other only through those keys.
#[derive(Debug)]
pub struct GraphScene {
    nodes: BTreeMap<String, TagNode>,
    connections: HashMap<ConnectionId, Connection>,
    // creation order, used for export
    connection_order: Vec<ConnectionId>,
    gesture: GestureState,
    pointer: PointerState,
    drag_threshold: f64,
}

impl Default for GraphScene {
    fn default() -> Self { Self::new() }
}

impl GraphScene {
    pub fn new() -> Self {
        GraphScene {
            nodes: BTreeMap::new(),
            connections: HashMap::new(),
            connection_order: Vec::new(),
            gesture: GestureState::Idle,
            pointer: PointerState::Released,
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
        }
    }

    pub fn with_drag_threshold(mut self, threshold: f64) -> Self {
        self.drag_threshold = threshold.max(0.0);
        self
    }

    pub fn from_tags<I, S>(tags: I, doc: &LayoutDocument) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scene = Self::new();
        scene.reconcile(tags, doc);
        scene
    }

    pub fn node(&self, name: &str) -> Option<&TagNode> { self.nodes.get(name) }
    pub fn nodes(&self) -> impl Iterator<Item = &TagNode> { self.nodes.values() }
    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> { self.connections.get(&id) }
    pub fn connection_count(&self) -> usize { self.connections.len() }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connection_order.iter().filter_map(|id| self.connections.get(id))
    }

    pub fn find_connection(&self, a: &str, b: &str) -> Option<&Connection> {
        let node = self.nodes.get(a)?;
        node.incident_edges()
            .filter_map(|id| self.connections.get(&id))
            .find(|c| c.joins(a, b))
    }

    pub fn gesture(&self) -> &GestureState { &self.gesture }

    // ---- reconciliation -------------------------------------------------

    /// Bring the scene in line with `tags`, using `doc` for saved positions and edges.
    ///
    /// Nodes for vanished tags are dropped, every connection is rebuilt from
    /// `doc`, and tags without a saved position are spiral-placed around the
    /// centroid of the saved ones.
    pub fn reconcile<I, S>(&mut self, tags: I, doc: &LayoutDocument)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags
            .into_iter()
            .map(Into::into)
            .filter(|t| !t.is_empty())
            .collect();

        let stale: Vec<String> = self.nodes.keys().filter(|n| !tags.contains(*n)).cloned().collect();
        for name in &stale {
            self.remove_node(name);
        }

        self.connections.clear();
        self.connection_order.clear();
        for node in self.nodes.values_mut() {
            node.clear_edges();
        }

        let mut occupied: Vec<Point> = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for tag in &tags {
            let node = self.nodes.entry(tag.clone()).or_insert_with(|| TagNode::new(tag.clone()));
            match doc.position_of(tag) {
                Some(p) => {
                    node.set_position(p);
                    occupied.push(p);
                }
                None => pending.push(tag),
            }
        }

        let placed = layout::place_batch(&occupied, &pending);
        for (name, pos) in &placed {
            if let Some(node) = self.nodes.get_mut(name) {
                node.set_position(*pos);
            }
        }

        let mut dropped = 0usize;
        for rec in &doc.connections {
            if !tags.contains(&rec.start) || !tags.contains(&rec.end) {
                debug!("dropping connection {} -> {}: unknown tag", rec.start, rec.end);
                dropped += 1;
                continue;
            }
            if self.connect(&rec.start, &rec.end, rec.label.clone()).is_none() {
                dropped += 1;
            }
        }

        info!(
            "tag map reconciled: {} nodes ({} auto-placed, {} removed), {} connections ({} dropped)",
            self.nodes.len(),
            placed.len(),
            stale.len(),
            self.connections.len(),
            dropped
        );
    }

    /// Reconcile against the scene's own current layout, keeping in-memory edges.
    pub fn refresh_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let doc = self.export_layout();
        self.reconcile(tags, &doc);
    }

    fn remove_node(&mut self, name: &str) -> bool {
        let Some(node) = self.nodes.remove(name) else { return false };
        for id in node.incident_edges() {
            self.detach_connection(id);
        }
        if matches!(&self.gesture, GestureState::PendingStart { node } if node == name) {
            self.gesture = GestureState::Idle;
        }
        if let PointerState::Pressed { target: Some(ItemRef::Node(n)), .. } = &self.pointer {
            if n == name {
                self.pointer = PointerState::Released;
            }
        }
        true
    }

    // ---- nodes & connections ------------------------------------------

    /// Move a node and re-clip every incident connection before returning.
    pub fn set_node_position(&mut self, name: &str, p: Point) -> bool {
        let Some(node) = self.nodes.get_mut(name) else { return false };
        if !node.set_position(p) {
            return true;
        }
        let Self { nodes, connections, .. } = self;
        if let Some(node) = nodes.get(name) {
            for id in node.incident_edges() {
                if let Some(conn) = connections.get_mut(&id)
                    && let (Some(a), Some(b)) = (nodes.get(conn.start()), nodes.get(conn.end()))
                {
                    conn.update_position(a, b);
                }
            }
        }
        true
    }

    /// Create a connection between two distinct, existing nodes.
    ///
    /// Returns `None` for self-loops, unknown names, or when the unordered
    /// pair is already connected (the existing edge is left as is).
    pub fn connect(&mut self, a: &str, b: &str, label: impl Into<String>) -> Option<ConnectionId> {
        if a == b {
            return None;
        }
        if self.find_connection(a, b).is_some() {
            debug!("ignoring duplicate connection {} - {}", a, b);
            return None;
        }
        let conn = match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(na), Some(nb)) => Connection::new(na, nb, label),
            _ => return None,
        };
        let id = conn.id();
        if let Some(n) = self.nodes.get_mut(a) { n.add_edge(id); }
        if let Some(n) = self.nodes.get_mut(b) { n.add_edge(id); }
        self.connections.insert(id, conn);
        self.connection_order.push(id);
        Some(id)
    }

    fn detach_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let conn = self.connections.remove(&id)?;
        self.connection_order.retain(|c| *c != id);
        for name in [conn.start(), conn.end()] {
            if let Some(n) = self.nodes.get_mut(name) {
                n.remove_edge(id);
            }
        }
        Some(conn)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        self.detach_connection(id).is_some()
    }

    /// Remove every selected connection. Nodes are never touched.
    pub fn delete_selected_connections(&mut self) -> usize {
        let selected: Vec<ConnectionId> = self
            .connection_order
            .iter()
            .copied()
            .filter(|id| self.connections.get(id).is_some_and(|c| c.is_selected()))
            .collect();
        for id in &selected {
            self.detach_connection(*id);
        }
        if !selected.is_empty() {
            info!("deleted {} connection(s)", selected.len());
        }
        selected.len()
    }

    // ---- selection ---------------------------------------------------------

    fn item_mut(&mut self, item: &ItemRef) -> Option<&mut dyn SceneItem> {
        match item {
            ItemRef::Node(name) => self.nodes.get_mut(name).map(|n| n as &mut dyn SceneItem),
            ItemRef::Connection(id) => self.connections.get_mut(id).map(|c| c as &mut dyn SceneItem),
        }
    }

    fn items(&self) -> impl Iterator<Item = (ItemRef, &dyn SceneItem)> {
        let nodes = self
            .nodes
            .iter()
            .map(|(name, n)| (ItemRef::Node(name.clone()), n as &dyn SceneItem));
        let conns = self
            .connections()
            .map(|c| (ItemRef::Connection(c.id()), c as &dyn SceneItem));
        conns.chain(nodes)
    }

    pub fn set_selected(&mut self, item: &ItemRef, selected: bool) -> bool {
        match self.item_mut(item) {
            Some(it) => {
                it.set_selected(selected);
                true
            }
            None => false,
        }
    }

    pub fn is_selected(&self, item: &ItemRef) -> bool {
        self.items().any(|(r, it)| &r == item && it.is_selected())
    }

    pub fn clear_selection(&mut self) {
        for n in self.nodes.values_mut() {
            n.set_selected(false);
        }
        for c in self.connections.values_mut() {
            c.set_selected(false);
        }
    }

    /// Topmost item under `p`; nodes sit above connections.
    pub fn hit_test(&self, p: Point) -> Option<ItemRef> {
        let mut best: Option<(u8, ItemRef)> = None;
        for (r, it) in self.items() {
            if it.hit_test(p) && best.as_ref().is_none_or(|(z, _)| it.z_order() >= *z) {
                best = Some((it.z_order(), r));
            }
        }
        best.map(|(_, r)| r)
    }

    // ---- connection gesture ---------------------------------------------

    pub fn cancel_gesture(&mut self) -> bool {
        let GestureState::PendingStart { node } = std::mem::take(&mut self.gesture) else {
            return false;
        };
        if let Some(n) = self.nodes.get_mut(&node) {
            n.set_highlighted(false);
        }
        true
    }

    /// Whether a click on `target` would complete the gesture and need a label.
    pub fn click_needs_label(&self, target: Option<&ItemRef>) -> bool {
        match (&self.gesture, target) {
            (GestureState::PendingStart { node }, Some(ItemRef::Node(b))) => {
                node != b && self.nodes.contains_key(node) && self.nodes.contains_key(b)
            }
            _ => false,
        }
    }

    /// Feed a click (press and release without drag) into the scene.
    pub fn click(&mut self, target: Option<ItemRef>, prompt: &mut dyn LabelPrompt) -> ClickOutcome {
        match target {
            Some(ItemRef::Node(b)) if self.nodes.contains_key(&b) => self.click_node(b, prompt),
            Some(ItemRef::Connection(id)) if self.connections.contains_key(&id) => {
                self.cancel_gesture();
                self.clear_selection();
                let item = ItemRef::Connection(id);
                self.set_selected(&item, true);
                ClickOutcome::Selected(item)
            }
            _ => {
                let cancelled = self.cancel_gesture();
                self.clear_selection();
                if cancelled { ClickOutcome::GestureCancelled } else { ClickOutcome::SelectionCleared }
            }
        }
    }

    pub fn click_at(&mut self, p: Point, prompt: &mut dyn LabelPrompt) -> ClickOutcome {
        let target = self.hit_test(p);
        self.click(target, prompt)
    }

    fn click_node(&mut self, b: String, prompt: &mut dyn LabelPrompt) -> ClickOutcome {
        let start = match &self.gesture {
            GestureState::PendingStart { node } if self.nodes.contains_key(node) => Some(node.clone()),
            _ => None,
        };
        let Some(a) = start else {
            self.cancel_gesture();
            if let Some(n) = self.nodes.get_mut(&b) {
                n.set_highlighted(true);
            }
            self.gesture = GestureState::PendingStart { node: b.clone() };
            return ClickOutcome::GestureStarted(b);
        };

        if a == b {
            self.cancel_gesture();
            return ClickOutcome::GestureCancelled;
        }

        let label = prompt.prompt_label(&a, &b);
        self.cancel_gesture();
        match label {
            None => ClickOutcome::PromptCancelled,
            Some(label) => match self.connect(&a, &b, label) {
                Some(id) => {
                    info!("connected {} - {}", a, b);
                    ClickOutcome::Connected(id)
                }
                None => ClickOutcome::DuplicateIgnored,
            },
        }
    }

    // ---- pointer protocol ---------------------------------------------------

    pub fn pointer_press(&mut self, p: Point) {
        let target = self.hit_test(p);
        self.pointer = PointerState::Pressed { origin: p, last: p, target, dragging: false };
    }

    pub fn pointer_move(&mut self, p: Point) {
        let PointerState::Pressed { origin, last, target, dragging } = &mut self.pointer else {
            return;
        };
        if !*dragging && origin.distance(p) <= self.drag_threshold {
            return;
        }
        let starting = !*dragging;
        *dragging = true;
        let delta = p.to_local(*last);
        *last = p;

        let Some(ItemRef::Node(name)) = target.clone() else { return };
        let Some(node) = self.nodes.get(&name) else { return };
        if !node.is_movable() {
            return;
        }
        let to = node.position().offset(delta);
        if starting && !node.is_selected() {
            self.clear_selection();
            self.set_selected(&ItemRef::Node(name.clone()), true);
        }
        self.set_node_position(&name, to);
    }

    /// Finish the current press. Clicks are returned for the host to pass to
    /// `click` (it may need to ask the user for a label first).
    pub fn pointer_release(&mut self, p: Point) -> PointerRelease {
        self.pointer_move(p);
        let state = std::mem::replace(&mut self.pointer, PointerState::Released);
        let PointerState::Pressed { origin, target, dragging, .. } = state else {
            return PointerRelease::Nothing;
        };
        if !dragging {
            return PointerRelease::Click(target);
        }
        match target {
            Some(ItemRef::Node(name)) => PointerRelease::Moved(name),
            Some(ItemRef::Connection(_)) => PointerRelease::Nothing,
            None => {
                let rect = Rect::from_corners(origin, p);
                PointerRelease::RubberBand(self.select_in_rect(&rect))
            }
        }
    }

    /// Feed one frame of pointer input. Returns the release result when the
    /// frame ended a press.
    pub fn pointer_frame(&mut self, frame: PointerFrame, p: Point) -> Option<PointerRelease> {
        if frame.pressed {
            self.pointer_press(p);
        }
        if frame.released {
            return Some(self.pointer_release(p));
        }
        if !frame.pressed && frame.down {
            self.pointer_move(p);
        }
        None
    }

    /// Rectangle of an in-progress rubber-band drag on empty space.
    pub fn rubber_band(&self) -> Option<Rect> {
        match &self.pointer {
            PointerState::Pressed { origin, last, target: None, dragging: true } => {
                Some(Rect::from_corners(*origin, *last))
            }
            _ => None,
        }
    }

    /// The node currently being dragged, if any.
    pub fn dragging_node(&self) -> Option<&str> {
        match &self.pointer {
            PointerState::Pressed { target: Some(ItemRef::Node(n)), dragging: true, .. } => Some(n),
            _ => None,
        }
    }

    pub fn select_in_rect(&mut self, rect: &Rect) -> usize {
        self.clear_selection();
        let picked: Vec<ItemRef> = self
            .items()
            .filter(|(_, it)| it.picked_by(rect))
            .map(|(r, _)| r)
            .collect();
        for item in &picked {
            self.set_selected(item, true);
        }
        picked.len()
    }

    pub fn key_delete(&mut self) -> usize { self.delete_selected_connections() }

    pub fn key_escape(&mut self) -> bool { self.cancel_gesture() }

    // ---- export ------------------------------------------------------------

    /// Snapshot of every live node position and connection.
    pub fn export_layout(&self) -> LayoutDocument {
        let nodes = self
            .nodes
            .iter()
            .map(|(name, n)| (name.clone(), NodePosition::from(n.position())))
            .collect();
        let connections = self
            .connections()
            .map(|c| ConnectionRecord {
                start: c.start().to_string(),
                end: c.end().to_string(),
                label: c.label().to_string(),
            })
            .collect();
        LayoutDocument { nodes, connections }
    }
}
