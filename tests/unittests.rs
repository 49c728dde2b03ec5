use tag_map::graph_utils::connection::ConnectionId;
use tag_map::graph_utils::geometry::{ellipse_intersection, point, vec2, Point};
use tag_map::graph_utils::item::{ItemRef, SceneItem};
use tag_map::graph_utils::layout::{collides, find_next_available, place_batch};
use tag_map::graph_utils::node::{NODE_RX, NODE_RY};
use tag_map::persistence::layout_doc::{ConnectionRecord, LayoutDocument, NodePosition};
use tag_map::{ClickOutcome, GestureState, GraphScene, PointerFrame, PointerRelease, PresetLabel};

const EPS: f64 = 1e-9;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn on_node_border(center: Point, p: Point) -> bool {
    let nx = (p.x - center.x) / NODE_RX;
    let ny = (p.y - center.y) / NODE_RY;
    (nx * nx + ny * ny - 1.0).abs() < 1e-6
}

fn doc_with(nodes: &[(&str, f64, f64)], conns: &[(&str, &str, &str)]) -> LayoutDocument {
    let mut doc = LayoutDocument::new();
    for (name, x, y) in nodes {
        doc.nodes.insert(name.to_string(), NodePosition { x: *x, y: *y });
    }
    for (s, e, l) in conns {
        doc.connections.push(ConnectionRecord { start: s.to_string(), end: e.to_string(), label: l.to_string() });
    }
    doc
}

fn label(text: &str) -> PresetLabel {
    PresetLabel(Some(text.to_string()))
}

#[test]
fn ellipse_intersection_axes_and_degenerate_rays() {
    let right = ellipse_intersection(45.0, 15.0, vec2(10.0, 0.0));
    assert!(approx(right.x, 45.0) && approx(right.y, 0.0));

    let left = ellipse_intersection(45.0, 15.0, vec2(-3.0, 0.0));
    assert!(approx(left.x, -45.0) && approx(left.y, 0.0));

    let down = ellipse_intersection(45.0, 15.0, vec2(0.0, 7.0));
    assert_eq!((down.x, down.y), (0.0, 15.0));
    let up = ellipse_intersection(45.0, 15.0, vec2(1e-9, -7.0));
    assert_eq!((up.x, up.y), (0.0, -15.0));

    let none = ellipse_intersection(45.0, 15.0, vec2(0.0, 0.0));
    assert_eq!((none.x, none.y), (0.0, 0.0));
}

#[test]
fn ellipse_intersection_diagonal_lies_on_border_along_ray() {
    let p = ellipse_intersection(45.0, 15.0, vec2(-2.0, -2.0));
    assert!(p.x < 0.0 && p.y < 0.0);
    assert!(approx(p.x, p.y), "point must stay on the ray's direction");
    assert!(on_node_border(Point::ORIGIN, point(p.x, p.y)));
}

#[test]
fn spiral_starts_at_radius_150_on_the_x_axis() {
    let p = find_next_available(&[], Point::ORIGIN);
    assert!(approx(p.x, 150.0) && approx(p.y, 0.0));

    // first candidate blocked: next is 30 degrees further round
    let q = find_next_available(&[point(150.0, 0.0)], Point::ORIGIN);
    assert!(approx(q.x, 150.0 * 30f64.to_radians().cos()));
    assert!(approx(q.y, 75.0));
}

#[test]
fn spiral_widens_after_a_full_turn() {
    // block every 30 degree point on the r=150 ring
    let ring: Vec<Point> = (0..12)
        .map(|k| {
            let t = f64::from(k * 30).to_radians();
            point(150.0 * t.cos(), 150.0 * t.sin())
        })
        .collect();
    let p = find_next_available(&ring, Point::ORIGIN);
    assert!(ring.iter().all(|r| !collides(*r, p)));
    assert!(p.distance(Point::ORIGIN) > 150.0 + EPS);
}

#[test]
fn batch_placement_is_sorted_and_never_overlaps_itself() {
    let placed = place_batch::<&str>(&[], &["zeta", "alpha", "mu", "beta"]);
    let names: Vec<&str> = placed.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["alpha", "beta", "mu", "zeta"]);
    assert!(approx(placed[0].1.x, 150.0) && approx(placed[0].1.y, 0.0));
    for (i, (_, p)) in placed.iter().enumerate() {
        for (_, q) in placed.iter().skip(i + 1) {
            assert!(!collides(*p, *q), "{:?} overlaps {:?}", p, q);
        }
    }
}

#[test]
fn reconcile_places_two_new_tags_without_overlap() {
    let scene = GraphScene::from_tags(["beta", "alpha"], &LayoutDocument::default());
    let a = scene.node("alpha").expect("alpha").position();
    let b = scene.node("beta").expect("beta").position();
    assert!(approx(a.x, 150.0) && approx(a.y, 0.0));
    assert!((a.x - b.x).abs() >= 120.0 || (a.y - b.y).abs() >= 50.0);
}

#[test]
fn reconcile_centers_new_tags_on_saved_centroid() {
    let doc = doc_with(&[("left", -300.0, 40.0), ("right", 300.0, 40.0)], &[]);
    let scene = GraphScene::from_tags(["left", "right", "new"], &doc);
    assert_eq!(scene.node("left").map(|n| n.position()), Some(point(-300.0, 40.0)));
    let p = scene.node("new").expect("new").position();
    // centroid is (0, 40); r=150, theta=0 is free
    assert!(approx(p.x, 150.0) && approx(p.y, 40.0));
}

#[test]
fn reconcile_drops_stale_tags_and_dangling_connections() {
    let doc = doc_with(
        &[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("ghost", 50.0, 50.0)],
        &[("a", "b", "ok"), ("a", "ghost", "dangling"), ("b", "a", "dup"), ("a", "a", "loop")],
    );
    let scene = GraphScene::from_tags(["a", "b"], &doc);
    assert_eq!(scene.node_count(), 2);
    assert!(scene.node("ghost").is_none());
    assert_eq!(scene.connection_count(), 1);
    let conn = scene.connections().next().expect("one connection");
    assert_eq!((conn.start(), conn.end(), conn.label()), ("a", "b", "ok"));

    let out = scene.export_layout();
    assert!(!out.nodes.contains_key("ghost"));
    assert_eq!(out.connections.len(), 1);
}

#[test]
fn reconcile_removes_nodes_and_their_edges() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", 0.0, 300.0)], &[("a", "b", ""), ("b", "c", "")]);
    let mut scene = GraphScene::from_tags(["a", "b", "c"], &doc);
    assert_eq!(scene.connection_count(), 2);

    let mut prompt = PresetLabel(None);
    scene.click(Some(ItemRef::Node("c".into())), &mut prompt);
    assert!(matches!(scene.gesture(), GestureState::PendingStart { node } if node == "c"));

    scene.refresh_tags(["a", "b"]);
    assert!(scene.node("c").is_none());
    assert_eq!(scene.connection_count(), 1);
    assert_eq!(scene.node("b").map(|n| n.degree()), Some(1));
    assert_eq!(scene.gesture(), &GestureState::Idle);
}

#[test]
fn reconcile_rebuilds_connections_from_the_document() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    assert!(scene.connect("a", "b", "fresh").is_some());

    // refresh uses the live layout, so the new edge survives
    scene.refresh_tags(["a", "b"]);
    assert_eq!(scene.connection_count(), 1);

    // an explicit reconcile against the old document does not keep it
    scene.reconcile(["a", "b"], &doc);
    assert_eq!(scene.connection_count(), 0);
}

#[test]
fn reconcile_with_own_export_is_idempotent() {
    let doc = doc_with(&[("rust", 10.0, 20.0)], &[]);
    let mut scene = GraphScene::from_tags(["rust", "notes", "math", "latex"], &doc);
    scene.connect("rust", "notes", "uses").expect("edge");
    scene.connect("math", "latex", "").expect("edge");

    let first = scene.export_layout();
    scene.reconcile(["rust", "notes", "math", "latex"], &first);
    let second = scene.export_layout();
    scene.reconcile(["rust", "notes", "math", "latex"], &second);
    let third = scene.export_layout();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(
        second.to_json_pretty().expect("json"),
        third.to_json_pretty().expect("json")
    );
    assert_eq!(scene.connection_count(), 2);
}

#[test]
fn duplicate_connections_are_suppressed_in_either_direction() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let id = scene.connect("a", "b", "first").expect("created");
    assert!(scene.connect("a", "b", "again").is_none());
    assert!(scene.connect("b", "a", "reverse").is_none());
    assert!(scene.connect("a", "a", "loop").is_none());
    assert!(scene.connect("a", "nope", "unknown").is_none());
    assert_eq!(scene.connection_count(), 1);
    assert_eq!(scene.connection(id).map(|c| c.label()), Some("first"));

    // through the gesture as well
    let mut prompt = label("gesture");
    scene.click(Some(ItemRef::Node("b".into())), &mut prompt);
    let out = scene.click(Some(ItemRef::Node("a".into())), &mut prompt);
    assert_eq!(out, ClickOutcome::DuplicateIgnored);
    assert_eq!(scene.connection_count(), 1);
    assert_eq!(scene.gesture(), &GestureState::Idle);
}

#[test]
fn gesture_start_cancel_and_complete() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let mut prompt = label("links");

    // empty space while idle stays idle
    assert_eq!(scene.click(None, &mut prompt), ClickOutcome::SelectionCleared);
    assert_eq!(scene.gesture(), &GestureState::Idle);

    // same node twice cancels
    assert_eq!(scene.click(Some(ItemRef::Node("a".into())), &mut prompt), ClickOutcome::GestureStarted("a".into()));
    assert!(scene.node("a").is_some_and(|n| n.is_highlighted()));
    assert_eq!(scene.click(Some(ItemRef::Node("a".into())), &mut prompt), ClickOutcome::GestureCancelled);
    assert!(scene.node("a").is_some_and(|n| !n.is_highlighted()));

    // empty space cancels
    scene.click(Some(ItemRef::Node("a".into())), &mut prompt);
    assert_eq!(scene.click(None, &mut prompt), ClickOutcome::GestureCancelled);
    assert!(scene.node("a").is_some_and(|n| !n.is_highlighted()));
    assert_eq!(scene.connection_count(), 0);

    // two distinct nodes connect
    scene.click(Some(ItemRef::Node("a".into())), &mut prompt);
    assert!(scene.click_needs_label(Some(&ItemRef::Node("b".into()))));
    let out = scene.click(Some(ItemRef::Node("b".into())), &mut prompt);
    assert!(matches!(out, ClickOutcome::Connected(_)));
    assert_eq!(scene.gesture(), &GestureState::Idle);
    assert!(scene.nodes().all(|n| !n.is_highlighted()));
    let conn = scene.find_connection("b", "a").expect("connected");
    assert_eq!(conn.label(), "links");
}

#[test]
fn cancelled_label_prompt_creates_nothing() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let mut asked = Vec::new();
    let mut prompt = |s: &str, e: &str| {
        asked.push((s.to_string(), e.to_string()));
        None::<String>
    };
    scene.click(Some(ItemRef::Node("a".into())), &mut prompt);
    let out = scene.click(Some(ItemRef::Node("b".into())), &mut prompt);
    assert_eq!(out, ClickOutcome::PromptCancelled);
    assert_eq!(scene.connection_count(), 0);
    assert_eq!(scene.gesture(), &GestureState::Idle);
    assert!(scene.nodes().all(|n| !n.is_highlighted()));
    assert_eq!(asked, vec![("a".to_string(), "b".to_string())]);
}

#[test]
fn empty_label_is_a_valid_answer() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let mut prompt = label("");
    scene.click(Some(ItemRef::Node("a".into())), &mut prompt);
    assert!(matches!(scene.click(Some(ItemRef::Node("b".into())), &mut prompt), ClickOutcome::Connected(_)));
    assert_eq!(scene.export_layout().connections[0].label, "");
}

#[test]
fn moving_a_node_keeps_edges_on_its_border() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", -200.0, 200.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b", "c"], &doc);
    let ab = scene.connect("a", "b", "x").expect("edge");
    let ca = scene.connect("c", "a", "").expect("edge");

    let line = scene.connection(ab).expect("ab").geometry().line;
    assert!(approx(line.a.x, 45.0) && approx(line.a.y, 0.0));
    assert!(approx(line.b.x, 255.0) && approx(line.b.y, 0.0));

    for target in [point(120.0, -310.0), point(-47.5, 3.25), point(301.0, 80.0)] {
        assert!(scene.set_node_position("a", target));
        let ab_line = scene.connection(ab).expect("ab").geometry().line;
        let ca_line = scene.connection(ca).expect("ca").geometry().line;
        assert!(on_node_border(target, ab_line.a), "ab start not on border after move");
        assert!(on_node_border(target, ca_line.b), "ca end not on border after move");
        assert!(ab_line.a.distance(target) > 1.0);
    }
}

#[test]
fn connection_label_is_centered_on_the_line() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let id = scene.connect("a", "b", "abcd").expect("edge");
    let g = *scene.connection(id).expect("edge").geometry();
    let mid = g.line.midpoint();
    assert!(approx(mid.x, 150.0) && approx(mid.y, 0.0));
    assert!(approx(g.label_origin.x + g.label_width / 2.0, mid.x));
    assert!(approx(g.label_origin.y + g.label_height / 2.0, mid.y));
    assert!(g.label_width > 0.0);

    // the drawn label is anchored on the midpoint whatever its length
    scene.set_node_position("b", point(77.0, 240.0));
    let g = *scene.connection(id).expect("edge").geometry();
    assert_eq!(g.label_center(), g.line.midpoint());
}

#[test]
fn coincident_nodes_give_a_degenerate_segment() {
    let doc = doc_with(&[("alpha", 0.0, 0.0), ("beta", 0.0, 0.0)], &[("alpha", "beta", "x")]);
    let mut scene = GraphScene::from_tags(["alpha", "beta"], &doc);
    assert_eq!(scene.connection_count(), 1);
    let conn = scene.connections().next().expect("edge");
    assert_eq!(conn.geometry().line.a, Point::ORIGIN);
    assert_eq!(conn.geometry().line.b, Point::ORIGIN);
    assert_eq!(conn.geometry().line.length(), 0.0);

    // moving one apart restores a proper clipped line
    scene.set_node_position("beta", point(0.0, 100.0));
    let conn = scene.connections().next().expect("edge");
    assert_eq!(conn.geometry().line.a, point(0.0, 15.0));
    assert_eq!(conn.geometry().line.b, point(0.0, 85.0));
}

#[test]
fn delete_selected_connection_keeps_nodes() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", 0.0, 300.0)], &[("a", "b", ""), ("a", "c", "")]);
    let mut scene = GraphScene::from_tags(["a", "b", "c"], &doc);
    let mut prompt = PresetLabel(None);

    // nothing selected: nothing deleted
    assert_eq!(scene.key_delete(), 0);

    let id = match scene.click_at(point(150.0, 0.0), &mut prompt) {
        ClickOutcome::Selected(ItemRef::Connection(id)) => id,
        other => panic!("expected a selected connection, got {:?}", other),
    };
    assert_eq!(scene.connection(id).map(|c| (c.start(), c.end())), Some(("a", "b")));

    assert_eq!(scene.key_delete(), 1);
    assert!(scene.connection(id).is_none());
    assert_eq!(scene.node_count(), 3);
    assert!(scene.node("a").is_some_and(|n| !n.has_edge(id) && n.degree() == 1));
    assert!(scene.node("b").is_some_and(|n| n.degree() == 0));
    assert_eq!(scene.connection_count(), 1);
}

#[test]
fn remove_connection_is_idempotent() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[("a", "b", "")]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    let id = scene.connections().next().map(|c| c.id()).expect("edge");
    assert!(scene.remove_connection(id));
    assert!(!scene.remove_connection(id));
    assert!(!scene.remove_connection(ConnectionId::new()));
    assert_eq!(scene.node("a").map(|n| n.degree()), Some(0));
}

#[test]
fn press_and_release_on_a_node_is_a_click() {
    let mut scene = GraphScene::from_tags(["alpha"], &LayoutDocument::default());
    scene.pointer_press(point(150.0, 0.0));
    scene.pointer_move(point(151.0, 1.0));
    let rel = scene.pointer_release(point(151.0, 1.0));
    assert_eq!(rel, PointerRelease::Click(Some(ItemRef::Node("alpha".into()))));
    // click is left for the host; the node did not move
    assert_eq!(scene.node("alpha").map(|n| n.position()), Some(point(150.0, 0.0)));
}

#[test]
fn dragging_a_node_moves_it_and_does_not_start_a_gesture() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[("a", "b", "")]);
    let mut scene = GraphScene::from_tags(["a", "b"], &doc);
    scene.pointer_press(point(5.0, 2.0));
    scene.pointer_move(point(25.0, 2.0));
    assert_eq!(scene.dragging_node(), Some("a"));
    scene.pointer_move(point(55.0, 42.0));
    let rel = scene.pointer_release(point(55.0, 42.0));

    assert_eq!(rel, PointerRelease::Moved("a".into()));
    assert_eq!(scene.node("a").map(|n| n.position()), Some(point(50.0, 40.0)));
    assert_eq!(scene.gesture(), &GestureState::Idle);
    assert!(scene.node("a").is_some_and(|n| n.is_selected() && !n.is_highlighted()));
    let line = scene.connections().next().expect("edge").geometry().line;
    assert!(on_node_border(point(50.0, 40.0), line.a));
}

#[test]
fn rubber_band_selects_enclosed_items() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("far", 0.0, 900.0)], &[("a", "b", "")]);
    let mut scene = GraphScene::from_tags(["a", "b", "far"], &doc);
    scene.pointer_press(point(-100.0, -100.0));
    scene.pointer_move(point(120.0, 50.0));
    assert!(scene.rubber_band().is_some());
    let rel = scene.pointer_release(point(120.0, 50.0));
    // node a plus the a-b line crossing the band
    assert_eq!(rel, PointerRelease::RubberBand(2));
    assert!(scene.rubber_band().is_none());
    assert!(scene.is_selected(&ItemRef::Node("a".into())));
    assert!(!scene.is_selected(&ItemRef::Node("b".into())));
    assert!(scene.connections().all(|c| c.is_selected()));

    assert_eq!(scene.delete_selected_connections(), 1);
    assert_eq!(scene.node_count(), 3);
}

#[test]
fn hit_test_prefers_nodes_over_lines() {
    let doc = doc_with(&[("a", 0.0, 0.0), ("b", 300.0, 0.0)], &[("a", "b", "")]);
    let scene = GraphScene::from_tags(["a", "b"], &doc);
    assert_eq!(scene.hit_test(point(44.0, 0.0)), Some(ItemRef::Node("a".into())));
    assert!(matches!(scene.hit_test(point(100.0, 2.0)), Some(ItemRef::Connection(_))));
    assert_eq!(scene.hit_test(point(100.0, 40.0)), None);
}

#[test]
fn escape_cancels_a_pending_gesture() {
    let mut scene = GraphScene::from_tags(["a"], &LayoutDocument::default());
    assert!(!scene.key_escape());
    scene.click(Some(ItemRef::Node("a".into())), &mut PresetLabel(None));
    assert!(scene.key_escape());
    assert_eq!(scene.gesture(), &GestureState::Idle);
    assert!(scene.node("a").is_some_and(|n| !n.is_highlighted()));
}

#[test]
fn tap_pressed_and_released_in_one_frame_still_clicks() {
    let mut scene = GraphScene::from_tags(["alpha", "beta"], &LayoutDocument::default());
    let a = scene.node("alpha").map(|n| n.position()).expect("alpha");
    let b = scene.node("beta").map(|n| n.position()).expect("beta");
    let tap = PointerFrame { pressed: true, released: true, down: false };

    let rel = scene.pointer_frame(tap, a);
    assert_eq!(rel, Some(PointerRelease::Click(Some(ItemRef::Node("alpha".into())))));
    let Some(PointerRelease::Click(target)) = rel else { unreachable!() };
    assert_eq!(scene.click(target, &mut PresetLabel(None)), ClickOutcome::GestureStarted("alpha".into()));

    // the pointer is free again: the next tap completes the gesture
    let Some(PointerRelease::Click(target)) = scene.pointer_frame(tap, b) else {
        panic!("second tap was not a click");
    };
    assert!(matches!(scene.click(target, &mut label("uses")), ClickOutcome::Connected(_)));
    assert!(scene.find_connection("alpha", "beta").is_some());
}

#[test]
fn pointer_frames_drag_and_ignore_stray_releases() {
    let doc = doc_with(&[("a", 0.0, 0.0)], &[]);
    let mut scene = GraphScene::from_tags(["a"], &doc);

    // release whose press happened elsewhere
    let release = PointerFrame { pressed: false, released: true, down: false };
    assert_eq!(scene.pointer_frame(release, point(500.0, 500.0)), Some(PointerRelease::Nothing));

    let press = PointerFrame { pressed: true, released: false, down: true };
    let held = PointerFrame { pressed: false, released: false, down: true };
    assert_eq!(scene.pointer_frame(press, point(0.0, 0.0)), None);
    assert_eq!(scene.pointer_frame(held, point(20.0, 10.0)), None);
    assert_eq!(scene.dragging_node(), Some("a"));
    assert_eq!(
        scene.pointer_frame(release, point(40.0, 10.0)),
        Some(PointerRelease::Moved("a".into()))
    );
    assert_eq!(scene.node("a").map(|n| n.position()), Some(point(40.0, 10.0)));
    assert_eq!(scene.gesture(), &GestureState::Idle);
}

#[test]
fn huge_saved_coordinates_keep_new_nodes_finite() {
    let doc = doc_with(&[("a", 1e308, 0.0), ("b", 1.7e308, 0.0)], &[]);
    let scene = GraphScene::from_tags(["a", "b", "c"], &doc);
    let c = scene.node("c").map(|n| n.position()).expect("c");
    assert!(c.x.is_finite() && c.y.is_finite(), "c placed at {:?}", c);

    let exported = scene.export_layout();
    let text = exported.to_json_pretty().expect("json");
    let back = LayoutDocument::parse_lenient(&text);
    assert_eq!(back, exported);
}
