use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph_utils::geometry::{point, Point};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

impl From<NodePosition> for Point {
    fn from(p: NodePosition) -> Point { point(p.x, p.y) }
}

impl From<Point> for NodePosition {
    fn from(p: Point) -> NodePosition { NodePosition { x: p.x, y: p.y } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub label: String,
}

/// Saved node positions plus the connection list.
///
/// `nodes` is a sorted map so two exports of the same scene serialise to the
/// same bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default)]
    pub nodes: BTreeMap<String, NodePosition>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl LayoutDocument {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    pub fn position_of(&self, name: &str) -> Option<Point> {
        self.nodes.get(name).map(|p| Point::from(*p))
    }

    /// Parse a layout document, tolerating damage.
    ///
    /// Anything that is not a JSON object yields an empty document. Node
    /// entries without numeric `x` and `y` are skipped (those tags get
    /// auto-placed); connection records without string `start`/`end` are
    /// skipped; a missing or non-string `label` becomes "".
    /// Like `parse_lenient`, but text that is not JSON at all is an error.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let v: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&v))
    }

    pub fn parse_lenient(text: &str) -> Self {
        match Self::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("layout document is not valid JSON: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_value(v: &Value) -> Self {
        let mut doc = Self::default();
        let Some(obj) = v.as_object() else { return doc };

        if let Some(nodes) = obj.get("nodes").and_then(Value::as_object) {
            for (name, pos) in nodes {
                let x = pos.get("x").and_then(Value::as_f64);
                let y = pos.get("y").and_then(Value::as_f64);
                match (x, y) {
                    (Some(x), Some(y)) => { doc.nodes.insert(name.clone(), NodePosition { x, y }); }
                    _ => debug!("ignoring saved position for '{}': missing x/y", name),
                }
            }
        }

        if let Some(conns) = obj.get("connections").and_then(Value::as_array) {
            for c in conns {
                let start = c.get("start").and_then(Value::as_str);
                let end = c.get("end").and_then(Value::as_str);
                if let (Some(start), Some(end)) = (start, end) {
                    let label = c.get("label").and_then(Value::as_str).unwrap_or_default();
                    doc.connections.push(ConnectionRecord {
                        start: start.to_string(),
                        end: end.to_string(),
                        label: label.to_string(),
                    });
                } else {
                    debug!("ignoring malformed connection record: {}", c);
                }
            }
        }
        doc
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
