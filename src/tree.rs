//! Content Tree - Schema-less Page Data
//!
//! Every pass over page content (rendering, asset resolution, packaging)
//! walks this one tagged variant instead of sniffing JSON types itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Node {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Sequence(Vec<Node>),
    Mapping(BTreeMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Mapping(BTreeMap::new())
    }
}

impl Node {
    /// Text form of a scalar. `None` for `Null` and containers.
    pub fn text(&self) -> Option<String> {
        match self {
            Node::Text(s) => Some(s.clone()),
            Node::Number(n) => Some(n.to_string()),
            Node::Bool(b) => Some(b.to_string()),
            Node::Null | Node::Sequence(_) | Node::Mapping(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Node::Sequence(_) | Node::Mapping(_))
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Resolve a dotted path such as `hero.headline`, `features[0].title`
    /// or `faq.1.q`. `"."` is the node itself.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        if path == "." {
            return Some(self);
        }

        let mut current = self;
        for segment in path.split('.') {
            current = step(current, segment)?;
        }
        Some(current)
    }

    /// Rebuild the tree, passing every text leaf through `f`.
    pub fn map_text<F>(&self, f: &mut F) -> Node
    where
        F: FnMut(&str) -> Option<String>,
    {
        match self {
            Node::Text(s) => match f(s) {
                Some(replaced) => Node::Text(replaced),
                None => Node::Text(s.clone()),
            },
            Node::Sequence(items) => Node::Sequence(items.iter().map(|n| n.map_text(f)).collect()),
            Node::Mapping(map) => Node::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.map_text(f)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Depth-first visit of every text leaf, in document order.
    pub fn visit_text<F>(&self, f: &mut F)
    where
        F: FnMut(&str),
    {
        match self {
            Node::Text(s) => f(s),
            Node::Sequence(items) => items.iter().for_each(|n| n.visit_text(f)),
            Node::Mapping(map) => map.values().for_each(|n| n.visit_text(f)),
            _ => {}
        }
    }
}

/// One path segment: `key`, `key[0]`, `[0]`, `key[0][1]` or a bare index.
fn step<'a>(node: &'a Node, segment: &str) -> Option<&'a Node> {
    let (key, mut rest) = match segment.find('[') {
        Some(pos) => segment.split_at(pos),
        None => (segment, ""),
    };

    let mut current = if key.is_empty() && !rest.is_empty() {
        node
    } else {
        match node {
            Node::Mapping(map) => map.get(key)?,
            Node::Sequence(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        }
    };

    while !rest.is_empty() {
        let close = rest.find(']')?;
        if !rest.starts_with('[') {
            return None;
        }
        let index: usize = rest[1..close].trim().parse().ok()?;
        current = current.as_sequence()?.get(index)?;
        rest = &rest[close + 1..];
    }

    Some(current)
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::Text(s),
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Mapping(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Number(n) => Value::Number(n),
            Node::Text(s) => Value::String(s),
            Node::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Node::Mapping(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}
