use std::collections::{BTreeMap, HashMap};

use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::GraphError;

/// Identifier of a node inside a [`RequestGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub &'static str);

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Reference output `index` of this node.
    pub fn output(self, index: u32) -> Input {
        Input::Link { node: self, index }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// A node input: either a literal or a reference to another node's output.
///
/// Links serialise as `["<node>", <index>]`, the executor's wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Literal(Value),
    Link { node: NodeId, index: u32 },
}

impl Input {
    pub fn literal(value: impl Into<Value>) -> Self {
        Input::Literal(value.into())
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Input::Literal(v) => Some(v),
            Input::Link { .. } => None,
        }
    }

    pub fn as_link(&self) -> Option<(NodeId, u32)> {
        match self {
            Input::Link { node, index } => Some((*node, *index)),
            Input::Literal(_) => None,
        }
    }
}

impl Serialize for Input {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Input::Literal(v) => v.serialize(serializer),
            Input::Link { node, index } => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(node.as_str())?;
                tuple.serialize_element(index)?;
                tuple.end()
            }
        }
    }
}

/// One stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub class_type: &'static str,
    pub title: Option<&'static str>,
    pub inputs: BTreeMap<String, Input>,
}

impl Node {
    pub fn new(class_type: &'static str) -> Self {
        Self {
            class_type,
            title: None,
            inputs: BTreeMap::new(),
        }
    }

    pub fn title(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn input(mut self, name: impl Into<String>, value: Input) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn literal(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input(name, Input::literal(value))
    }

    pub fn link(self, name: impl Into<String>, node: NodeId, index: u32) -> Self {
        self.input(name, node.output(index))
    }

    pub fn get(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.title.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("inputs", &self.inputs)?;
        map.serialize_entry("class_type", self.class_type)?;
        if let Some(title) = self.title {
            map.serialize_entry("_meta", &serde_json::json!({ "title": title }))?;
        }
        map.end()
    }
}

/// Immutable mapping from node id to node, sent as the job's workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestGraph {
    nodes: BTreeMap<NodeId, Node>,
}

impl RequestGraph {
    pub(crate) fn from_nodes(nodes: impl IntoIterator<Item = (NodeId, Node)>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Literal value of `input` on `node`, if both exist and the input is not a link.
    pub fn literal(&self, node: NodeId, input: &str) -> Option<&Value> {
        self.node(node)?.get(input)?.as_literal()
    }

    /// Verify that every link targets an existing node and the graph is acyclic.
    pub fn check(&self) -> Result<(), GraphError> {
        for (id, node) in &self.nodes {
            for (name, input) in &node.inputs {
                if let Some((target, _)) = input.as_link() {
                    if !self.nodes.contains_key(&target) {
                        return Err(GraphError::DanglingLink {
                            node: id.to_string(),
                            input: name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &RequestGraph,
            id: NodeId,
            marks: &mut HashMap<NodeId, Mark>,
        ) -> Result<(), GraphError> {
            match marks.get(&id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(GraphError::Cycle(id.to_string())),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            if let Some(node) = graph.nodes.get(&id) {
                for input in node.inputs.values() {
                    if let Some((target, _)) = input.as_link() {
                        visit(graph, target, marks)?;
                    }
                }
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for id in self.nodes.keys() {
            visit(self, *id, &mut marks)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for RequestGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (id, node) in &self.nodes {
            map.serialize_entry(id.as_str(), node)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const A: NodeId = NodeId("1");
    const B: NodeId = NodeId("2");
    const C: NodeId = NodeId("3");

    #[test]
    fn test_link_serializes_as_pair() {
        let value = serde_json::to_value(B.output(1)).unwrap();
        assert_eq!(value, json!(["2", 1]));
    }

    #[test]
    fn test_node_wire_shape() {
        let node = Node::new("VAELoader")
            .title("Load VAE")
            .literal("vae_name", "ae.safetensors");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "inputs": {"vae_name": "ae.safetensors"},
                "class_type": "VAELoader",
                "_meta": {"title": "Load VAE"}
            })
        );
    }

    #[test]
    fn test_untitled_node_has_no_meta() {
        let value = serde_json::to_value(Node::new("X")).unwrap();
        assert!(value.get("_meta").is_none());
    }

    #[test]
    fn test_check_accepts_chain() {
        let graph = RequestGraph::from_nodes([
            (A, Node::new("Source").literal("v", 1)),
            (B, Node::new("Mid").link("in", A, 0)),
            (C, Node::new("Sink").link("in", B, 0)),
        ]);
        assert!(graph.check().is_ok());
        assert_eq!(graph.to_json()["3"]["inputs"]["in"], json!(["2", 0]));
    }

    #[test]
    fn test_check_rejects_dangling_link() {
        let graph = RequestGraph::from_nodes([(A, Node::new("Sink").link("in", C, 0))]);
        assert_eq!(
            graph.check(),
            Err(GraphError::DanglingLink {
                node: "1".into(),
                input: "in".into(),
                target: "3".into()
            })
        );
    }

    #[test]
    fn test_check_rejects_cycle() {
        let graph = RequestGraph::from_nodes([
            (A, Node::new("X").link("in", B, 0)),
            (B, Node::new("Y").link("in", A, 0)),
        ]);
        assert!(matches!(graph.check(), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn test_literal_lookup() {
        let graph = RequestGraph::from_nodes([
            (A, Node::new("X").literal("seed", 42)),
            (B, Node::new("Y").link("in", A, 0)),
        ]);
        assert_eq!(graph.literal(A, "seed"), Some(&json!(42)));
        assert_eq!(graph.literal(B, "in"), None);
        assert_eq!(graph.literal(C, "seed"), None);
    }
}
