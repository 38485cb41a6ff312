#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;

use std::{collections::HashMap, fmt::Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeShape {
    /// Tables, including the ones only known as a reference target.
    #[default]
    Ellipse,
    /// Plain (non foreign key) fields.
    Box,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: String,
    label: String,
    shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    from: String,
    to: String,
    label: Option<String>,
}

/// Directed graph of tables, fields and foreign-key references. Node ids
/// are unique and keep their first insertion order.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shape(&self) -> NodeShape {
        self.shape
    }
}

impl Edge {
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node. Declaring an existing id again replaces its label and
    /// shape but keeps its position.
    pub fn add_node(&mut self, id: impl Into<String>, label: impl Into<String>, shape: NodeShape) {
        let node = Node {
            id: id.into(),
            label: label.into(),
            shape,
        };
        match self.index.get(&node.id) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Add a directed edge. Endpoints that were never declared become plain
    /// nodes labeled with their id.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, label: Option<String>) {
        let edge = Edge {
            from: from.into(),
            to: to.into(),
            label,
        };
        for id in [&edge.from, &edge.to] {
            if !self.index.contains_key(id) {
                self.add_node(id.as_str(), id.as_str(), NodeShape::Ellipse);
            }
        }
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for node in &self.nodes {
            let _ = write!(out, "    {} [label={}", quote(&node.id), quote(&node.label));
            if node.shape == NodeShape::Box {
                out.push_str(" shape=box");
            }
            out.push_str("]\n");
        }
        for edge in &self.edges {
            let _ = write!(out, "    {} -> {}", quote(&edge.from), quote(&edge.to));
            if let Some(label) = &edge.label {
                let _ = write!(out, " [label={}]", quote(label));
            }
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
