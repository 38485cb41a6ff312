//! Entity-relationship diagrams built from accumulated schema text.
//!
//! The schema is free-form text expected to hold `CREATE TABLE` fragments.
//! [`build_schema_graph`] turns it into a [`SchemaGraph`] which can be
//! rendered as Graphviz DOT with [`SchemaGraph::to_dot`].

pub mod graph;
pub mod parser;

pub use graph::{Edge, Node, NodeShape, SchemaGraph};
pub use parser::{ParseError, build_schema_graph};
