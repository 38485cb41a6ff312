#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;

use thiserror::Error;

use super::graph::{NodeShape, SchemaGraph};

const FRAGMENT_SEPARATOR: char = ';';
const TABLE_PREFIX: &str = "CREATE TABLE";
const FOREIGN_KEY: &str = "FOREIGN KEY";
const REFERENCES: &str = "REFERENCES";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("table definition #{index} has no opening parenthesis: {fragment}")]
    MissingOpenParen { index: usize, fragment: String },

    #[error("table {table} declares a foreign key without REFERENCES: {declaration}")]
    MissingReferences { table: String, declaration: String },
}

/// Build the entity-relationship graph of a schema text.
///
/// This is a text splitter over `CREATE TABLE name (fields)` fragments
/// separated by `;`, not a SQL parser. The first malformed fragment fails the
/// whole build; no partial graph is returned.
pub fn build_schema_graph(schema: &str) -> Result<SchemaGraph, ParseError> {
    let mut graph = SchemaGraph::new();

    let fragments = schema
        .split(FRAGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty());

    for (index, fragment) in fragments.enumerate() {
        let table = parse_table(index, fragment)?;
        log::trace!("table {} with {} fields", table.name, table.fields.len());

        graph.add_node(table.name.as_str(), table.name.as_str(), NodeShape::Ellipse);

        for field in table.fields {
            if field.contains(FOREIGN_KEY) {
                let (column, referenced) = parse_foreign_key(field).ok_or_else(|| {
                    ParseError::MissingReferences {
                        table: table.name.clone(),
                        declaration: field.to_string(),
                    }
                })?;
                let label = format!("{} → {}", column, referenced);
                graph.add_edge(table.name.as_str(), referenced, Some(label));
            } else {
                let id = format!("{}_{}", table.name, field);
                graph.add_node(id.as_str(), field, NodeShape::Box);
                graph.add_edge(table.name.as_str(), id, None);
            }
        }
    }

    Ok(graph)
}

struct TableFragment<'a> {
    name: String,
    fields: Vec<&'a str>,
}

fn parse_table(index: usize, fragment: &str) -> Result<TableFragment<'_>, ParseError> {
    let (head, rest) =
        fragment
            .split_once('(')
            .ok_or_else(|| ParseError::MissingOpenParen {
                index,
                fragment: fragment.to_string(),
            })?;

    let name = strip_table_prefix(head);

    // Without a closing parenthesis the remainder is kept as-is.
    let body = match rest.rfind(')') {
        Some(end) => &rest[..end],
        None => rest,
    };

    let fields = split_fields(body)
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    Ok(TableFragment { name, fields })
}

/// Remove every `CREATE TABLE` literal from the head of a fragment. A head
/// without the prefix is used as the table name unchanged.
fn strip_table_prefix(head: &str) -> String {
    head.replace(TABLE_PREFIX, "").trim().to_string()
}

/// Split a field list on commas that are not nested inside parentheses, so
/// `DECIMAL(10, 2)` or `FOREIGN KEY (a, b)` stay one declaration.
fn split_fields(body: &str) -> Vec<&str> {
    let mut fields = vec![];
    let mut depth = 0usize;
    let mut start = 0;

    for (pos, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(&body[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    fields.push(&body[start..]);
    fields
}

/// Split `FOREIGN KEY (col) REFERENCES other(id)` into `("col", "other")`.
fn parse_foreign_key(declaration: &str) -> Option<(String, &str)> {
    let (left, right) = declaration.split_once(REFERENCES)?;
    let column = left
        .replace(FOREIGN_KEY, "")
        .replace(['(', ')'], "")
        .trim()
        .to_string();
    let referenced = right.split('(').next().unwrap_or(right).trim();
    Some((column, referenced))
}
