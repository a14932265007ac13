//! Tree Body Text Format
//!
//! One node per line, in pre-order. The children of a decision node follow it
//! directly. Indentation is written for readability and ignored on read.
//!
//! ```text
//! decision <count> <feature> < <threshold>
//! decision <count> <feature> == <code>
//! decision <count> <feature> in <n-children>
//! leaf <count> <symbol>:<probability> ...
//! ```
use crate::constants::{INDENT, MAX_DEPTH};
use crate::data::FeatureDefinition;
use crate::errors::CartError;
use crate::node::{DecisionNode, LeafNode, Node, Predicate};
use std::fmt;
use std::str::FromStr;

const DECISION: &str = "decision";
const LEAF: &str = "leaf";

/// Lines of a tree body, numbered from `first_line` for error reporting.
#[derive(Debug, Clone, Copy)]
pub struct BodyLines<'a> {
    lines: &'a [&'a str],
    first_line: usize,
}

impl<'a> BodyLines<'a> {
    pub fn new(lines: &'a [&'a str], first_line: usize) -> Self {
        BodyLines { lines, first_line }
    }

    fn line_number(&self, cursor: usize) -> usize {
        self.first_line + cursor
    }

    fn skip_blank(&self, mut cursor: usize) -> usize {
        while cursor < self.lines.len() && self.lines[cursor].trim().is_empty() {
            cursor += 1;
        }
        cursor
    }
}

/// Read a complete tree body. The top node comes back flagged as root.
pub fn read_tree(body: BodyLines, features: &FeatureDefinition) -> Result<Node, CartError> {
    let cursor = body.skip_blank(0);
    if cursor >= body.lines.len() {
        return Err(CartError::format(body.line_number(cursor), "missing tree body"));
    }
    let (root, cursor) = read_node(body, cursor, 0, features)?;
    let rest = body.skip_blank(cursor);
    if rest < body.lines.len() {
        return Err(CartError::format(
            body.line_number(rest),
            "unexpected content after the end of the tree",
        ));
    }
    Ok(root.into_root())
}

/// Read the node starting at `cursor`, `depth` edges below the top node,
/// with its whole subtree. Returns the node and the cursor just past its last line.
pub fn read_node(
    body: BodyLines,
    cursor: usize,
    depth: usize,
    features: &FeatureDefinition,
) -> Result<(Node, usize), CartError> {
    let line_number = body.line_number(cursor);
    if depth > MAX_DEPTH {
        return Err(CartError::format(line_number, "tree too deep"));
    }
    let tokens: Vec<&str> = body.lines[cursor].split_whitespace().collect();
    match tokens.first().copied() {
        Some(LEAF) => Ok((read_leaf(&tokens, line_number)?.into(), cursor + 1)),
        Some(DECISION) => {
            let (data_count, predicate, n_children) = read_decision(&tokens, line_number, features)?;
            let mut children = Vec::with_capacity(n_children);
            let mut cursor = cursor + 1;
            for i in 0..n_children {
                cursor = body.skip_blank(cursor);
                if cursor >= body.lines.len() {
                    return Err(CartError::format(
                        body.line_number(cursor),
                        format!("expected {} children, stream ended after {}", n_children, i),
                    ));
                }
                let child_line = body.line_number(cursor);
                let (child, next) = read_node(body, cursor, depth + 1, features)?;
                if child.data_count() > data_count {
                    return Err(CartError::format(
                        child_line,
                        format!(
                            "node holds {} data points but its parent only {}",
                            child.data_count(),
                            data_count
                        ),
                    ));
                }
                children.push(child);
                cursor = next;
            }
            let node = DecisionNode::new(data_count, predicate, children)
                .map_err(|e| CartError::format(line_number, e.to_string()))?;
            Ok((node.into(), cursor))
        }
        Some(other) => Err(CartError::format(line_number, format!("unknown node type '{}'", other))),
        None => Err(CartError::format(line_number, "empty node line")),
    }
}

fn parse_token<T: FromStr>(token: &str, what: &str, line_number: usize) -> Result<T, CartError> {
    token
        .parse::<T>()
        .map_err(|_| CartError::format(line_number, format!("invalid {} '{}'", what, token)))
}

fn read_leaf(tokens: &[&str], line_number: usize) -> Result<LeafNode, CartError> {
    let count_token = tokens
        .get(1)
        .ok_or_else(|| CartError::format(line_number, "leaf without data count"))?;
    let data_count = parse_token::<usize>(count_token, "data count", line_number)?;
    let mut indices = Vec::with_capacity(tokens.len().saturating_sub(2));
    let mut probabilities = Vec::with_capacity(tokens.len().saturating_sub(2));
    for entry in &tokens[2..] {
        let (idx, prob) = entry
            .split_once(':')
            .ok_or_else(|| CartError::format(line_number, format!("invalid leaf entry '{}'", entry)))?;
        indices.push(parse_token::<usize>(idx, "symbol id", line_number)?);
        probabilities.push(parse_token::<f32>(prob, "probability", line_number)?);
    }
    LeafNode::new(data_count, indices, probabilities).map_err(|e| CartError::format(line_number, e.to_string()))
}

fn read_decision(
    tokens: &[&str],
    line_number: usize,
    features: &FeatureDefinition,
) -> Result<(usize, Predicate, usize), CartError> {
    if tokens.len() != 5 {
        return Err(CartError::format(
            line_number,
            format!("decision line needs 5 fields, found {}", tokens.len()),
        ));
    }
    let data_count = parse_token::<usize>(tokens[1], "data count", line_number)?;
    let feature = features
        .index_of(tokens[2])
        .map_err(|e| CartError::format(line_number, e.to_string()))?;
    let (predicate, n_children) = match tokens[3] {
        "<" => (
            Predicate::LessThan {
                feature,
                threshold: parse_token::<f64>(tokens[4], "threshold", line_number)?,
            },
            2,
        ),
        "==" => (
            Predicate::Equals {
                feature,
                value: parse_token::<u32>(tokens[4], "categorical code", line_number)?,
            },
            2,
        ),
        "in" => {
            let n = parse_token::<usize>(tokens[4], "number of children", line_number)?;
            if n == 0 {
                return Err(CartError::format(line_number, "decision node without children"));
            }
            (Predicate::OneOf { feature }, n)
        }
        op => return Err(CartError::format(line_number, format!("unknown operator '{}'", op))),
    };
    Ok((data_count, predicate, n_children))
}

/// Write a node and its subtree, one line per node.
pub fn write_node<W: fmt::Write>(
    out: &mut W,
    node: &Node,
    features: &FeatureDefinition,
    depth: usize,
) -> fmt::Result {
    out.write_str(&INDENT.repeat(depth))?;
    let name = match node {
        Node::Decision(d) => features.name(d.predicate().feature()).ok_or(fmt::Error)?,
        Node::Leaf(_) => "",
    };
    node.write_line(out, name)?;
    writeln!(out)?;
    for child in node.children() {
        write_node(out, child, features, depth + 1)?;
    }
    Ok(())
}
