//! Readers for the function-view payload returned by the analysis server.
//!
//! The payload is owned by the server; only the statement terms are read
//! here, to list comments and address completions. A node carries `Terms`,
//! a list of statements; each statement is a list of `[text, tag]` terms
//! whose first term starts with the address and whose last term is the
//! statement comment. Malformed pieces are skipped rather than rejected.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramStatement {
    pub address: String,
    pub text: String,
    pub comment: String,
}

impl DiagramStatement {
    /// Statement line as drawn: text, then ` # comment` when one is set.
    pub fn display_text(&self) -> String {
        if self.comment.is_empty() {
            self.text.clone()
        } else {
            format!("{} # {}", self.text, self.comment)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiagramNode {
    pub statements: Vec<DiagramStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementComment {
    pub address: String,
    pub text: String,
}

pub fn diagram_nodes(payload: &Value) -> Vec<DiagramNode> {
    node_values(payload)
        .iter()
        .map(|node| DiagramNode {
            statements: node
                .get("Terms")
                .and_then(Value::as_array)
                .map(|statements| statements.iter().filter_map(parse_statement).collect())
                .unwrap_or_default(),
        })
        .collect()
}

/// Non-empty statement comments, in payload order.
pub fn statement_comments(payload: &Value) -> Vec<StatementComment> {
    diagram_nodes(payload)
        .into_iter()
        .flat_map(|node| node.statements)
        .filter(|statement| !statement.comment.is_empty())
        .map(|statement| StatementComment {
            address: statement.address,
            text: statement.comment,
        })
        .collect()
}

/// Distinct statement addresses in order of first appearance.
pub fn statement_addresses(payload: &Value) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for statement in diagram_nodes(payload)
        .into_iter()
        .flat_map(|node| node.statements)
    {
        if !statement.address.is_empty() && !addresses.contains(&statement.address) {
            addresses.push(statement.address);
        }
    }
    addresses
}

fn node_values(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(nodes) => nodes.as_slice(),
        Value::Object(fields) => fields
            .get("Nodes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn parse_statement(statement: &Value) -> Option<DiagramStatement> {
    let terms = statement
        .as_array()?
        .iter()
        .filter_map(|term| term.get(0).and_then(Value::as_str))
        .collect::<Vec<_>>();
    let (first, _) = terms.split_first()?;
    let address = first.split(':').next().unwrap_or_default().trim().to_owned();
    let (comment, body) = if terms.len() > 1 {
        let (last, body) = terms.split_last()?;
        ((*last).to_owned(), body.concat())
    } else {
        (String::new(), terms.concat())
    };

    Some(DiagramStatement {
        address,
        text: body,
        comment,
    })
}
