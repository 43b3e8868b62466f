//! Indented ASCII diagram of a parsed query.
//!
//! Each node is printed on its own line as `|-- label`, with one
//! `   |` column per level of nesting.

use crate::ast::{Expr, KeyValue, Node};

/// Render a forest as an indented tree diagram.
///
/// ```
/// use regexl::{diagram, parse, tokenize};
///
/// let tokens = tokenize("select starts_with('a')").unwrap();
/// let forest = parse(&tokens).unwrap();
/// assert_eq!(diagram(&forest), "|-- select\n|   |-- starts_with\n|   |   |-- a\n");
/// ```
#[must_use]
pub fn diagram(forest: &[Node]) -> String {
    let mut out = String::new();
    for node in forest {
        format_node(&mut out, node);
    }
    out
}

fn format_node(out: &mut String, node: &Node) {
    match node {
        Node::Select(select) => {
            push_line(out, "select", 0);
            for expr in &select.expressions {
                format_expr(out, expr, 1);
            }
        }
        Node::Expr(expr) => format_expr(out, expr, 0),
    }
}

fn format_expr(out: &mut String, expr: &Expr, depth: usize) {
    match expr {
        Expr::Identifier(ident) => push_line(out, &ident.name, depth),
        Expr::Call(call) => {
            push_line(out, &call.callee.name, depth);
            for arg in &call.arguments {
                format_expr(out, arg, depth + 1);
            }
        }
        // A `+` chain prints as one node with every operand under it.
        Expr::Binary(binary) => {
            push_line(out, binary.op.symbol(), depth);
            for operand in binary.operands() {
                format_expr(out, operand, depth + 1);
            }
        }
        Expr::Literal(literal) => push_line(out, &literal.value, depth),
        Expr::Object(object) => {
            push_line(out, "object", depth);
            for entry in &object.entries {
                format_entry(out, entry, depth + 1);
            }
        }
    }
}

fn format_entry(out: &mut String, entry: &KeyValue, depth: usize) {
    push_line(out, "key-value pair", depth);
    push_line(out, &entry.key.name, depth + 1);
    format_expr(out, &entry.value, depth + 1);
}

fn push_line(out: &mut String, label: &str, depth: usize) {
    out.push('|');
    out.push_str(&"   |".repeat(depth));
    out.push_str("-- ");
    out.push_str(label);
    out.push('\n');
}
