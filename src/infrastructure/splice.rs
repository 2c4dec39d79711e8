//! Splice Unparser
//!
//! Renders a tree by copying the original source verbatim and inserting the
//! synthesized `Diagnostic` statements at their anchors. Untouched code keeps
//! its exact bytes, comments and formatting included.

use crate::domain::ast::{AstNode, AstNodeKind, SyntaxTree};
use crate::ports::Unparser;

pub struct SpliceUnparser;

impl Unparser for SpliceUnparser {
    fn unparse(&self, tree: &SyntaxTree) -> String {
        let src = tree.source.as_str();
        let mut inserts = Vec::new();
        collect_diagnostics(&tree.root, &mut inserts);
        if inserts.is_empty() {
            return src.to_string();
        }
        inserts.sort_by_key(|i| i.anchor);

        let newline = if src.contains("\r\n") { "\r\n" } else { "\n" };
        let mut out = String::with_capacity(src.len() + inserts.len() * 64);
        let mut cursor = 0;

        for insert in inserts {
            let anchor = insert.anchor.min(src.len());
            let line_start = src[..anchor].rfind('\n').map_or(0, |i| i + 1);
            let indent = &src[line_start..anchor];
            // Parenthesized so any expression is a valid argument (`yield`, multi-line).
            let statement = format!("print({}, ({}))", python_string(insert.message), insert.expr);

            if indent.chars().all(|c| c == ' ' || c == '\t' || c == '\x0c') {
                // The assert opens its line: give each diagnostic its own line.
                out.push_str(&src[cursor..line_start]);
                out.push_str(indent);
                out.push_str(&statement);
                out.push_str(newline);
                cursor = line_start;
            } else {
                // `x = 1; assert ...` or `for ...: assert ...`
                out.push_str(&src[cursor..anchor]);
                out.push_str(&statement);
                out.push_str("; ");
                cursor = anchor;
            }
        }
        out.push_str(&src[cursor..]);
        out
    }
}

struct Insert<'t> {
    anchor: usize,
    message: &'t str,
    expr: &'t str,
}

fn collect_diagnostics<'t>(node: &'t AstNode, out: &mut Vec<Insert<'t>>) {
    if let AstNodeKind::Diagnostic { message, expr } = &node.kind {
        out.push(Insert {
            anchor: node.span.start_byte,
            message,
            expr,
        });
    }
    for child in &node.children {
        collect_diagnostics(child, out);
    }
}

/// Single-quoted Python string literal for `s`.
pub fn python_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
