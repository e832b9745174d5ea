//! Renders a tree back to .htaccess text
//!
//! Untouched nodes are emitted from their stored raw bytes, so a parse →
//! serialize round trip with no edits reproduces the input exactly.
//! Nodes built by the editor (no raw line) render canonically at four
//! spaces of indentation per nesting level.

use crate::node::{HtTree, Node, NodeSeq};

const INDENT: &str = "    ";

/// Render the full tree to file text.
pub fn serialize(tree: &HtTree) -> String {
    let mut lines = Vec::new();
    render_sequence(&tree.root, 0, &mut lines);

    let mut out = lines.join("\n");
    if tree.trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_sequence(seq: &NodeSeq, depth: usize, lines: &mut Vec<String>) {
    for (_, node) in seq.iter() {
        render_node(node, depth, lines);
    }
}

fn render_node(node: &Node, depth: usize, lines: &mut Vec<String>) {
    match node {
        Node::Directive {
            name,
            arguments,
            raw,
        } => match raw {
            Some(raw) => lines.push(raw.clone()),
            None => {
                let mut line = format!("{}{}", INDENT.repeat(depth), name);
                for arg in arguments {
                    line.push(' ');
                    line.push_str(arg);
                }
                lines.push(line);
            }
        },
        Node::Block {
            name,
            arguments,
            children,
            raw_open,
            raw_close,
        } => {
            match raw_open {
                Some(raw) => lines.push(raw.clone()),
                None => {
                    let mut line = format!("{}<{}", INDENT.repeat(depth), name);
                    for arg in arguments {
                        line.push(' ');
                        line.push_str(arg);
                    }
                    line.push('>');
                    lines.push(line);
                }
            }
            render_sequence(children, depth + 1, lines);
            match raw_close {
                Some(raw) => lines.push(raw.clone()),
                None => lines.push(format!("{}</{}>", INDENT.repeat(depth), name)),
            }
        }
        Node::Comment { text, raw } => match raw {
            Some(raw) => lines.push(raw.clone()),
            None => lines.push(format!("{}{}", INDENT.repeat(depth), text)),
        },
        Node::Blank { raw } => lines.push(raw.clone()),
    }
}
