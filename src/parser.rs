//! Grammar parser for .htaccess-style files
//!
//! The grammar is a small fixed subset: directives (`Name arg1 arg2`),
//! nested blocks (`<Name args> ... </Name>`), comments (`# ...`) and
//! blank lines. Each node keeps its original line bytes so an unmodified
//! tree serializes back to the input byte-for-byte.
//!
//! Parsing is fatal on malformed block syntax — a partially parsed tree
//! would make the later splice unsafe, so there is no recovery mode.

use crate::error::{Error, Result};
use crate::node::{HtTree, Node, NodeSeq};

/// Parse a whole file into a tree.
pub fn parse(text: &str) -> Result<HtTree> {
    let trailing_newline = text.ends_with('\n');
    let mut lines: Vec<&str> = if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    };
    if trailing_newline {
        lines.pop();
    }

    let mut pos = 0usize;
    let root = parse_sequence(&lines, &mut pos, None)?;

    Ok(HtTree::new(root, trailing_newline))
}

/// Parse one nesting level.
///
/// `closer` is the name of the block we are inside (None at top level).
/// Returns once the matching closing tag is consumed, or at end of input
/// for the top level.
fn parse_sequence(lines: &[&str], pos: &mut usize, closer: Option<&str>) -> Result<NodeSeq> {
    let mut nodes = Vec::new();

    while *pos < lines.len() {
        let raw = lines[*pos];
        let line_no = *pos + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            nodes.push(Node::Blank {
                raw: raw.to_string(),
            });
            *pos += 1;
            continue;
        }

        if trimmed.starts_with('#') {
            nodes.push(Node::Comment {
                text: trimmed.to_string(),
                raw: Some(raw.to_string()),
            });
            *pos += 1;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("</") {
            let name = rest
                .strip_suffix('>')
                .ok_or_else(|| Error::parse(line_no, "malformed closing tag"))?
                .trim()
                .to_string();

            return match closer {
                Some(open_name) if name.eq_ignore_ascii_case(open_name) => {
                    *pos += 1;
                    Ok(NodeSeq::from_nodes(nodes))
                }
                Some(open_name) => Err(Error::parse(
                    line_no,
                    format!("closing tag </{name}> does not match open block <{open_name}>"),
                )),
                None => Err(Error::parse(
                    line_no,
                    format!("closing tag </{name}> without an open block"),
                )),
            };
        }

        if let Some(rest) = trimmed.strip_prefix('<') {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| Error::parse(line_no, "malformed block opener"))?;
            let mut parts = split_arguments(inner);
            if parts.is_empty() {
                return Err(Error::parse(line_no, "block opener has no name"));
            }
            let name = parts.remove(0);
            let raw_open = raw.to_string();

            *pos += 1;
            let children = match parse_sequence(lines, pos, Some(&name)) {
                Ok(children) => children,
                // EOF inside the body means this opener was never closed;
                // report it against the opener's line.
                Err(Error::Parse { message, .. }) if message == UNTERMINATED => {
                    return Err(Error::parse(
                        line_no,
                        format!("unterminated block <{name}>"),
                    ));
                }
                Err(other) => return Err(other),
            };

            // parse_sequence consumed the closing tag as its last line.
            let raw_close = lines[*pos - 1].to_string();

            nodes.push(Node::Block {
                name,
                arguments: parts,
                children,
                raw_open: Some(raw_open),
                raw_close: Some(raw_close),
            });
            continue;
        }

        let mut parts = split_arguments(trimmed);
        // trimmed is non-empty here, so there is always at least a name
        let name = parts.remove(0);
        nodes.push(Node::Directive {
            name,
            arguments: parts,
            raw: Some(raw.to_string()),
        });
        *pos += 1;
    }

    if closer.is_some() {
        return Err(Error::parse(lines.len(), UNTERMINATED));
    }

    Ok(NodeSeq::from_nodes(nodes))
}

const UNTERMINATED: &str = "unterminated block";

/// Split a directive or opener body into whitespace-separated arguments.
///
/// Double quotes group an argument containing spaces; the quotes stay
/// part of the stored token so the original line can be reproduced.
fn split_arguments(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    args
}
