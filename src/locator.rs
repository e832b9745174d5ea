//! Locates the managed redirects region inside a parsed tree
//!
//! The region is delimited by two literal marker comments which may sit
//! at the top level or arbitrarily deep inside nested blocks. The search
//! is depth-first with children scanned before the rest of the current
//! level, and the first terminated region wins: once a nested block
//! yields a match, sibling blocks after it are not searched.
//!
//! Two quirks are deliberate, inherited contracts (do not "fix" them):
//! a second start marker seen before any end marker invalidates what was
//! accumulated and rebinds to the new start, and a start marker with no
//! end marker at the same level leaves the region unusable.

use crate::error::{Error, Result};
use crate::node::{Node, NodeSeq};

/// Literal start marker comment, including its leading hashes.
pub const START_MARKER: &str = "### Redirects Manager block";
/// Literal end marker comment.
pub const END_MARKER: &str = "### END Redirects Manager block";

/// A located region: bounds, the nodes strictly between the markers, and
/// the path of block keys leading to the level where the markers sit.
///
/// `path` is recorded innermost-first as the search unwinds; callers
/// reverse it before descending from the root (the editor does this).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub rules: Option<Vec<(usize, Node)>>,
    pub path: Vec<usize>,
}

/// Search the tree for the managed region.
///
/// `rules` is non-empty in the success case; a marker pair with nothing
/// between it reads as not-found so callers can offer to (re)create the
/// block.
pub fn find_region(root: &NodeSeq) -> Result<Region> {
    let region = scan_level(root, Region::default());
    if region.rules.is_none() {
        return Err(Error::BlockNotFound);
    }
    Ok(region)
}

fn scan_level(seq: &NodeSeq, mut region: Region) -> Region {
    for (key, node) in seq.iter() {
        if node.is_block() && node.has_children() {
            region = scan_level(node.children().expect("block has children"), region);

            if region.rules.is_some() {
                region.path.push(key);
                break;
            }
            continue;
        }

        if let Some(text) = node.comment_text() {
            if text == START_MARKER {
                // A start on top of an unterminated start throws away
                // what was collected; the later marker wins.
                if region.start.is_some() {
                    region.rules = None;
                }
                region.start = Some(key);
                continue;
            }
            if text == END_MARKER {
                region.end = Some(key);
                break;
            }
        }

        if region.start.is_some() && region.end.is_none() {
            region
                .rules
                .get_or_insert_with(Vec::new)
                .push((key, node.clone()));
        }
    }

    if region.end.is_none() {
        region.rules = None;
    }

    region
}
