//! Applies an edit list to the managed region
//!
//! Editing is two-phase so a conflict can never leave a half-written
//! file: `merge_edits` is a pure function that resolves the edit list
//! against the current rules (and fails on any unmatched update/delete
//! key before anything is touched), and `splice_rules` rewrites exactly
//! the node range between the markers, at the nesting depth the locator
//! recorded, leaving every other node alone.

use crate::codec::{Rule, RuleEdit, encode_rule};
use crate::error::{Error, Result};
use crate::locator::Region;
use crate::node::{HtTree, Node, NodeSeq};

/// Result of resolving an edit list against the current rules.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub rules: Vec<Rule>,
    /// How many rows were appended; the region descriptor's `end` bound
    /// advances by one per insertion.
    pub inserted: usize,
}

/// Resolve `edits` against `current`, in edit order.
///
/// Update and delete rows carry an `original_old_url` key and are matched
/// by exact equality against the current list, scanning only forward from
/// the previously matched row — repeated keys resolve in stable order and
/// a consumed row is never rematched. Insert rows (no key) are appended
/// after everything else. Any unmatched key aborts the whole merge.
pub fn merge_edits(current: &[Rule], edits: &[RuleEdit]) -> Result<MergeOutcome> {
    let mut merged: Vec<Option<Rule>> = current.iter().cloned().map(Some).collect();
    let mut inserts: Vec<Rule> = Vec::new();
    let mut cursor: Option<usize> = None;

    for edit in edits {
        match &edit.original_old_url {
            None => {
                // Blank form rows are ignored, as is deleting a row that
                // was never saved.
                if edit.rule.delete
                    || edit.rule.old_url.is_empty()
                    || edit.rule.new_url.is_empty()
                {
                    continue;
                }
                inserts.push(edit.rule.clone());
            }
            Some(key) => {
                let from = cursor.map_or(0, |matched| matched + 1);
                let idx = (from..current.len())
                    .find(|&i| current[i].old_url == *key)
                    .ok_or_else(|| Error::EditConflict {
                        old_url: key.clone(),
                    })?;
                cursor = Some(idx);

                if edit.rule.delete {
                    merged[idx] = None;
                } else {
                    merged[idx] = Some(edit.rule.clone());
                }
            }
        }
    }

    let inserted = inserts.len();
    let mut rules: Vec<Rule> = merged.into_iter().flatten().collect();
    rules.append(&mut inserts);

    Ok(MergeOutcome { rules, inserted })
}

/// Rebuild the node range strictly between the region's markers as fresh
/// RewriteRule directives, one per rule.
///
/// The region's path (recorded innermost-first) is reversed and followed
/// from the root. If an index along the way no longer resolves to a block
/// — the tree shape changed since the region was located — the rebuild
/// falls back to the level reached so far, mirroring how the range was
/// originally addressed by position.
pub fn splice_rules(
    tree: &mut HtTree,
    region: &Region,
    rules: &[Rule],
    site_host: Option<&str>,
) -> Result<()> {
    let start = region.start.ok_or(Error::BlockNotFound)?;
    let end = region.end.ok_or(Error::BlockNotFound)?;

    let nodes: Vec<Node> = rules
        .iter()
        .map(|rule| encode_rule(rule, site_host))
        .collect();

    let mut path = region.path.clone();
    path.reverse();

    apply_at(&mut tree.root, &path, start, end, nodes);
    Ok(())
}

fn apply_at(seq: &mut NodeSeq, path: &[usize], start: usize, end: usize, nodes: Vec<Node>) {
    if let Some((&idx, rest)) = path.split_first() {
        if seq.get(idx).is_some_and(Node::is_block) {
            let children = seq
                .get_mut(idx)
                .and_then(Node::children_mut)
                .expect("checked block above");
            apply_at(children, rest, start, end, nodes);
            return;
        }
    }

    // Markers at start and end stay untouched; everything strictly
    // between them is replaced. replace_range renumbers the end marker
    // and the rest of the tail to contiguous keys.
    seq.replace_range(start + 1, end.saturating_sub(1), nodes);
}
