//! Tree model for one parsed .htaccess file
//!
//! Every line becomes a typed `Node`. Nodes keep the original line bytes
//! in `raw` so serialization reproduces untouched content exactly; nodes
//! built by the editor carry `raw = None` and render canonically.
//!
//! Children live in a `NodeSeq`: an ordered container with explicit
//! integer keys. Keys are stable identifiers, not array offsets — after a
//! splice the keys before the edited range are left alone and only the
//! keys after it are renumbered, so a block path recorded before the
//! edit still resolves.

use std::collections::BTreeMap;

/// One line (or nested scope) of the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `Name arg1 arg2 ...`
    Directive {
        name: String,
        arguments: Vec<String>,
        raw: Option<String>,
    },
    /// `<Name args> ... </Name>` with an ordered child sequence.
    Block {
        name: String,
        arguments: Vec<String>,
        children: NodeSeq,
        raw_open: Option<String>,
        raw_close: Option<String>,
    },
    /// `# ...` — `text` is the trimmed line including its leading `#`s.
    Comment { text: String, raw: Option<String> },
    /// A whitespace-only line, kept verbatim.
    Blank { raw: String },
}

impl Node {
    /// Build a directive with no original raw line (rendered canonically).
    pub fn directive(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Node::Directive {
            name: name.into(),
            arguments,
            raw: None,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment {
            text: text.into(),
            raw: None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Block { .. })
    }

    pub fn has_children(&self) -> bool {
        match self {
            Node::Block { children, .. } => !children.is_empty(),
            _ => false,
        }
    }

    pub fn children(&self) -> Option<&NodeSeq> {
        match self {
            Node::Block { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut NodeSeq> {
        match self {
            Node::Block { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn comment_text(&self) -> Option<&str> {
        match self {
            Node::Comment { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Ordered, explicitly-indexed child sequence.
///
/// Keys are not necessarily contiguous after edits; iteration order is
/// always ascending key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSeq {
    entries: BTreeMap<usize, Node>,
}

impl NodeSeq {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence with contiguous keys starting at 0.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let entries = nodes.into_iter().enumerate().collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: usize) -> Option<&Node> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: usize) -> Option<&mut Node> {
        self.entries.get_mut(&key)
    }

    pub fn contains_key(&self, key: usize) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn insert(&mut self, key: usize, node: Node) {
        self.entries.insert(key, node);
    }

    /// Append after the current highest key.
    pub fn push(&mut self, node: Node) {
        let key = self.entries.keys().next_back().map_or(0, |k| k + 1);
        self.entries.insert(key, node);
    }

    /// Iterate `(key, node)` in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.entries.iter().map(|(k, n)| (*k, n))
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    /// Replace every node with key in `[first, last]` by `replacement`.
    ///
    /// Nodes before `first` keep their keys. Replacement nodes take keys
    /// `first, first + 1, ...`; nodes after `last` are renumbered to
    /// contiguous positions following the replacement so no key is
    /// duplicated or skipped. `first > last` inserts without removing.
    pub fn replace_range(&mut self, first: usize, last: usize, replacement: Vec<Node>) {
        let old = std::mem::take(&mut self.entries);
        let mut entries = BTreeMap::new();
        let mut after = Vec::new();

        for (key, node) in old {
            if key < first {
                entries.insert(key, node);
            } else if key > last {
                after.push(node);
            }
            // keys in [first, last] are dropped
        }

        let mut next = first;
        for node in replacement {
            entries.insert(next, node);
            next += 1;
        }
        for node in after {
            entries.insert(next, node);
            next += 1;
        }

        self.entries = entries;
    }
}

impl<'a> IntoIterator for &'a NodeSeq {
    type Item = (&'a usize, &'a Node);
    type IntoIter = std::collections::btree_map::Iter<'a, usize, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A fully parsed file: the root sequence plus whether the original text
/// ended with a newline (needed for byte-exact round-trips).
#[derive(Debug, Clone, PartialEq)]
pub struct HtTree {
    pub root: NodeSeq,
    pub trailing_newline: bool,
}

impl HtTree {
    pub fn new(root: NodeSeq, trailing_newline: bool) -> Self {
        Self {
            root,
            trailing_newline,
        }
    }
}
