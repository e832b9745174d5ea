//! High-level redirects API
//!
//! `RedirectsManager` is the surface consumers (the CLI here, a web
//! layer elsewhere) talk to: list the managed rules, filter them, save
//! an edit list, create the managed block, roll back the last save.
//!
//! Nothing is cached between calls. Each operation builds its own
//! session — read, parse, locate — and discards it; the file on disk is
//! the only durable state, so two calls never disagree about what the
//! file contains because of stale in-memory handles.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::codec::{self, Rule, RuleEdit, REWRITE_RULE};
use crate::editor;
use crate::error::{Error, Result};
use crate::file_store::FileStore;
use crate::locator::{self, END_MARKER, START_MARKER};
use crate::node::Node;
use crate::parser;
use crate::serializer;

/// The decoded managed region: bounds, path, and human rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    /// Key of the start marker within its block.
    pub start: usize,
    /// Key of the end marker within its block.
    pub end: usize,
    /// Block keys from the region's level up to the root (innermost
    /// first, as the locator records them).
    pub path: Vec<usize>,
    pub rules: Vec<Rule>,
}

pub struct RedirectsManager {
    store: FileStore,
    site_host: Option<String>,
    backup_dir: Option<PathBuf>,
}

impl RedirectsManager {
    pub fn new(htaccess_path: impl Into<PathBuf>) -> Self {
        Self {
            store: FileStore::new(htaccess_path),
            site_host: None,
            backup_dir: None,
        }
    }

    /// Host prefix (for example `https://example.com`) stripped from
    /// URLs when encoding rules.
    pub fn with_site_host(mut self, host: Option<String>) -> Self {
        self.site_host = host.filter(|h| !h.is_empty());
        self
    }

    /// Directory receiving a timestamped copy of the file before each
    /// save; `None` disables backups.
    pub fn with_backup_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.backup_dir = dir;
        self
    }

    pub fn htaccess_path(&self) -> &Path {
        self.store.path()
    }

    /// Read, parse and decode the managed block.
    pub fn list_rules(&self) -> Result<RuleSet> {
        let text = self.store.read()?;
        let tree = parser::parse(&text)?;
        let region = locator::find_region(&tree.root)?;
        Ok(decode_region(&region))
    }

    /// Keep rules whose old or new URL contains `needle` (plain
    /// substring, no regex). Bounds and path carry over unchanged.
    pub fn filter_rules(ruleset: &RuleSet, needle: &str) -> RuleSet {
        let rules = ruleset
            .rules
            .iter()
            .filter(|rule| rule.old_url.contains(needle) || rule.new_url.contains(needle))
            .cloned()
            .collect();

        RuleSet {
            start: ruleset.start,
            end: ruleset.end,
            path: ruleset.path.clone(),
            rules,
        }
    }

    /// Apply an edit list and write the file.
    ///
    /// The merge runs first, against the caller's ruleset, so an edit
    /// conflict aborts before the lock is even taken. The write is a
    /// single exclusive read-modify-write cycle against the file's
    /// current content — the block is re-located fresh, so the splice
    /// lands where the markers are now, not where they were at list
    /// time.
    ///
    /// Returns the saved ruleset; `end` advances by one per inserted
    /// row.
    pub fn save_rules(&self, ruleset: &RuleSet, edits: &[RuleEdit]) -> Result<RuleSet> {
        let outcome = editor::merge_edits(&ruleset.rules, edits)?;

        let site_host = self.site_host.clone();
        let rules = outcome.rules.clone();
        self.store
            .update(self.backup_dir.as_deref(), move |current| {
                let mut tree = parser::parse(current)?;
                let region = locator::find_region(&tree.root)?;
                editor::splice_rules(&mut tree, &region, &rules, site_host.as_deref())?;
                Ok(serializer::serialize(&tree))
            })?;

        Ok(RuleSet {
            start: ruleset.start,
            end: ruleset.end + outcome.inserted,
            path: ruleset.path.clone(),
            rules: outcome.rules,
        })
    }

    /// Render what a save would write, without writing it.
    ///
    /// Returns `(current_text, new_text)` for diff display.
    pub fn preview_save(&self, ruleset: &RuleSet, edits: &[RuleEdit]) -> Result<(String, String)> {
        let outcome = editor::merge_edits(&ruleset.rules, edits)?;

        let current = self.store.read()?;
        let mut tree = parser::parse(&current)?;
        let region = locator::find_region(&tree.root)?;
        editor::splice_rules(&mut tree, &region, &outcome.rules, self.site_host.as_deref())?;

        Ok((current, serializer::serialize(&tree)))
    }

    /// Append an empty managed block to the end of the file.
    ///
    /// Returns false (and leaves the file alone) when a managed block
    /// already exists. The block carries a placeholder comment between
    /// the markers so the locator recognizes it before any rule is
    /// added.
    pub fn init_block(&self) -> Result<bool> {
        let mut created = false;

        self.store.update(self.backup_dir.as_deref(), |current| {
            let tree = parser::parse(current)?;
            if locator::find_region(&tree.root).is_ok() {
                return Ok(current.to_string());
            }

            let mut text = current.to_string();
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(START_MARKER);
            text.push('\n');
            text.push_str("# Managed by htredirects; edits between these markers are rewritten on save\n");
            text.push_str(END_MARKER);
            text.push('\n');

            created = true;
            Ok(text)
        })?;

        Ok(created)
    }

    /// Restore the most recent pre-save backup over the file.
    pub fn rollback(&self) -> Result<PathBuf> {
        let dir = self.backup_dir.as_deref().ok_or_else(|| {
            Error::io(
                self.store.path(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no backup directory configured"),
            )
        })?;
        self.store.restore_latest_backup(dir)
    }
}

/// Decode the located region's RewriteRule children into human rules.
///
/// Other node kinds between the markers are tolerated (and replaced on
/// the next save); a directive that doesn't decode is skipped with a
/// warning rather than failing the listing.
fn decode_region(region: &locator::Region) -> RuleSet {
    let mut rules = Vec::new();

    if let Some(nodes) = &region.rules {
        for (key, node) in nodes {
            let Node::Directive {
                name, arguments, ..
            } = node
            else {
                continue;
            };
            if name != REWRITE_RULE {
                continue;
            }

            match codec::decode_rule(arguments) {
                Ok(rule) => rules.push(rule),
                Err(err) => {
                    warn!(key, %err, "skipping undecodable rewrite rule");
                }
            }
        }
    }

    RuleSet {
        // find_region only succeeds with both bounds present.
        start: region.start.unwrap_or_default(),
        end: region.end.unwrap_or_default(),
        path: region.path.clone(),
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FIXTURE: &str = "\
# Site rules
RewriteEngine on

<IfModule mod_rewrite.c>
    ### Redirects Manager block
    RewriteRule ^old\\-page(/)?$ /new-page$1 [R=301,L]
    RewriteRule ^moved(/)?$ /landed$1 [R=302,L]
    ### END Redirects Manager block
</IfModule>
";

    fn manager_with(dir: &TempDir, content: &str) -> RedirectsManager {
        let path = dir.path().join(".htaccess");
        fs::write(&path, content).unwrap();
        RedirectsManager::new(path)
    }

    #[test]
    fn test_list_rules_decodes_block() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);

        let ruleset = manager.list_rules().unwrap();
        assert_eq!(ruleset.path, vec![3]);
        assert_eq!(ruleset.rules.len(), 2);
        assert_eq!(ruleset.rules[0].old_url, "/old-page");
        assert_eq!(ruleset.rules[0].new_url, "/new-page");
        assert_eq!(ruleset.rules[0].status, 301);
    }

    #[test]
    fn test_list_rules_skips_malformed_rule() {
        let dir = TempDir::new().unwrap();
        let text = "\
### Redirects Manager block
RewriteRule ^ok(/)?$ /fine$1 [R=301,L]
RewriteRule broken-two-args [L]
### END Redirects Manager block
";
        let manager = manager_with(&dir, text);

        let ruleset = manager.list_rules().unwrap();
        assert_eq!(ruleset.rules.len(), 1);
        assert_eq!(ruleset.rules[0].old_url, "/ok");
    }

    #[test]
    fn test_list_rules_missing_block() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, "RewriteEngine on\n");
        assert!(matches!(manager.list_rules(), Err(Error::BlockNotFound)));
    }

    #[test]
    fn test_filter_rules_substring_both_sides() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);
        let ruleset = manager.list_rules().unwrap();

        let hits = RedirectsManager::filter_rules(&ruleset, "landed");
        assert_eq!(hits.rules.len(), 1);
        assert_eq!(hits.rules[0].old_url, "/moved");

        let hits = RedirectsManager::filter_rules(&ruleset, "old-page");
        assert_eq!(hits.rules.len(), 1);

        let misses = RedirectsManager::filter_rules(&ruleset, "zzz");
        assert!(misses.rules.is_empty());
        assert_eq!(misses.start, ruleset.start);
    }

    #[test]
    fn test_save_rules_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);
        let ruleset = manager.list_rules().unwrap();

        let edits = vec![
            RuleEdit::update("/old-page", Rule::new("/old-page", "/renamed", 301)),
            RuleEdit::insert(Rule::new("/fresh", "/target", 302)),
        ];
        let saved = manager.save_rules(&ruleset, &edits).unwrap();
        assert_eq!(saved.rules.len(), 3);
        assert_eq!(saved.end, ruleset.end + 1);

        let relisted = manager.list_rules().unwrap();
        assert_eq!(relisted.rules, saved.rules);
    }

    #[test]
    fn test_save_preserves_unrelated_content() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);
        let ruleset = manager.list_rules().unwrap();

        manager
            .save_rules(&ruleset, &[RuleEdit::delete("/moved")])
            .unwrap();

        let text = fs::read_to_string(manager.htaccess_path()).unwrap();
        assert!(text.starts_with("# Site rules\nRewriteEngine on\n\n<IfModule mod_rewrite.c>\n"));
        assert!(text.contains("    ### Redirects Manager block\n"));
        assert!(text.contains("    ### END Redirects Manager block\n</IfModule>\n"));
        assert!(!text.contains("moved"));
    }

    #[test]
    fn test_save_conflict_leaves_file_byte_identical() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);
        let ruleset = manager.list_rules().unwrap();

        let edits = vec![RuleEdit::update("/absent", Rule::new("/absent", "/x", 301))];
        let err = manager.save_rules(&ruleset, &edits).unwrap_err();
        assert!(matches!(err, Error::EditConflict { .. }));

        assert_eq!(fs::read_to_string(manager.htaccess_path()).unwrap(), FIXTURE);
    }

    #[test]
    fn test_preview_save_does_not_write() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, FIXTURE);
        let ruleset = manager.list_rules().unwrap();

        let edits = vec![RuleEdit::insert(Rule::new("/p", "/q", 301))];
        let (before, after) = manager.preview_save(&ruleset, &edits).unwrap();
        assert_eq!(before, FIXTURE);
        assert!(after.contains("RewriteRule ^p(/)?$ /q$1 [R=301,L]"));

        assert_eq!(fs::read_to_string(manager.htaccess_path()).unwrap(), FIXTURE);
    }

    #[test]
    fn test_init_block_creates_once() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, "RewriteEngine on\n");

        assert!(manager.init_block().unwrap());
        assert!(manager.list_rules().unwrap().rules.is_empty());

        // Second init is a no-op.
        assert!(!manager.init_block().unwrap());
        let text = fs::read_to_string(manager.htaccess_path()).unwrap();
        assert_eq!(text.matches(START_MARKER).count(), 1);
    }

    #[test]
    fn test_save_after_init_block() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, "RewriteEngine on\n");
        manager.init_block().unwrap();

        let ruleset = manager.list_rules().unwrap();
        let saved = manager
            .save_rules(&ruleset, &[RuleEdit::insert(Rule::new("/a", "/b", 301))])
            .unwrap();
        assert_eq!(saved.rules.len(), 1);

        let relisted = manager.list_rules().unwrap();
        assert_eq!(relisted.rules[0].old_url, "/a");
    }

    #[test]
    fn test_rollback_restores_previous_content() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        let path = dir.path().join(".htaccess");
        fs::write(&path, FIXTURE).unwrap();
        let manager = RedirectsManager::new(&path).with_backup_dir(Some(backups));

        let ruleset = manager.list_rules().unwrap();
        manager
            .save_rules(&ruleset, &[RuleEdit::delete("/moved")])
            .unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), FIXTURE);

        manager.rollback().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), FIXTURE);
    }

    #[test]
    fn test_site_host_stripped_on_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".htaccess");
        fs::write(&path, FIXTURE).unwrap();
        let manager =
            RedirectsManager::new(&path).with_site_host(Some("https://example.com".to_string()));

        let ruleset = manager.list_rules().unwrap();
        manager
            .save_rules(
                &ruleset,
                &[RuleEdit::insert(Rule::new(
                    "https://example.com/promo",
                    "https://example.com/sale",
                    302,
                ))],
            )
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("RewriteRule ^promo(/)?$ /sale$1 [R=302,L]"));
    }
}
