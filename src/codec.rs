//! Conversion between RewriteRule arguments and human rule records
//!
//! The escaped form of a redirect looks like:
//!
//! ```text
//! RewriteRule ^old\-page(/)?$ /new-page$1 [R=301,L]
//! ```
//!
//! and the human form is `{old_url: "/old-page", new_url: "/new-page",
//! type: 301}`. The two directions are not byte-exact inverses — encoding
//! normalizes slashes and whitespace — so callers may only rely on
//! semantic equivalence, which is what the tests pin.

use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::node::Node;

/// Directive name carrying a redirect.
pub const REWRITE_RULE: &str = "RewriteRule";

/// Characters percent-encoded in a query string. Mirrors PHP urlencode's
/// unreserved set, except spaces become `%20` rather than `+`.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-');

/// Matches the optional-trailing-slash suffix `(/)?$` in an old pattern,
/// tolerating one trailing whitespace character.
static SLASH_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(/\)\?\$\s?").expect("static pattern"));

/// Matches backreference tokens (`$1`, `$2`, ...) in a target URL.
static BACKREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").expect("static pattern"));

/// Extracts the numeric redirect code from a flag group like `[R=301,L]`.
static REDIRECT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*R=(\d+)").expect("static pattern"));

/// A redirect in human-editable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub old_url: String,
    pub new_url: String,
    /// HTTP redirect status code (301, 302, ...).
    #[serde(rename = "type")]
    pub status: u16,
    /// Transient edit flag; never written to the file.
    #[serde(default, skip_serializing)]
    pub delete: bool,
}

impl Rule {
    pub fn new(old_url: impl Into<String>, new_url: impl Into<String>, status: u16) -> Self {
        Self {
            old_url: old_url.into(),
            new_url: new_url.into(),
            status,
            delete: false,
        }
    }
}

/// One row of a caller-supplied edit list.
///
/// `original_old_url = Some(..)` marks an update (or delete, when the
/// rule's delete flag is set) matched against current rules by that key;
/// `None` marks an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEdit {
    pub original_old_url: Option<String>,
    pub rule: Rule,
}

impl RuleEdit {
    pub fn insert(rule: Rule) -> Self {
        Self {
            original_old_url: None,
            rule,
        }
    }

    pub fn update(original_old_url: impl Into<String>, rule: Rule) -> Self {
        Self {
            original_old_url: Some(original_old_url.into()),
            rule,
        }
    }

    pub fn delete(original_old_url: impl Into<String>) -> Self {
        let key = original_old_url.into();
        let mut rule = Rule::new(key.clone(), String::new(), 301);
        rule.delete = true;
        Self {
            original_old_url: Some(key),
            rule,
        }
    }
}

/// Decode the three arguments of a RewriteRule directive into a `Rule`.
pub fn decode_rule(arguments: &[String]) -> Result<Rule> {
    if arguments.len() != 3 {
        return Err(Error::MalformedRule {
            argument: arguments.join(" "),
        });
    }

    let old_url = decode_old_url(&arguments[0]);
    let new_url = decode_new_url(&arguments[1]);
    let status = decode_status(&arguments[2])?;

    Ok(Rule::new(old_url, new_url, status))
}

/// Escaped old pattern → human URL path.
///
/// Stages: drop the `(/)?$` suffix, percent-decode, unescape backslash
/// escapes (`\s` back to a space), decode HTML entities, drop the `^`
/// anchor, then normalize to one leading slash and no trailing slash.
pub fn decode_old_url(pattern: &str) -> String {
    let stripped = SLASH_SUFFIX.replace_all(pattern, "");
    let decoded = percent_decode_lossy(&stripped);
    let unescaped = unescape(&decoded);
    let unentitied = html_escape::decode_html_entities(&unescaped);
    let bare = unentitied.trim_start_matches('^');
    format!("/{}", bare.trim_matches('/'))
}

/// Escaped target URL → human URL.
///
/// Stages: drop backreference tokens, percent-decode, unescape, decode
/// HTML entities. No slash normalization — absolute `http` targets stay
/// untouched.
pub fn decode_new_url(target: &str) -> String {
    let stripped = BACKREF.replace_all(target, "");
    let decoded = percent_decode_lossy(&stripped);
    let unescaped = unescape(&decoded);
    html_escape::decode_html_entities(&unescaped).into_owned()
}

/// Extract the redirect status code from a flag group like `[R=301,L]`.
pub fn decode_status(flags: &str) -> Result<u16> {
    REDIRECT_CODE
        .captures(flags)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .ok_or_else(|| Error::MalformedRule {
            argument: flags.to_string(),
        })
}

/// Build a RewriteRule directive node from a human rule.
///
/// `site_host` is the configured host prefix (for example
/// `https://example.com`) stripped from both URLs before encoding.
pub fn encode_rule(rule: &Rule, site_host: Option<&str>) -> Node {
    let old = trim_url(remove_host(&rule.old_url, site_host));
    let old = format!("^{}(/)?$", escape_pattern(&old, r"\s"));

    let new = trim_url(remove_host(&rule.new_url, site_host));
    let new = fix_query_string(&prepend_slash(&new));
    let new = format!("{}$1", escape_pattern(&new, "%20"));

    let flags = format!("[R={},L]", rule.status);

    Node::directive(REWRITE_RULE, vec![old, new, flags])
}

fn percent_decode_lossy(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// Undo backslash escaping. `\s` is the whitespace token the encoder
/// emits inside old patterns; everything else drops the backslash.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }

    out
}

/// Strip the configured host prefix from the front of a URL.
fn remove_host<'a>(url: &'a str, site_host: Option<&str>) -> &'a str {
    match site_host {
        Some(host) if !host.is_empty() => url.strip_prefix(host).unwrap_or(url),
        _ => url,
    }
}

/// Trim surrounding whitespace, then surrounding slashes.
fn trim_url(url: &str) -> &str {
    url.trim().trim_matches('/')
}

/// Prefix with `/` unless the value is already rooted or absolute.
fn prepend_slash(url: &str) -> String {
    if url.starts_with('/') || url.starts_with("http") {
        url.to_string()
    } else {
        format!("/{url}")
    }
}

/// Percent-encode the query portion of a URL, leaving the path alone.
fn fix_query_string(url: &str) -> String {
    match url.split_once('?') {
        Some((path, query)) if !query.is_empty() => {
            format!("{path}?{}", utf8_percent_encode(query, QUERY_ENCODE))
        }
        _ => url.to_string(),
    }
}

/// Escape regex metacharacters and replace whitespace runs with
/// `whitespace_token` (`\s` in patterns, `%20` in targets).
///
/// The escaped set matches PHP's preg_quote default list; `/` is left
/// alone so the `(/)?$` suffix stays recognizable.
fn escape_pattern(text: &str, whitespace_token: &str) -> String {
    const METACHARACTERS: &str = ".\\+*?[^]$(){}=!<>|:-#";

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            out.push_str(whitespace_token);
        } else if METACHARACTERS.contains(c) {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive_arguments(node: Node) -> Vec<String> {
        match node {
            Node::Directive {
                name, arguments, ..
            } => {
                assert_eq!(name, REWRITE_RULE);
                arguments
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    // --- decode stages ---

    #[test]
    fn test_decode_old_strips_suffix_and_anchor() {
        assert_eq!(decode_old_url("^old-page(/)?$"), "/old-page");
    }

    #[test]
    fn test_decode_old_unescapes_metacharacters() {
        assert_eq!(decode_old_url(r"^old\-page\.html(/)?$"), "/old-page.html");
    }

    #[test]
    fn test_decode_old_whitespace_token() {
        assert_eq!(decode_old_url(r"^my\spage(/)?$"), "/my page");
    }

    #[test]
    fn test_decode_old_percent_decoding() {
        assert_eq!(decode_old_url("^caf%C3%A9(/)?$"), "/café");
    }

    #[test]
    fn test_decode_old_html_entities() {
        assert_eq!(decode_old_url("^fish&amp;chips(/)?$"), "/fish&chips");
    }

    #[test]
    fn test_decode_old_normalizes_slashes() {
        assert_eq!(decode_old_url("^/wrapped/(/)?$"), "/wrapped");
        assert_eq!(decode_old_url("bare"), "/bare");
    }

    #[test]
    fn test_decode_new_strips_backrefs() {
        assert_eq!(decode_new_url("/new-page$1"), "/new-page");
        assert_eq!(decode_new_url("/a$1/b$12"), "/a/b");
    }

    #[test]
    fn test_decode_new_keeps_absolute_urls() {
        assert_eq!(
            decode_new_url("https://elsewhere.example/landing$1"),
            "https://elsewhere.example/landing"
        );
    }

    #[test]
    fn test_decode_new_percent_decodes_query() {
        assert_eq!(decode_new_url("/p?x%3D1%26y%3D2$1"), "/p?x=1&y=2");
    }

    #[test]
    fn test_decode_status_variants() {
        assert_eq!(decode_status("[R=301,L]").unwrap(), 301);
        assert_eq!(decode_status("[R=302]").unwrap(), 302);
        assert_eq!(decode_status("[NC,R=307,L]").unwrap(), 307);
    }

    #[test]
    fn test_decode_status_missing_is_malformed() {
        assert!(matches!(
            decode_status("[L]"),
            Err(Error::MalformedRule { .. })
        ));
    }

    #[test]
    fn test_decode_rule_wrong_arity_is_malformed() {
        let args = vec!["^a(/)?$".to_string(), "/b$1".to_string()];
        assert!(matches!(
            decode_rule(&args),
            Err(Error::MalformedRule { .. })
        ));
    }

    // --- encode stages ---

    #[test]
    fn test_encode_basic_rule() {
        let node = encode_rule(&Rule::new("/foo", "/bar", 301), None);
        assert_eq!(
            directive_arguments(node),
            vec![
                "^foo(/)?$".to_string(),
                "/bar$1".to_string(),
                "[R=301,L]".to_string()
            ]
        );
    }

    #[test]
    fn test_encode_escapes_metacharacters() {
        let node = encode_rule(&Rule::new("/old-page.html", "/new", 301), None);
        let args = directive_arguments(node);
        assert_eq!(args[0], r"^old\-page\.html(/)?$");
    }

    #[test]
    fn test_encode_whitespace_tokens_differ_by_side() {
        let node = encode_rule(&Rule::new("/my page", "/new page", 302), None);
        let args = directive_arguments(node);
        assert_eq!(args[0], r"^my\spage(/)?$");
        assert_eq!(args[1], "/new%20page$1");
    }

    #[test]
    fn test_encode_strips_site_host() {
        let node = encode_rule(
            &Rule::new("https://example.com/old", "https://example.com/new", 301),
            Some("https://example.com"),
        );
        let args = directive_arguments(node);
        assert_eq!(args[0], "^old(/)?$");
        assert_eq!(args[1], "/new$1");
    }

    #[test]
    fn test_encode_keeps_foreign_absolute_target() {
        let node = encode_rule(
            &Rule::new("/old", "https://elsewhere.example/landing", 301),
            Some("https://example.com"),
        );
        let args = directive_arguments(node);
        assert!(args[1].starts_with("https"));
    }

    #[test]
    fn test_encode_query_string_portion_only() {
        let node = encode_rule(&Rule::new("/old", "/new?x=1&y=2", 301), None);
        let args = directive_arguments(node);
        assert_eq!(args[1], r"/new\?x%3D1%26y%3D2$1");
    }

    #[test]
    fn test_encode_collapses_redundant_slashes() {
        let node = encode_rule(&Rule::new("  /foo/  ", "//bar/", 301), None);
        let args = directive_arguments(node);
        assert_eq!(args[0], "^foo(/)?$");
        assert_eq!(args[1], "/bar$1");
    }

    // --- semantic reversibility ---

    #[test]
    fn test_decode_of_encode_is_semantically_identity() {
        let original = Rule::new("/foo", "/bar", 301);
        let args = directive_arguments(encode_rule(&original, None));
        let decoded = decode_rule(&args).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_of_encode_with_spaces_and_query() {
        let original = Rule::new("/my old page", "/new?x=1&y=2", 302);
        let args = directive_arguments(encode_rule(&original, None));
        let decoded = decode_rule(&args).unwrap();
        assert_eq!(decoded, original);
    }
}
