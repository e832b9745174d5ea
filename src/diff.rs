//! Dry-run preview rendering
//!
//! Shows what a save would change, as a unified-style line diff of the
//! whole file, before anything is written.

use colored::*;
use similar::{ChangeTag, TextDiff};

/// Auto-detect if we should use colors
fn should_use_color() -> bool {
    // Check NO_COLOR env var (https://no-color.org/)
    std::env::var("NO_COLOR").is_err()
}

/// Render a line diff between the current and proposed file text.
///
/// Unchanged runs longer than `context` lines collapse to a `...`
/// separator.
pub fn format_preview(path: &str, before: &str, after: &str, context: usize) -> String {
    let use_color = should_use_color();
    let mut output = String::new();

    if use_color {
        output.push_str(&format!("{}\n", path.bold().cyan()));
    } else {
        output.push_str(&format!("{}\n", path));
    }

    if before == after {
        output.push_str("No changes would be made.\n");
        return output;
    }

    let diff = TextDiff::from_lines(before, after);

    for (idx, group) in diff.grouped_ops(context).iter().enumerate() {
        if idx > 0 {
            output.push_str("...\n");
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let line = change.value().trim_end_matches('\n');
                let formatted = match change.tag() {
                    ChangeTag::Delete => {
                        let text = format!("- {}", line);
                        if use_color { text.red().to_string() } else { text }
                    }
                    ChangeTag::Insert => {
                        let text = format!("+ {}", line);
                        if use_color { text.green().to_string() } else { text }
                    }
                    ChangeTag::Equal => format!("  {}", line),
                };
                output.push_str(&formatted);
                output.push('\n');
            }
        }
    }

    output
}
