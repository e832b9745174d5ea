//! htredirects: safe editor for the managed redirects block of an .htaccess file
//!
//! This library exposes the parsing, locating and editing core for use in
//! integration and property-based tests. The main binary is at src/main.rs.

pub mod cli;
pub mod codec;
pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod file_store;
pub mod locator;
pub mod logger;
pub mod manager;
pub mod node;
pub mod parser;
pub mod serializer;

// Re-export commonly used types for convenience
pub use codec::{Rule, RuleEdit};
pub use error::{Error, Result};
pub use file_store::FileStore;
pub use locator::{END_MARKER, START_MARKER, Region, find_region};
pub use manager::{RedirectsManager, RuleSet};
pub use node::{HtTree, Node, NodeSeq};
pub use parser::parse;
pub use serializer::serialize;
