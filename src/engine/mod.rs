//! Engine module for discovery: search cursor, tree walker, path allocation, CLI surface

pub mod arg_parser;
pub mod cli;
pub mod paths;
pub mod progress;
pub mod search;
pub mod tools;
pub mod tree;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::{apply_cli_to_opts, handle_run};
pub use paths::PathAllocator;
pub use search::{CrawlSession, CursorLimits, SearchCursor, WindowStep};
pub use tools::{
    join_tree_path, matches_extension, raw_content_url, running_as_root, sanitize_component,
    sanitize_full_name,
};
pub use tree::{TreeFetchFailure, TreeWalk, TreeWalker};
