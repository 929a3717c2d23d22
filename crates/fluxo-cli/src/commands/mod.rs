//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `import` - Statement file import
//! - `segments` - Segment management commands
//! - `serve` - Web server command
//! - `sync` - Provider sync command
//! - `transactions` - Transaction listing

pub mod core;
pub mod import;
pub mod segments;
pub mod serve;
pub mod sync;
pub mod transactions;

// Re-export command functions for main.rs
pub use self::core::*;
pub use import::*;
pub use segments::*;
pub use serve::*;
pub use sync::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
///
/// Counts chars, not bytes: descriptions are frequently Portuguese text
/// with accented characters.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
