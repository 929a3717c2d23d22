//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod audit;
pub mod health;
pub mod reports;
pub mod segments;
pub mod sync;
pub mod transactions;

// Re-export all handlers for use in router
pub use audit::*;
pub use health::*;
pub use reports::*;
pub use segments::*;
pub use sync::*;
pub use transactions::*;
