//! Utility functions and helpers
//!
//! Logging setup plus the small formatting helpers used by handlers and views.

pub mod format;
pub mod logging;

pub use format::{escape_html, truncate_email};
