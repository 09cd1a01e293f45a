//! Data types for the inbox server
//!
//! This module contains the records that flow between ingestion, storage and views.

mod email;
mod page;

pub use email::{ContentType, Email, EmailSummary, NewEmail};
pub use page::{Page, PageRequest};
