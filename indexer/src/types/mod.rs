//! Common types used throughout the pipeline.
//!
//! Covers the invocation input (change records and the invocation context), the decoded form
//! of a record and the bulk actions produced from it.

mod bulk;
mod context;
mod event;
mod record;

pub use bulk::*;
pub use context::*;
pub use event::*;
pub use record::*;
