#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # wms-edi-apply
//!
//! The inbound half of the EDI integration: ingesting partner interchanges
//! into the inbox, resolving external item codes to warehouse items, and
//! applying decoded orders as warehouse lists under partial-failure
//! semantics with per-line error capture and an audit trail.

pub mod apply;
pub mod inbox;
pub mod resolver;

pub use apply::{ApplyOptions, ApplyOutcome, ApplyService, CreatedList};
pub use inbox::{InboxService, IngestOutcome};
pub use resolver::ItemResolver;

use thiserror::Error;

/// Errors that can occur while ingesting or applying
#[derive(Error, Debug)]
pub enum Error {
    #[error("Inbox record {inbox_id} not found for integration '{integration_key}'")]
    InboxNotFound {
        integration_key: String,
        inbox_id: i64,
    },

    #[error(
        "Inbox record {inbox_id} was already applied at {applied_at}; \
         pass reprocess to apply it again"
    )]
    AlreadyApplied { inbox_id: i64, applied_at: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] wms_edi_store::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
