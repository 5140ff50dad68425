#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # wms-edi-model
//!
//! Value types shared by the EDI X12 codec and the apply pipeline.
//!
//! This crate holds pure data: message types, raw and typed segments,
//! the decoded order/line model produced by the decoder, and the payload
//! row shapes fed to the encoder. No I/O and no behavior beyond parsing
//! individual segments into their typed variants.

/// Message types and outbound flow selection.
pub mod message;
/// Decoded interchange, order and line model.
pub mod order;
/// Outbound payload row shapes per flow.
pub mod payload;
/// Raw and typed segment representations.
pub mod segment;

pub use message::{Flow, MessageType};
pub use order::{DecodedInterchange, DecodedLine, DecodedOrder, MAX_ORDER_NUMBERS, MAX_ORDERS};
pub use payload::{ItemRow, OrderRow, PayloadRows, StockRow};
pub use segment::{ELEMENT_SEPARATOR, RawSegment, SEGMENT_SEPARATOR, Segment};

use thiserror::Error;

/// Errors that can occur when interpreting model data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown message type '{code}'")]
    UnknownMessageType { code: String },

    #[error("Malformed {tag} segment at position {index}: {reason}")]
    MalformedSegment {
        tag: String,
        index: usize,
        reason: String,
    },

    #[error("Unknown flow '{name}'")]
    UnknownFlow { name: String },
}

impl Error {
    /// Build a malformed-segment error with tag and position context.
    pub fn malformed(tag: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSegment {
            tag: tag.into(),
            index,
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for model operations.
pub type Result<T> = std::result::Result<T, Error>;
