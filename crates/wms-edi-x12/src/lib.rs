//! # wms-edi-x12
//!
//! Encoder and decoder for the EDI X12 subset exchanged with trading
//! partners (832/846/850/855/856/940/945).
//!
//! Encoding builds one interchange (single envelope, single group, single
//! transaction set) from a message type and a list of payload rows.
//! Decoding is best-effort: structural problems are accumulated as warnings
//! on the result, never raised as errors.

pub mod control;
pub mod decoder;
pub mod encoder;

pub use control::{ControlNumberSource, SequentialControlNumbers};
pub use decoder::decode;
pub use encoder::{Encoder, EncoderConfig};

use thiserror::Error;

/// Errors that can occur when encoding an interchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Message type {message_type} cannot be built from the {flow} flow")]
    PayloadMismatch { message_type: String, flow: String },
}

pub type Result<T> = std::result::Result<T, Error>;
