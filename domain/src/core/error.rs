//! Wire format errors

use super::string::truncate;
use thiserror::Error;

/// Longest frame excerpt kept inside a [`DecodeError`].
const FRAME_EXCERPT_LEN: usize = 160;

/// An inbound frame could not be decoded into a known message.
#[derive(Error, Debug)]
#[error("failed to decode SDK frame {frame}: {source}")]
pub struct DecodeError {
    /// Excerpt of the offending frame.
    pub frame: String,
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    pub fn from_frame(raw: &str, source: serde_json::Error) -> Self {
        Self {
            frame: truncate(raw, FRAME_EXCERPT_LEN),
            source,
        }
    }
}

/// A value could not be serialized into the SDK wire format.
#[derive(Error, Debug)]
#[error("failed to encode SDK frame: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);
