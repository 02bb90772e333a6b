//! Shared building blocks of the domain layer.
//!
//! - [`error::DecodeError`] / [`error::EncodeError`]: wire format failures
//! - [`string::truncate`]: UTF-8 safe shortening for log and error output

pub mod error;
pub mod string;
