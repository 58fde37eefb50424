// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crate-wide error type and the public, C-ABI-shaped result code mapping.

use std::fmt;
use std::io;

/// `Error` enumerates every way decoding, demuxing, or stream control can fail.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while reading, writing, or seeking the stream.
    Io(io::Error),
    /// The stream contained malformed data and could not be decoded or demuxed.
    Decode(&'static str),
    /// An unsupported container or codec feature was encountered.
    Unsupported(&'static str),
    /// A caller-supplied argument was invalid (null pointer, zero length, etc).
    InvalidArgs(&'static str),
    /// A caller-supplied index was out of range.
    OutOfRange,
    /// The underlying stream could not be positioned as requested.
    BadSeek,
    /// Allocation failed.
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Decode(msg) => write!(f, "malformed stream: {}", msg),
            Error::Unsupported(feature) => write!(f, "unsupported feature: {}", feature),
            Error::InvalidArgs(msg) => write!(f, "invalid argument: {}", msg),
            Error::OutOfRange => write!(f, "index out of range"),
            Error::BadSeek => write!(f, "seek failed"),
            Error::OutOfMemory => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Decode(desc))
}

/// Convenience function to create an unsupported-feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Public, C-ABI-shaped result codes. Provided for callers that embed this decoder behind a
/// narrow, non-Rust-idiomatic boundary and want a stable numeric status rather than `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    Error = -1,
    InvalidArgs = -2,
    InvalidOperation = -3,
    OutOfMemory = -4,
    OutOfRange = -5,
    InvalidFile = -10,
    AtEnd = -17,
    BadSeek = -25,
    NotImplemented = -29,
}

impl From<&Error> for ResultCode {
    fn from(err: &Error) -> ResultCode {
        match err {
            Error::Io(_) => ResultCode::InvalidFile,
            Error::Decode(_) => ResultCode::InvalidFile,
            Error::Unsupported(_) => ResultCode::NotImplemented,
            Error::InvalidArgs(_) => ResultCode::InvalidArgs,
            Error::OutOfRange => ResultCode::OutOfRange,
            Error::BadSeek => ResultCode::BadSeek,
            Error::OutOfMemory => ResultCode::OutOfMemory,
        }
    }
}
