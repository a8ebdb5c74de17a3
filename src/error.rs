/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Error types of this crate.
//!
//! Decoding and listing fail with [`Error`], which always aborts the whole operation.
//! Extraction reports one [`ExtractError`] per failed entry and carries on with the others.

use std::io;
use std::num::ParseIntError;

/// Result type alias for decoding and listing operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Fatal errors while decoding or listing an archive.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input does not carry the `ustar` magic at the expected position.
    #[error("Error opening archive: Unrecognized archive format")]
    Format,

    /// A byte window ended before all of its bytes could be read.
    #[error("truncated archive at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedRead {
        /// Absolute offset of the window.
        offset: u64,
        /// Width of the window.
        expected: usize,
        /// Bytes that were available.
        actual: usize,
    },

    /// The size field holds a number that is not representable. Empty or non-numeric size
    /// fields mark the end of the archive instead.
    #[error("unable to parse size {value:?} of the entry at offset {offset}: {source}")]
    SizeParse {
        /// Absolute offset of the header block.
        offset: u64,
        /// The trimmed size field.
        value: String,
        #[source]
        source: ParseIntError,
    },

    /// The content span of an entry does not fit into memory.
    #[error("entry at offset {offset} spans {span} bytes of content, which is not addressable")]
    EntryTooLarge {
        /// Absolute offset of the header block.
        offset: u64,
        /// Content span in bytes.
        span: u64,
    },

    /// The underlying source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to extract a single entry.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The entry name contains a `..` component or nothing that could name a file.
    #[error("Unable to extract content for {name}: unsafe path")]
    UnsafePath { name: String },

    #[error("Unable to extract content for {name}: failed to create file")]
    Create {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to extract content for {name}: failed to write to file")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to extract content for {name}: failed to create directory")]
    CreateDir {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    /// Name of the entry that failed.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::UnsafePath { name }
            | Self::Create { name, .. }
            | Self::Write { name, .. }
            | Self::CreateDir { name, .. } => name,
        }
    }
}
