/*
MIT License

Copyright (c) 2021 Philipp Schuster

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
//! Library to read Tar archives in the strict USTAR format.
//!
//! An archive is a sequence of 512-byte blocks. Every member starts with a header block
//! followed by its content blocks. This crate walks those blocks from a random-access byte
//! source ([`ByteSource`]), decodes every header field into a printable string
//! ([`TarFormatString`]) and collects the members as [`ArchiveEntry`]s. On top of the decoded
//! entries, it offers listing ([`EntryLister`]) and extraction to the filesystem
//! ([`extract_all`]).
//!
//! The crate is simple and only supports reading of "basic" archives, therefore no extensions,
//! such as GNU Longname, PAX headers, or sparse files. Compressed archives are not supported
//! either; decompress them first.
//!
//! # Example
//! ```rust
//! use std::io::Cursor;
//! use ustar_reader::{decode_archive, list_names};
//!
//! // Two zero blocks form an empty archive.
//! let source = Cursor::new(vec![0_u8; 1024]);
//! let entries = decode_archive(source).unwrap();
//! assert!(list_names(&entries).is_empty());
//! ```

#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

/// Each Archive Entry (either Header or Data Block) is a block of 512 bytes.
pub const BLOCKSIZE: usize = 512;

mod archive;
mod error;
mod extract;
mod header;
mod list;
mod source;
mod tar_format_types;
#[cfg(test)]
mod test_utils;

pub use archive::*;
pub use error::*;
pub use extract::*;
pub use header::*;
pub use list::*;
pub use source::*;
pub use tar_format_types::*;
