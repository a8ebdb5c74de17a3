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
//! Listing the names of archive entries.
//!
//! There are two algorithms behind the [`EntryLister`] capability, picked by the kind of input:
//! - a seekable source is fully decoded by the archive walk ([`TarArchive`]), the listing
//!   yields the exact `name` field of every entry;
//! - a non-seekable stream is read line by line ([`StreamLister`]). This is a heuristic: it
//!   checks the `ustar` magic once and derives one name per line of input, without decoding
//!   any header. Its output only resembles entry names for archives whose lines happen to
//!   line up with the headers.

use crate::{ArchiveEntry, ByteSource, Error, HeaderField, Result, TarArchive};
use std::io::BufRead;

/// Suffix that is cut from the first word of every line by [`StreamLister`].
const NAME_SUFFIX_LEN: usize = 6;

/// Capability to list the entry names of an archive.
pub trait EntryLister {
    /// Names in archive order.
    ///
    /// # Errors
    /// Fails if the input is not an archive or could not be read. Nothing is returned then.
    fn list_names(self) -> Result<Vec<String>>;
}

/// The `name` field of each entry in decode order.
pub fn list_names(entries: &[ArchiveEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.name().to_owned()).collect()
}

impl<S: ByteSource> EntryLister for TarArchive<S> {
    fn list_names(self) -> Result<Vec<String>> {
        Ok(list_names(&self.entries()?))
    }
}

/// Line oriented lister for input without random access, such as a pipe.
#[derive(Debug)]
pub struct StreamLister<R> {
    reader: R,
}

impl<R: BufRead> StreamLister<R> {
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> EntryLister for StreamLister<R> {
    fn list_names(self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut validated = false;
        for line in self.reader.split(b'\n') {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !validated {
                validate_magic(&line)?;
                validated = true;
            }
            names.push(derive_name(&line));
        }
        Ok(names)
    }
}

/// Checks that the bytes at the position of the `magic` field contain `ustar`.
///
/// # Errors
/// Fails with [`Error::Format`] if the bytes are missing or don't contain the magic.
pub fn validate_magic(bytes: &[u8]) -> Result<()> {
    let start = HeaderField::Magic.offset();
    let window = bytes
        .get(start..start + HeaderField::Magic.width())
        .ok_or(Error::Format)?;
    memchr::memmem::find(window, b"ustar")
        .map(|_| ())
        .ok_or(Error::Format)
}

/// The first word of the line without its last six bytes. Shorter words yield an empty name.
fn derive_name(line: &[u8]) -> String {
    let word = &line[..memchr::memchr(b' ', line).unwrap_or(line.len())];
    let name = &word[..word.len().saturating_sub(NAME_SUFFIX_LEN)];
    String::from_utf8_lossy(name).into_owned()
}

/// Input of a listing. Selects the algorithm by the kind of source.
#[derive(Debug)]
pub enum ListSource<S, R> {
    Seekable(TarArchive<S>),
    Stream(StreamLister<R>),
}

impl<S: ByteSource, R: BufRead> EntryLister for ListSource<S, R> {
    fn list_names(self) -> Result<Vec<String>> {
        match self {
            Self::Seekable(archive) => archive.list_names(),
            Self::Stream(lister) => lister.list_names(),
        }
    }
}
