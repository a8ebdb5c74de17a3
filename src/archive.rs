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
//! Module for [`TarArchive`] and the block walk that turns a [`ByteSource`] into
//! [`ArchiveEntry`]s.
//!
//! The walk starts at offset zero and repeats: decode the header block, parse its size,
//! read the content span that follows and continue right behind it. It stops at the end of
//! the source or at the first header without a numeric size, which is how the two zero
//! blocks at the end of an archive are recognized.

use crate::header::{decode_header, PosixHeader};
use crate::{ByteSource, Error, Result, TarFormatString, TypeFlag, BLOCKSIZE};
use core::fmt::{Debug, Formatter};
use core::iter::FusedIterator;
use core::num::IntErrorKind;

const BLOCK: u64 = BLOCKSIZE as u64;

/// Policy that maps the size field of a header to the number of bytes that follow as
/// content.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ContentSpan {
    /// Sizes up to one block occupy exactly one block, even empty files. Larger sizes occupy `size % 512` bytes, which
    /// misaligns every following header unless the size is a multiple of 512.
    #[default]
    Legacy,
    /// The content occupies `size` rounded up to the next multiple of 512. Empty files
    /// occupy no block at all. This matches archives written by tar.
    BlockAligned,
}

impl ContentSpan {
    /// Number of bytes after the header that belong to an entry of the given size.
    pub const fn span(self, size: u64) -> u64 {
        match self {
            Self::Legacy => {
                if size > BLOCK {
                    size % BLOCK
                } else {
                    BLOCK
                }
            }
            Self::BlockAligned => size.div_ceil(BLOCK) * BLOCK,
        }
    }
}

/// Options for decoding an archive.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub content_span: ContentSpan,
}

impl DecodeOptions {
    #[must_use]
    pub const fn with_content_span(mut self, content_span: ContentSpan) -> Self {
        self.content_span = content_span;
        self
    }
}

/// Describes an entry in an archive: the decoded header plus its content.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    header: PosixHeader,
    content: TarFormatString,
    offset: u64,
}

impl ArchiveEntry {
    pub const fn new(header: PosixHeader, content: TarFormatString, offset: u64) -> Self {
        Self {
            header,
            content,
            offset,
        }
    }

    /// Name of the entry, exactly as stored in the `name` field.
    pub fn name(&self) -> &str {
        self.header.name.as_str()
    }

    pub const fn header(&self) -> &PosixHeader {
        &self.header
    }

    /// Printable content of the entry.
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Content as bytes, as it is written when extracting.
    pub fn data(&self) -> &[u8] {
        self.content.as_str().as_bytes()
    }

    /// Length of the content in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Absolute offset of the header block in the archive.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    pub fn type_flag(&self) -> Option<TypeFlag> {
        self.header.type_flag().ok()
    }
}

impl Debug for ArchiveEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name())
            .field("offset", &self.offset)
            .field("size", &self.size())
            .field("data", &"<bytes>")
            .finish()
    }
}

/// Wrapper type around a source, which represents an archive.
#[derive(Debug)]
pub struct TarArchive<S> {
    source: S,
    options: DecodeOptions,
}

impl<S: ByteSource> TarArchive<S> {
    /// Interprets the provided source as Tar archive.
    pub fn new(source: S) -> Self {
        Self::with_options(source, DecodeOptions::default())
    }

    pub const fn with_options(source: S, options: DecodeOptions) -> Self {
        Self { source, options }
    }

    /// Walks the archive lazily. Each iteration step starts at the next header.
    ///
    /// # Errors
    /// Fails if the length of the source can't be determined.
    pub fn walk(self) -> Result<ArchiveWalker<S>> {
        ArchiveWalker::new(self.source, self.options)
    }

    /// Decodes all entries of the archive in order.
    ///
    /// # Errors
    /// Fails with the first error of the walk. No partial sequence is returned.
    pub fn entries(self) -> Result<Vec<ArchiveEntry>> {
        self.walk()?.collect()
    }
}

/// Decodes all entries of the archive with the default [`DecodeOptions`].
///
/// # Errors
/// See [`TarArchive::entries`].
pub fn decode_archive<S: ByteSource>(source: S) -> Result<Vec<ArchiveEntry>> {
    TarArchive::new(source).entries()
}

/// Iterator over the entries. Each iteration step starts at the next Tar header.
///
/// After the first error, the iterator is exhausted.
#[derive(Debug)]
pub struct ArchiveWalker<S> {
    source: S,
    options: DecodeOptions,
    offset: u64,
    total_len: u64,
    finished: bool,
}

impl<S: ByteSource> ArchiveWalker<S> {
    /// # Errors
    /// Fails if the length of the source can't be determined.
    pub fn new(mut source: S, options: DecodeOptions) -> Result<Self> {
        let total_len = source.total_len()?;
        Ok(Self {
            source,
            options,
            offset: 0,
            total_len,
            finished: false,
        })
    }

    /// Offset of the next header block.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        if self.offset >= self.total_len {
            log::debug!("Reached end of Tar archive data at offset {}", self.offset);
            return Ok(None);
        }

        let header_offset = self.offset;
        let Some((header, content_offset)) = decode_header(&mut self.source, header_offset)? else {
            log::debug!("Tar archive data ends at offset {header_offset}");
            return Ok(None);
        };

        let Some(size) = parse_size(&header, header_offset)? else {
            // gracefully terminated archive: zero blocks have no size
            log::debug!("End of Tar archive at offset {header_offset}");
            return Ok(None);
        };

        if !header.is_ustar() {
            log::warn!(
                "Entry {:?} at offset {header_offset} has magic {:?} instead of \"ustar\"",
                header.name.as_str(),
                header.magic.as_str()
            );
        }
        match header.type_flag() {
            Ok(TypeFlag::XHDTYPE | TypeFlag::XGLTYPE) => log::warn!(
                "Found extended header at offset {header_offset}, which is read as a plain entry"
            ),
            Err(e) => log::warn!("Entry at offset {header_offset}: {e}"),
            Ok(_) => {}
        }

        let span = self.options.content_span.span(size);
        let width = usize::try_from(span).map_err(|_| Error::EntryTooLarge {
            offset: header_offset,
            span,
        })?;
        let available = self.total_len.saturating_sub(content_offset);
        if span > available {
            return Err(Error::TruncatedRead {
                offset: content_offset,
                expected: width,
                actual: available as usize,
            });
        }

        let mut block = vec![0; width];
        let actual = if width == 0 {
            0
        } else {
            self.source.read_at(content_offset, &mut block)?
        };
        if actual < width {
            return Err(Error::TruncatedRead {
                offset: content_offset,
                expected: width,
                actual,
            });
        }
        let data = match self.options.content_span {
            ContentSpan::Legacy => &block[..],
            ContentSpan::BlockAligned => {
                let len = usize::try_from(size).map_or(width, |size| size.min(width));
                &block[..len]
            }
        };

        self.offset = content_offset + span;
        log::trace!(
            "Decoded {:?} at offset {header_offset}: size={size}, span={span}, next={}",
            header.name.as_str(),
            self.offset
        );

        Ok(Some(ArchiveEntry::new(
            header,
            TarFormatString::from_raw(data),
            header_offset,
        )))
    }
}

/// Parses the size of the header at `offset`. Returns `None` if the size field is empty or
/// not a number, which marks the end of the archive.
fn parse_size(header: &PosixHeader, offset: u64) -> Result<Option<u64>> {
    match header.size() {
        Ok(size) => Ok(Some(size)),
        Err(e) if matches!(e.kind(), IntErrorKind::Empty | IntErrorKind::InvalidDigit) => Ok(None),
        Err(source) => Err(Error::SizeParse {
            offset,
            value: header.size.trimmed().to_owned(),
            source,
        }),
    }
}

impl<S: ByteSource> Iterator for ArchiveWalker<S> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: ByteSource> FusedIterator for ArchiveWalker<S> {}
