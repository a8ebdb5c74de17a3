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
//! Helpers to assemble archives byte by byte in tests.

use crate::{HeaderField, BLOCKSIZE};
use std::io::Cursor;

/// Appends raw blocks to an in-memory archive.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    bytes: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a USTAR header block with the given raw size field.
    pub fn header(mut self, name: &str, size_field: &str, typeflag: u8) -> Self {
        let mut block = [0_u8; BLOCKSIZE];
        put(&mut block, HeaderField::Name, name.as_bytes());
        put(&mut block, HeaderField::Mode, b"0000644");
        put(&mut block, HeaderField::Uid, b"0001750");
        put(&mut block, HeaderField::Gid, b"0001750");
        put(&mut block, HeaderField::Size, size_field.as_bytes());
        put(&mut block, HeaderField::Mtime, b"14524770400");
        put(&mut block, HeaderField::TypeFlag, &[typeflag]);
        put(&mut block, HeaderField::Magic, b"ustar\0");
        put(&mut block, HeaderField::Version, b"00");
        put(&mut block, HeaderField::UName, b"user");
        put(&mut block, HeaderField::GName, b"user");

        put(&mut block, HeaderField::Checksum, b"        ");
        let checksum: u32 = block.iter().map(|b| u32::from(*b)).sum();
        put(&mut block, HeaderField::Checksum, format!("{checksum:06o}\0 ").as_bytes());

        self.bytes.extend_from_slice(&block);
        self
    }

    /// Appends a regular file the way tar writes it: the header and the content padded to
    /// full blocks.
    pub fn file(self, name: &str, content: &[u8]) -> Self {
        self.header(name, &format!("{:011o}", content.len()), b'0')
            .padded(content)
    }

    /// Appends the bytes, padded with zeroes to the next block boundary.
    pub fn padded(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        let blocks = bytes.len().div_ceil(BLOCKSIZE);
        self.bytes.resize(self.bytes.len() + blocks * BLOCKSIZE - bytes.len(), 0);
        self
    }

    /// Appends the bytes without any padding.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Appends the end-of-archive marker.
    pub fn finish(self) -> Self {
        self.raw(&[0; 2 * BLOCKSIZE])
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn cursor(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.bytes)
    }
}

fn put(block: &mut [u8; BLOCKSIZE], field: HeaderField, value: &[u8]) {
    assert!(value.len() <= field.width(), "{field:?} too long");
    let start = field.offset();
    block[start..start + value.len()].copy_from_slice(value);
}
