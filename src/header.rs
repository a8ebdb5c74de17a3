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
//! USTAR header definition taken from <https://www.gnu.org/software/tar/manual/html_node/Standard.html>.
//! A Tar-archive is a collection of 512-byte sized blocks. Unfortunately there are several
//! TAR-like archive specifications. An Overview can be found here:
//! <https://www.gnu.org/software/tar/manual/html_node/Formats.html#Formats>
//!
//! This library focuses on the strict POSIX USTAR format. Every header field is read through
//! [`decode_field`], in the order of [`HEADER_LAYOUT`], and kept as a [`TarFormatString`].

#![allow(non_upper_case_globals)]

use crate::{ByteSource, Error, Result, TarFormatString, BLOCKSIZE};
use core::fmt::{Display, Formatter};
use core::num::ParseIntError;

/// Width of the `name` and `linkname` fields.
pub const NAME_LEN: usize = 100;
/// Width of the `prefix` field.
pub const PREFIX_LEN: usize = 155;
/// Unused bytes after the last field that complete a header to [`BLOCKSIZE`].
pub const RESERVED_PAD: usize = 12;

/// The fields of a USTAR header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Name,
    Mode,
    Uid,
    Gid,
    Size,
    Mtime,
    Checksum,
    TypeFlag,
    LinkName,
    Magic,
    Version,
    UName,
    GName,
    DevMajor,
    DevMinor,
    Prefix,
}

/// The fields of a header in the order they are stored. Offsets are derived from this order.
pub const HEADER_LAYOUT: [HeaderField; 16] = [
    HeaderField::Name,
    HeaderField::Mode,
    HeaderField::Uid,
    HeaderField::Gid,
    HeaderField::Size,
    HeaderField::Mtime,
    HeaderField::Checksum,
    HeaderField::TypeFlag,
    HeaderField::LinkName,
    HeaderField::Magic,
    HeaderField::Version,
    HeaderField::UName,
    HeaderField::GName,
    HeaderField::DevMajor,
    HeaderField::DevMinor,
    HeaderField::Prefix,
];

const _: () = assert!(HeaderField::Prefix.offset() + PREFIX_LEN + RESERVED_PAD == BLOCKSIZE);

impl HeaderField {
    /// Width of the field in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Name | Self::LinkName => NAME_LEN,
            Self::Mode | Self::Uid | Self::Gid | Self::Checksum => 8,
            Self::DevMajor | Self::DevMinor => 8,
            Self::Size | Self::Mtime => 12,
            Self::TypeFlag => 1,
            Self::Magic => 6,
            Self::Version => 2,
            Self::UName | Self::GName => 32,
            Self::Prefix => PREFIX_LEN,
        }
    }

    /// Offset of the field relative to the start of the header block.
    pub const fn offset(self) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < HEADER_LAYOUT.len() {
            if HEADER_LAYOUT[i] as u8 == self as u8 {
                break;
            }
            offset += HEADER_LAYOUT[i].width();
            i += 1;
        }
        offset
    }
}

/// Errors that may happen when parsing the [`ModeFlags`].
#[derive(Debug, PartialEq, Eq)]
pub enum ModeError {
    ParseInt(ParseIntError),
    IllegalMode,
}

/// Header of the USTAR format as specified by POSIX (POSIX 1003.1-1988).
///
/// Each file is started by such a header, that describes the size and
/// the file name. After that, the file content stands in chunks of 512 bytes.
///
/// All fields hold the printable characters of their byte window, see
/// [`TarFormatString`]. Numeric fields are octal and parsed on demand. No checksum
/// verification and no magic enforcement happen while decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosixHeader {
    pub name: TarFormatString,
    pub mode: TarFormatString,
    pub uid: TarFormatString,
    pub gid: TarFormatString,
    // confusing; size is stored as ASCII string
    pub size: TarFormatString,
    pub mtime: TarFormatString,
    pub cksum: TarFormatString,
    pub typeflag: TarFormatString,
    pub linkname: TarFormatString,
    pub magic: TarFormatString,
    pub version: TarFormatString,
    pub uname: TarFormatString,
    pub gname: TarFormatString,
    pub dev_major: TarFormatString,
    pub dev_minor: TarFormatString,
    pub prefix: TarFormatString,
}

impl PosixHeader {
    /// Returns the value of the given field.
    pub const fn field(&self, field: HeaderField) -> &TarFormatString {
        match field {
            HeaderField::Name => &self.name,
            HeaderField::Mode => &self.mode,
            HeaderField::Uid => &self.uid,
            HeaderField::Gid => &self.gid,
            HeaderField::Size => &self.size,
            HeaderField::Mtime => &self.mtime,
            HeaderField::Checksum => &self.cksum,
            HeaderField::TypeFlag => &self.typeflag,
            HeaderField::LinkName => &self.linkname,
            HeaderField::Magic => &self.magic,
            HeaderField::Version => &self.version,
            HeaderField::UName => &self.uname,
            HeaderField::GName => &self.gname,
            HeaderField::DevMajor => &self.dev_major,
            HeaderField::DevMinor => &self.dev_minor,
            HeaderField::Prefix => &self.prefix,
        }
    }

    fn field_mut(&mut self, field: HeaderField) -> &mut TarFormatString {
        match field {
            HeaderField::Name => &mut self.name,
            HeaderField::Mode => &mut self.mode,
            HeaderField::Uid => &mut self.uid,
            HeaderField::Gid => &mut self.gid,
            HeaderField::Size => &mut self.size,
            HeaderField::Mtime => &mut self.mtime,
            HeaderField::Checksum => &mut self.cksum,
            HeaderField::TypeFlag => &mut self.typeflag,
            HeaderField::LinkName => &mut self.linkname,
            HeaderField::Magic => &mut self.magic,
            HeaderField::Version => &mut self.version,
            HeaderField::UName => &mut self.uname,
            HeaderField::GName => &mut self.gname,
            HeaderField::DevMajor => &mut self.dev_major,
            HeaderField::DevMinor => &mut self.dev_minor,
            HeaderField::Prefix => &mut self.prefix,
        }
    }

    /// Content length in bytes as stored in the header.
    ///
    /// # Errors
    /// Fails if the field is empty or not an octal number.
    pub fn size(&self) -> core::result::Result<u64, ParseIntError> {
        self.size.as_octal()
    }

    pub fn uid(&self) -> core::result::Result<u32, ParseIntError> {
        self.uid.as_octal()
    }

    pub fn gid(&self) -> core::result::Result<u32, ParseIntError> {
        self.gid.as_octal()
    }

    /// Modification time in seconds since the UNIX epoch.
    pub fn mtime(&self) -> core::result::Result<u64, ParseIntError> {
        self.mtime.as_octal()
    }

    pub fn checksum(&self) -> core::result::Result<u32, ParseIntError> {
        self.cksum.as_octal()
    }

    /// Parses the [`ModeFlags`] from the mode string.
    pub fn mode_flags(&self) -> core::result::Result<ModeFlags, ModeError> {
        let bits = self.mode.as_octal::<u64>().map_err(ModeError::ParseInt)?;
        ModeFlags::from_bits(bits).ok_or(ModeError::IllegalMode)
    }

    /// Tries to parse the type flag. This fails if the archive is corrupt and the type is
    /// invalid.
    pub fn type_flag(&self) -> core::result::Result<TypeFlag, InvalidTypeFlagError> {
        TypeFlag::try_from(&self.typeflag)
    }

    /// Whether the magic field identifies a USTAR header.
    pub fn is_ustar(&self) -> bool {
        self.magic.as_str().contains("ustar")
    }

    /// The full member path: `prefix` and `name` joined by a slash, or only `name` if there
    /// is no prefix.
    pub fn path(&self) -> String {
        if self.prefix.is_empty() {
            self.name.as_str().to_owned()
        } else {
            format!("{}/{}", self.prefix, self.name)
        }
    }
}

/// Reads the `width` bytes at `offset` and decodes them as [`TarFormatString`]. Returns the
/// value and the offset right after the field.
///
/// Returns `None` if the source has no bytes left at `offset`, which signals the end of the
/// source to the caller.
///
/// # Errors
/// Fails with [`Error::TruncatedRead`] if some but fewer than `width` bytes are available, or
/// with [`Error::Io`] if the source fails.
pub fn decode_field<S: ByteSource + ?Sized>(
    source: &mut S,
    width: usize,
    offset: u64,
) -> Result<Option<(TarFormatString, u64)>> {
    if width == 0 {
        return Ok(Some((TarFormatString::default(), offset)));
    }
    let mut buf = vec![0; width];
    match source.read_at(offset, &mut buf)? {
        0 => Ok(None),
        actual if actual < width => Err(Error::TruncatedRead {
            offset,
            expected: width,
            actual,
        }),
        _ => Ok(Some((TarFormatString::from_raw(&buf), offset + width as u64))),
    }
}

/// Decodes the header block starting at `offset`. Returns the header and the offset of the
/// next block.
///
/// Returns `None` if the source ends right at `offset`, i.e. before the first field.
///
/// # Errors
/// Fails with [`Error::TruncatedRead`] if the source ends within the header.
pub fn decode_header<S: ByteSource + ?Sized>(
    source: &mut S,
    offset: u64,
) -> Result<Option<(PosixHeader, u64)>> {
    let mut header = PosixHeader::default();
    let mut cursor = offset;
    for (index, field) in HEADER_LAYOUT.into_iter().enumerate() {
        match decode_field(source, field.width(), cursor)? {
            Some((value, next)) => {
                *header.field_mut(field) = value;
                cursor = next;
            }
            None if index == 0 => return Ok(None),
            None => {
                return Err(Error::TruncatedRead {
                    offset: cursor,
                    expected: field.width(),
                    actual: 0,
                })
            }
        }
    }
    Ok(Some((header, cursor + RESERVED_PAD as u64)))
}

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
pub struct InvalidTypeFlagError(char);

impl Display for InvalidTypeFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} is not a valid TypeFlag", self.0)
    }
}

impl std::error::Error for InvalidTypeFlagError {}

/// Describes the kind of payload, that follows after a
/// [`PosixHeader`]. The properties of this payload are
/// described inside the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
#[allow(unused)]
pub enum TypeFlag {
    /// Represents a regular file. In order to be compatible with older versions of tar, a typeflag
    /// value of AREGTYPE should be silently recognized as a regular file. New archives should be
    /// created using REGTYPE.
    REGTYPE = b'0',
    /// Legacy regular file. The NUL byte is filtered while decoding, so an empty type flag
    /// field maps to this value.
    AREGTYPE = b'\0',
    /// This flag represents a file linked to another file, of any type, previously archived.
    /// The linked-to name is specified in the linkname field.
    LINK = b'1',
    /// This represents a symbolic link to another file. The linked-to name is specified in the
    /// linkname field.
    SYMTYPE = b'2',
    /// Character special file. The devmajor and devminor fields contain the device numbers.
    CHRTYPE = b'3',
    /// Block special file. The devmajor and devminor fields contain the device numbers.
    BLKTYPE = b'4',
    /// This flag specifies a directory or sub-directory. The directory name in the name field
    /// should end with a slash.
    DIRTYPE = b'5',
    /// This specifies a FIFO special file. Note that the archiving of a FIFO file archives the
    /// existence of this file and not its contents.
    FIFOTYPE = b'6',
    /// This specifies a contiguous file, which is the same as a normal file except that, in
    /// operating systems which support it, all its space is allocated contiguously on the disk.
    CONTTYPE = b'7',
    /// Extended header referring to the next file in the archive. Not supported.
    XHDTYPE = b'x',
    /// Global extended header. Not supported.
    XGLTYPE = b'g',
}

impl TypeFlag {
    /// Whether we have a regular file.
    pub fn is_regular_file(self) -> bool {
        // contiguous files are regular files on every platform we write to
        self == Self::AREGTYPE || self == Self::REGTYPE || self == Self::CONTTYPE
    }

    pub fn is_directory(self) -> bool {
        self == Self::DIRTYPE
    }
}

impl TryFrom<&TarFormatString> for TypeFlag {
    type Error = InvalidTypeFlagError;

    fn try_from(value: &TarFormatString) -> core::result::Result<Self, Self::Error> {
        match value.as_str().chars().next().unwrap_or('\0') {
            '0' => Ok(Self::REGTYPE),
            '\0' => Ok(Self::AREGTYPE),
            '1' => Ok(Self::LINK),
            '2' => Ok(Self::SYMTYPE),
            '3' => Ok(Self::CHRTYPE),
            '4' => Ok(Self::BLKTYPE),
            '5' => Ok(Self::DIRTYPE),
            '6' => Ok(Self::FIFOTYPE),
            '7' => Ok(Self::CONTTYPE),
            'x' => Ok(Self::XHDTYPE),
            'g' => Ok(Self::XGLTYPE),
            e => Err(InvalidTypeFlagError(e)),
        }
    }
}

bitflags::bitflags! {
    /// UNIX file permissions in octal format.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u64 {
        /// Set UID on execution.
        const SetUID = 0o4000;
        /// Set GID on execution.
        const SetGID = 0o2000;
        /// Reserved.
        const TSVTX = 0o1000;
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others write.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}
