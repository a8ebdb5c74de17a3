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
//! Module for [`TarFormatString`], the decoded representation of every header field and of
//! the entry content.

use core::fmt::{Debug, Display, Formatter};

/// Returns whether a character survives the printable filter. Spaces are kept, every other
/// whitespace (newlines, tabs) and all control characters (including NUL) are dropped.
#[must_use]
pub fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace())
}

/// A field value decoded from a raw byte window of the archive.
///
/// The decode is lossy: invalid UTF-8 sequences become `U+FFFD` and every non-printable
/// character (see [`is_printable`]) is stripped, not escaped. NUL padding therefore vanishes
/// and the value has no fixed width anymore.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TarFormatString(String);

impl TarFormatString {
    /// Decodes the raw bytes of a field.
    #[must_use]
    pub fn from_raw(bytes: &[u8]) -> Self {
        let decoded = String::from_utf8_lossy(bytes);
        Self(decoded.chars().filter(|c| is_printable(*c)).collect())
    }

    /// True if nothing printable was left after filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the filtered value in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value without leading and trailing spaces. Numeric fields are often padded with
    /// spaces by ustar implementations, which prevents the proper parsing as number.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        self.0.trim()
    }

    /// Interprets the trimmed value as a number of the specified type using the given radix.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty or cannot be parsed as a number of the specified
    /// type and radix.
    pub fn as_number<T>(&self, radix: u32) -> Result<T, T::FromStrRadixErr>
    where
        T: num_traits::Num,
    {
        T::from_str_radix(self.trimmed(), radix)
    }

    /// Wrapper around [`Self::as_number`] for the octal encoding used by all numeric
    /// header fields.
    ///
    /// # Errors
    ///
    /// See [`Self::as_number`].
    pub fn as_octal<T>(&self) -> Result<T, T::FromStrRadixErr>
    where
        T: num_traits::Num,
    {
        self.as_number(8)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for TarFormatString {
    fn from(value: &str) -> Self {
        Self::from_raw(value.as_bytes())
    }
}

impl AsRef<str> for TarFormatString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for TarFormatString {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for TarFormatString {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "str={:?},len={}", self.0, self.0.len())
    }
}
