//! A zero-copy view over RLP encoded bytes.
//!
//! Unlike the [`rlp`] crate (which we still use for *encoding*), everything
//! here is written with untrusted input in mind. Every offset is validated
//! against the underlying buffer before it is dereferenced, and non-canonical
//! length encodings are rejected instead of being normalized.
//!
//! The kind of an item is determined entirely by its first byte:
//!
//! | first byte    | kind         | encoded length                     |
//! |---------------|--------------|------------------------------------|
//! | `0x00..=0x7f` | single byte  | `1`                                |
//! | `0x80..=0xb7` | short string | `b0 - 0x80 + 1`                    |
//! | `0xb8..=0xbf` | long string  | `1 + N + len`, `N = b0 - 0xb7`     |
//! | `0xc0..=0xf7` | short list   | `b0 - 0xc0 + 1`                    |
//! | `0xf8..=0xff` | long list    | `1 + N + len`, `N = b0 - 0xf7`     |

use std::{
    fmt::{self, Display},
    mem::size_of,
};

use ethereum_types::{H256, U256};
use thiserror::Error;

/// Largest payload a short string or short list can carry.
const MAX_SHORT_PAYLOAD: usize = 55;

/// Stores the result of RLP decoding. Returns a [`RlpError`] upon failure.
pub type RlpResult<T> = Result<T, RlpError>;

/// Errors encountered while decoding an untrusted RLP buffer.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum RlpError {
    /// There is no byte at the offset an item was expected at.
    #[error("Expected an RLP item at offset {offset} but the buffer is only {len} bytes long")]
    EmptyInput {
        /// Offset of the missing item.
        offset: usize,
        /// Length of the buffer.
        len: usize,
    },

    /// The item (or its length prefix) runs past the end of its container.
    #[error("RLP item at offset {offset} needs {needed} bytes but only {available} are available")]
    Truncated {
        /// Offset of the item.
        offset: usize,
        /// Bytes required by the header.
        needed: usize,
        /// Bytes left in the container.
        available: usize,
    },

    /// A long-form length has a leading zero byte or encodes a length that
    /// fits the short form.
    #[error("RLP item at offset {offset} uses a non-canonical length encoding")]
    NonCanonicalLength {
        /// Offset of the item.
        offset: usize,
    },

    /// A single byte below `0x80` wrapped in a one-byte string header.
    #[error("RLP item at offset {offset} wraps a single byte below 0x80 in a string header")]
    NonCanonicalSingleByte {
        /// Offset of the item.
        offset: usize,
    },

    /// The declared length does not fit in a `usize`.
    #[error("RLP item at offset {offset} declares a length that overflows")]
    LengthOverflow {
        /// Offset of the item.
        offset: usize,
    },

    /// Bytes remain after the item that was supposed to span the whole
    /// buffer.
    #[error("RLP item spans {item_len} bytes but the buffer holds {buf_len}")]
    TrailingBytes {
        /// Encoded length of the decoded item.
        item_len: usize,
        /// Length of the buffer.
        buf_len: usize,
    },

    /// The item was a string where a list was required or vice versa.
    #[error("RLP item at offset {offset} is a {found} but a {expected} was required")]
    UnexpectedKind {
        /// Offset of the item.
        offset: usize,
        /// The shape required by the caller.
        expected: RlpShape,
        /// The shape actually found.
        found: RlpShape,
    },

    /// An integer with a leading zero byte.
    #[error("Integer at offset {offset} has a leading zero byte")]
    NonCanonicalInteger {
        /// Offset of the item.
        offset: usize,
    },

    /// An integer that does not fit the requested width.
    #[error("Integer at offset {offset} is {len} bytes long, more than the {max} allowed")]
    IntegerTooLarge {
        /// Offset of the item.
        offset: usize,
        /// Payload length of the item.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },

    /// A fixed-width string had the wrong payload length.
    #[error("String at offset {offset} is {found} bytes long (expected {expected})")]
    UnexpectedLength {
        /// Offset of the item.
        offset: usize,
        /// Required payload length.
        expected: usize,
        /// Actual payload length.
        found: usize,
    },
}

/// The encoding class of an item, derived from its first byte.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RlpKind {
    /// A byte in `0x00..=0x7f` that is its own encoding.
    SingleByte,

    /// A string with a payload of at most 55 bytes.
    ShortString,

    /// A string with a payload longer than 55 bytes.
    LongString,

    /// A list with a payload of at most 55 bytes.
    ShortList,

    /// A list with a payload longer than 55 bytes.
    LongList,
}

impl RlpKind {
    /// Classifies an item by its first byte.
    pub const fn from_first_byte(b: u8) -> Self {
        match b {
            0x00..=0x7f => Self::SingleByte,
            0x80..=0xb7 => Self::ShortString,
            0xb8..=0xbf => Self::LongString,
            0xc0..=0xf7 => Self::ShortList,
            0xf8..=0xff => Self::LongList,
        }
    }

    /// Returns the coarse shape (string or list) of this kind.
    pub const fn shape(&self) -> RlpShape {
        match self {
            Self::SingleByte | Self::ShortString | Self::LongString => RlpShape::String,
            Self::ShortList | Self::LongList => RlpShape::List,
        }
    }
}

/// Whether an item is a byte string or a list.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RlpShape {
    /// Byte string.
    String,

    /// List of items.
    List,
}

impl Display for RlpShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlpShape::String => write!(f, "string"),
            RlpShape::List => write!(f, "list"),
        }
    }
}

/// Returns the total encoded length (header + payload) of the item starting
/// at `offset`.
///
/// The returned length is guaranteed to fit inside `buf`.
pub fn item_length(buf: &[u8], offset: usize) -> RlpResult<usize> {
    RlpItem::decode(buf, offset).map(|item| item.encoded_len())
}

/// A bounds-checked view of a single RLP item inside a larger buffer.
///
/// Constructing an `RlpItem` validates that the whole item (header and
/// payload) lies inside the buffer, so the accessors never need to re-check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RlpItem<'a> {
    buf: &'a [u8],
    offset: usize,
    header_len: usize,
    payload_len: usize,
    kind: RlpKind,
}

impl<'a> RlpItem<'a> {
    /// Decodes the header of the item at `offset`.
    pub fn decode(buf: &'a [u8], offset: usize) -> RlpResult<Self> {
        let b0 = *buf.get(offset).ok_or(RlpError::EmptyInput {
            offset,
            len: buf.len(),
        })?;
        let kind = RlpKind::from_first_byte(b0);

        let (header_len, payload_len) = match kind {
            RlpKind::SingleByte => (0, 1),
            RlpKind::ShortString => (1, (b0 - 0x80) as usize),
            RlpKind::ShortList => (1, (b0 - 0xc0) as usize),
            RlpKind::LongString => read_long_length(buf, offset, b0 - 0xb7)?,
            RlpKind::LongList => read_long_length(buf, offset, b0 - 0xf7)?,
        };

        let end = offset
            .checked_add(header_len)
            .and_then(|v| v.checked_add(payload_len))
            .ok_or(RlpError::LengthOverflow { offset })?;

        if end > buf.len() {
            return Err(RlpError::Truncated {
                offset,
                needed: end - offset,
                available: buf.len() - offset,
            });
        }

        if kind == RlpKind::ShortString && payload_len == 1 && buf[offset + 1] < 0x80 {
            return Err(RlpError::NonCanonicalSingleByte { offset });
        }

        Ok(Self {
            buf,
            offset,
            header_len,
            payload_len,
            kind,
        })
    }

    /// Decodes the item at the start of `buf` and requires that it spans the
    /// entire buffer.
    pub fn decode_exact(buf: &'a [u8]) -> RlpResult<Self> {
        let item = Self::decode(buf, 0)?;

        match item.encoded_len() == buf.len() {
            false => Err(RlpError::TrailingBytes {
                item_len: item.encoded_len(),
                buf_len: buf.len(),
            }),
            true => Ok(item),
        }
    }

    /// Offset of the first header byte inside the underlying buffer.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// The encoding class of this item.
    pub const fn kind(&self) -> RlpKind {
        self.kind
    }

    /// Number of header bytes (zero for a single byte item).
    pub const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Number of payload bytes.
    pub const fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Header plus payload length.
    pub const fn encoded_len(&self) -> usize {
        self.header_len + self.payload_len
    }

    /// Offset one past the last byte of this item.
    pub const fn end(&self) -> usize {
        self.offset + self.encoded_len()
    }

    /// The first byte of the encoding.
    pub fn first_byte(&self) -> u8 {
        self.buf[self.offset]
    }

    /// Whether this item is a list.
    pub const fn is_list(&self) -> bool {
        matches!(self.kind.shape(), RlpShape::List)
    }

    /// The payload region (excluding the header).
    pub fn payload(&self) -> &'a [u8] {
        &self.buf[self.offset + self.header_len..self.end()]
    }

    /// The full encoding of this item, header included.
    pub fn encoded(&self) -> &'a [u8] {
        &self.buf[self.offset..self.end()]
    }

    /// Returns the payload of a string item.
    pub fn as_bytes(&self) -> RlpResult<&'a [u8]> {
        self.expect_shape(RlpShape::String)?;
        Ok(self.payload())
    }

    /// Returns the payload of a string item interpreted as a canonical big
    /// endian integer of at most `max_len` bytes.
    pub fn as_uint_bytes(&self, max_len: usize) -> RlpResult<&'a [u8]> {
        let bytes = self.as_bytes()?;

        if bytes.len() > max_len {
            return Err(RlpError::IntegerTooLarge {
                offset: self.offset,
                len: bytes.len(),
                max: max_len,
            });
        }

        if bytes.first() == Some(&0) {
            return Err(RlpError::NonCanonicalInteger {
                offset: self.offset,
            });
        }

        Ok(bytes)
    }

    /// Decodes a string item as a `U256`.
    pub fn as_u256(&self) -> RlpResult<U256> {
        self.as_uint_bytes(32).map(U256::from_big_endian)
    }

    /// Decodes a string item as a `u64`.
    pub fn as_u64(&self) -> RlpResult<u64> {
        let bytes = self.as_uint_bytes(size_of::<u64>())?;
        Ok(bytes.iter().fold(0, |acc, b| (acc << 8) | *b as u64))
    }

    /// Decodes a string item that must hold exactly 32 bytes.
    pub fn as_h256(&self) -> RlpResult<H256> {
        let bytes = self.as_bytes()?;

        match bytes.len() {
            32 => Ok(H256::from_slice(bytes)),
            found => Err(RlpError::UnexpectedLength {
                offset: self.offset,
                expected: 32,
                found,
            }),
        }
    }

    /// Returns an iterator over the children of a list item.
    pub fn list_items(&self) -> RlpResult<RlpListIter<'a>> {
        self.expect_shape(RlpShape::List)?;

        let start = self.offset + self.header_len;
        Ok(RlpListIter {
            buf: self.buf,
            pos: start,
            end: self.end(),
        })
    }

    /// Counts the children of a list item by scanning it.
    pub fn item_count(&self) -> RlpResult<usize> {
        self.list_items()?
            .try_fold(0, |count, item| item.map(|_| count + 1))
    }

    fn expect_shape(&self, expected: RlpShape) -> RlpResult<()> {
        let found = self.kind.shape();
        match found == expected {
            false => Err(RlpError::UnexpectedKind {
                offset: self.offset,
                expected,
                found,
            }),
            true => Ok(()),
        }
    }
}

/// Iterator over the direct children of a list item.
///
/// Each child is checked to end inside the parent's payload. After the first
/// error the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct RlpListIter<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Iterator for RlpListIter<'a> {
    type Item = RlpResult<RlpItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }

        // Restricting the buffer to the parent's payload keeps children from
        // being validated against bytes that belong to a sibling of the parent.
        let res = RlpItem::decode(&self.buf[..self.end], self.pos).map(|item| RlpItem {
            buf: self.buf,
            ..item
        });

        match &res {
            Ok(item) => self.pos = item.end(),
            Err(_) => self.pos = self.end,
        }

        Some(res)
    }
}

fn read_long_length(buf: &[u8], offset: usize, len_of_len: u8) -> RlpResult<(usize, usize)> {
    let len_of_len = len_of_len as usize;
    let start = offset + 1;

    let len_bytes = buf
        .get(start..start + len_of_len)
        .ok_or(RlpError::Truncated {
            offset,
            needed: 1 + len_of_len,
            available: buf.len() - offset,
        })?;

    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonicalLength { offset });
    }

    if len_of_len > size_of::<usize>() {
        return Err(RlpError::LengthOverflow { offset });
    }

    let payload_len = len_bytes
        .iter()
        .fold(0_usize, |acc, b| (acc << 8) | *b as usize);

    if payload_len <= MAX_SHORT_PAYLOAD {
        return Err(RlpError::NonCanonicalLength { offset });
    }

    Ok((1 + len_of_len, payload_len))
}
