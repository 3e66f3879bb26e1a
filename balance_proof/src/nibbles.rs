//! Define [`Nibbles`], the hex-prefix ("compact") encoding of partial paths,
//! and [`TriePath`], the 256-bit key consumed while walking a proof.

use std::fmt::{self, Debug, Display, LowerHex};

use bytes::{Bytes, BytesMut};
use ethereum_types::{Address, H256, U512};
use thiserror::Error;

use crate::utils::{create_mask_of_1s, hash_bytes, is_even};

// Use a whole byte for a Nibble just for convenience
/// A Nibble has 4 bits and is stored as `u8`.
pub type Nibble = u8;

/// The maximum number of nibbles in a key of the account trie.
pub const MAX_NIBBLES: usize = 64;

/// Number of bytes used when writing the packed representation out.
const PACKED_BYTES: usize = 64;

const MULTIPLE_NIBBLES_APPEND_ASSERT_ERR_MSG: &str =
    "Attempted to create a nibbles sequence longer than 64!";
const SINGLE_NIBBLE_APPEND_ASSERT_ERR_MSG: &str =
    "Attempted to append a single nibble that was greater than 15!";

#[derive(Clone, Debug, Eq, Error, PartialEq, Hash)]
/// Errors encountered when converting a hex prefix encoding to nibbles.
pub enum HexPrefixError {
    #[error("Tried to convert an empty byte string into a hex prefix path")]
    /// There is not even a flag byte.
    Empty,

    #[error("Tried to convert a hex prefix byte string into `Nibbles` with invalid flags at the start: {0:#06b}")]
    /// The hex prefix encoding flag is invalid.
    InvalidFlags(Nibble),

    #[error("Hex prefix path of even length has a non-zero padding nibble: {0:#x}")]
    /// The nibble following an even flag must be zero.
    NonZeroPadding(Nibble),

    #[error("Tried to convert a hex prefix byte string into `Nibbles` that holds more than 64 nibbles: (bytes: {0}, nibbles: {1})")]
    /// The hex prefix encoding is too large.
    TooLong(String, usize),
}

#[derive(Copy, Clone, Default, Eq, Hash, PartialEq)]
/// A sequence of up to 64 nibbles.
///
/// The nibbles are packed into the least significant `4 * count` bits of
/// `packed`; the first nibble of the sequence is the most significant one.
/// Leading `0` nibbles are part of the sequence, so `0x0123` and `0x123` are
/// different values.
pub struct Nibbles {
    /// The number of nibbles in this sequence.
    pub count: usize,
    /// A packed encoding of these nibbles. Only the first (least significant)
    /// `4 * count` bits are used. The rest are unused and should be zero.
    pub packed: U512,
}

impl Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // By default, just use lower hex.
        <Self as LowerHex>::fmt(self, f)
    }
}

// Manual impl in order to print `packed` nicely.
impl Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nibbles")
            .field("count", &self.count)
            .field("packed", &format!("{self:x}"))
            .finish()
    }
}

impl LowerHex for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut byte_buf = [0; PACKED_BYTES];
        self.packed.to_big_endian(&mut byte_buf);

        let hex_string_raw = hex::encode(&byte_buf[(PACKED_BYTES - self.min_bytes())..]);

        // An odd count leaves a zero high nibble in the first byte.
        let skip = match is_even(self.count) {
            false => 1,
            true => 0,
        };

        write!(f, "0x{}", &hex_string_raw[skip..])
    }
}

impl From<H256> for Nibbles {
    fn from(v: H256) -> Self {
        Self::from_h256_be(v)
    }
}

impl Nibbles {
    /// Creates `Nibbles` from a big endian `H256`.
    pub fn from_h256_be(v: H256) -> Self {
        Self {
            count: MAX_NIBBLES,
            packed: U512::from_big_endian(v.as_bytes()),
        }
    }

    /// Creates `Nibbles` from big endian bytes. Every byte contributes two
    /// nibbles.
    ///
    /// # Panics
    /// Panics if more than `32` bytes are passed.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        assert!(
            bytes.len() * 2 <= MAX_NIBBLES,
            "{}",
            MULTIPLE_NIBBLES_APPEND_ASSERT_ERR_MSG
        );

        Self {
            count: bytes.len() * 2,
            packed: U512::from_big_endian(bytes),
        }
    }

    /// Gets the nth proceeding nibble. The front `Nibble` is at idx `0`.
    ///
    /// # Panics
    /// Panics if `idx` is out of range.
    pub fn get_nibble(&self, idx: usize) -> Nibble {
        let nib_idx = self.count - idx - 1;
        let byte = self.packed.byte(nib_idx / 2);

        match is_even(nib_idx) {
            false => (byte & 0b11110000) >> 4,
            true => byte & 0b00001111,
        }
    }

    /// Gets the nibbles at the range specified, where `0` is the next nibble.
    ///
    /// # Panics
    /// Panics if `range.end` is outside of the current `Nibbles`.
    pub fn get_nibble_range(&self, range: std::ops::Range<usize>) -> Nibbles {
        let range_count = range.end - range.start;

        let shift_amt = (self.count - range.end) * 4;
        let mask = create_mask_of_1s(range_count * 4) << shift_amt;
        let range_packed = (self.packed & mask) >> shift_amt;

        Self {
            count: range_count,
            packed: range_packed,
        }
    }

    /// Drops the next `n` proceeding nibbles without mutation.
    ///
    /// If we truncate more nibbles that there are, we will just return the
    /// `empty` nibble.
    pub fn truncate_n_nibbles_front(&self, n: usize) -> Nibbles {
        let n = n.min(self.count);
        self.get_nibble_range(n..self.count)
    }

    /// Pushes a nibble to the back.
    ///
    /// # Panics
    /// Panics if appending the `Nibble` causes an overflow (total nibbles >
    /// 64).
    pub fn push_nibble_back(&mut self, n: Nibble) {
        assert!(
            self.count < MAX_NIBBLES,
            "{}",
            MULTIPLE_NIBBLES_APPEND_ASSERT_ERR_MSG
        );
        assert!(n < 16, "{}", SINGLE_NIBBLE_APPEND_ASSERT_ERR_MSG);

        self.count += 1;
        self.packed = (self.packed << 4) | U512::from(n);
    }

    /// Returns whether or not this `Nibbles` contains actual nibbles. (If
    /// `count` is set to `0`)
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of leading nibbles both sequences share.
    pub fn common_prefix_len(&self, other: &Nibbles) -> usize {
        let smaller_count = self.count.min(other.count);
        (0..smaller_count)
            .find(|i| self.get_nibble(*i) != other.get_nibble(*i))
            .unwrap_or(smaller_count)
    }

    /// Returns the minimum number of bytes needed to represent these `Nibbles`.
    pub const fn min_bytes(&self) -> usize {
        (self.count + 1) / 2
    }

    /// Converts [`Nibbles`] to hex-prefix encoding (AKA "compact").
    /// This prepends an extra nibble which encodes if the path is even and if
    /// it ends in a leaf (terminator) or not.
    pub fn to_hex_prefix_encoding(&self, is_leaf: bool) -> Bytes {
        let num_nibbles = self.count + 1;
        let num_bytes = (num_nibbles + 1) / 2;
        let flag_byte_idx = PACKED_BYTES + 1 - num_bytes;

        // Needed because `to_big_endian` always writes the full width.
        let mut bytes = BytesMut::zeroed(PACKED_BYTES + 1);

        let odd_bit = match is_even(self.count) {
            false => 1,
            true => 0,
        };

        let term_bit = match is_leaf {
            false => 0,
            true => 1,
        };

        let flags: u8 = (odd_bit | (term_bit << 1)) << 4;
        self.packed.to_big_endian(&mut bytes[1..]);

        bytes[flag_byte_idx] |= flags;
        Bytes::copy_from_slice(&bytes[flag_byte_idx..])
    }
}

/// Whether a hex-prefix path terminates in a leaf.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PathKind {
    /// Flag nibble `0` or `1`.
    Extension,

    /// Flag nibble `2` or `3`.
    Leaf,
}

/// A decoded hex-prefix path: the node kind its flag selects plus the path
/// nibbles, right-aligned.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PartialPath {
    /// Kind selected by bit 1 of the flag nibble.
    pub kind: PathKind,
    /// The path nibbles with the flag (and padding) removed.
    pub nibbles: Nibbles,
}

impl PartialPath {
    /// Decodes a hex-prefix byte string.
    ///
    /// The first nibble is a flag in `0..=3`: bit 0 marks an odd number of
    /// path nibbles, bit 1 marks a leaf. An even path carries one padding
    /// nibble after the flag which must be zero.
    pub fn from_hex_prefix_encoding(hex_prefix_bytes: &[u8]) -> Result<Self, HexPrefixError> {
        let (first, rest) = hex_prefix_bytes
            .split_first()
            .ok_or(HexPrefixError::Empty)?;

        let flag_bits = (first & 0b11110000) >> 4;

        // is_odd --> 0b01
        // is_leaf --> 0b10
        let (kind, is_odd) = match flag_bits {
            0b00 => (PathKind::Extension, false),
            0b01 => (PathKind::Extension, true),
            0b10 => (PathKind::Leaf, false),
            0b11 => (PathKind::Leaf, true),
            _ => return Err(HexPrefixError::InvalidFlags(flag_bits)),
        };

        let count = rest.len() * 2 + usize::from(is_odd);
        if count > MAX_NIBBLES {
            return Err(HexPrefixError::TooLong(hex::encode(hex_prefix_bytes), count));
        }

        let low = first & 0b1111;
        let mut nibbles = Nibbles::default();
        match is_odd {
            false if low != 0 => return Err(HexPrefixError::NonZeroPadding(low)),
            false => (),
            true => nibbles.push_nibble_back(low),
        }

        for b in rest {
            nibbles.push_nibble_back(b >> 4);
            nibbles.push_nibble_back(b & 0b1111);
        }

        Ok(Self { kind, nibbles })
    }
}

/// A 256-bit trie key together with a cursor into it.
///
/// The cursor only ever moves forward, one nibble (4 bits) at a time or by a
/// whole partial path segment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TriePath {
    key: Nibbles,
    bit_index: usize,
}

impl TriePath {
    /// Total number of bits in a key.
    pub const BITS: usize = MAX_NIBBLES * 4;

    /// Creates a cursor at the start of `key`.
    pub fn new(key: H256) -> Self {
        Self {
            key: Nibbles::from_h256_be(key),
            bit_index: 0,
        }
    }

    /// The secure-trie key of an account: `keccak(address)`.
    pub fn for_account(address: &Address) -> Self {
        Self::new(hash_bytes(address.as_bytes()))
    }

    /// The full key.
    pub const fn key(&self) -> &Nibbles {
        &self.key
    }

    /// Number of key bits matched so far.
    pub const fn consumed_bits(&self) -> usize {
        self.bit_index
    }

    /// Number of nibbles still to be matched.
    pub const fn remaining_nibbles(&self) -> usize {
        (Self::BITS - self.bit_index) / 4
    }

    /// Whether every bit of the key has been matched.
    pub const fn is_complete(&self) -> bool {
        self.bit_index == Self::BITS
    }

    /// Consumes the nibble under the cursor, if any remains.
    pub fn next_nibble(&mut self) -> Option<Nibble> {
        if self.is_complete() {
            return None;
        }

        let n = self.key.get_nibble(self.bit_index / 4);
        self.bit_index += 4;

        Some(n)
    }

    /// Checks `segment` against the key at the cursor and advances past it on
    /// a match. The cursor is left untouched on a mismatch.
    ///
    /// Callers must ensure the segment fits in the remaining nibbles.
    pub fn consume_segment(&mut self, segment: &Nibbles) -> bool {
        debug_assert!(segment.count <= self.remaining_nibbles());

        let start = self.bit_index / 4;
        let matches = self.key.get_nibble_range(start..start + segment.count) == *segment;
        if matches {
            self.bit_index += segment.count * 4;
        }

        matches
    }
}
