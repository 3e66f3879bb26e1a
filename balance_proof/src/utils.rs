//! Various types and logic that don't fit well into any other module.

use std::{
    fmt::{self, Display},
    ops::BitAnd,
};

use ethereum_types::{H256, U512};
use keccak_hash::keccak;

use crate::{
    error::{ItemRole, ProofError, ProofResult},
    rlp::{RlpItem, RlpKind},
};

/// Leading byte of a string holding exactly 32 bytes.
pub(crate) const HASH_STRING_PREFIX: u8 = 0x80 + 32;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
/// Simplified trie node type to make logging cleaner.
pub enum TrieNodeType {
    /// Branch node.
    Branch,

    /// Extension node.
    Extension,

    /// Leaf node.
    Leaf,
}

impl Display for TrieNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrieNodeType::Branch => "Branch",
            TrieNodeType::Extension => "Extension",
            TrieNodeType::Leaf => "Leaf",
        };

        write!(f, "{}", s)
    }
}

pub(crate) fn is_even<T: Copy + BitAnd<Output = T> + From<u8> + PartialEq>(num: T) -> bool {
    (num & T::from(1)) == T::from(0)
}

pub(crate) fn create_mask_of_1s(amt: usize) -> U512 {
    (U512::one() << amt) - 1
}

/// Hashes raw bytes with keccak-256.
pub fn hash_bytes(bytes: &[u8]) -> H256 {
    keccak(bytes)
}

/// Reads a 32-byte hash that must be encoded as `0xa0 ++ hash`.
///
/// Anything else (an empty string, an embedded node, a shorter string) is
/// reported against `role`.
pub(crate) fn expect_hash_item(item: &RlpItem<'_>, role: ItemRole) -> ProofResult<H256> {
    match item.kind() == RlpKind::ShortString && item.first_byte() == HASH_STRING_PREFIX {
        false => Err(ProofError::UnexpectedLeadingByte {
            role,
            byte: item.first_byte(),
        }),
        true => Ok(H256::from_slice(item.payload())),
    }
}
