//! Decoding of a single encoded trie node from a proof.

use enum_as_inner::EnumAsInner;
use ethereum_types::H256;

use crate::{
    error::{ItemRole, ProofError, ProofResult},
    nibbles::{Nibbles, PartialPath, PathKind},
    rlp::{RlpItem, RlpKind},
    utils::{expect_hash_item, TrieNodeType},
};

/// Items in a branch node: 16 children and a value.
pub const BRANCH_ARITY: usize = 17;

/// Items in an extension or leaf node: a path and a child or value.
pub const SHORT_NODE_ARITY: usize = 2;

/// Encoding of an empty branch slot.
const EMPTY_STRING: u8 = 0x80;

/// A slot of a branch node.
#[derive(Clone, Copy, Debug, EnumAsInner, Eq, Hash, PartialEq)]
pub enum BranchChild {
    /// No child below this nibble.
    Empty,

    /// Reference to a child node by its keccak hash.
    Hash(H256),
}

/// A trie node borrowed from the proof buffer.
///
/// Children are only ever references by hash: proofs of the account trie never
/// embed a child node inline because every encoded account node is longer than
/// 32 bytes.
#[derive(Clone, Debug, EnumAsInner, Eq, PartialEq)]
pub enum ProofNode<'a> {
    /// A node with 16 children and a (always empty in the account trie) value.
    Branch {
        /// The children, indexed by nibble.
        children: [BranchChild; 16],
        /// Payload of the 17th item.
        value: &'a [u8],
    },

    /// A node with a shared path segment and a single child.
    Extension {
        /// The path segment. Never empty.
        nibbles: Nibbles,
        /// Hash of the child node.
        child: H256,
    },

    /// A node holding the rest of a key and its value.
    Leaf {
        /// The remaining key nibbles. May be empty.
        nibbles: Nibbles,
        /// The encoded value (for accounts, the account state RLP).
        value: &'a [u8],
    },
}

impl<'a> ProofNode<'a> {
    /// Decodes a node, requiring `encoded` to be exactly one RLP list.
    pub fn decode(encoded: &'a [u8]) -> ProofResult<Self> {
        let node = RlpItem::decode_exact(encoded)?;
        if !node.is_list() {
            return Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::Node,
                byte: node.first_byte(),
            });
        }

        // Scan once to learn the arity before interpreting anything.
        let arity = node.item_count()?;
        let mut items = node.list_items()?;
        let mut next = || -> ProofResult<RlpItem<'a>> {
            match items.next() {
                Some(item) => Ok(item?),
                None => Err(ProofError::InvalidNodeArity { arity }),
            }
        };

        match arity {
            BRANCH_ARITY => {
                let mut children = [BranchChild::Empty; 16];
                for child in children.iter_mut() {
                    *child = decode_branch_child(&next()?)?;
                }

                let value = next()?;
                if value.is_list() {
                    return Err(ProofError::UnexpectedLeadingByte {
                        role: ItemRole::BranchValue,
                        byte: value.first_byte(),
                    });
                }

                Ok(Self::Branch {
                    children,
                    value: value.as_bytes()?,
                })
            }
            SHORT_NODE_ARITY => {
                let path_item = next()?;
                let path_bytes = match path_item.is_list() {
                    false => path_item.as_bytes()?,
                    true => {
                        return Err(ProofError::UnexpectedLeadingByte {
                            role: ItemRole::PartialPath,
                            byte: path_item.first_byte(),
                        })
                    }
                };
                let PartialPath { kind, nibbles } =
                    PartialPath::from_hex_prefix_encoding(path_bytes)?;

                let second = next()?;
                match kind {
                    PathKind::Extension => {
                        if nibbles.is_empty() {
                            return Err(ProofError::EmptyExtensionPath);
                        }

                        Ok(Self::Extension {
                            nibbles,
                            child: expect_hash_item(&second, ItemRole::ExtensionChild)?,
                        })
                    }
                    PathKind::Leaf => {
                        if second.is_list() {
                            return Err(ProofError::UnexpectedLeadingByte {
                                role: ItemRole::LeafValue,
                                byte: second.first_byte(),
                            });
                        }

                        Ok(Self::Leaf {
                            nibbles,
                            value: second.as_bytes()?,
                        })
                    }
                }
            }
            _ => Err(ProofError::InvalidNodeArity { arity }),
        }
    }

    /// The kind of this node.
    pub const fn node_type(&self) -> TrieNodeType {
        match self {
            ProofNode::Branch { .. } => TrieNodeType::Branch,
            ProofNode::Extension { .. } => TrieNodeType::Extension,
            ProofNode::Leaf { .. } => TrieNodeType::Leaf,
        }
    }

}

fn decode_branch_child(item: &RlpItem<'_>) -> ProofResult<BranchChild> {
    match item.kind() == RlpKind::ShortString && item.first_byte() == EMPTY_STRING {
        false => expect_hash_item(item, ItemRole::BranchChild).map(BranchChild::Hash),
        true => Ok(BranchChild::Empty),
    }
}
