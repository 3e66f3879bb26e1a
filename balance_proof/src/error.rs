//! Errors produced while checking a balance proof.

use std::fmt::{self, Display};

use ethereum_types::H256;
use thiserror::Error;

use crate::{
    nibbles::{HexPrefixError, Nibbles},
    rlp::RlpError,
    utils::TrieNodeType,
};

/// Result type used by every proof operation.
pub type ProofResult<T> = Result<T, ProofError>;

/// The broad category of a [`ProofError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProofErrorKind {
    /// The input is not a well-formed proof.
    Format,

    /// The input is well formed but does not belong to the trusted hash or
    /// to the requested path.
    CryptographicMismatch,
}

/// Which part of the input an unexpected byte was found in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum ItemRole {
    HeaderList,
    ParentHash,
    OmmersHash,
    Beneficiary,
    StateRoot,
    Node,
    BranchChild,
    BranchValue,
    PartialPath,
    ExtensionChild,
    LeafValue,
    AccountState,
    Nonce,
    Balance,
    StorageRoot,
    CodeHash,
}

impl Display for ItemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemRole::HeaderList => "header list",
            ItemRole::ParentHash => "parent hash",
            ItemRole::OmmersHash => "ommers hash",
            ItemRole::Beneficiary => "beneficiary",
            ItemRole::StateRoot => "state root",
            ItemRole::Node => "trie node",
            ItemRole::BranchChild => "branch child",
            ItemRole::BranchValue => "branch value",
            ItemRole::PartialPath => "partial path",
            ItemRole::ExtensionChild => "extension child",
            ItemRole::LeafValue => "leaf value",
            ItemRole::AccountState => "account state",
            ItemRole::Nonce => "nonce",
            ItemRole::Balance => "balance",
            ItemRole::StorageRoot => "storage root",
            ItemRole::CodeHash => "code hash",
        };

        write!(f, "{}", s)
    }
}

/// An error encountered while verifying a header or an account proof.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ProofError {
    /// No proof nodes were given.
    #[error("The proof contains no nodes")]
    EmptyProof,

    /// The header cannot possibly hold a state root.
    #[error("Block header is {len} bytes long but must be at least {min}")]
    HeaderTooShort {
        /// Length of the given header.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// The header does not hash to the trusted block hash.
    #[error("Block header hashes to {computed:x} but the trusted block hash is {expected:x}")]
    BlockHashMismatch {
        /// The trusted hash.
        expected: H256,
        /// keccak of the given header.
        computed: H256,
    },

    /// A proof node does not hash to the reference its parent holds.
    #[error("Proof node {depth} hashes to {computed:x} but its parent references {expected:x}")]
    NodeHashMismatch {
        /// Index of the node in the proof.
        depth: usize,
        /// The hash the node was expected to have.
        expected: H256,
        /// keccak of the node bytes.
        computed: H256,
    },

    /// An item does not start with the byte its position requires.
    #[error("Unexpected leading byte {byte:#04x} for the {role}")]
    UnexpectedLeadingByte {
        /// What the item was supposed to be.
        role: ItemRole,
        /// The byte actually found.
        byte: u8,
    },

    /// A node list holds neither 17 nor 2 items.
    #[error("Trie node has {arity} items but must have either 17 or 2")]
    InvalidNodeArity {
        /// Number of items in the node list.
        arity: usize,
    },

    /// An extension node with no path nibbles.
    #[error("Extension node has an empty path")]
    EmptyExtensionPath,

    /// A partial path disagrees with the key being proven.
    #[error("Partial path {partial} of node {depth} does not match the key at nibble {nibble_offset}")]
    PartialPathMismatch {
        /// Index of the node in the proof.
        depth: usize,
        /// Nibble offset into the key where the segment starts.
        nibble_offset: usize,
        /// The path held by the node.
        partial: Nibbles,
    },

    /// A partial path is longer than what is left of the key.
    #[error("Node {depth} has a {segment_bits} bit path but only {} key bits remain after {consumed_bits}", 256 - consumed_bits)]
    PathOverrun {
        /// Index of the node in the proof.
        depth: usize,
        /// Key bits matched before this node.
        consumed_bits: usize,
        /// Length of the node path in bits.
        segment_bits: usize,
    },

    /// The proof ended before the whole key was matched by a leaf.
    #[error("Proof ends after matching {consumed_bits} of 256 key bits")]
    IncompletePath {
        /// Key bits matched when the proof ran out.
        consumed_bits: usize,
    },

    /// A node of the given kind appeared where it cannot be.
    #[error("Unexpected {found} node at depth {depth}")]
    UnexpectedNodeKind {
        /// Index of the node in the proof.
        depth: usize,
        /// The kind of node found.
        found: TrieNodeType,
    },

    /// The branch slot selected by the key is empty, so the account is absent.
    #[error("Branch node {depth} has no child at nibble {nibble:x}")]
    EmptyBranchSlot {
        /// Index of the node in the proof.
        depth: usize,
        /// The key nibble that selected the slot.
        nibble: u8,
    },

    /// The account list length disagrees with its contents.
    #[error("Account state declares {declared} payload bytes but its fields span {consumed}")]
    AccountStateLength {
        /// Payload length from the list header.
        declared: usize,
        /// Bytes spanned by the decoded fields.
        consumed: usize,
    },

    /// The account list does not have exactly 4 fields.
    #[error("Account state has {0} fields but must have 4")]
    AccountFieldCount(usize),

    /// The balance field has a length outside `1..=33` bytes.
    #[error("Balance is encoded in {0} bytes")]
    BalanceLength(usize),

    /// A lower level RLP decoding failure.
    #[error(transparent)]
    Rlp(#[from] RlpError),

    /// A malformed partial path.
    #[error(transparent)]
    HexPrefix(#[from] HexPrefixError),
}

impl ProofError {
    /// Which category this error belongs to.
    pub const fn kind(&self) -> ProofErrorKind {
        match self {
            ProofError::BlockHashMismatch { .. }
            | ProofError::NodeHashMismatch { .. }
            | ProofError::PartialPathMismatch { .. } => ProofErrorKind::CryptographicMismatch,
            _ => ProofErrorKind::Format,
        }
    }
}
