//! Verification of Ethereum account balances from untrusted proofs.
//!
//! Given a trusted block hash, a caller can check that some raw header bytes
//! are the header of that block, read the state root out of it and then walk
//! an account proof (the list of trie nodes returned by `eth_getProof`) down
//! to the account leaf to learn the balance the account had in that block.
//!
//! Every byte of the header and the proof is treated as hostile. Decoding is
//! done with the zero-copy [`RlpItem`][crate::rlp::RlpItem] view, which bounds
//! checks every offset and rejects non-canonical encodings, and no node is
//! looked into before its hash has been matched against its parent.
//!
//! The entry point most users want is [`verify_balance`]. The
//! [`builder`] module can produce tries, proofs and headers for testing.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod account;
pub mod builder;
pub mod error;
pub mod header;
pub mod nibbles;
pub mod node;
pub mod rlp;
pub mod utils;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing_utils;

pub use error::{ProofError, ProofErrorKind, ProofResult};
pub use verifier::{
    verify_account_at_root, verify_balance, verify_balance_at_root, verify_balance_for_path,
};
