//! Walks an account proof from a trusted root down to the account leaf.
//!
//! A proof is the ordered list of encoded nodes on the path from the root to
//! the leaf of `keccak(address)`. Each node is accepted only if it hashes to
//! the reference held by the node before it (the trusted root for the first
//! one), so once the walk reaches the leaf its contents are as trustworthy as
//! the root itself.

use ethereum_types::{Address, H256, U256};
use log::{debug, trace};

use crate::{
    account::AccountState,
    error::{ProofError, ProofResult},
    header::extract_state_root,
    nibbles::{Nibbles, TriePath},
    node::{BranchChild, ProofNode},
    utils::{hash_bytes, TrieNodeType},
};

/// Verifies `proof` against `root` and returns the account stored under the
/// hashed key `path`.
///
/// Exclusion proofs (a path that ends in an empty branch slot or diverges
/// from a node's path) are errors: an absent account has no balance to
/// prove.
pub fn verify_account_at_root<P: AsRef<[u8]>>(
    proof: &[P],
    root: H256,
    path: H256,
) -> ProofResult<AccountState> {
    verify_account_along(proof, root, TriePath::new(path))
}

fn verify_account_along<P: AsRef<[u8]>>(
    proof: &[P],
    root: H256,
    mut path: TriePath,
) -> ProofResult<AccountState> {
    let (last, interior) = proof.split_last().ok_or(ProofError::EmptyProof)?;

    let mut expected = root;

    for (depth, encoded) in interior.iter().enumerate() {
        let node = decode_checked(depth, encoded.as_ref(), expected)?;
        expected = descend(&mut path, depth, node)?;
    }

    let depth = interior.len();
    match decode_checked(depth, last.as_ref(), expected)? {
        ProofNode::Leaf { nibbles, value } => {
            consume_partial_path(&mut path, depth, &nibbles)?;
            if !path.is_complete() {
                return Err(ProofError::IncompletePath {
                    consumed_bits: path.consumed_bits(),
                });
            }

            let account = AccountState::decode(value)?;
            debug!(
                "Verified account {:x} with balance {} through {} proof nodes",
                path.key(),
                account.balance,
                proof.len()
            );

            Ok(account)
        }
        // The key still has to be followed so an exclusion proof reports
        // where it diverges.
        node => {
            descend(&mut path, depth, node)?;
            Err(ProofError::IncompletePath {
                consumed_bits: path.consumed_bits(),
            })
        }
    }
}

/// Same as [`verify_account_at_root`] but only returns the balance.
pub fn verify_balance_at_root<P: AsRef<[u8]>>(
    proof: &[P],
    root: H256,
    path: H256,
) -> ProofResult<U256> {
    verify_account_at_root(proof, root, path).map(|account| account.balance)
}

/// Extracts the state root from a header trusted through its block hash and
/// proves the balance stored under the hashed key `path`.
pub fn verify_balance_for_path<P: AsRef<[u8]>>(
    proof: &[P],
    header_rlp: &[u8],
    expected_block_hash: H256,
    path: H256,
) -> ProofResult<U256> {
    let root = extract_state_root(header_rlp, expected_block_hash)?;
    verify_balance_at_root(proof, root, path)
}

/// Proves the balance `account` had in the block with hash
/// `expected_block_hash`.
///
/// `header_rlp` must be the encoded header of that block and `proof` the
/// account proof against its state root (as returned by `eth_getProof`).
pub fn verify_balance<P: AsRef<[u8]>>(
    proof: &[P],
    header_rlp: &[u8],
    expected_block_hash: H256,
    account: Address,
) -> ProofResult<U256> {
    let root = extract_state_root(header_rlp, expected_block_hash)?;
    verify_account_along(proof, root, TriePath::for_account(&account))
        .map(|account| account.balance)
}

/// Moves the cursor past a branch or extension and returns the hash of the
/// next node.
fn descend(path: &mut TriePath, depth: usize, node: ProofNode<'_>) -> ProofResult<H256> {
    match node {
        ProofNode::Branch { children, .. } => {
            let nibble = path.next_nibble().ok_or(ProofError::PathOverrun {
                depth,
                consumed_bits: path.consumed_bits(),
                segment_bits: 4,
            })?;

            match children[nibble as usize] {
                BranchChild::Hash(h) => Ok(h),
                BranchChild::Empty => Err(ProofError::EmptyBranchSlot { depth, nibble }),
            }
        }
        ProofNode::Extension { nibbles, child } => {
            consume_partial_path(path, depth, &nibbles)?;
            Ok(child)
        }
        ProofNode::Leaf { .. } => Err(ProofError::UnexpectedNodeKind {
            depth,
            found: TrieNodeType::Leaf,
        }),
    }
}

/// Hashes a node before anything inside it is read.
fn decode_checked(depth: usize, encoded: &[u8], expected: H256) -> ProofResult<ProofNode<'_>> {
    let computed = hash_bytes(encoded);
    if computed != expected {
        return Err(ProofError::NodeHashMismatch {
            depth,
            expected,
            computed,
        });
    }

    let node = ProofNode::decode(encoded)?;
    trace!("Proof node {} ({}) matches {:x}", depth, node.node_type(), computed);

    Ok(node)
}

fn consume_partial_path(
    path: &mut TriePath,
    depth: usize,
    partial: &Nibbles,
) -> ProofResult<()> {
    if partial.count > path.remaining_nibbles() {
        return Err(ProofError::PathOverrun {
            depth,
            consumed_bits: path.consumed_bits(),
            segment_bits: partial.count * 4,
        });
    }

    let nibble_offset = path.consumed_bits() / 4;
    match path.consume_segment(partial) {
        false => Err(ProofError::PartialPathMismatch {
            depth,
            nibble_offset,
            partial: *partial,
        }),
        true => Ok(()),
    }
}
