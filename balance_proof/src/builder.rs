//! Bottom-up construction of account tries and block headers.
//!
//! Nothing here is needed to *verify* a proof. These types produce the inputs
//! a verifier consumes (a state root, per-account proofs and a header that
//! commits to the root), which is what tests and fixtures need.

use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, H64, U256};
use log::debug;
use rlp::RlpStream;
use vickrey_common::EMPTY_TRIE_HASH;

use crate::{
    account::AccountState,
    nibbles::{Nibble, Nibbles},
    utils::hash_bytes,
};

/// How a node is referenced by its parent.
#[derive(Clone, Debug, Hash)]
enum EncodedNode {
    /// Node that is RLPed but not hashed.
    Raw(Bytes),
    /// Node that is hashed.
    Hashed(H256),
}

/// A secure account trie: accounts are stored under `keccak(address)`.
#[derive(Clone, Debug, Default)]
pub struct AccountTrie {
    accounts: BTreeMap<H256, AccountState>,
}

impl AccountTrie {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) an account under `keccak(address)`.
    pub fn insert_account(&mut self, address: Address, account: AccountState) {
        self.insert_hashed(hash_bytes(address.as_bytes()), account);
    }

    /// Inserts (or replaces) an account under an already hashed key.
    pub fn insert_hashed(&mut self, key: H256, account: AccountState) {
        self.accounts.insert(key, account);
    }

    /// Number of accounts in the trie.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the trie holds no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// The account stored under a hashed key.
    pub fn get(&self, key: &H256) -> Option<&AccountState> {
        self.accounts.get(key)
    }

    /// The root hash of the trie.
    pub fn root(&self) -> H256 {
        match self.encode_root(None, &mut Vec::new()) {
            Some(root) => hash_bytes(&root),
            None => EMPTY_TRIE_HASH,
        }
    }

    /// The encoded nodes on the path from the root towards `key`, root first.
    ///
    /// For a key that is absent the path stops at the node where it leaves
    /// the trie, so the result is an exclusion proof rather than an empty one.
    pub fn proof(&self, key: H256) -> Vec<Bytes> {
        let mut proof = Vec::new();
        self.encode_root(Some(&Nibbles::from_h256_be(key)), &mut proof);

        // Nodes are pushed bottom-up.
        proof.reverse();
        proof
    }

    /// Shorthand for [`AccountTrie::proof`] on `keccak(address)`.
    pub fn account_proof(&self, address: Address) -> Vec<Bytes> {
        self.proof(hash_bytes(address.as_bytes()))
    }

    fn encode_root(&self, target: Option<&Nibbles>, proof: &mut Vec<Bytes>) -> Option<Bytes> {
        if self.accounts.is_empty() {
            return None;
        }

        let entries: Vec<_> = self
            .accounts
            .iter()
            .map(|(k, v)| (Nibbles::from_h256_be(*k), v.rlp_encode()))
            .collect();

        let root = encode_subtrie(&entries, 0, target, proof);
        debug!(
            "Encoded trie of {} accounts with a {} byte root node",
            entries.len(),
            root.len()
        );

        Some(root)
    }
}

/// Encodes the node covering `entries`, all of which share their first
/// `offset` nibbles. `entries` must be sorted by key and non-empty.
///
/// If `target` is set this node lies on its path and is pushed to `proof`
/// after every node below it.
fn encode_subtrie(
    entries: &[(Nibbles, Bytes)],
    offset: usize,
    target: Option<&Nibbles>,
    proof: &mut Vec<Bytes>,
) -> Bytes {
    let (first_key, first_val) = &entries[0];
    let last_key = &entries[entries.len() - 1].0;

    let encoded = match entries.len() {
        1 => {
            let mut stream = RlpStream::new_list(2);
            stream.append(
                &first_key
                    .truncate_n_nibbles_front(offset)
                    .to_hex_prefix_encoding(true),
            );
            stream.append(first_val);

            stream.out().freeze()
        }
        _ => match first_key.common_prefix_len(last_key) - offset {
            0 => encode_branch(entries, offset, target, proof),
            shared => {
                let ext_path = first_key.get_nibble_range(offset..offset + shared);
                let child_target =
                    target.filter(|t| t.get_nibble_range(offset..offset + shared) == ext_path);
                let child = encode_subtrie(entries, offset + shared, child_target, proof);

                let mut stream = RlpStream::new_list(2);
                stream.append(&ext_path.to_hex_prefix_encoding(false));
                append_to_stream(&mut stream, hash_bytes_if_large_enough(child));

                stream.out().freeze()
            }
        },
    };

    if target.is_some() {
        proof.push(encoded.clone());
    }

    encoded
}

fn encode_branch(
    entries: &[(Nibbles, Bytes)],
    offset: usize,
    target: Option<&Nibbles>,
    proof: &mut Vec<Bytes>,
) -> Bytes {
    let mut stream = RlpStream::new_list(17);
    let mut rest = entries;

    for nibble in 0..16 as Nibble {
        let count = rest
            .iter()
            .take_while(|(k, _)| k.get_nibble(offset) == nibble)
            .count();
        let (group, tail) = rest.split_at(count);
        rest = tail;

        if group.is_empty() {
            stream.append_empty_data();
            continue;
        }

        let child_target = target.filter(|t| t.get_nibble(offset) == nibble);
        let child = encode_subtrie(group, offset + 1, child_target, proof);
        append_to_stream(&mut stream, hash_bytes_if_large_enough(child));
    }

    // Account tries never store a value in a branch.
    stream.append_empty_data();
    stream.out().freeze()
}

fn hash_bytes_if_large_enough(bytes: Bytes) -> EncodedNode {
    match bytes.len() >= 32 {
        false => EncodedNode::Raw(bytes),
        true => EncodedNode::Hashed(hash_bytes(&bytes)),
    }
}

fn append_to_stream(s: &mut RlpStream, node: EncodedNode) {
    match node {
        EncodedNode::Raw(b) => s.append_raw(&b, 1),
        EncodedNode::Hashed(h) => s.append(&h),
    };
}

/// The fields of a post-London block header, in encoding order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct BlockHeader {
    pub parent_hash: H256,
    pub ommers_hash: H256,
    pub beneficiary: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: H256,
    pub nonce: H64,
    /// Absent before London.
    pub base_fee_per_gas: Option<U256>,
}

impl BlockHeader {
    /// A header committing to `state_root` whose parent is `parent_hash`.
    pub fn with_state_root(parent_hash: H256, number: u64, state_root: H256) -> Self {
        Self {
            parent_hash,
            state_root,
            number,
            ommers_hash: hash_bytes(&rlp::EMPTY_LIST_RLP),
            transactions_root: EMPTY_TRIE_HASH,
            receipts_root: EMPTY_TRIE_HASH,
            gas_limit: 30_000_000,
            base_fee_per_gas: Some(U256::from(7)),
            ..Default::default()
        }
    }

    /// The RLP encoding whose keccak is the block hash.
    pub fn rlp_encode(&self) -> Bytes {
        let num_fields = 15 + usize::from(self.base_fee_per_gas.is_some());
        let mut s = RlpStream::new_list(num_fields);

        s.append(&self.parent_hash)
            .append(&self.ommers_hash)
            .append(&self.beneficiary)
            .append(&self.state_root)
            .append(&self.transactions_root)
            .append(&self.receipts_root)
            .append(&self.logs_bloom)
            .append(&self.difficulty)
            .append(&self.number)
            .append(&self.gas_limit)
            .append(&self.gas_used)
            .append(&self.timestamp)
            .append(&self.extra_data)
            .append(&self.mix_hash)
            .append(&self.nonce);

        if let Some(base_fee) = &self.base_fee_per_gas {
            s.append(base_fee);
        }

        s.out().freeze()
    }

    /// keccak of the encoded header.
    pub fn hash(&self) -> H256 {
        hash_bytes(&self.rlp_encode())
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::{H256, U256};
    use vickrey_common::EMPTY_TRIE_HASH;

    use super::{AccountTrie, BlockHeader};
    use crate::{
        account::AccountState,
        node::ProofNode,
        testing_utils::{common_setup, random_accounts},
        utils::{hash_bytes, TrieNodeType},
    };

    #[test]
    fn empty_trie_has_empty_root() {
        let trie = AccountTrie::new();
        assert_eq!(trie.root(), EMPTY_TRIE_HASH);
        assert!(trie.proof(H256::zero()).is_empty());
    }

    #[test]
    fn single_account_is_a_root_leaf() {
        common_setup();

        let mut trie = AccountTrie::new();
        trie.insert_hashed(H256::repeat_byte(1), AccountState::new_with_balance(U256::one()));

        let proof = trie.proof(H256::repeat_byte(1));
        assert_eq!(proof.len(), 1);
        assert_eq!(hash_bytes(&proof[0]), trie.root());
        assert_eq!(
            ProofNode::decode(&proof[0]).unwrap().node_type(),
            TrieNodeType::Leaf
        );
    }

    #[test]
    fn shared_prefix_produces_extension() {
        let mut key_a = [0x12; 32];
        let mut key_b = [0x12; 32];
        key_a[5] = 0x30;
        key_b[5] = 0x40;

        let mut trie = AccountTrie::new();
        trie.insert_hashed(H256(key_a), AccountState::default());
        trie.insert_hashed(H256(key_b), AccountState::default());

        let proof = trie.proof(H256(key_a));
        let kinds: Vec<_> = proof
            .iter()
            .map(|n| ProofNode::decode(n).unwrap().node_type())
            .collect();

        assert_eq!(
            kinds,
            vec![TrieNodeType::Extension, TrieNodeType::Branch, TrieNodeType::Leaf]
        );
        assert_eq!(hash_bytes(&proof[0]), trie.root());
    }

    #[test]
    fn proof_nodes_link_by_hash() {
        common_setup();

        let accounts = random_accounts(64, 9);
        let mut trie = AccountTrie::new();
        for (addr, account) in &accounts {
            trie.insert_account(*addr, *account);
        }

        for (addr, _) in &accounts {
            let proof = trie.account_proof(*addr);
            assert_eq!(hash_bytes(&proof[0]), trie.root());

            for pair in proof.windows(2) {
                let child_hash = hash_bytes(&pair[1]);
                let parent = ProofNode::decode(&pair[0]).unwrap();
                let links = match parent {
                    ProofNode::Branch { children, .. } => {
                        children.iter().any(|c| c.as_hash() == Some(&child_hash))
                    }
                    ProofNode::Extension { child, .. } => child == child_hash,
                    ProofNode::Leaf { .. } => false,
                };
                assert!(links);
            }
        }
    }

    #[test]
    fn header_hash_commits_to_encoding() {
        let header = BlockHeader::with_state_root(H256::repeat_byte(9), 100, H256::repeat_byte(4));
        let enc = header.rlp_encode();

        assert_eq!(header.hash(), hash_bytes(&enc));
        assert_eq!(rlp::Rlp::new(&enc).item_count().unwrap(), 16);

        let pre_london = BlockHeader {
            base_fee_per_gas: None,
            ..header
        };
        assert_eq!(rlp::Rlp::new(&pre_london.rlp_encode()).item_count().unwrap(), 15);
    }
}
