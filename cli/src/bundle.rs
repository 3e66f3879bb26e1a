//! The JSON file format exchanged by the command line tools.
//!
//! A bundle carries everything needed to check the balance of one account at
//! one block: the trusted block hash, the raw header and the account proof
//! as returned by `eth_getProof`. Byte strings are `0x` prefixed hex.

use anyhow::{ensure, Result};
use balance_proof::{
    account::AccountState,
    builder::{AccountTrie, BlockHeader},
    verify_balance, ProofResult,
};
use ethereum_types::{Address, H256, U256};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Bytes serialized as a `0x` prefixed hex string.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct HexBytes(#[serde(with = "crate::hex")] pub Vec<u8>);

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// An account balance claim and the evidence backing it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    /// The account.
    pub address: Address,
    /// Hash of the block the balance is read at. This is the only trusted
    /// input.
    pub block_hash: H256,
    /// Encoded header of that block.
    pub block_header_rlp: HexBytes,
    /// Trie nodes from the state root down to the account.
    pub account_proof: Vec<HexBytes>,
    /// The balance the proof should show, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_balance: Option<U256>,
}

impl ProofBundle {
    /// The balance the proof shows.
    pub fn verify(&self) -> ProofResult<U256> {
        verify_balance(
            self.account_proof.as_slice(),
            &self.block_header_rlp.0,
            self.block_hash,
            self.address,
        )
    }

    /// Like [`ProofBundle::verify`], but also fails if the proven balance is
    /// not the expected one.
    pub fn check(&self) -> Result<U256> {
        let balance = self.verify()?;

        if let Some(expected) = self.expected_balance {
            ensure!(
                balance == expected,
                "Proof of {:?} shows a balance of {} wei, expected {}",
                self.address,
                balance,
                expected
            );
        }

        Ok(balance)
    }

    /// A self-consistent bundle for `address` holding `balance`, taken from a
    /// synthetic state of `num_accounts` other random accounts.
    pub fn fixture(address: Address, balance: U256, num_accounts: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut trie = AccountTrie::new();
        for _ in 0..num_accounts {
            let account = AccountState {
                nonce: U256::from(rng.gen::<u16>()),
                balance: U256::from(rng.gen::<u128>()),
                ..Default::default()
            };
            trie.insert_account(Address::from(rng.gen::<[u8; 20]>()), account);
        }
        trie.insert_account(address, AccountState::new_with_balance(balance));

        let header = BlockHeader::with_state_root(
            H256::from(rng.gen::<[u8; 32]>()),
            rng.gen_range(1..20_000_000),
            trie.root(),
        );

        Self {
            address,
            block_hash: header.hash(),
            block_header_rlp: HexBytes::from(&header.rlp_encode()[..]),
            account_proof: trie
                .account_proof(address)
                .iter()
                .map(|node| HexBytes::from(&node[..]))
                .collect(),
            expected_balance: Some(balance),
        }
    }
}
