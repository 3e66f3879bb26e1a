//! The account state stored in the leaves of the state trie.

use bytes::Bytes;
use ethereum_types::{H256, U256};
use rlp::RlpStream;
use vickrey_common::{EMPTY_CODE_HASH, EMPTY_TRIE_HASH};

use crate::{
    error::{ItemRole, ProofError, ProofResult},
    rlp::{RlpItem, RlpKind},
    utils::expect_hash_item,
};

/// Number of fields in an encoded account.
pub const ACCOUNT_FIELDS: usize = 4;

/// Longest encoding of a balance: a 32 byte integer plus its header.
const MAX_BALANCE_ENCODED_LEN: usize = 33;

/// `[nonce, balance, storage_root, code_hash]` of an account.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AccountState {
    /// Number of transactions sent (or contracts created).
    pub nonce: U256,
    /// Balance in wei.
    pub balance: U256,
    /// Root of the storage trie.
    pub storage_root: H256,
    /// Hash of the account code.
    pub code_hash: H256,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            nonce: U256::zero(),
            balance: U256::zero(),
            storage_root: EMPTY_TRIE_HASH,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl AccountState {
    /// An externally owned account (no code, no storage) holding `balance`.
    pub fn new_with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Decodes the value of an account leaf.
    ///
    /// The encoding must be a single long list: the two 32 byte hashes alone
    /// push every valid account past the 55 byte short-list limit, so a short
    /// list can only come from a malformed proof.
    pub fn decode(encoded: &[u8]) -> ProofResult<Self> {
        let list = RlpItem::decode_exact(encoded)?;
        if list.kind() != RlpKind::LongList {
            return Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::AccountState,
                byte: list.first_byte(),
            });
        }

        let fields = list.list_items()?.collect::<Result<Vec<_>, _>>()?;
        if fields.len() != ACCOUNT_FIELDS {
            return Err(ProofError::AccountFieldCount(fields.len()));
        }

        let consumed: usize = fields.iter().map(RlpItem::encoded_len).sum();
        if consumed != list.payload_len() {
            return Err(ProofError::AccountStateLength {
                declared: list.payload_len(),
                consumed,
            });
        }

        let (nonce, balance, storage_root, code_hash) =
            (&fields[0], &fields[1], &fields[2], &fields[3]);

        if nonce.is_list() {
            return Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::Nonce,
                byte: nonce.first_byte(),
            });
        }

        if balance.is_list() {
            return Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::Balance,
                byte: balance.first_byte(),
            });
        }

        if balance.encoded_len() > MAX_BALANCE_ENCODED_LEN {
            return Err(ProofError::BalanceLength(balance.encoded_len()));
        }

        Ok(Self {
            nonce: nonce.as_u256()?,
            balance: balance.as_u256()?,
            storage_root: expect_hash_item(storage_root, ItemRole::StorageRoot)?,
            code_hash: expect_hash_item(code_hash, ItemRole::CodeHash)?,
        })
    }

    /// RLP encodes this account the way it is stored in a leaf.
    pub fn rlp_encode(&self) -> Bytes {
        let mut s = RlpStream::new_list(ACCOUNT_FIELDS);
        s.append(&self.nonce)
            .append(&self.balance)
            .append(&self.storage_root)
            .append(&self.code_hash);

        s.out().freeze()
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::{H256, U256};
    use rlp::RlpStream;

    use super::AccountState;
    use crate::{
        error::{ItemRole, ProofError},
        rlp::RlpError,
    };

    #[test]
    fn balances_decode_across_widths() {
        let balances = [
            U256::zero(),
            U256::one(),
            U256::from(255),
            U256::from(u64::MAX),
            (U256::one() << 248) - 1,
            U256::MAX,
        ];

        for balance in balances {
            let account = AccountState {
                nonce: U256::from(7),
                ..AccountState::new_with_balance(balance)
            };
            let enc = account.rlp_encode();

            assert_eq!(AccountState::decode(&enc), Ok(account));
        }
    }

    #[test]
    fn matches_rlp_crate_decoding() {
        let account = AccountState {
            nonce: U256::from(1),
            balance: U256::from(10).pow(20.into()),
            storage_root: H256::repeat_byte(2),
            code_hash: H256::repeat_byte(3),
        };
        let enc = account.rlp_encode();

        let reference = rlp::Rlp::new(&enc);
        assert_eq!(reference.item_count().unwrap(), 4);
        assert_eq!(reference.val_at::<U256>(1).unwrap(), account.balance);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let mut s = RlpStream::new_list(3);
        s.append(&U256::zero())
            .append(&H256::zero())
            .append(&H256::zero());

        assert_eq!(
            AccountState::decode(&s.out()),
            Err(ProofError::AccountFieldCount(3))
        );
    }

    #[test]
    fn rejects_short_list() {
        let mut s = RlpStream::new_list(4);
        s.append(&0_u8).append(&0_u8).append(&0_u8).append(&0_u8);

        assert_eq!(
            AccountState::decode(&s.out()),
            Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::AccountState,
                byte: 0xc4,
            })
        );
    }

    #[test]
    fn rejects_oversized_balance() {
        // A 33 byte balance payload (34 encoded bytes).
        let mut s = RlpStream::new_list(4);
        s.append_empty_data()
            .append(&vec![1_u8; 33])
            .append(&H256::zero())
            .append(&H256::zero());

        assert_eq!(
            AccountState::decode(&s.out()),
            Err(ProofError::BalanceLength(34))
        );
    }

    #[test]
    fn rejects_non_canonical_balance() {
        let mut s = RlpStream::new_list(4);
        s.append_empty_data()
            .append(&vec![0_u8, 1])
            .append(&H256::zero())
            .append(&H256::zero());

        assert!(matches!(
            AccountState::decode(&s.out()),
            Err(ProofError::Rlp(RlpError::NonCanonicalInteger { .. }))
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut enc = AccountState::default().rlp_encode().to_vec();
        enc.push(0);

        assert!(matches!(
            AccountState::decode(&enc),
            Err(ProofError::Rlp(RlpError::TrailingBytes { .. }))
        ));
    }
}
