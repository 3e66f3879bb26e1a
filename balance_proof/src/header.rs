//! Extraction of the state root from a raw block header.
//!
//! The header is an RLP list whose first four fields are fixed width:
//!
//! ```text
//! 0xf9 LL LL | 0xa0 parent_hash | 0xa0 ommers_hash | 0x94 beneficiary | 0xa0 state_root | ...
//!   3 bytes  |     33 bytes     |     33 bytes     |     21 bytes     |     33 bytes
//! ```
//!
//! so the state root always starts at byte [`STATE_ROOT_OFFSET`]. Any
//! post-genesis header is longer than 255 bytes and shorter than 64KiB, which
//! is what makes the two byte long-list prefix fixed as well.

use ethereum_types::H256;
use log::trace;

use crate::{
    error::{ItemRole, ProofError, ProofResult},
    rlp::{RlpItem, RlpListIter},
    utils::{expect_hash_item, hash_bytes},
};

/// Leading byte of a list whose payload length takes two bytes.
pub const HEADER_LIST_PREFIX: u8 = 0xf9;

/// Leading byte of a 20 byte string.
const ADDRESS_STRING_PREFIX: u8 = 0x80 + 20;

/// Offset of the first state root byte.
pub const STATE_ROOT_OFFSET: usize = 3 + 33 + 33 + 21 + 1;

/// The shortest header that can contain a state root.
pub const MIN_HEADER_LEN: usize = STATE_ROOT_OFFSET + 32;

/// Returns the state root of `header_rlp` after checking that the header
/// hashes to `expected_block_hash`.
///
/// Nothing inside the header is read before the hash matches; after that the
/// outer list and the leading fields are still validated so the fixed offset
/// is known to point at the state root.
pub fn extract_state_root(header_rlp: &[u8], expected_block_hash: H256) -> ProofResult<H256> {
    if header_rlp.len() < MIN_HEADER_LEN {
        return Err(ProofError::HeaderTooShort {
            len: header_rlp.len(),
            min: MIN_HEADER_LEN,
        });
    }

    let computed = hash_bytes(header_rlp);
    if computed != expected_block_hash {
        return Err(ProofError::BlockHashMismatch {
            expected: expected_block_hash,
            computed,
        });
    }

    if header_rlp[0] != HEADER_LIST_PREFIX {
        return Err(ProofError::UnexpectedLeadingByte {
            role: ItemRole::HeaderList,
            byte: header_rlp[0],
        });
    }

    let header = RlpItem::decode_exact(header_rlp)?;
    let mut fields = header.list_items()?;
    let mut next_field = || next_header_field(&mut fields, header_rlp.len());

    expect_hash_item(&next_field()?, ItemRole::ParentHash)?;
    expect_hash_item(&next_field()?, ItemRole::OmmersHash)?;

    let beneficiary = next_field()?;
    if beneficiary.first_byte() != ADDRESS_STRING_PREFIX {
        return Err(ProofError::UnexpectedLeadingByte {
            role: ItemRole::Beneficiary,
            byte: beneficiary.first_byte(),
        });
    }

    let root_item = next_field()?;
    let state_root = expect_hash_item(&root_item, ItemRole::StateRoot)?;
    debug_assert_eq!(root_item.offset() + 1, STATE_ROOT_OFFSET);

    trace!("Extracted state root {:x} from block {:x}", state_root, computed);

    Ok(state_root)
}

fn next_header_field<'a>(fields: &mut RlpListIter<'a>, len: usize) -> ProofResult<RlpItem<'a>> {
    match fields.next() {
        Some(field) => Ok(field?),
        None => Err(ProofError::HeaderTooShort {
            len,
            min: MIN_HEADER_LEN,
        }),
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;

    use super::{extract_state_root, MIN_HEADER_LEN, STATE_ROOT_OFFSET};
    use crate::{
        builder::BlockHeader,
        error::{ItemRole, ProofError, ProofErrorKind},
        utils::hash_bytes,
    };

    fn sample_header() -> BlockHeader {
        BlockHeader {
            state_root: H256::repeat_byte(0x5a),
            number: 17_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn extracts_root_at_fixed_offset() {
        let header = sample_header();
        let enc = header.rlp_encode();

        assert_eq!(enc[0], 0xf9);
        assert_eq!(&enc[STATE_ROOT_OFFSET..MIN_HEADER_LEN], header.state_root.as_bytes());
        assert_eq!(
            extract_state_root(&enc, header.hash()),
            Ok(H256::repeat_byte(0x5a))
        );
    }

    #[test]
    fn rejects_short_header() {
        let res = extract_state_root(&[0xf9; 122], H256::zero());
        assert_eq!(
            res,
            Err(ProofError::HeaderTooShort { len: 122, min: 123 })
        );
    }

    #[test]
    fn rejects_wrong_block_hash() {
        let enc = sample_header().rlp_encode();
        let err = extract_state_root(&enc, H256::repeat_byte(1)).unwrap_err();

        assert!(matches!(err, ProofError::BlockHashMismatch { .. }));
        assert_eq!(err.kind(), ProofErrorKind::CryptographicMismatch);
    }

    #[test]
    fn rejects_any_modified_byte() {
        let header = sample_header();
        let mut enc = header.rlp_encode().to_vec();
        enc[STATE_ROOT_OFFSET + 7] ^= 1;

        assert!(matches!(
            extract_state_root(&enc, header.hash()),
            Err(ProofError::BlockHashMismatch { .. })
        ));
    }

    #[test]
    fn rejects_malformed_layout_even_with_matching_hash() {
        // A short list prefix: long enough and correctly hashed, but not a header.
        let mut bogus = vec![0xf8, 0x7e];
        bogus.extend(std::iter::repeat(0x01).take(126));
        let hash = hash_bytes(&bogus);

        assert_eq!(
            extract_state_root(&bogus, hash),
            Err(ProofError::UnexpectedLeadingByte {
                role: ItemRole::HeaderList,
                byte: 0xf8,
            })
        );
    }
}
