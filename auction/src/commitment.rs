//! Hashes binding a bidder to a hidden bid.
//!
//! The over-collateralized auction stores [`bid_commitment`] directly. The
//! escrow based auctions never store anything during bidding: the commitment
//! is the [`escrow_address`] the bidder funds, which can only be derived by
//! someone who knows the bid and the salt.

use ethereum_types::{Address, H256};
use keccak_hash::keccak;
use rlp::RlpStream;

use crate::types::{AssetId, AuctionIndex, BidUnits};

/// Init code of an escrow: `CALLER SELFDESTRUCT`. Deploying it sends the
/// whole escrow balance to the deployer (the auction house).
pub const ESCROW_INIT_CODE: [u8; 2] = [0x33, 0xff];

/// Prefix byte of a `CREATE2` address preimage.
const CREATE2_PREFIX: u8 = 0xff;

/// The commitment of an over-collateralized bid.
///
/// The auction index is part of the preimage so a reveal can not be replayed
/// against a later auction of the same asset.
pub fn bid_commitment(salt: H256, bid: BidUnits, asset: &AssetId, index: AuctionIndex) -> H256 {
    let mut s = RlpStream::new_list(5);
    s.append(&salt)
        .append(&bid)
        .append(&asset.collection)
        .append(&asset.token_id)
        .append(&index);

    keccak(s.out())
}

/// The `CREATE2` address of the escrow holding the collateral of a bid in
/// an escrow based auction run by `house`.
pub fn escrow_address(
    house: Address,
    asset: &AssetId,
    index: AuctionIndex,
    bidder: Address,
    bid: BidUnits,
    salt: H256,
) -> Address {
    let mut s = RlpStream::new_list(6);
    s.append(&asset.collection)
        .append(&asset.token_id)
        .append(&index)
        .append(&bidder)
        .append(&bid)
        .append(&salt);
    let create2_salt = keccak(s.out());

    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(CREATE2_PREFIX);
    preimage.extend_from_slice(house.as_bytes());
    preimage.extend_from_slice(create2_salt.as_bytes());
    preimage.extend_from_slice(keccak(ESCROW_INIT_CODE).as_bytes());

    Address::from_slice(&keccak(&preimage)[12..])
}
