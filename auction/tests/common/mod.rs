#![allow(dead_code)]

use std::sync::Arc;

use ethereum_types::{Address, H256, U256};
use sealed_auction::{
    commitment::bid_commitment, AssetId, AuctionIndex, AuctionParams, BidUnits, InMemoryAssets,
    InMemoryLedger,
};
use vickrey_common::units_to_wei;

pub const START: u64 = 1_700_000_000;
pub const BID_PERIOD: u64 = 100;
pub const REVEAL_PERIOD: u64 = 50;
pub const RESERVE: BidUnits = 1_000;

pub const HOUSE: Address = Address::repeat_byte(0xaa);
pub const SELLER: Address = Address::repeat_byte(0x5e);
pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const CAROL: Address = Address::repeat_byte(0xca);

/// Wei every bidder starts with.
pub fn starting_balance() -> U256 {
    units_to_wei(1_000_000)
}

pub fn salt(n: u8) -> H256 {
    H256::repeat_byte(n)
}

pub fn asset() -> AssetId {
    asset_with_id(42)
}

pub fn asset_with_id(id: u64) -> AssetId {
    AssetId::new(Address::repeat_byte(0xc0), U256::from(id))
}

pub fn params() -> AuctionParams {
    AuctionParams {
        bid_period: BID_PERIOD,
        reveal_period: REVEAL_PERIOD,
        reserve_price: RESERVE,
    }
}

pub fn commitment(bid: BidUnits, salt: H256, index: AuctionIndex) -> H256 {
    bid_commitment(salt, bid, &asset(), index)
}

/// A ledger and an asset registry holding the asset of the seller, with the
/// house approved to move it.
#[derive(Debug)]
pub struct World {
    pub ledger: Arc<InMemoryLedger>,
    pub assets: Arc<InMemoryAssets>,
}

impl World {
    pub fn new() -> Self {
        let _ = pretty_env_logger::try_init();

        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_timestamp(START);
        for bidder in [ALICE, BOB, CAROL] {
            ledger.credit(bidder, starting_balance());
        }

        let assets = Arc::new(InMemoryAssets::new());
        assets.mint(asset(), SELLER);
        assets.approve(SELLER, HOUSE);

        Self { ledger, assets }
    }

    pub fn balance(&self, account: Address) -> U256 {
        use sealed_auction::Ledger;
        self.ledger.balance_of(&account)
    }

    pub fn owner(&self) -> Address {
        use sealed_auction::AssetRegistry;
        self.assets.owner_of(&asset()).unwrap()
    }

    /// Moves the clock to the first second of the reveal period.
    pub fn start_reveal(&self) {
        self.ledger.set_timestamp(START + BID_PERIOD + 1);
    }

    /// Moves the clock past the reveal period.
    pub fn end_reveal(&self) {
        self.ledger
            .set_timestamp(START + BID_PERIOD + REVEAL_PERIOD + 1);
    }
}
