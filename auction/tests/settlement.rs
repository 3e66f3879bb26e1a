mod common;

use std::sync::Arc;

use common::*;
use ethereum_types::{Address, H256, U256};
use parking_lot::Mutex;
use sealed_auction::{
    AssetId, AssetRegistry, AuctionError, BidUnits, InMemoryAssets, InMemoryLedger, Ledger,
    LedgerError, OverCollateralizedAuction, Phase, Settlement, SneakyAuction,
};
use vickrey_common::units_to_wei;

/// An asset registry whose receivers can refuse one delivery each.
#[derive(Debug)]
struct RefusingAssets {
    inner: Arc<InMemoryAssets>,
    refusing: Mutex<Vec<Address>>,
}

impl RefusingAssets {
    fn new(world: &World) -> Arc<Self> {
        Arc::new(Self {
            inner: world.assets.clone(),
            refusing: Mutex::new(Vec::new()),
        })
    }

    /// The next delivery to `receiver` reverts.
    fn refuse_once(&self, receiver: Address) {
        self.refusing.lock().push(receiver);
    }
}

impl AssetRegistry for RefusingAssets {
    fn owner_of(&self, asset: &AssetId) -> Result<Address, LedgerError> {
        self.inner.owner_of(asset)
    }

    fn transfer(&self, from: Address, to: Address, asset: &AssetId) -> Result<(), LedgerError> {
        {
            let mut refusing = self.refusing.lock();
            if let Some(pos) = refusing.iter().position(|r| *r == to) {
                refusing.remove(pos);
                return Err(LedgerError::NotAuthorized {
                    operator: from,
                    owner: to,
                });
            }
        }

        self.inner.transfer(from, to, asset)
    }

    fn transfer_from_authorized(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        self.inner.transfer_from_authorized(operator, from, to, asset)
    }
}

fn refused_delivery(res: Result<Settlement, AuctionError>) -> bool {
    matches!(
        res,
        Err(AuctionError::Ledger(LedgerError::NotAuthorized { owner, .. })) if owner == ALICE
    )
}

#[test]
fn refused_delivery_pays_nobody_in_the_collateral_house() {
    let world = World::new();
    let assets = RefusingAssets::new(&world);
    let house = OverCollateralizedAuction::in_memory(HOUSE, world.ledger.clone(), assets.clone());

    let index = house.create_auction(SELLER, asset(), params()).unwrap();
    let (low, high) = (RESERVE + 1, RESERVE + 2);
    house
        .commit_bid(BOB, asset(), index, commitment(low, salt(1), index), units_to_wei(low))
        .unwrap();
    house
        .commit_bid(ALICE, asset(), index, commitment(high, salt(2), index), units_to_wei(high))
        .unwrap();

    world.start_reveal();
    house.reveal_bid(BOB, asset(), index, low, salt(1)).unwrap();
    house.reveal_bid(ALICE, asset(), index, high, salt(2)).unwrap();
    world.end_reveal();

    let pooled = units_to_wei(low) + units_to_wei(high);
    assets.refuse_once(ALICE);
    assert!(refused_delivery(house.end_auction(asset())));

    assert_eq!(world.balance(SELLER), U256::zero());
    assert_eq!(world.balance(HOUSE), pooled);
    assert_eq!(world.owner(), HOUSE);
    assert_eq!(house.core().phase(&asset()), Phase::Ended);

    assert_eq!(
        house.end_auction(asset()).unwrap(),
        Settlement {
            winner: Some(ALICE),
            price: low,
            winner_refund: units_to_wei(high) - units_to_wei(low),
        }
    );
    assert_eq!(world.owner(), ALICE);
    assert_eq!(world.balance(SELLER), units_to_wei(low));
    assert_eq!(world.balance(HOUSE), units_to_wei(low));

    assert_eq!(
        house.withdraw_collateral(BOB, asset(), index).unwrap(),
        units_to_wei(low)
    );
    assert_eq!(world.balance(BOB), starting_balance());
    assert_eq!(world.balance(HOUSE), U256::zero());
}

#[test]
fn refused_delivery_leaves_the_winning_escrow_intact() {
    let world = World::new();
    let assets = RefusingAssets::new(&world);
    let house = SneakyAuction::in_memory(HOUSE, world.ledger.clone(), assets.clone());
    house.create_auction(SELLER, asset(), params()).unwrap();

    let fund = |bidder: Address, bid: BidUnits, salt: H256, amount: U256| {
        let escrow = house.escrow_address(&asset(), 1, bidder, bid, salt);
        world.ledger.transfer_value(bidder, escrow, amount).unwrap();
        escrow
    };

    let (low, high) = (RESERVE + 1, RESERVE + 2);
    fund(BOB, low, salt(1), units_to_wei(low));
    let alice_escrow = fund(ALICE, high, salt(2), units_to_wei(high + 50));

    world.start_reveal();
    house.reveal_bid(BOB, asset(), low, salt(1)).unwrap();
    house.reveal_bid(ALICE, asset(), high, salt(2)).unwrap();
    world.end_reveal();

    assets.refuse_once(ALICE);
    assert!(refused_delivery(house.end_auction(asset())));

    assert_eq!(world.balance(SELLER), U256::zero());
    assert_eq!(world.balance(alice_escrow), units_to_wei(high + 50));
    assert_eq!(world.owner(), HOUSE);

    house.end_auction(asset()).unwrap();
    assert_eq!(world.owner(), ALICE);
    assert_eq!(world.balance(SELLER), units_to_wei(low));
    assert_eq!(world.balance(alice_escrow), U256::zero());
    assert_eq!(world.balance(ALICE), starting_balance() - units_to_wei(low));
    assert_eq!(world.balance(BOB), starting_balance());
}
