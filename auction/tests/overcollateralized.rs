mod common;

use std::sync::Arc;

use common::*;
use ethereum_types::{Address, U256};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sealed_auction::{
    AssetId, AuctionError, AuctionErrorKind, BidUnits, InMemoryAssets, InMemoryLedger,
    OverCollateralizedAuction, Phase, RevealOutcome, Settlement, TournamentOutcome,
};
use vickrey_common::units_to_wei;

type House = OverCollateralizedAuction<Arc<InMemoryLedger>, Arc<InMemoryAssets>>;

fn house(world: &World) -> House {
    OverCollateralizedAuction::in_memory(HOUSE, world.ledger.clone(), world.assets.clone())
}

#[test]
fn winner_pays_the_second_highest_bid() {
    let world = World::new();
    let house = house(&world);

    let index = house.create_auction(SELLER, asset(), params()).unwrap();
    assert_eq!(index, 1);
    assert_eq!(world.owner(), HOUSE);

    let (low, high) = (RESERVE + 1, RESERVE + 2);
    house
        .commit_bid(BOB, asset(), index, commitment(low, salt(1), index), units_to_wei(low))
        .unwrap();
    house
        .commit_bid(
            ALICE,
            asset(),
            index,
            commitment(high, salt(2), index),
            units_to_wei(high + 500),
        )
        .unwrap();
    assert_eq!(house.core().auction(&asset()).unwrap().num_unrevealed, 2);

    world.start_reveal();
    assert_eq!(
        house.reveal_bid(BOB, asset(), index, low, salt(1)).unwrap(),
        RevealOutcome::Accepted(TournamentOutcome::NewHighest { displaced: None })
    );
    assert!(matches!(
        house.reveal_bid(ALICE, asset(), index, high, salt(2)).unwrap(),
        RevealOutcome::Accepted(TournamentOutcome::NewHighest {
            displaced: Some(d)
        }) if d.bidder == BOB && d.escrow.is_none()
    ));

    world.end_reveal();
    let settlement = house.end_auction(asset()).unwrap();
    assert_eq!(
        settlement,
        Settlement {
            winner: Some(ALICE),
            price: low,
            winner_refund: units_to_wei(high + 500) - units_to_wei(low),
        }
    );

    assert_eq!(world.owner(), ALICE);
    assert_eq!(world.balance(SELLER), units_to_wei(low));
    assert_eq!(world.balance(ALICE), starting_balance() - units_to_wei(low));

    assert_eq!(
        house.withdraw_collateral(BOB, asset(), index).unwrap(),
        units_to_wei(low)
    );
    assert_eq!(world.balance(BOB), starting_balance());
    assert_eq!(world.balance(HOUSE), U256::zero());
    assert_eq!(house.core().phase(&asset()), Phase::NoAuction);
}

#[test]
fn no_bid_above_reserve_returns_the_asset() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();

    house
        .commit_bid(
            ALICE,
            asset(),
            index,
            commitment(RESERVE, salt(1), index),
            units_to_wei(RESERVE),
        )
        .unwrap();

    world.start_reveal();
    assert_eq!(
        house.reveal_bid(ALICE, asset(), index, RESERVE, salt(1)).unwrap(),
        RevealOutcome::Accepted(TournamentOutcome::NoEffect)
    );

    world.end_reveal();
    assert_eq!(house.end_auction(asset()).unwrap().winner, None);
    assert_eq!(world.owner(), SELLER);
    assert_eq!(world.balance(SELLER), U256::zero());

    house.withdraw_collateral(ALICE, asset(), index).unwrap();
    assert_eq!(world.balance(ALICE), starting_balance());
}

#[test]
fn undercollateralized_reveal_is_refunded_and_ignored() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();

    let bid = RESERVE + 10;
    house
        .commit_bid(
            ALICE,
            asset(),
            index,
            commitment(bid, salt(1), index),
            units_to_wei(bid - 1),
        )
        .unwrap();

    world.start_reveal();
    assert_eq!(
        house.reveal_bid(ALICE, asset(), index, bid, salt(1)).unwrap(),
        RevealOutcome::InsufficientCollateral {
            refunded: units_to_wei(bid - 1)
        }
    );
    assert_eq!(world.balance(ALICE), starting_balance());

    let auction = house.core().auction(&asset()).unwrap();
    assert_eq!(auction.highest_bidder, None);
    assert_eq!(auction.highest_bid, RESERVE);
}

#[test]
fn recommitting_adds_collateral() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();

    let bid = RESERVE + 10;
    house
        .commit_bid(
            ALICE,
            asset(),
            index,
            commitment(1, salt(9), index),
            units_to_wei(bid / 2),
        )
        .unwrap();
    house
        .commit_bid(
            ALICE,
            asset(),
            index,
            commitment(bid, salt(1), index),
            units_to_wei(bid / 2 + 1),
        )
        .unwrap();
    assert_eq!(house.core().auction(&asset()).unwrap().num_unrevealed, 1);

    world.start_reveal();
    assert_eq!(
        house.reveal_bid(ALICE, asset(), index, 1, salt(9)),
        Err(AuctionError::CommitmentMismatch)
    );
    assert!(matches!(
        house.reveal_bid(ALICE, asset(), index, bid, salt(1)),
        Ok(RevealOutcome::Accepted(_))
    ));
}

#[test]
fn reveal_rules() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();
    let bid = RESERVE + 1;

    assert_eq!(
        house.commit_bid(
            ALICE,
            asset(),
            index + 1,
            commitment(bid, salt(1), index),
            U256::zero()
        ),
        Err(AuctionError::WrongAuctionIndex {
            expected: index,
            actual: index + 1
        })
    );
    house
        .commit_bid(ALICE, asset(), index, commitment(bid, salt(1), index), units_to_wei(bid))
        .unwrap();

    let early = house.reveal_bid(ALICE, asset(), index, bid, salt(1)).unwrap_err();
    assert_eq!(
        early,
        AuctionError::NotInPhase {
            asset: asset(),
            expected: Phase::RevealOpen,
            actual: Phase::BiddingOpen,
        }
    );
    assert_eq!(early.kind(), AuctionErrorKind::Timing);

    world.start_reveal();
    assert!(matches!(
        house.commit_bid(BOB, asset(), index, commitment(bid, salt(2), index), U256::zero()),
        Err(AuctionError::NotInPhase { .. })
    ));
    assert_eq!(
        house.reveal_bid(BOB, asset(), index, bid, salt(2)),
        Err(AuctionError::NoCommitment)
    );

    let mismatch = house
        .reveal_bid(ALICE, asset(), index, bid, salt(3))
        .unwrap_err();
    assert_eq!(mismatch, AuctionError::CommitmentMismatch);
    assert_eq!(mismatch.kind(), AuctionErrorKind::BusinessRule);

    house.reveal_bid(ALICE, asset(), index, bid, salt(1)).unwrap();
    assert_eq!(
        house.reveal_bid(ALICE, asset(), index, bid, salt(1)),
        Err(AuctionError::AlreadyRevealed)
    );
}

#[test]
fn withdrawal_rules() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();

    let bids = [
        (ALICE, RESERVE + 5, 1),
        (BOB, RESERVE + 3, 2),
        (CAROL, RESERVE + 9, 3),
    ];
    for (bidder, bid, s) in bids {
        let commitment = commitment(bid, salt(s), index);
        house
            .commit_bid(bidder, asset(), index, commitment, units_to_wei(bid))
            .unwrap();
    }

    world.start_reveal();
    house.reveal_bid(ALICE, asset(), index, RESERVE + 5, salt(1)).unwrap();
    house.reveal_bid(BOB, asset(), index, RESERVE + 3, salt(2)).unwrap();

    assert_eq!(
        house.withdraw_collateral(ALICE, asset(), index),
        Err(AuctionError::WinnerCannotWithdraw)
    );
    assert_eq!(
        house.withdraw_collateral(CAROL, asset(), index),
        Err(AuctionError::NotRevealed)
    );
    assert_eq!(
        house.withdraw_collateral(BOB, asset(), index).unwrap(),
        units_to_wei(RESERVE + 3)
    );
    assert_eq!(
        house.withdraw_collateral(BOB, asset(), index).unwrap(),
        U256::zero()
    );

    world.end_reveal();
    let settlement = house.end_auction(asset()).unwrap();
    assert_eq!(settlement.winner, Some(ALICE));
    assert_eq!(settlement.price, RESERVE + 3);

    // Carol never revealed: her collateral stays with the house.
    assert_eq!(
        house.withdraw_collateral(CAROL, asset(), index),
        Err(AuctionError::NotRevealed)
    );
    assert_eq!(world.balance(HOUSE), units_to_wei(RESERVE + 9));
    assert_eq!(
        house.withdraw_collateral(ALICE, asset(), index).unwrap(),
        U256::zero()
    );
}

#[test]
fn ends_early_once_every_bid_is_revealed() {
    let world = World::new();
    let house = house(&world);
    let index = house.create_auction(SELLER, asset(), params()).unwrap();
    let bid = RESERVE + 1;

    house
        .commit_bid(ALICE, asset(), index, commitment(bid, salt(1), index), units_to_wei(bid))
        .unwrap();

    assert!(matches!(
        house.end_auction(asset()),
        Err(AuctionError::NotInPhase {
            actual: Phase::BiddingOpen,
            ..
        })
    ));

    world.start_reveal();
    assert!(matches!(
        house.end_auction(asset()),
        Err(AuctionError::NotInPhase {
            actual: Phase::RevealOpen,
            ..
        })
    ));

    house.reveal_bid(ALICE, asset(), index, bid, salt(1)).unwrap();
    let settlement = house.end_auction(asset()).unwrap();
    assert_eq!(settlement.winner, Some(ALICE));
    assert_eq!(settlement.price, RESERVE);
    assert_eq!(world.balance(SELLER), units_to_wei(RESERVE));
}

#[test]
fn auctions_of_an_asset_are_numbered() {
    let world = World::new();
    let house = house(&world);

    assert_eq!(house.create_auction(SELLER, asset(), params()), Ok(1));
    assert_eq!(
        house.create_auction(SELLER, asset(), params()),
        Err(AuctionError::AuctionAlreadyActive(asset()))
    );

    world.end_reveal();
    house.end_auction(asset()).unwrap();
    assert_eq!(world.owner(), SELLER);

    assert_eq!(house.create_auction(SELLER, asset(), params()), Ok(2));
    assert!(matches!(
        house.create_auction(SELLER, common::asset_with_id(7), params()),
        Err(AuctionError::Ledger(_))
    ));
}

#[test]
fn rejects_empty_periods() {
    let world = World::new();
    let house = house(&world);

    let mut bad = params();
    bad.reveal_period = 0;
    assert_eq!(
        house.create_auction(SELLER, asset(), bad),
        Err(AuctionError::InvalidPeriod {
            bid_period: BID_PERIOD,
            reveal_period: 0
        })
    );
    assert_eq!(world.owner(), SELLER);
}

#[test]
fn receiver_hook_cannot_reenter() {
    let world = World::new();
    let house = Arc::new(house(&world));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let weak = Arc::downgrade(&house);
    let hook_seen = seen.clone();
    world
        .assets
        .set_receiver_hook(Arc::new(move |asset: &AssetId, _: Address, _: Address| {
            if let Some(house) = weak.upgrade() {
                hook_seen.lock().push(house.end_auction(*asset));
            }
        }));

    let index = house.create_auction(SELLER, asset(), params()).unwrap();
    assert_eq!(*seen.lock(), vec![Err(AuctionError::Reentrancy)]);
    assert_eq!(
        seen.lock()[0].as_ref().unwrap_err().kind(),
        AuctionErrorKind::Reentrancy
    );

    world.end_reveal();
    house.end_auction(asset()).unwrap();
    assert_eq!(seen.lock().len(), 2);
    assert_eq!(seen.lock()[1], Err(AuctionError::Reentrancy));

    // The guard is released after every call.
    assert_eq!(house.create_auction(SELLER, asset(), params()), Ok(index + 1));
}

#[test]
fn random_bids_settle_at_the_second_price() {
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..20 {
        let world = World::new();
        let house = house(&world);
        let index = house.create_auction(SELLER, asset(), params()).unwrap();

        let bidders = [ALICE, BOB, CAROL];
        let bids: Vec<BidUnits> = bidders
            .iter()
            .map(|_| rng.gen_range(RESERVE - 50..RESERVE + 50))
            .collect();

        for (s, (bidder, bid)) in bidders.iter().zip(&bids).enumerate() {
            let collateral = units_to_wei(bid + rng.gen_range(0..100));
            let commitment = commitment(*bid, salt(s as u8), index);
            house
                .commit_bid(*bidder, asset(), index, commitment, collateral)
                .unwrap();
        }

        world.start_reveal();
        for (s, (bidder, bid)) in bidders.iter().zip(&bids).enumerate() {
            house
                .reveal_bid(*bidder, asset(), index, *bid, salt(s as u8))
                .unwrap();
        }

        let settlement = house.end_auction(asset()).unwrap();

        let mut sorted = bids.clone();
        sorted.sort_unstable();
        let (highest, second) = (sorted[2], sorted[1].max(RESERVE));
        match highest > RESERVE && sorted[1] < highest {
            true => {
                let winner = bids.iter().position(|b| *b == highest).unwrap();
                assert_eq!(settlement.winner, Some(bidders[winner]));
                assert_eq!(settlement.price, second);
                assert_eq!(world.balance(SELLER), units_to_wei(second));
            }
            // Ties go to the first revealed bid.
            false if highest > RESERVE => {
                let winner = bids.iter().position(|b| *b == highest).unwrap();
                assert_eq!(settlement.winner, Some(bidders[winner]));
                assert_eq!(settlement.price, highest);
            }
            false => {
                assert_eq!(settlement.winner, None);
                assert_eq!(world.owner(), SELLER);
            }
        }
    }
}
