//! The over-collateralized auction.
//!
//! Bidders send collateral together with their commitment. Since the amount
//! sent is public, a bidder hides their bid by sending more than it. A reveal
//! whose collateral does not cover the bid is ignored and refunded. The
//! collateral of a bid that is never revealed stays locked in the house.

use ethereum_types::{Address, H256, U256};
use log::debug;
use vickrey_common::units_to_wei;

use crate::{
    commitment::bid_commitment,
    error::{AuctionError, AuctionResult},
    house::AuctionCore,
    ledger::{AssetRegistry, Ledger},
    store::{AuctionStore, BidKey, MemoryStore},
    types::{
        AssetId, AuctionIndex, AuctionParams, BidUnits, Phase, RevealOutcome, Settlement,
    },
};

/// What the house remembers about a committed bid.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollateralBid {
    /// Hash of the hidden bid, see [`bid_commitment`].
    pub commitment: H256,
    /// Wei held by the house for this bid.
    pub collateral: U256,
    /// Whether the bid was revealed.
    pub revealed: bool,
}

/// An auction house running over-collateralized auctions.
#[derive(Debug)]
pub struct OverCollateralizedAuction<L, A, S = MemoryStore<CollateralBid>> {
    core: AuctionCore<L, A, S>,
}

impl<L: Ledger, A: AssetRegistry> OverCollateralizedAuction<L, A> {
    /// A house keeping its records in memory.
    pub fn in_memory(address: Address, ledger: L, assets: A) -> Self {
        Self::new(address, ledger, assets, MemoryStore::new())
    }
}

impl<L, A, S> OverCollateralizedAuction<L, A, S>
where
    L: Ledger,
    A: AssetRegistry,
    S: AuctionStore<Bid = CollateralBid>,
{
    /// Creates a house operating from `address`.
    pub fn new(address: Address, ledger: L, assets: A, store: S) -> Self {
        Self {
            core: AuctionCore::new(address, ledger, assets, store),
        }
    }

    /// State and collaborators of the house.
    pub fn core(&self) -> &AuctionCore<L, A, S> {
        &self.core
    }

    /// Takes custody of `asset` and opens bidding on it.
    pub fn create_auction(
        &self,
        seller: Address,
        asset: AssetId,
        params: AuctionParams,
    ) -> AuctionResult<AuctionIndex> {
        let _guard = self.core.enter()?;
        self.core.create_auction(seller, asset, params)
    }

    /// Commits to a hidden bid and moves `collateral` wei from the bidder to
    /// the house.
    ///
    /// Committing again replaces the commitment and adds to the collateral.
    pub fn commit_bid(
        &self,
        bidder: Address,
        asset: AssetId,
        index: AuctionIndex,
        commitment: H256,
        collateral: U256,
    ) -> AuctionResult<()> {
        let _guard = self.core.enter()?;

        let mut auction = self.core.auction_in_phase(&asset, Phase::BiddingOpen)?;
        check_index(auction.index, index)?;

        let key = BidKey::new(asset, index, bidder);
        let existing = self.core.store().bid(&key);

        self.core.pay(bidder, self.core.address(), collateral)?;

        let record = match existing {
            Some(prev) => CollateralBid {
                commitment,
                collateral: prev.collateral + collateral,
                revealed: false,
            },
            None => {
                auction.num_unrevealed += 1;
                self.core.store().put_auction(asset, auction);

                CollateralBid {
                    commitment,
                    collateral,
                    revealed: false,
                }
            }
        };

        debug!(
            "{:?} committed to a bid on {} with {} wei in total",
            bidder, asset, record.collateral
        );
        self.core.store().put_bid(key, record);

        Ok(())
    }

    /// Opens a committed bid.
    ///
    /// Fails if the bid and salt do not match the commitment. A bid the
    /// collateral does not cover is refunded and has no effect.
    pub fn reveal_bid(
        &self,
        bidder: Address,
        asset: AssetId,
        index: AuctionIndex,
        bid: BidUnits,
        salt: H256,
    ) -> AuctionResult<RevealOutcome> {
        let _guard = self.core.enter()?;

        let mut auction = self.core.auction_in_phase(&asset, Phase::RevealOpen)?;
        check_index(auction.index, index)?;

        let key = BidKey::new(asset, index, bidder);
        let mut record = self
            .core
            .store()
            .bid(&key)
            .ok_or(AuctionError::NoCommitment)?;

        if record.revealed {
            return Err(AuctionError::AlreadyRevealed);
        }

        if bid_commitment(salt, bid, &asset, index) != record.commitment {
            return Err(AuctionError::CommitmentMismatch);
        }

        let outcome = match record.collateral < units_to_wei(bid) {
            true => {
                let refunded = record.collateral;
                self.core.pay(self.core.address(), bidder, refunded)?;
                record.collateral = U256::zero();

                RevealOutcome::InsufficientCollateral { refunded }
            }
            false => RevealOutcome::Accepted(auction.record_bid(bidder, bid, None)),
        };

        record.revealed = true;
        auction.num_unrevealed = auction.num_unrevealed.saturating_sub(1);
        debug!("{:?} revealed {} on {}: {:?}", bidder, bid, asset, outcome);

        self.core.store().put_bid(key, record);
        self.core.store().put_auction(asset, auction);

        Ok(outcome)
    }

    /// Returns the collateral of a revealed bid that is not currently
    /// winning.
    pub fn withdraw_collateral(
        &self,
        bidder: Address,
        asset: AssetId,
        index: AuctionIndex,
    ) -> AuctionResult<U256> {
        let _guard = self.core.enter()?;

        let key = BidKey::new(asset, index, bidder);
        let mut record = self
            .core
            .store()
            .bid(&key)
            .ok_or(AuctionError::NoCommitment)?;

        if !record.revealed {
            return Err(AuctionError::NotRevealed);
        }

        let is_winning = self
            .core
            .auction(&asset)
            .is_some_and(|a| a.index == index && a.highest_bidder == Some(bidder));
        if is_winning {
            return Err(AuctionError::WinnerCannotWithdraw);
        }

        let amount = record.collateral;
        self.core.pay(self.core.address(), bidder, amount)?;

        record.collateral = U256::zero();
        self.core.store().put_bid(key, record);

        Ok(amount)
    }

    /// Settles the auction once the reveal period is over, or as soon as
    /// every commitment has been revealed.
    ///
    /// The seller is paid the second highest bid out of the winner's
    /// collateral and the rest of that collateral goes back to the winner.
    pub fn end_auction(&self, asset: AssetId) -> AuctionResult<Settlement> {
        let _guard = self.core.enter()?;

        let auction = self
            .core
            .auction(&asset)
            .ok_or(AuctionError::NoActiveAuction(asset))?;

        let actual = auction.phase(self.core.ledger().timestamp());
        let all_revealed = actual == Phase::RevealOpen && auction.num_unrevealed == 0;
        if actual != Phase::Ended && !all_revealed {
            return Err(AuctionError::NotInPhase {
                asset,
                expected: Phase::Ended,
                actual,
            });
        }

        let winner_key = auction
            .highest_bidder
            .map(|winner| BidKey::new(asset, auction.index, winner));
        let winner_record = winner_key.and_then(|key| self.core.store().bid(&key));
        let collateral = winner_record
            .as_ref()
            .map_or(U256::zero(), |r| r.collateral);

        let settlement = self
            .core
            .settle(&asset, &auction, self.core.address(), collateral)?;

        if let (Some(key), Some(record)) = (winner_key, winner_record) {
            self.core.store().put_bid(
                key,
                CollateralBid {
                    collateral: U256::zero(),
                    ..record
                },
            );
        }

        Ok(settlement)
    }
}

fn check_index(expected: AuctionIndex, actual: AuctionIndex) -> AuctionResult<()> {
    match expected == actual {
        false => Err(AuctionError::WrongAuctionIndex { expected, actual }),
        true => Ok(()),
    }
}
