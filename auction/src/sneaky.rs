//! The sneaky auction.
//!
//! Nothing is sent to the house while bidding. A bidder funds the
//! [`escrow_address`] derived from their bid and salt, which looks like any
//! other fresh account until the bid is revealed. Collateral is the live
//! balance of that escrow at reveal time.

use ethereum_types::{Address, H256, U256};
use log::debug;
use vickrey_common::units_to_wei;

use crate::{
    commitment::escrow_address,
    error::{AuctionError, AuctionResult},
    house::AuctionCore,
    ledger::{AssetRegistry, Ledger},
    store::{AuctionStore, BidKey, MemoryStore},
    types::{
        AssetId, Auction, AuctionIndex, AuctionParams, BidUnits, Displaced, Phase, RevealOutcome,
        Settlement, TournamentOutcome,
    },
};

/// An accepted reveal in an escrow based auction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SneakyBid {
    /// Escrow holding the collateral.
    pub escrow: Address,
    /// The revealed bid.
    pub bid: BidUnits,
}

/// An auction house running sneaky auctions.
#[derive(Debug)]
pub struct SneakyAuction<L, A, S = MemoryStore<SneakyBid>> {
    core: AuctionCore<L, A, S>,
}

impl<L: Ledger, A: AssetRegistry> SneakyAuction<L, A> {
    /// A house keeping its records in memory.
    pub fn in_memory(address: Address, ledger: L, assets: A) -> Self {
        Self::new(address, ledger, assets, MemoryStore::new())
    }
}

impl<L, A, S> SneakyAuction<L, A, S>
where
    L: Ledger,
    A: AssetRegistry,
    S: AuctionStore<Bid = SneakyBid>,
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

    /// The escrow a bidder has to fund to bid `bid` on the active auction
    /// `index` of `asset`.
    pub fn escrow_address(
        &self,
        asset: &AssetId,
        index: AuctionIndex,
        bidder: Address,
        bid: BidUnits,
        salt: H256,
    ) -> Address {
        escrow_address(self.core.address(), asset, index, bidder, bid, salt)
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

    /// Reveals a bid on the active auction of `asset`.
    ///
    /// A wrong salt points at an empty escrow and so reads as a bid without
    /// collateral.
    pub fn reveal_bid(
        &self,
        bidder: Address,
        asset: AssetId,
        bid: BidUnits,
        salt: H256,
    ) -> AuctionResult<RevealOutcome> {
        let _guard = self.core.enter()?;

        let mut auction = self.core.auction_in_phase(&asset, Phase::RevealOpen)?;
        let key = BidKey::new(asset, auction.index, bidder);
        if self.core.store().bid(&key).is_some() {
            return Err(AuctionError::AlreadyRevealed);
        }

        let escrow = self.escrow_address(&asset, auction.index, bidder, bid, salt);
        let collateral = self.core.ledger().balance_of(&escrow);

        let outcome = self
            .core
            .apply_escrowed_bid(&mut auction, bidder, bid, escrow, collateral)?;

        if let RevealOutcome::Accepted(_) = outcome {
            self.core.store().put_bid(key, SneakyBid { escrow, bid });
        }
        self.core.store().put_auction(asset, auction);

        Ok(outcome)
    }

    /// Empties the escrow of a bid that can no longer win, such as one that
    /// was never revealed.
    pub fn reclaim_escrow(
        &self,
        bidder: Address,
        asset: AssetId,
        index: AuctionIndex,
        bid: BidUnits,
        salt: H256,
    ) -> AuctionResult<U256> {
        let _guard = self.core.enter()?;

        let escrow = self.escrow_address(&asset, index, bidder, bid, salt);
        self.core.reclaim_escrow(bidder, asset, index, escrow)
    }

    /// Settles the auction after the reveal period. The winning escrow pays
    /// the seller and the rest of it goes back to the winner.
    pub fn end_auction(&self, asset: AssetId) -> AuctionResult<Settlement> {
        let _guard = self.core.enter()?;
        self.core.end_escrowed_auction(asset)
    }
}

impl<L, A, S> AuctionCore<L, A, S>
where
    L: Ledger,
    A: AssetRegistry,
    S: AuctionStore<Bid = SneakyBid>,
{
    /// Runs a revealed bid backed by `collateral` through the tournament and
    /// empties every escrow that stopped mattering.
    ///
    /// Only `auction` is updated. Storing it is left to the caller.
    pub(crate) fn apply_escrowed_bid(
        &self,
        auction: &mut Auction,
        bidder: Address,
        bid: BidUnits,
        escrow: Address,
        collateral: U256,
    ) -> AuctionResult<RevealOutcome> {
        if collateral < units_to_wei(bid) {
            let refunded = self.sweep_escrow(escrow, bidder)?;
            debug!(
                "{:?} revealed {} with {} wei of collateral, bid ignored",
                bidder, bid, collateral
            );

            return Ok(RevealOutcome::InsufficientCollateral { refunded });
        }

        let tournament = auction.record_bid(bidder, bid, Some(escrow));
        match tournament {
            TournamentOutcome::NewHighest {
                displaced:
                    Some(Displaced {
                        bidder: prev,
                        escrow: Some(prev_escrow),
                    }),
            } => {
                self.sweep_escrow(prev_escrow, prev)?;
            }
            TournamentOutcome::NewHighest { .. } => {}
            TournamentOutcome::NewSecond | TournamentOutcome::NoEffect => {
                self.sweep_escrow(escrow, bidder)?;
            }
        }
        debug!("{:?} revealed {}: {:?}", bidder, bid, tournament);

        Ok(RevealOutcome::Accepted(tournament))
    }

    /// Sends the balance of `escrow` back to `bidder` unless it may still
    /// back the winning bid of auction `index`.
    pub(crate) fn reclaim_escrow(
        &self,
        bidder: Address,
        asset: AssetId,
        index: AuctionIndex,
        escrow: Address,
    ) -> AuctionResult<U256> {
        let latest = self.store().latest_index(&asset).unwrap_or_default();
        if index == 0 || index > latest {
            return Err(AuctionError::WrongAuctionIndex {
                expected: latest,
                actual: index,
            });
        }

        if let Some(auction) = self.auction(&asset).filter(|a| a.index == index) {
            let actual = auction.phase(self.ledger().timestamp());
            if actual != Phase::Ended {
                return Err(AuctionError::NotInPhase {
                    asset,
                    expected: Phase::Ended,
                    actual,
                });
            }

            if auction.winning_escrow == Some(escrow) {
                return Err(AuctionError::WinnerCannotWithdraw);
            }
        }

        self.sweep_escrow(escrow, bidder)
    }

    /// Settles an escrow based auction out of its winning escrow.
    pub(crate) fn end_escrowed_auction(&self, asset: AssetId) -> AuctionResult<Settlement> {
        let auction = self.auction_in_phase(&asset, Phase::Ended)?;

        let (funds, collateral) = match auction.winning_escrow {
            Some(escrow) => (escrow, self.ledger().balance_of(&escrow)),
            None => (self.address(), U256::zero()),
        };

        self.settle(&asset, &auction, funds, collateral)
    }
}
