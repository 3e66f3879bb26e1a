//! State and lifecycle steps shared by every auction variant.

use ethereum_types::{Address, U256};
use log::{debug, info};
use vickrey_common::units_to_wei;

use crate::{
    error::{AuctionError, AuctionResult},
    guard::{NonReentrant, ReentrancyGuard},
    ledger::{AssetRegistry, Ledger, LedgerError},
    store::{AuctionStore, BidKey},
    types::{AssetId, Auction, AuctionIndex, AuctionParams, Phase, Settlement},
};

/// An auction house: its own account on the ledger, the collaborators it
/// calls into and the records it owns.
///
/// The house takes custody of auctioned assets and (depending on the variant)
/// of bid collateral, so `address` must be an account only the house moves
/// value out of.
#[derive(Debug)]
pub struct AuctionCore<L, A, S> {
    address: Address,
    ledger: L,
    assets: A,
    store: S,
    lock: NonReentrant,
}

impl<L, A, S> AuctionCore<L, A, S>
where
    L: Ledger,
    A: AssetRegistry,
    S: AuctionStore,
{
    /// Creates a house operating from `address`.
    pub fn new(address: Address, ledger: L, assets: A, store: S) -> Self {
        Self {
            address,
            ledger,
            assets,
            store,
            lock: NonReentrant::new(),
        }
    }

    /// The house's own account.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The ledger the house runs on.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The asset registry auctioned assets live in.
    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// The records of the house.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active auction of an asset.
    pub fn auction(&self, asset: &AssetId) -> Option<Auction> {
        self.store.auction(asset)
    }

    /// The phase of the auction of an asset right now.
    pub fn phase(&self, asset: &AssetId) -> Phase {
        self.store
            .auction(asset)
            .map_or(Phase::NoAuction, |a| a.phase(self.ledger.timestamp()))
    }

    /// A bid record.
    pub fn bid(&self, asset: AssetId, index: AuctionIndex, bidder: Address) -> Option<S::Bid> {
        self.store.bid(&BidKey::new(asset, index, bidder))
    }

    pub(crate) fn enter(&self) -> AuctionResult<ReentrancyGuard<'_>> {
        self.lock.enter()
    }

    /// Pulls the asset from the seller and opens bidding on it.
    ///
    /// The house must be approved by the seller in the asset registry.
    pub(crate) fn create_auction(
        &self,
        seller: Address,
        asset: AssetId,
        params: AuctionParams,
    ) -> AuctionResult<AuctionIndex> {
        if self.store.auction(&asset).is_some() {
            return Err(AuctionError::AuctionAlreadyActive(asset));
        }

        let now = self.ledger.timestamp();
        let invalid_period = AuctionError::InvalidPeriod {
            bid_period: params.bid_period,
            reveal_period: params.reveal_period,
        };
        if params.bid_period == 0 || params.reveal_period == 0 {
            return Err(invalid_period);
        }

        let end_of_bidding = now
            .checked_add(params.bid_period)
            .ok_or_else(|| invalid_period.clone())?;
        let end_of_revealing = end_of_bidding
            .checked_add(params.reveal_period)
            .ok_or(invalid_period)?;

        self.assets
            .transfer_from_authorized(self.address, seller, self.address, &asset)?;

        let index = self.store.next_index(&asset);
        self.store.put_auction(
            asset,
            Auction::new(
                seller,
                index,
                end_of_bidding,
                end_of_revealing,
                params.reserve_price,
            ),
        );

        info!(
            "Opened auction {} of {} (reserve {}, bidding until {}, revealing until {})",
            index, asset, params.reserve_price, end_of_bidding, end_of_revealing
        );

        Ok(index)
    }

    /// The active auction of `asset`, if it is in phase `expected`.
    pub(crate) fn auction_in_phase(
        &self,
        asset: &AssetId,
        expected: Phase,
    ) -> AuctionResult<Auction> {
        let auction = self
            .store
            .auction(asset)
            .ok_or(AuctionError::NoActiveAuction(*asset))?;

        let actual = auction.phase(self.ledger.timestamp());
        match actual == expected {
            false => Err(AuctionError::NotInPhase {
                asset: *asset,
                expected,
                actual,
            }),
            true => Ok(auction),
        }
    }

    /// Moves wei out of the house (or out of an escrow the house controls).
    /// Zero amounts are skipped.
    pub(crate) fn pay(&self, from: Address, to: Address, amount: U256) -> AuctionResult<()> {
        if amount.is_zero() {
            return Ok(());
        }

        self.ledger.transfer_value(from, to, amount)?;
        debug!("Paid {} wei from {:?} to {:?}", amount, from, to);

        Ok(())
    }

    /// Sends the whole balance of an escrow to `to` and returns the amount.
    pub(crate) fn sweep_escrow(&self, escrow: Address, to: Address) -> AuctionResult<U256> {
        let balance = self.ledger.balance_of(&escrow);
        self.pay(escrow, to, balance)?;

        Ok(balance)
    }

    /// Delivers the asset and pays the seller the second highest bid out of
    /// `funds`, refunding whatever `funds` holds above that to the winner.
    /// Without a winner the asset goes back to the seller.
    ///
    /// Nothing moves unless every step succeeds: `funds` is checked to cover
    /// both payments, then the asset is delivered, then value is paid out.
    ///
    /// The auction record is removed, which lets the asset be auctioned again.
    pub(crate) fn settle(
        &self,
        asset: &AssetId,
        auction: &Auction,
        funds: Address,
        winner_collateral: U256,
    ) -> AuctionResult<Settlement> {
        let settlement = match auction.highest_bidder {
            None => {
                self.assets.transfer(self.address, auction.seller, asset)?;
                info!(
                    "Auction {} of {} ended without a bid above the reserve",
                    auction.index, asset
                );

                Settlement {
                    winner: None,
                    price: 0,
                    winner_refund: U256::zero(),
                }
            }
            Some(winner) => {
                let price = units_to_wei(auction.second_highest_bid);
                let winner_refund = winner_collateral.saturating_sub(price);

                let needed = price + winner_refund;
                let available = self.ledger.balance_of(&funds);
                if available < needed {
                    return Err(LedgerError::InsufficientBalance {
                        account: funds,
                        balance: available,
                        needed,
                    }
                    .into());
                }

                // Delivery may be refused by the receiver, so it goes before
                // any value leaves `funds`.
                self.assets.transfer(self.address, winner, asset)?;
                self.pay(funds, auction.seller, price)?;
                self.pay(funds, winner, winner_refund)?;
                info!(
                    "Auction {} of {} won by {:?} at {} (highest bid {})",
                    auction.index, asset, winner, auction.second_highest_bid, auction.highest_bid
                );

                Settlement {
                    winner: Some(winner),
                    price: auction.second_highest_bid,
                    winner_refund,
                }
            }
        };

        self.store.remove_auction(asset);

        Ok(settlement)
    }
}
