//! Identifiers, parameters and the per-auction record shared by every auction
//! variant.

use std::fmt::{self, Display};

use ethereum_types::{Address, H256, U256};

/// A bid amount, in multiples of [`vickrey_common::BID_BASE_UNIT_GWEI`].
pub type BidUnits = u64;

/// Sequence number of an auction of a given asset. The first auction is `1`.
pub type AuctionIndex = u64;

/// Seconds since the unix epoch.
pub type Timestamp = u64;

/// A unique asset: a token of a collection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AssetId {
    /// The collection (token contract) the asset belongs to.
    pub collection: Address,
    /// The token inside the collection.
    pub token_id: U256,
}

impl AssetId {
    /// Creates a new asset identifier.
    pub const fn new(collection: Address, token_id: U256) -> Self {
        Self {
            collection,
            token_id,
        }
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.collection, self.token_id)
    }
}

/// Parameters a seller picks when putting an asset up for auction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AuctionParams {
    /// Length of the bidding period in seconds.
    pub bid_period: u64,
    /// Length of the reveal period in seconds.
    pub reveal_period: u64,
    /// Bids must exceed this to win.
    pub reserve_price: BidUnits,
}

/// Where in its lifecycle the auction of an asset is.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Phase {
    /// No auction exists for the asset.
    NoAuction,
    /// Commitments are accepted.
    BiddingOpen,
    /// Bids are revealed.
    RevealOpen,
    /// The reveal period is over and the auction waits to be settled.
    Ended,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::NoAuction => "no auction",
            Phase::BiddingOpen => "bidding",
            Phase::RevealOpen => "revealing",
            Phase::Ended => "ended",
        };

        write!(f, "{}", s)
    }
}

/// The bidder pushed out of first place by a higher bid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Displaced {
    /// The previous highest bidder.
    pub bidder: Address,
    /// The escrow holding their collateral, for variants that use escrows.
    pub escrow: Option<Address>,
}

/// Effect of a valid reveal on the highest and second highest bids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TournamentOutcome {
    /// The bid is the new highest. The old highest became the second highest.
    NewHighest {
        /// The previous highest bidder, unless the old highest was the
        /// reserve price.
        displaced: Option<Displaced>,
    },
    /// The bid only replaced the second highest.
    NewSecond,
    /// The bid does not beat the second highest.
    NoEffect,
}

/// What a reveal did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevealOutcome {
    /// The bid was collateralized and took part in the tournament.
    Accepted(TournamentOutcome),
    /// The collateral did not cover the bid. It was handed back and the bid
    /// is ignored.
    InsufficientCollateral {
        /// Wei returned to the bidder.
        refunded: U256,
    },
}

/// The result of settling an auction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Settlement {
    /// The bidder that received the asset, if any bid beat the reserve.
    pub winner: Option<Address>,
    /// The price the winner paid (the second highest bid).
    pub price: BidUnits,
    /// Collateral above the price returned to the winner, in wei.
    pub winner_refund: U256,
}

/// The live record of an asset's current auction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Auction {
    /// Account that put the asset up and receives the proceeds.
    pub seller: Address,
    /// Sequence number of this auction for the asset.
    pub index: AuctionIndex,
    /// Last second at which commitments are accepted.
    pub end_of_bidding: Timestamp,
    /// Last second at which bids can be revealed.
    pub end_of_revealing: Timestamp,
    /// Current highest bid. Starts at the reserve price.
    pub highest_bid: BidUnits,
    /// Current second highest bid. Starts at the reserve price.
    pub second_highest_bid: BidUnits,
    /// Bidder of `highest_bid`, `None` while nobody beat the reserve.
    pub highest_bidder: Option<Address>,
    /// Escrow holding the winning collateral, for escrow based variants.
    pub winning_escrow: Option<Address>,
    /// Block hash the collateral of every reveal is proven against. Pinned by
    /// the first reveal.
    pub collateralization_deadline: Option<H256>,
    /// Commitments that were made but not revealed yet.
    pub num_unrevealed: u64,
}

impl Auction {
    /// A fresh auction with no bids.
    pub fn new(
        seller: Address,
        index: AuctionIndex,
        end_of_bidding: Timestamp,
        end_of_revealing: Timestamp,
        reserve_price: BidUnits,
    ) -> Self {
        debug_assert!(end_of_bidding < end_of_revealing);

        Self {
            seller,
            index,
            end_of_bidding,
            end_of_revealing,
            highest_bid: reserve_price,
            second_highest_bid: reserve_price,
            highest_bidder: None,
            winning_escrow: None,
            collateralization_deadline: None,
            num_unrevealed: 0,
        }
    }

    /// The phase of this auction at `now`.
    pub const fn phase(&self, now: Timestamp) -> Phase {
        if now <= self.end_of_bidding {
            Phase::BiddingOpen
        } else if now <= self.end_of_revealing {
            Phase::RevealOpen
        } else {
            Phase::Ended
        }
    }

    /// Applies a collateralized bid to the two-tier tournament.
    pub fn record_bid(
        &mut self,
        bidder: Address,
        bid: BidUnits,
        escrow: Option<Address>,
    ) -> TournamentOutcome {
        if bid > self.highest_bid {
            let displaced = self.highest_bidder.map(|bidder| Displaced {
                bidder,
                escrow: self.winning_escrow,
            });

            self.second_highest_bid = self.highest_bid;
            self.highest_bid = bid;
            self.highest_bidder = Some(bidder);
            self.winning_escrow = escrow;

            TournamentOutcome::NewHighest { displaced }
        } else if bid > self.second_highest_bid {
            self.second_highest_bid = bid;
            TournamentOutcome::NewSecond
        } else {
            TournamentOutcome::NoEffect
        }
    }
}
