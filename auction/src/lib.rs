//! Sealed-bid second-price (Vickrey) auctions.
//!
//! Bidders first commit to a hidden bid and reveal it once bidding closes.
//! The highest revealed bid wins and pays the second highest one. Three
//! variants differ in how a bid is backed by collateral:
//!
//! - [`OverCollateralizedAuction`]: collateral is sent to the house along
//!   with the commitment, so bidders hide their bid by sending more than it.
//! - [`SneakyAuction`]: collateral sits in an escrow address only the bidder
//!   can derive before the reveal. Its live balance is checked on reveal.
//! - [`SneakyProofAuction`]: as above, but the balance is proven as of a
//!   historical block with [`balance_proof`], so late top-ups do not count.
//!
//! The houses talk to the outside world through the [`Ledger`] and
//! [`AssetRegistry`] traits and keep their records in an [`AuctionStore`].
//! Every operation is guarded against reentrant calls coming back through
//! those collaborators.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod commitment;
pub mod error;
pub mod guard;
pub mod house;
pub mod ledger;
pub mod overcollateralized;
pub mod sneaky;
pub mod sneaky_proof;
pub mod store;
pub mod types;

pub use error::{AuctionError, AuctionErrorKind, AuctionResult};
pub use ledger::{AssetRegistry, InMemoryAssets, InMemoryLedger, Ledger, LedgerError};
pub use overcollateralized::{CollateralBid, OverCollateralizedAuction};
pub use sneaky::{SneakyAuction, SneakyBid};
pub use sneaky_proof::{CollateralProof, SneakyProofAuction};
pub use store::{AuctionStore, BidKey, MemoryStore};
pub use types::{
    AssetId, Auction, AuctionIndex, AuctionParams, BidUnits, Displaced, Phase, RevealOutcome,
    Settlement, TournamentOutcome,
};
