//! Errors returned by auction operations.

use balance_proof::{ProofError, ProofErrorKind};
use thiserror::Error;

use crate::{
    ledger::LedgerError,
    types::{AssetId, AuctionIndex, Phase},
};

/// Stores the result of auction operations. Returns an [`AuctionError`] upon
/// failure.
pub type AuctionResult<T> = Result<T, AuctionError>;

/// The broad category of an [`AuctionError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AuctionErrorKind {
    /// The call came outside its time window and may succeed later.
    Timing,
    /// The call breaks a rule of the auction.
    BusinessRule,
    /// A collateral proof was rejected.
    Proof(ProofErrorKind),
    /// The ledger reverted a transfer.
    Ledger,
    /// The call was made from inside another auction call.
    Reentrancy,
}

/// An auction operation that was rejected. A rejected operation leaves no
/// trace in the auction state.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum AuctionError {
    /// There is no auction of the asset.
    #[error("No active auction for asset {0}")]
    NoActiveAuction(AssetId),

    /// The asset is already being auctioned.
    #[error("Asset {0} is already being auctioned")]
    AuctionAlreadyActive(AssetId),

    /// A period of zero length, or one ending past the end of time.
    #[error("Invalid auction periods (bidding: {bid_period}s, revealing: {reveal_period}s)")]
    InvalidPeriod {
        /// Requested bidding period.
        bid_period: u64,
        /// Requested reveal period.
        reveal_period: u64,
    },

    /// The operation is not allowed in the current phase.
    #[error("Auction of {asset} is {actual} but the operation requires it to be {expected}")]
    NotInPhase {
        /// The auctioned asset.
        asset: AssetId,
        /// Phase the operation requires.
        expected: Phase,
        /// Phase the auction is in.
        actual: Phase,
    },

    /// The bid targets a different auction of the asset.
    #[error("Bid is for auction {actual} but the active auction is {expected}")]
    WrongAuctionIndex {
        /// Index of the active auction.
        expected: AuctionIndex,
        /// Index given by the bidder.
        actual: AuctionIndex,
    },

    /// The bidder never committed to a bid.
    #[error("No commitment found for this bidder")]
    NoCommitment,

    /// The revealed bid and salt do not hash to the commitment.
    #[error("Revealed bid does not match the commitment")]
    CommitmentMismatch,

    /// The bid was already revealed.
    #[error("Bid was already revealed")]
    AlreadyRevealed,

    /// Collateral of an unrevealed bid stays locked.
    #[error("Bid was never revealed so its collateral is forfeit")]
    NotRevealed,

    /// The current winner's collateral pays for the asset.
    #[error("The highest bidder cannot withdraw collateral before settlement")]
    WinnerCannotWithdraw,

    /// The ledger has no hash for the block the collateral deadline refers to.
    #[error("No block hash is available for block {0}")]
    MissingBlockHash(u64),

    /// The collateral deadline was requested in block 0, which has no
    /// preceding block to pin.
    #[error("Block 0 has no preceding block to pin the collateral deadline to")]
    NoPrecedingBlock,

    /// A state-mutating operation was entered while another was running.
    #[error("Reentrant call into the auction house")]
    Reentrancy,

    /// The collateral proof was rejected.
    #[error("Collateral proof rejected: {0}")]
    Proof(#[from] ProofError),

    /// A transfer reverted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl AuctionError {
    /// Which category this error belongs to.
    pub const fn kind(&self) -> AuctionErrorKind {
        match self {
            AuctionError::NotInPhase { .. }
            | AuctionError::MissingBlockHash(_)
            | AuctionError::NoPrecedingBlock => AuctionErrorKind::Timing,
            AuctionError::Proof(e) => AuctionErrorKind::Proof(e.kind()),
            AuctionError::Ledger(_) => AuctionErrorKind::Ledger,
            AuctionError::Reentrancy => AuctionErrorKind::Reentrancy,
            _ => AuctionErrorKind::BusinessRule,
        }
    }
}
