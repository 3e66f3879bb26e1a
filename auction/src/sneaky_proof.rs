//! The sneaky auction with historical collateral proofs.
//!
//! Like [`crate::sneaky`], but the collateral of a bid is the balance its
//! escrow held at the collateralization deadline, a block pinned at the start
//! of the reveal period. Bidders prove that balance with an account proof
//! against the header of that block. Funding an escrow after the deadline
//! does not count, which stops a bidder from topping up once they have seen
//! the other reveals.

use balance_proof::verify_balance;
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use log::{debug, info};

use crate::{
    commitment::escrow_address,
    error::{AuctionError, AuctionResult},
    house::AuctionCore,
    ledger::{AssetRegistry, Ledger},
    sneaky::SneakyBid,
    store::{AuctionStore, BidKey, MemoryStore},
    types::{
        AssetId, Auction, AuctionIndex, AuctionParams, BidUnits, Phase, RevealOutcome, Settlement,
    },
};

/// Evidence of an escrow balance at the collateralization deadline.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollateralProof {
    /// The encoded header of the deadline block.
    pub block_header_rlp: Bytes,
    /// Account proof of the escrow against the header's state root, root
    /// node first.
    pub account_proof: Vec<Bytes>,
}

/// An auction house running sneaky auctions settled with balance proofs.
#[derive(Debug)]
pub struct SneakyProofAuction<L, A, S = MemoryStore<SneakyBid>> {
    core: AuctionCore<L, A, S>,
}

impl<L: Ledger, A: AssetRegistry> SneakyProofAuction<L, A> {
    /// A house keeping its records in memory.
    pub fn in_memory(address: Address, ledger: L, assets: A) -> Self {
        Self::new(address, ledger, assets, MemoryStore::new())
    }
}

impl<L, A, S> SneakyProofAuction<L, A, S>
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

    /// The escrow a bidder has to fund to bid `bid` on auction `index` of
    /// `asset`.
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

    /// Pins the collateralization deadline of the auction of `asset` and
    /// returns its block hash.
    ///
    /// The deadline is the block preceding the current one. Once pinned it
    /// never moves. The first reveal pins it too, so calling this is only
    /// needed to let bidders fetch their proofs before revealing.
    pub fn record_collateralization_deadline(&self, asset: AssetId) -> AuctionResult<H256> {
        let _guard = self.core.enter()?;

        let mut auction = self.core.auction_in_phase(&asset, Phase::RevealOpen)?;
        let deadline = self.pin_deadline(&mut auction)?;
        self.core.store().put_auction(asset, auction);

        Ok(deadline)
    }

    /// Reveals a bid on the active auction of `asset`, proving the escrow
    /// balance at the collateralization deadline.
    ///
    /// A proof that does not check out fails the call. A proof of too small
    /// a balance is the same no-op as in the sneaky auction: the escrow is
    /// emptied back to the bidder.
    pub fn reveal_bid(
        &self,
        bidder: Address,
        asset: AssetId,
        bid: BidUnits,
        salt: H256,
        proof: &CollateralProof,
    ) -> AuctionResult<RevealOutcome> {
        let _guard = self.core.enter()?;

        let mut auction = self.core.auction_in_phase(&asset, Phase::RevealOpen)?;
        let key = BidKey::new(asset, auction.index, bidder);
        if self.core.store().bid(&key).is_some() {
            return Err(AuctionError::AlreadyRevealed);
        }

        let deadline = self.pin_deadline(&mut auction)?;
        let escrow = self.escrow_address(&asset, auction.index, bidder, bid, salt);

        let collateral = verify_balance(
            proof.account_proof.as_slice(),
            &proof.block_header_rlp,
            deadline,
            escrow,
        )?;
        debug!(
            "Proved {} wei in escrow {:?} at deadline {:?}",
            collateral, escrow, deadline
        );

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

    /// The deadline of `auction`, pinning it first if needed. Only the
    /// in-memory copy is updated.
    fn pin_deadline(&self, auction: &mut Auction) -> AuctionResult<H256> {
        if let Some(deadline) = auction.collateralization_deadline {
            return Ok(deadline);
        }

        let ledger = self.core.ledger();
        let number = ledger
            .block_number()
            .checked_sub(1)
            .ok_or(AuctionError::NoPrecedingBlock)?;
        let deadline = ledger
            .block_hash(number)
            .ok_or(AuctionError::MissingBlockHash(number))?;

        info!(
            "Collateralization deadline of auction {} pinned to block {} ({:?})",
            auction.index, number, deadline
        );
        auction.collateralization_deadline = Some(deadline);

        Ok(deadline)
    }
}
