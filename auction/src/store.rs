//! Persistence of auction and bid records.

use std::{collections::HashMap, fmt::Debug};

use ethereum_types::Address;
use parking_lot::Mutex;

use crate::types::{AssetId, Auction, AuctionIndex};

/// Identifies the bid of one bidder in one auction of an asset.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BidKey {
    /// The auctioned asset.
    pub asset: AssetId,
    /// The auction of the asset.
    pub index: AuctionIndex,
    /// The bidder.
    pub bidder: Address,
}

impl BidKey {
    /// Creates a new key.
    pub const fn new(asset: AssetId, index: AuctionIndex, bidder: Address) -> Self {
        Self {
            asset,
            index,
            bidder,
        }
    }
}

/// Records owned by an auction house.
///
/// Every method takes `&self`: implementations synchronize internally and
/// never hold a lock once a call returns, so the house is free to call out to
/// the ledger between store accesses.
pub trait AuctionStore {
    /// What a variant remembers about each bid.
    type Bid: Clone + Debug;

    /// The active auction of an asset.
    fn auction(&self, asset: &AssetId) -> Option<Auction>;

    /// Inserts or replaces the active auction of an asset.
    fn put_auction(&self, asset: AssetId, auction: Auction);

    /// Removes the active auction of an asset.
    fn remove_auction(&self, asset: &AssetId) -> Option<Auction>;

    /// Index of the most recent auction of an asset, active or not.
    fn latest_index(&self, asset: &AssetId) -> Option<AuctionIndex>;

    /// Reserves the index of the next auction of an asset.
    fn next_index(&self, asset: &AssetId) -> AuctionIndex;

    /// A bid record.
    fn bid(&self, key: &BidKey) -> Option<Self::Bid>;

    /// Inserts or replaces a bid record.
    fn put_bid(&self, key: BidKey, bid: Self::Bid);
}

#[derive(Debug)]
struct StoreInner<B> {
    auctions: HashMap<AssetId, Auction>,
    indices: HashMap<AssetId, AuctionIndex>,
    bids: HashMap<BidKey, B>,
}

impl<B> Default for StoreInner<B> {
    fn default() -> Self {
        Self {
            auctions: HashMap::new(),
            indices: HashMap::new(),
            bids: HashMap::new(),
        }
    }
}

/// An [`AuctionStore`] kept in memory.
#[derive(Debug)]
pub struct MemoryStore<B> {
    inner: Mutex<StoreInner<B>>,
}

impl<B> Default for MemoryStore<B> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }
}

impl<B> MemoryStore<B> {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Clone + Debug> AuctionStore for MemoryStore<B> {
    type Bid = B;

    fn auction(&self, asset: &AssetId) -> Option<Auction> {
        self.inner.lock().auctions.get(asset).cloned()
    }

    fn put_auction(&self, asset: AssetId, auction: Auction) {
        self.inner.lock().auctions.insert(asset, auction);
    }

    fn remove_auction(&self, asset: &AssetId) -> Option<Auction> {
        self.inner.lock().auctions.remove(asset)
    }

    fn latest_index(&self, asset: &AssetId) -> Option<AuctionIndex> {
        self.inner.lock().indices.get(asset).copied()
    }

    fn next_index(&self, asset: &AssetId) -> AuctionIndex {
        let mut inner = self.inner.lock();
        let index = inner.indices.entry(*asset).or_default();
        *index += 1;

        *index
    }

    fn bid(&self, key: &BidKey) -> Option<B> {
        self.inner.lock().bids.get(key).cloned()
    }

    fn put_bid(&self, key: BidKey, bid: B) {
        self.inner.lock().bids.insert(key, bid);
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::{Address, U256};

    use super::{AuctionStore, BidKey, MemoryStore};
    use crate::types::{AssetId, Auction};

    #[test]
    fn indices_increase_per_asset() {
        let store = MemoryStore::<()>::new();
        let a = AssetId::new(Address::repeat_byte(1), U256::one());
        let b = AssetId::new(Address::repeat_byte(1), U256::from(2));

        assert_eq!(store.latest_index(&a), None);
        assert_eq!(store.next_index(&a), 1);
        assert_eq!(store.next_index(&a), 2);
        assert_eq!(store.next_index(&b), 1);
        assert_eq!(store.latest_index(&a), Some(2));
    }

    #[test]
    fn records_round_trip() {
        let store = MemoryStore::<u64>::new();
        let asset = AssetId::new(Address::repeat_byte(1), U256::one());
        let auction = Auction::new(Address::repeat_byte(2), 1, 10, 20, 5);

        store.put_auction(asset, auction.clone());
        assert_eq!(store.auction(&asset), Some(auction.clone()));
        assert_eq!(store.remove_auction(&asset), Some(auction));
        assert_eq!(store.auction(&asset), None);

        let key = BidKey::new(asset, 1, Address::repeat_byte(3));
        store.put_bid(key, 7);
        assert_eq!(store.bid(&key), Some(7));
        assert_eq!(store.bid(&BidKey { index: 2, ..key }), None);
        store.put_bid(key, 8);
        assert_eq!(store.bid(&key), Some(8));
    }
}
