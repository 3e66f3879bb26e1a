//! The host ledger an auction house runs on: native value, block data and
//! asset ownership.
//!
//! The auction logic only talks to these traits. The in-memory
//! implementations back the tests and the fixtures.

use std::{collections::HashMap, sync::Arc};

use ethereum_types::{Address, H256, U256};
use log::trace;
use parking_lot::Mutex;
use thiserror::Error;

use crate::types::{AssetId, Timestamp};

/// Stores the result of ledger operations. Returns a [`LedgerError`] upon
/// failure.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A ledger call that reverted.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum LedgerError {
    /// The sender does not hold enough native value.
    #[error("Account {account:?} holds {balance} wei but {needed} wei were requested")]
    InsufficientBalance {
        /// The paying account.
        account: Address,
        /// Its balance.
        balance: U256,
        /// The requested amount.
        needed: U256,
    },

    /// The asset is not owned by the account trying to move it.
    #[error("Account {account:?} does not own asset {asset}")]
    NotOwner {
        /// The asset.
        asset: AssetId,
        /// The account that claimed ownership.
        account: Address,
    },

    /// The operator has no approval from the owner.
    #[error("Account {operator:?} is not approved to move assets of {owner:?}")]
    NotAuthorized {
        /// The account attempting the transfer.
        operator: Address,
        /// The owner of the asset.
        owner: Address,
    },

    /// The asset was never minted.
    #[error("Unknown asset {0}")]
    UnknownAsset(AssetId),
}

/// Native value and block data.
pub trait Ledger {
    /// Timestamp of the current block.
    fn timestamp(&self) -> Timestamp;

    /// Number of the current block.
    fn block_number(&self) -> u64;

    /// Hash of an earlier block, `None` for the current or a future block.
    fn block_hash(&self, number: u64) -> Option<H256>;

    /// Native balance of an account, in wei.
    fn balance_of(&self, account: &Address) -> U256;

    /// Moves `amount` wei from `from` to `to`.
    fn transfer_value(&self, from: Address, to: Address, amount: U256) -> LedgerResult<()>;
}

/// Ownership of unique assets.
pub trait AssetRegistry {
    /// The current owner of an asset.
    fn owner_of(&self, asset: &AssetId) -> LedgerResult<Address>;

    /// Moves an asset that `from` owns.
    fn transfer(&self, from: Address, to: Address, asset: &AssetId) -> LedgerResult<()>;

    /// Moves an asset on behalf of its owner. `operator` must be the owner or
    /// approved by them.
    fn transfer_from_authorized(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        asset: &AssetId,
    ) -> LedgerResult<()>;
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn timestamp(&self) -> Timestamp {
        (**self).timestamp()
    }

    fn block_number(&self) -> u64 {
        (**self).block_number()
    }

    fn block_hash(&self, number: u64) -> Option<H256> {
        (**self).block_hash(number)
    }

    fn balance_of(&self, account: &Address) -> U256 {
        (**self).balance_of(account)
    }

    fn transfer_value(&self, from: Address, to: Address, amount: U256) -> LedgerResult<()> {
        (**self).transfer_value(from, to, amount)
    }
}

impl<T: AssetRegistry + ?Sized> AssetRegistry for Arc<T> {
    fn owner_of(&self, asset: &AssetId) -> LedgerResult<Address> {
        (**self).owner_of(asset)
    }

    fn transfer(&self, from: Address, to: Address, asset: &AssetId) -> LedgerResult<()> {
        (**self).transfer(from, to, asset)
    }

    fn transfer_from_authorized(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        asset: &AssetId,
    ) -> LedgerResult<()> {
        (**self).transfer_from_authorized(operator, from, to, asset)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    timestamp: Timestamp,
    /// Hashes of every finished block; the current block is number `len`.
    block_hashes: Vec<H256>,
    balances: HashMap<Address, U256>,
}

/// A [`Ledger`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// An empty ledger at time `0` and block `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current timestamp.
    pub fn set_timestamp(&self, timestamp: Timestamp) {
        self.state.lock().timestamp = timestamp;
    }

    /// Moves the clock forward.
    pub fn advance_time(&self, secs: u64) {
        self.state.lock().timestamp += secs;
    }

    /// Finishes the current block with `hash` and starts the next one.
    pub fn push_block(&self, hash: H256) -> u64 {
        let mut state = self.state.lock();
        state.block_hashes.push(hash);

        state.block_hashes.len() as u64
    }

    /// Mints `amount` wei to `account`.
    pub fn credit(&self, account: Address, amount: U256) {
        *self.state.lock().balances.entry(account).or_default() += amount;
    }
}

impl Ledger for InMemoryLedger {
    fn timestamp(&self) -> Timestamp {
        self.state.lock().timestamp
    }

    fn block_number(&self) -> u64 {
        self.state.lock().block_hashes.len() as u64
    }

    fn block_hash(&self, number: u64) -> Option<H256> {
        let state = self.state.lock();
        usize::try_from(number)
            .ok()
            .and_then(|n| state.block_hashes.get(n).copied())
    }

    fn balance_of(&self, account: &Address) -> U256 {
        self.state
            .lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    fn transfer_value(&self, from: Address, to: Address, amount: U256) -> LedgerResult<()> {
        let mut state = self.state.lock();

        let balance = state.balances.get(&from).copied().unwrap_or_default();
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from,
                balance,
                needed: amount,
            });
        }

        state.balances.insert(from, balance - amount);
        *state.balances.entry(to).or_default() += amount;
        trace!("Moved {} wei from {:?} to {:?}", amount, from, to);

        Ok(())
    }
}

/// Called with `(asset, from, to)` after an asset changed hands.
pub type ReceiverHook = Arc<dyn Fn(&AssetId, Address, Address) + Send + Sync>;

#[derive(Debug, Default)]
struct AssetState {
    owners: HashMap<AssetId, Address>,
    /// `(owner, operator)` pairs.
    approvals: Vec<(Address, Address)>,
}

/// An [`AssetRegistry`] kept in memory.
///
/// A receiver hook can be installed to run code (possibly calling back into an
/// auction house) whenever an asset is delivered, like a token receiver
/// callback would.
#[derive(Default)]
pub struct InMemoryAssets {
    state: Mutex<AssetState>,
    hook: Mutex<Option<ReceiverHook>>,
}

impl std::fmt::Debug for InMemoryAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAssets")
            .field("state", &self.state)
            .field("hook", &self.hook.lock().is_some())
            .finish()
    }
}

impl InMemoryAssets {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `asset` owned by `owner`.
    pub fn mint(&self, asset: AssetId, owner: Address) {
        self.state.lock().owners.insert(asset, owner);
    }

    /// Lets `operator` move every asset of `owner`.
    pub fn approve(&self, owner: Address, operator: Address) {
        self.state.lock().approvals.push((owner, operator));
    }

    /// Installs the hook run after every transfer.
    pub fn set_receiver_hook(&self, hook: ReceiverHook) {
        *self.hook.lock() = Some(hook);
    }

    fn move_asset(&self, from: Address, to: Address, asset: &AssetId) -> LedgerResult<()> {
        self.state.lock().owners.insert(*asset, to);

        // The lock is released before the hook so it can call back in.
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(asset, from, to);
        }

        Ok(())
    }

    fn check_owner(&self, from: Address, asset: &AssetId) -> LedgerResult<()> {
        let owner = self.owner_of(asset)?;
        match owner == from {
            false => Err(LedgerError::NotOwner {
                asset: *asset,
                account: from,
            }),
            true => Ok(()),
        }
    }
}

impl AssetRegistry for InMemoryAssets {
    fn owner_of(&self, asset: &AssetId) -> LedgerResult<Address> {
        self.state
            .lock()
            .owners
            .get(asset)
            .copied()
            .ok_or(LedgerError::UnknownAsset(*asset))
    }

    fn transfer(&self, from: Address, to: Address, asset: &AssetId) -> LedgerResult<()> {
        self.check_owner(from, asset)?;
        self.move_asset(from, to, asset)
    }

    fn transfer_from_authorized(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        asset: &AssetId,
    ) -> LedgerResult<()> {
        self.check_owner(from, asset)?;

        let approved = operator == from || self.state.lock().approvals.contains(&(from, operator));
        if !approved {
            return Err(LedgerError::NotAuthorized {
                operator,
                owner: from,
            });
        }

        self.move_asset(from, to, asset)
    }
}
