//! Random states shared by the unit tests and the integration tests.

use ethereum_types::{Address, H256, U256};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{account::AccountState, builder::BlockHeader};

/// An account and the state stored for it.
pub type TestAccountEntry = (Address, AccountState);

/// Installs the test logger.
pub fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

/// `n` distinct addresses with random nonces, balances of every width and
/// random storage roots and code hashes.
pub fn random_accounts(n: usize, seed: u64) -> Vec<TestAccountEntry> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n)
        .map(|i| {
            // The index keeps addresses distinct whatever the rng yields.
            let mut addr = rng.gen::<[u8; 20]>();
            addr[..8].copy_from_slice(&(i as u64).to_be_bytes());

            let balance_bytes = rng.gen_range(0..=32);
            let mut balance = [0; 32];
            rng.fill(&mut balance[32 - balance_bytes..]);

            let account = AccountState {
                nonce: U256::from(rng.gen::<u32>()),
                balance: U256::from_big_endian(&balance),
                storage_root: H256(rng.gen()),
                code_hash: H256(rng.gen()),
            };

            (Address::from(addr), account)
        })
        .collect()
}

/// A header committing to `state_root`, plus its hash.
pub fn header_for_root(state_root: H256) -> (Vec<u8>, H256) {
    let header = BlockHeader::with_state_root(H256::repeat_byte(0x11), 1_000, state_root);
    (header.rlp_encode().to_vec(), header.hash())
}
