use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};
use ethereum_types::Address;

/// Checks account balances against block headers.
#[derive(Parser)]
#[command(version = vickrey_cli::version(), propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Verifies every proof bundle of a JSON array.
    Verify {
        /// The file containing the bundles.
        #[arg(short, long, env = "VICKREY_BUNDLE_FILE", value_hint = ValueHint::FilePath)]
        file_path: PathBuf,
    },
    /// Writes a bundle for a synthetic state, for testing.
    Fixture {
        /// The account the bundle proves.
        #[arg(short, long, env = "VICKREY_FIXTURE_ADDRESS")]
        address: Address,
        /// The balance of the account, in ether.
        #[arg(short, long, env = "VICKREY_FIXTURE_BALANCE_ETH", default_value_t = 1)]
        balance_eth: u64,
        /// Number of other accounts in the state.
        #[arg(short = 'n', long, env = "VICKREY_FIXTURE_ACCOUNTS", default_value_t = 256)]
        num_accounts: usize,
        /// Seed of the generated state.
        #[arg(short, long, env = "VICKREY_FIXTURE_SEED", default_value_t = 0)]
        seed: u64,
        /// Where to write the bundle. Defaults to stdout.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}
