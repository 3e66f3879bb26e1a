use std::{
    fs::File,
    io::{self, BufReader, Write},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use ethereum_types::U256;
use serde_json::Deserializer;
use tracing::{error, info};
use vickrey_cli::{bundle::ProofBundle, env::load_dotenvy_vars_if_present};
use vickrey_common::eth_to_wei;

use self::verify_balance::*;
mod verify_balance {
    pub mod cli;
}

fn main() -> Result<()> {
    load_dotenvy_vars_if_present();
    vickrey_cli::tracing::init();

    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Verify { file_path } => {
            let file = File::open(&file_path)
                .with_context(|| format!("Failed to open {}", file_path.display()))?;
            let des = &mut Deserializer::from_reader(BufReader::new(file));
            let bundles: Vec<ProofBundle> = serde_path_to_error::deserialize(des)?;

            let failed = bundles
                .iter()
                .filter(|bundle| match bundle.check() {
                    Ok(balance) => {
                        info!(
                            "{:?} held {} wei at block {:?}",
                            bundle.address, balance, bundle.block_hash
                        );
                        false
                    }
                    Err(e) => {
                        error!("Proof of {:?} rejected: {e:?}", bundle.address);
                        true
                    }
                })
                .count();

            if failed > 0 {
                bail!("{failed} of {} proofs were rejected", bundles.len());
            }
            info!("All proofs verified successfully!");
        }
        cli::Command::Fixture {
            address,
            balance_eth,
            num_accounts,
            seed,
            output,
        } => {
            let bundle = ProofBundle::fixture(
                address,
                eth_to_wei(U256::from(balance_eth)),
                num_accounts,
                seed,
            );
            let json = serde_json::to_string_pretty(&[bundle])?;

            match output {
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    writeln!(file, "{json}")?;
                    info!("Wrote a fixture for {:?} to {}", address, path.display());
                }
                None => writeln!(io::stdout().lock(), "{json}")?,
            }
        }
    }

    Ok(())
}
