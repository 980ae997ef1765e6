//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferrocoin", version, about = "A minimal proof-of-work cryptocurrency node")]
pub struct Opt {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "ferrocoin.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the node: propagation workers, periodic persistence and, when
    /// enabled, the mining loop
    Start {
        /// Path to the PKCS#8 wallet key file; created when missing
        #[arg(short, long, default_value = "node.key")]
        wallet: PathBuf,
    },
    /// Generate a fresh wallet key file and print its address
    CreateWallet {
        /// Where to write the PKCS#8 key material
        #[arg(short, long, default_value = "node.key")]
        output: PathBuf,
    },
    /// Sum the unspent outputs locked to an address
    Balance {
        /// Address to query; defaults to the wallet file's address
        #[arg(short, long)]
        address: Option<String>,

        /// Wallet key file used when no address is given
        #[arg(short, long, default_value = "node.key")]
        wallet: PathBuf,
    },
}
