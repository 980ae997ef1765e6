use clap::Parser;
use ferrocoin::cli::{Command, Opt};
use ferrocoin::config::Config;
use ferrocoin::error::Result;
use ferrocoin::node::{Node, NoOpSender};
use ferrocoin::wallet::{Signer, Wallet};
use log::{info, LevelFilter};
use std::path::Path;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

fn main() {
    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = Config::load(&opt.config)?;
    init_logger(&config.log.level);

    match opt.command {
        Command::Start { wallet } => start(config, &wallet),
        Command::CreateWallet { output } => create_wallet(&output),
        Command::Balance { address, wallet } => balance(config, address, &wallet),
    }
}

fn init_logger(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    env_logger::Builder::new().filter_level(level).init();
}

fn start(config: Config, wallet_path: &Path) -> Result<()> {
    let wallet = load_or_create_wallet(wallet_path)?;
    info!("rewards will go to {}", wallet.address());

    let sender = Arc::new(NoOpSender);
    let node = Node::new(config, sender.clone(), sender)?;
    node.start(Some(wallet.address()))?;

    // The workers run on their own threads; nothing left to do here.
    loop {
        thread::park();
    }
}

fn create_wallet(output: &Path) -> Result<()> {
    let wallet = Wallet::new()?;
    wallet.save(output)?;
    println!("{}", wallet.address());
    Ok(())
}

fn balance(config: Config, address: Option<String>, wallet_path: &Path) -> Result<()> {
    let address = match address {
        Some(address) => address,
        None => Wallet::load(wallet_path)?.address(),
    };

    let sender = Arc::new(NoOpSender);
    let node = Node::new(config, sender.clone(), sender)?;
    println!("{}", node.balance(&address)?);
    Ok(())
}

fn load_or_create_wallet(path: &Path) -> Result<Wallet> {
    if path.exists() {
        return Wallet::load(path);
    }
    let wallet = Wallet::new()?;
    wallet.save(path)?;
    info!("created wallet key file {}", path.display());
    Ok(wallet)
}
