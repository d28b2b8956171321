#![windows_subsystem = "windows"]

use anyhow::Result;
use ledgerpay::{config::Config, gui};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // XRPL_NETWORK, XRPL_RPC_URL, LEDGER_ACCOUNT_INDEX, ... from the environment or .env
    let config = Config::from_env();
    gui::launch(config)?;

    Ok(())
}
