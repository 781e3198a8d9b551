//! Pump runner: one-time contract deployment, then periodic transactions
//! until interrupted.
//!
//! Configured entirely through `PUMP_*` environment variables; see
//! `PumpConfig::from_env`. With `PUMP_DEPLOY_TARGET` and `PUMP_RAW_TXS`
//! set, the pre-signed deployment sequence is replayed first (skipped when
//! the target already has code).

use tokio_util::sync::CancellationToken;
use tronvault_client::{HttpChainClient, RpcSigner};
use tronvault_pump::{deploy_if_needed, load_raw_txs, Pump, PumpConfig};
use tronvault_types::{Address, Result, VaultError};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = PumpConfig::from_env()?;
    let client = HttpChainClient::new(&config.endpoint, None);
    let signer = RpcSigner::new(&config.endpoint, None);

    if let Ok(raw) = std::env::var("PUMP_DEPLOY_TARGET") {
        let target = Address::from_hex(&raw)
            .map_err(|e| VaultError::Config(format!("PUMP_DEPLOY_TARGET: {}", e)))?;
        let path = std::env::var("PUMP_RAW_TXS")
            .map_err(|_| VaultError::Config("PUMP_RAW_TXS is not set".to_string()))?;
        let raw_txs = load_raw_txs(&path)?;
        deploy_if_needed(&client, &target, &raw_txs).await?;
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    Pump::new(config).run(&client, &signer, cancel).await
}
