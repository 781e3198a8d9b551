//! Block-production pump for test chains with empty-block suppression.
//!
//! - One-time idempotent deployment: replay pre-signed raw transactions
//!   unless the target contract already has code
//! - Then an unbounded loop: sign and broadcast a minimal value transfer
//!   once per interval, with a strictly incrementing local nonce
//!
//! Per-iteration failures are logged and suppressed; the loop must outlive
//! any single transaction. A failed submission still consumes its nonce
//! slot, so this is not a delivery mechanism.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tronvault_client::{ChainClient, Signer, TxRequest};
use tronvault_types::{Address, Hex, Result, VaultError};

/// Pump configuration, usually read from the environment.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    pub endpoint: String,
    pub sender: Address,
    pub recipient: Address,
    pub interval_ms: u64,
    pub value: u128,
    pub gas: u64,
}

impl PumpConfig {
    /// Read configuration from `PUMP_*` environment variables. Endpoint and
    /// interval have defaults; sender and recipient are required. Values are
    /// shape-checked only, never validated against the chain.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("PUMP_ENDPOINT")
            .unwrap_or_else(|_| "http://127.0.0.1:8547".to_string());
        let sender = required_address("PUMP_SENDER")?;
        let recipient = required_address("PUMP_RECIPIENT")?;
        let interval_ms = match std::env::var("PUMP_INTERVAL_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| VaultError::Config(format!("PUMP_INTERVAL_MS: {}", e)))?,
            Err(_) => 250,
        };

        Ok(Self {
            endpoint,
            sender,
            recipient,
            interval_ms,
            value: 1,
            gas: 5_000_000,
        })
    }
}

fn required_address(var: &str) -> Result<Address> {
    let raw = std::env::var(var).map_err(|_| VaultError::Config(format!("{} is not set", var)))?;
    Address::from_hex(&raw).map_err(|e| VaultError::Config(format!("{}: {}", var, e)))
}

/// Parse a JSON array of pre-signed raw transactions.
pub fn parse_raw_txs(json: &str) -> Result<Vec<Hex>> {
    serde_json::from_str(json).map_err(|e| VaultError::Config(format!("raw tx file: {}", e)))
}

/// Load the fixed, ordered deployment transaction sequence from a file.
pub fn load_raw_txs(path: &str) -> Result<Vec<Hex>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| VaultError::Config(format!("{}: {}", path, e)))?;
    parse_raw_txs(&contents)
}

/// Replay the deployment transactions unless `target` already has code.
///
/// Running this twice against a deployed chain submits nothing and returns
/// Ok both times. Errors here are fatal to the caller: an incomplete
/// deployment is unrecoverable for the run.
pub async fn deploy_if_needed(
    client: &dyn ChainClient,
    target: &Address,
    raw_txs: &[Hex],
) -> Result<()> {
    let code = client.get_code(target).await?;
    if !code.is_empty() && code != "0x" {
        info!(%target, "contracts already deployed, skipping");
        return Ok(());
    }

    for raw in raw_txs {
        let result = client.submit_raw(raw).await?;
        info!(tx_hash = %result.tx_hash, "deployment transaction sent");
    }
    info!(count = raw_txs.len(), "deployment transactions replayed");
    Ok(())
}

/// The transaction pump. Owns its nonce counter exclusively; nothing else
/// may touch it while the loop runs.
pub struct Pump {
    config: PumpConfig,
}

impl Pump {
    pub fn new(config: PumpConfig) -> Self {
        Self { config }
    }

    /// Run forever: once per interval, sign and broadcast a minimal value
    /// transfer with the current local nonce, then increment the nonce
    /// whatever the outcome. The chain nonce is read exactly once, up
    /// front. Exits only through `cancel`, checked once per iteration, or a
    /// failure of that initial nonce read.
    pub async fn run(
        &self,
        client: &dyn ChainClient,
        signer: &dyn Signer,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut nonce = client.get_nonce(&self.config.sender).await?;
        let interval = Duration::from_millis(self.config.interval_ms);
        info!(
            nonce,
            interval_ms = self.config.interval_ms,
            recipient = %self.config.recipient,
            "pump running"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(nonce, "pump stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let tx = TxRequest {
                from: self.config.sender,
                to: self.config.recipient,
                value: self.config.value,
                gas: self.config.gas,
                nonce,
                data: "0x".to_string(),
            };

            match signer.sign(&tx).await {
                Ok(raw) => {
                    if let Err(err) = client.submit_raw(&raw).await {
                        warn!(nonce, %err, "pump submission failed");
                    }
                }
                Err(err) => warn!(nonce, %err, "pump signing failed"),
            }

            // A failed attempt still consumes its nonce slot.
            nonce += 1;
        }
    }
}
