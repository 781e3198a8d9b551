//! Chain access seams for the vault tooling.
//!
//! - `ChainClient`: submit transactions, read nonces, read code
//! - `Signer`: produce signed raw bytes from an unsigned transaction
//! - `HttpChainClient` / `RpcSigner`: JSON-RPC implementations
//! - `MockChainClient`: scripted in-memory client for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tronvault_types::{Address, Hex, Result};

pub mod http;
pub mod mock;

pub use http::{HttpChainClient, RpcSigner};
pub use mock::MockChainClient;

/// An unsigned transaction to be signed and broadcast.
///
/// `data` doubles as the auxiliary-data field: swap-intent notes attached to
/// a plain value transfer ride here as opaque hex-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub gas: u64,
    pub nonce: u64,
    pub data: Hex,
}

/// A contract call submitted through a node-managed account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub gas: Option<u64>,
    pub data: Hex,
}

/// One emitted event log, undecoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub address: Hex,
    pub topics: Vec<Hex>,
    pub data: Hex,
}

/// Receipt details, when the client implementation waits for one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub status: Option<Hex>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<Hex>,
    #[serde(default)]
    pub logs: Vec<LogRecord>,
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub tx_hash: Hex,
    pub receipt: Option<TxReceipt>,
}

/// Chain access capability. Errors are surfaced verbatim; callers decide
/// what, if anything, to do with them.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Deployed bytecode at `address` ("0x" when none).
    async fn get_code(&self, address: &Address) -> Result<Hex>;

    /// Current transaction count for `address`.
    async fn get_nonce(&self, address: &Address) -> Result<u64>;

    /// Broadcast pre-signed raw transaction bytes.
    async fn submit_raw(&self, signed: &Hex) -> Result<SubmissionResult>;

    /// Submit a contract call through the node's account management.
    async fn submit(&self, call: &CallRequest) -> Result<SubmissionResult>;
}

/// Signing capability. The core assumes nothing about the signature scheme
/// beyond "same input, valid output".
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `tx`, returning raw bytes ready for `submit_raw`.
    async fn sign(&self, tx: &TxRequest) -> Result<Hex>;
}
