//! Shared types for the vault batch/pump crates: addresses, swap ids,
//! the replay guard tuple, and the common error enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Vault tooling error types.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid swap id: {0}")]
    InvalidSwapId(String),

    #[error("malformed calldata: {0}")]
    Calldata(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("signer error: {0}")]
    Signer(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// A 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Sentinel address the vault uses for the chain's native coin.
    pub const NATIVE: Address = Address([0xEE; 20]);

    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a 0x-prefixed (or bare) 40-char hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex_to_bytes(s)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidAddress(s.to_string()))?;
        Ok(Address(arr))
    }

    pub fn to_hex(&self) -> Hex {
        bytes_to_hex(&self.0)
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// A 32-byte swap identifier used to derive deterministic deposit contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapId([u8; 32]);

impl SwapId {
    pub const ZERO: SwapId = SwapId([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        SwapId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex_to_bytes(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidSwapId(s.to_string()))?;
        Ok(SwapId(arr))
    }

    pub fn to_hex(&self) -> Hex {
        bytes_to_hex(&self.0)
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Replay protection tuple attached to a protected batch call.
///
/// The nonce must be unique across every submission the vault has ever
/// consumed. The client cannot observe the contract's consumed-nonce set, so
/// uniqueness comes from drawing uniformly over the full u64 space rather
/// than from a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayGuard {
    pub sig_version: u64,
    pub nonce: u64,
    pub sender: [u8; 20],
}

impl ReplayGuard {
    pub fn sender_address(&self) -> Address {
        Address::new(self.sender)
    }
}

/// Parse a hex string (with or without 0x prefix) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| VaultError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a JSON-RPC quantity ("0x1a") into a u64.
pub fn hex_to_u64(s: &str) -> Result<u64> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16).map_err(|e| VaultError::InvalidHex(e.to_string()))
}

/// Format a u64 as a JSON-RPC quantity.
pub fn u64_to_hex(v: u64) -> Hex {
    format!("0x{:x}", v)
}

/// Format a u128 amount as a JSON-RPC quantity.
pub fn u128_to_hex(v: u128) -> Hex {
    format!("0x{:x}", v)
}
