//! In-memory chain client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tronvault_types::{Address, Hex, Result, VaultError};

use crate::{CallRequest, ChainClient, SubmissionResult};

/// Scripted chain client: serves canned code/nonce values, records every
/// submission, and can be told to fail specific submission attempts.
#[derive(Default)]
pub struct MockChainClient {
    code: Mutex<HashMap<Address, Hex>>,
    nonces: Mutex<HashMap<Address, u64>>,
    raw_submissions: Mutex<Vec<Hex>>,
    calls: Mutex<Vec<CallRequest>>,
    attempts: Mutex<usize>,
    fail_on: Mutex<HashSet<usize>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_code(&self, address: Address, code: &str) {
        self.code.lock().unwrap().insert(address, code.to_string());
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.nonces.lock().unwrap().insert(address, nonce);
    }

    /// Fail the Nth submission attempt (0-based, raw and call counted
    /// together) with an RPC error. The attempt is still recorded.
    pub fn fail_attempt(&self, index: usize) {
        self.fail_on.lock().unwrap().insert(index);
    }

    pub fn raw_submissions(&self) -> Vec<Hex> {
        self.raw_submissions.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn next_attempt(&self) -> Result<usize> {
        let mut attempts = self.attempts.lock().unwrap();
        let index = *attempts;
        *attempts += 1;
        if self.fail_on.lock().unwrap().contains(&index) {
            return Err(VaultError::Rpc {
                code: -32000,
                message: format!("scripted failure for attempt {}", index),
            });
        }
        Ok(index)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_code(&self, address: &Address) -> Result<Hex> {
        let code = self.code.lock().unwrap();
        Ok(code.get(address).cloned().unwrap_or_else(|| "0x".to_string()))
    }

    async fn get_nonce(&self, address: &Address) -> Result<u64> {
        let nonces = self.nonces.lock().unwrap();
        Ok(nonces.get(address).copied().unwrap_or(0))
    }

    async fn submit_raw(&self, signed: &Hex) -> Result<SubmissionResult> {
        self.raw_submissions.lock().unwrap().push(signed.clone());
        let index = self.next_attempt()?;
        Ok(SubmissionResult {
            tx_hash: format!("0x{:064x}", index),
            receipt: None,
        })
    }

    async fn submit(&self, call: &CallRequest) -> Result<SubmissionResult> {
        self.calls.lock().unwrap().push(call.clone());
        let index = self.next_attempt()?;
        Ok(SubmissionResult {
            tx_hash: format!("0x{:064x}", index),
            receipt: None,
        })
    }
}
