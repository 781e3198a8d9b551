//! Batch-operation orchestration for the vault's `allBatch` entry point.
//!
//! Converts caller intent (sweep, deploy-and-sweep, pay out) into one
//! well-formed batch call, optionally replay-protected, and submits it as a
//! single on-chain transaction. The vault is the authority on business
//! rules; nothing is pre-validated here, and failures propagate verbatim
//! after being logged. Retrying is the caller's call: a resubmission draws a
//! fresh random nonce, so it is always safe.

use tracing::{error, info};
use tronvault_abi::{self as abi, DeployFetchParams, FetchParams, TransferParams};
use tronvault_client::{CallRequest, ChainClient, SubmissionResult, TxRequest};
use tronvault_types::{bytes_to_hex, Address, ReplayGuard, Result, SwapId};

pub mod nonce;

pub use nonce::{FixedNonceSource, NonceSource, RandomNonceSource};

/// The asset a vault operation acts on: the chain's native coin or a
/// fungible-token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRef {
    Native,
    Token(Address),
}

impl AssetRef {
    /// Wire representation; the native coin maps to the all-0xEE sentinel.
    pub fn address(&self) -> Address {
        match self {
            AssetRef::Native => Address::NATIVE,
            AssetRef::Token(addr) => *addr,
        }
    }
}

/// One vault operation. Closed set so the wire encoding stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Deploy the deterministic deposit contract for `swap_id` and sweep its
    /// balance into the vault in the same call.
    DeployAndFetch { swap_id: SwapId, asset: AssetRef },
    /// Sweep balance from an already-deployed deposit contract.
    Fetch {
        deposit_address: Address,
        asset: AssetRef,
    },
    /// Move funds out of the vault. Amounts are integral minor units.
    Transfer {
        asset: AssetRef,
        recipient: Address,
        amount: u128,
    },
}

/// An assembled batch, ready to encode. Constructed fresh per invocation and
/// discarded after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub deploy_and_fetch: Vec<DeployFetchParams>,
    pub fetch: Vec<FetchParams>,
    pub transfer: Vec<TransferParams>,
    pub guard: Option<ReplayGuard>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.deploy_and_fetch.is_empty() && self.fetch.is_empty() && self.transfer.is_empty()
    }

    /// ABI-encoded calldata; shape follows from the guard's presence.
    pub fn calldata(&self) -> Vec<u8> {
        abi::encode_all_batch(
            self.guard.as_ref(),
            &self.deploy_and_fetch,
            &self.fetch,
            &self.transfer,
        )
    }
}

/// Builds and submits `allBatch` calls against one vault contract.
pub struct BatchBuilder {
    vault: Address,
    sender: Address,
    sig_version: u64,
    nonce_source: Box<dyn NonceSource>,
}

impl BatchBuilder {
    pub fn new(vault: Address, sender: Address) -> Self {
        Self {
            vault,
            sender,
            sig_version: 1,
            nonce_source: Box::new(RandomNonceSource),
        }
    }

    /// Swap the nonce source (tests inject deterministic values here).
    pub fn with_nonce_source(mut self, source: Box<dyn NonceSource>) -> Self {
        self.nonce_source = source;
        self
    }

    pub fn with_sig_version(mut self, version: u64) -> Self {
        self.sig_version = version;
        self
    }

    /// Partition operations into the three wire arrays. Any sequence may end
    /// up empty; empty arrays still serialize as such. With `protected` a
    /// replay guard is attached, its nonce drawn from the nonce source.
    pub fn build(&self, operations: impl IntoIterator<Item = Operation>, protected: bool) -> Batch {
        let mut deploy_and_fetch = Vec::new();
        let mut fetch = Vec::new();
        let mut transfer = Vec::new();

        for op in operations {
            match op {
                Operation::DeployAndFetch { swap_id, asset } => {
                    deploy_and_fetch.push(DeployFetchParams {
                        swap_id,
                        token: asset.address(),
                    });
                }
                Operation::Fetch {
                    deposit_address,
                    asset,
                } => {
                    fetch.push(FetchParams {
                        deposit_address,
                        token: asset.address(),
                    });
                }
                Operation::Transfer {
                    asset,
                    recipient,
                    amount,
                } => {
                    transfer.push(TransferParams {
                        token: asset.address(),
                        recipient,
                        amount,
                    });
                }
            }
        }

        let guard = protected.then(|| ReplayGuard {
            sig_version: self.sig_version,
            nonce: self.nonce_source.next_nonce(),
            sender: *self.sender.as_bytes(),
        });

        Batch {
            deploy_and_fetch,
            fetch,
            transfer,
            guard,
        }
    }

    /// Submit the batch as exactly one on-chain call. No retry, no error
    /// categorization: failures are logged and rethrown for the caller.
    pub async fn submit(
        &self,
        batch: &Batch,
        client: &dyn ChainClient,
    ) -> Result<SubmissionResult> {
        let call = CallRequest {
            from: self.sender,
            to: self.vault,
            value: 0,
            gas: None,
            data: bytes_to_hex(&batch.calldata()),
        };

        match client.submit(&call).await {
            Ok(result) => {
                info!(
                    tx_hash = %result.tx_hash,
                    deploy_and_fetch = batch.deploy_and_fetch.len(),
                    fetch = batch.fetch.len(),
                    transfer = batch.transfer.len(),
                    protected = batch.guard.is_some(),
                    "allBatch submitted"
                );
                Ok(result)
            }
            Err(err) => {
                error!(vault = %self.vault, %err, "allBatch submission failed");
                Err(err)
            }
        }
    }
}

/// Build a direct value transfer to the vault carrying a swap-intent note.
///
/// The note rides in the transaction's auxiliary-data field as opaque bytes,
/// hex-encoded and otherwise untouched.
pub fn transfer_with_note(
    from: Address,
    vault: Address,
    value: u128,
    gas: u64,
    nonce: u64,
    note: &[u8],
) -> TxRequest {
    TxRequest {
        from,
        to: vault,
        value,
        gas,
        nonce,
        data: bytes_to_hex(note),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tronvault_abi::decode_all_batch;
    use tronvault_client::MockChainClient;
    use tronvault_types::{hex_to_bytes, VaultError};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_single_token_transfer_batch_shape() {
        let token = addr(0x70);
        let recipient = Address::from_hex("0xabcdabcdabcdabcdabcdabcdabcdabcdabcdabcd").unwrap();
        let builder = BatchBuilder::new(addr(0x10), addr(0x01));

        let batch = builder.build(
            [Operation::Transfer {
                asset: AssetRef::Token(token),
                recipient,
                amount: 2,
            }],
            false,
        );

        assert!(batch.guard.is_none());
        assert_eq!(batch.deploy_and_fetch.len(), 0);
        assert_eq!(batch.fetch.len(), 0);
        assert_eq!(batch.transfer.len(), 1);
        assert_eq!(batch.transfer[0].token, token);
        assert_eq!(batch.transfer[0].recipient, recipient);
        assert_eq!(batch.transfer[0].amount, 2);
    }

    #[tokio::test]
    async fn test_submit_makes_exactly_one_call() {
        let client = MockChainClient::new();
        let builder = BatchBuilder::new(addr(0x10), addr(0x01));
        let batch = builder.build(
            [Operation::Transfer {
                asset: AssetRef::Token(addr(0x70)),
                recipient: addr(0xAB),
                amount: 2,
            }],
            false,
        );

        builder.submit(&batch, &client).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, addr(0x10));
        assert_eq!(calls[0].value, 0);

        let decoded = decode_all_batch(&hex_to_bytes(&calls[0].data).unwrap()).unwrap();
        assert_eq!(decoded.transfer.len(), 1);
        assert_eq!(decoded.deploy_and_fetch.len(), 0);
        assert_eq!(decoded.fetch.len(), 0);
        assert!(decoded.guard.is_none());
    }

    #[tokio::test]
    async fn test_submit_error_propagates_verbatim() {
        let client = MockChainClient::new();
        client.fail_attempt(0);

        let builder = BatchBuilder::new(addr(0x10), addr(0x01));
        let batch = builder.build([], false);

        let err = builder.submit(&batch, &client).await.unwrap_err();
        match err {
            VaultError::Rpc { code, .. } => assert_eq!(code, -32000),
            other => panic!("unexpected error variant: {other:?}"),
        }
        // Exactly one attempt: the builder never retries.
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn test_protected_batch_uses_nonce_source() {
        let builder = BatchBuilder::new(addr(0x10), addr(0x01))
            .with_nonce_source(Box::new(FixedNonceSource::new(1234)));

        let batch = builder.build([], true);
        let guard = batch.guard.unwrap();
        assert_eq!(guard.nonce, 1234);
        assert_eq!(guard.sig_version, 1);
        assert_eq!(guard.sender_address(), addr(0x01));
        assert!(batch.is_empty());

        // Empty sequences still serialize as empty arrays.
        let decoded = decode_all_batch(&batch.calldata()).unwrap();
        assert_eq!(decoded.guard, Some(guard));
        assert!(decoded.transfer.is_empty());
    }

    #[test]
    fn test_random_nonces_do_not_collide() {
        let source = RandomNonceSource;
        let mut seen = HashSet::with_capacity(10_000);
        for _ in 0..10_000 {
            assert!(seen.insert(source.next_nonce()), "nonce collision");
        }
    }

    #[test]
    fn test_native_asset_maps_to_sentinel() {
        let builder = BatchBuilder::new(addr(0x10), addr(0x01));
        let batch = builder.build(
            [
                Operation::DeployAndFetch {
                    swap_id: SwapId::ZERO,
                    asset: AssetRef::Native,
                },
                Operation::Fetch {
                    deposit_address: addr(0x33),
                    asset: AssetRef::Token(addr(0x44)),
                },
            ],
            false,
        );

        assert!(batch.deploy_and_fetch[0].token.is_native());
        assert_eq!(batch.fetch[0].token, addr(0x44));
    }

    #[test]
    fn test_transfer_with_note_passes_bytes_through() {
        let note = b"swap intent\x00\x01\x02";
        let tx = transfer_with_note(addr(0x01), addr(0x10), 1_000_000, 100_000, 5, note);

        assert_eq!(tx.value, 1_000_000);
        assert_eq!(tx.nonce, 5);
        assert_eq!(tx.data, "0x7377617020696e74656e74000102");
        assert_eq!(hex_to_bytes(&tx.data).unwrap(), note);
    }
}
