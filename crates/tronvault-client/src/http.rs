//! JSON-RPC 2.0 client over HTTP.
//!
//! Methods used:
//! - eth_getCode / eth_getTransactionCount
//! - eth_sendRawTransaction / eth_sendTransaction
//! - eth_signTransaction (RpcSigner, unlocked test accounts only)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tronvault_types::{u128_to_hex, u64_to_hex, Address, Hex, Result, VaultError};

use crate::{CallRequest, ChainClient, Signer, SubmissionResult, TxRequest};

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

async fn rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    method: &str,
    params: serde_json::Value,
) -> Result<T> {
    let request = RpcRequest {
        jsonrpc: "2.0",
        id: 1,
        method,
        params,
    };

    let resp = client
        .post(url)
        .json(&request)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| VaultError::Transport(format!("{} request failed: {}", method, e)))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(VaultError::Transport(format!(
            "{} returned status {}: {}",
            method, status, body
        )));
    }

    let body: RpcResponse<T> = resp
        .json()
        .await
        .map_err(|e| VaultError::Transport(format!("failed to parse {} response: {}", method, e)))?;

    if let Some(err) = body.error {
        return Err(VaultError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    body.result
        .ok_or_else(|| VaultError::Transport(format!("{} response missing result", method)))
}

fn call_object(from: &Address, to: &Address, value: u128, gas: Option<u64>, data: &str) -> serde_json::Value {
    let mut obj = json!({
        "from": from.to_hex(),
        "to": to.to_hex(),
        "value": u128_to_hex(value),
        "data": if data.is_empty() { "0x".to_string() } else { data.to_string() },
    });
    if let Some(gas) = gas {
        obj["gas"] = json!(u64_to_hex(gas));
    }
    obj
}

/// JSON-RPC chain client.
pub struct HttpChainClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpChainClient {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        rpc_call(&self.client, &self.base_url, self.timeout, method, params).await
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_code(&self, address: &Address) -> Result<Hex> {
        self.rpc("eth_getCode", json!([address.to_hex(), "latest"]))
            .await
    }

    async fn get_nonce(&self, address: &Address) -> Result<u64> {
        let count: Hex = self
            .rpc("eth_getTransactionCount", json!([address.to_hex(), "pending"]))
            .await?;
        tronvault_types::hex_to_u64(&count)
    }

    async fn submit_raw(&self, signed: &Hex) -> Result<SubmissionResult> {
        let tx_hash: Hex = self.rpc("eth_sendRawTransaction", json!([signed])).await?;
        Ok(SubmissionResult {
            tx_hash,
            receipt: None,
        })
    }

    async fn submit(&self, call: &CallRequest) -> Result<SubmissionResult> {
        let params = json!([call_object(&call.from, &call.to, call.value, call.gas, &call.data)]);
        let tx_hash: Hex = self.rpc("eth_sendTransaction", params).await?;
        Ok(SubmissionResult {
            tx_hash,
            receipt: None,
        })
    }
}

#[derive(Deserialize)]
struct SignedTx {
    raw: Hex,
}

/// Signer that delegates to the node's `eth_signTransaction`. Only suitable
/// for test chains with unlocked accounts; key custody stays on the node.
pub struct RpcSigner {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RpcSigner {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl Signer for RpcSigner {
    async fn sign(&self, tx: &TxRequest) -> Result<Hex> {
        let mut obj = call_object(&tx.from, &tx.to, tx.value, Some(tx.gas), &tx.data);
        obj["nonce"] = json!(u64_to_hex(tx.nonce));

        let signed: SignedTx = rpc_call(
            &self.client,
            &self.base_url,
            self.timeout,
            "eth_signTransaction",
            json!([obj]),
        )
        .await
        .map_err(|e| VaultError::Signer(e.to_string()))?;

        Ok(signed.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_object_shape() {
        let from = Address::new([0x01; 20]);
        let to = Address::new([0x02; 20]);
        let obj = call_object(&from, &to, 1_000_000, Some(21_000), "");

        assert_eq!(obj["from"], from.to_hex());
        assert_eq!(obj["to"], to.to_hex());
        assert_eq!(obj["value"], "0xf4240");
        assert_eq!(obj["gas"], "0x5208");
        assert_eq!(obj["data"], "0x");

        let no_gas = call_object(&from, &to, 0, None, "0xdeadbeef");
        assert!(no_gas.get("gas").is_none());
        assert_eq!(no_gas["data"], "0xdeadbeef");
    }

    #[test]
    fn test_rpc_error_body_is_surfaced() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"insufficient funds"}}"#;
        let resp: RpcResponse<Hex> = serde_json::from_str(raw).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "insufficient funds");
        assert!(resp.result.is_none());
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = HttpChainClient::new("http://127.0.0.1:8547/", None);
        assert_eq!(client.base_url, "http://127.0.0.1:8547");
    }
}
