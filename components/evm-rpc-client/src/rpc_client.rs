use std::sync::atomic::{AtomicU64, Ordering};

use evm_codec::{Address, TransactionHash};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub enum RpcError {
    Generic,
    StatusCode(u16),
    Message(String),
    JsonRpc { code: i64, message: String },
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            RpcError::Message(e) => write!(f, "{}", e),
            RpcError::StatusCode(e) => write!(f, "error status code {}", e),
            RpcError::JsonRpc { code, message } => write!(f, "rpc error {}: {}", code, message),
            RpcError::Generic => write!(f, "unknown error"),
        }
    }
}

impl std::error::Error for RpcError {}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

pub fn parse_quantity(quantity: &str) -> Result<u64, RpcError> {
    let digits = quantity.strip_prefix("0x").unwrap_or(quantity);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Message(format!("unable to parse quantity {}: {}", quantity, e)))
}

#[derive(Deserialize, Debug)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

/// Transaction submitted through `eth_sendTransaction`; the node signs with the
/// unlocked `from` account. A missing `to` creates a contract.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl TransactionRequest {
    pub fn new(from: Address, to: Option<Address>, data: &[u8]) -> TransactionRequest {
        TransactionRequest {
            from,
            to,
            data: format!("0x{}", hex::encode(data)),
            gas: None,
            nonce: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> TransactionRequest {
        self.nonce = Some(to_quantity(nonce));
        self
    }

    pub fn with_gas(mut self, gas: u64) -> TransactionRequest {
        self.gas = Some(to_quantity(gas));
        self
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TransactionHash,
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<String>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status; inclusion is taken as success.
    pub fn is_success(&self) -> bool {
        match &self.status {
            Some(status) => parse_quantity(status).map(|s| s == 1).unwrap_or(false),
            None => true,
        }
    }

    pub fn block_height(&self) -> Option<u64> {
        self.block_number
            .as_ref()
            .and_then(|n| parse_quantity(n).ok())
    }
}

pub struct EvmRpc {
    pub url: String,
    pub client: Client,
    request_id: AtomicU64,
}

impl EvmRpc {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        let client = Client::builder()
            .build()
            .map_err(|e| RpcError::Message(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let res = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RpcError::StatusCode(res.status().as_u16()));
        }

        let response: JsonRpcResponse = res
            .json()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(RpcError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| {
            RpcError::Message(format!("unable to decode {} response: {}", method, e))
        })
    }

    pub fn get_chain_id(&self) -> Result<u64, RpcError> {
        let res: String = self.request("eth_chainId", json!([]))?;
        parse_quantity(&res)
    }

    /// Number of transactions sent by `address`, counting the ones still in the mempool.
    pub fn get_transaction_count(&self, address: &Address) -> Result<u64, RpcError> {
        let res: String = self.request(
            "eth_getTransactionCount",
            json!([address.to_string(), "pending"]),
        )?;
        parse_quantity(&res)
    }

    pub fn send_transaction(
        &self,
        transaction: &TransactionRequest,
    ) -> Result<TransactionHash, RpcError> {
        self.request("eth_sendTransaction", json!([transaction]))
    }

    pub fn get_transaction_receipt(
        &self,
        hash: &TransactionHash,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([hash.to_string()]))
    }

    /// Runtime code stored at `address`; empty for accounts without a contract.
    pub fn get_code(&self, address: &Address) -> Result<Vec<u8>, RpcError> {
        let res: String = self.request("eth_getCode", json!([address.to_string(), "latest"]))?;
        let raw = res.strip_prefix("0x").unwrap_or(&res);
        hex::decode(raw).map_err(|e| RpcError::Message(e.to_string()))
    }
}
