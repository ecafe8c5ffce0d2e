use evm_codec::{Address, TransactionHash};
use mockito::{Matcher, Mock, ServerGuard};

pub struct MockEvmRpc {
    pub url: String,
    server: ServerGuard,
}

impl Default for MockEvmRpc {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEvmRpc {
    pub fn new() -> Self {
        let server = mockito::Server::new();
        let url = server.url();
        Self { server, url }
    }

    pub fn method_mock(&mut self, method: &str, result: serde_json::Value) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create()
    }

    pub fn error_mock(&mut self, method: &str, code: i64, message: &str) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": code, "message": message }
                })
                .to_string(),
            )
            .create()
    }

    pub fn chain_id_mock(&mut self, chain_id: u64) -> Mock {
        self.method_mock("eth_chainId", json!(format!("0x{:x}", chain_id)))
    }

    pub fn transaction_count_mock(&mut self, nonce: u64) -> Mock {
        self.method_mock("eth_getTransactionCount", json!(format!("0x{:x}", nonce)))
    }

    pub fn send_transaction_mock(&mut self, hash: &TransactionHash) -> Mock {
        self.method_mock("eth_sendTransaction", json!(hash.to_string()))
    }

    pub fn receipt_mock(
        &mut self,
        hash: &TransactionHash,
        success: bool,
        contract_address: Option<&Address>,
    ) -> Mock {
        self.method_mock(
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": hash.to_string(),
                "blockNumber": "0x1",
                "status": if success { "0x1" } else { "0x0" },
                "contractAddress": contract_address.map(|a| a.to_string()),
                "gasUsed": "0x5208",
            }),
        )
    }

    pub fn code_mock(&mut self, code: &[u8]) -> Mock {
        self.method_mock("eth_getCode", json!(format!("0x{}", hex::encode(code))))
    }

    pub fn pending_receipt_mock(&mut self) -> Mock {
        self.method_mock("eth_getTransactionReceipt", serde_json::Value::Null)
    }
}
