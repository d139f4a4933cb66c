//! Shared utilities for integration tests: a programmable JSON-RPC chain.

#![allow(dead_code)]

use base64::Engine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Scripted chain state behind one mock endpoint.
#[derive(Debug)]
pub struct ChainState {
    pub balance: u64,
    pub blockhash: String,
    pub health: &'static str,
    /// HTTP status returned for specific methods instead of a JSON-RPC answer.
    pub http_failures: HashMap<&'static str, u16>,
    pub simulation_error: Option<Value>,
    /// JSON-RPC error object returned by `sendTransaction`.
    pub send_error: Option<Value>,
    /// hash → status object for `getSignatureStatuses`.
    pub statuses: HashMap<String, Value>,
    /// hash → body for `getTransaction`; unknown hashes answer `null`.
    pub transactions: HashMap<String, Value>,
    pub token_accounts: Vec<Value>,
    /// `getSignaturesForAddress` entries, newest first.
    pub signatures: Vec<Value>,
    pub sent: Vec<String>,
    pub calls: Vec<String>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            balance: 10_000_000_000,
            blockhash: bs58::encode([7u8; 32]).into_string(),
            health: "ok",
            http_failures: HashMap::new(),
            simulation_error: None,
            send_error: None,
            statuses: HashMap::new(),
            transactions: HashMap::new(),
            token_accounts: Vec::new(),
            signatures: Vec::new(),
            sent: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// A running mock endpoint.
#[derive(Clone)]
pub struct MockChain {
    pub url: String,
    pub state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(ChainState::default()));

        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let state = shared.clone();
                        tokio::spawn(async move {
                            let _ = serve(socket, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self { url, state }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn count(&self, method: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|m| *m == method).count())
    }

    pub fn finalize(&self, hash: &str) {
        self.with(|s| {
            s.statuses.insert(
                hash.to_string(),
                json!({ "slot": 90, "confirmations": null, "err": null, "confirmationStatus": "finalized" }),
            )
        });
    }

    pub fn fail(&self, hash: &str, err: Value) {
        self.with(|s| {
            s.statuses.insert(
                hash.to_string(),
                json!({ "slot": 90, "confirmations": 4, "err": err, "confirmationStatus": "confirmed" }),
            )
        });
    }
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<ChainState>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    let (status, body) = dispatch(&state, &request);

    let reason = match status {
        200 => "OK",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

fn dispatch(state: &Mutex<ChainState>, request: &Value) -> (u16, String) {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = &request["params"];

    let mut s = state.lock().unwrap();
    s.calls.push(method.clone());
    if let Some(status) = s.http_failures.get(method.as_str()) {
        return (*status, String::new());
    }

    let context = json!({ "slot": 100 });
    let outcome: Result<Value, Value> = match method.as_str() {
        "getHealth" => Ok(json!(s.health)),
        "getBalance" => Ok(json!({ "context": context, "value": s.balance })),
        "getLatestBlockhash" => Ok(json!({
            "context": context,
            "value": { "blockhash": s.blockhash, "lastValidBlockHeight": 200 }
        })),
        "simulateTransaction" => Ok(json!({
            "context": context,
            "value": {
                "err": s.simulation_error,
                "logs": ["Program 11111111111111111111111111111111 invoke [1]",
                         "Program 11111111111111111111111111111111 success"],
                "unitsConsumed": 150
            }
        })),
        "sendTransaction" => match &s.send_error {
            Some(err) => Err(err.clone()),
            None => {
                let wire = base64::engine::general_purpose::STANDARD
                    .decode(params[0].as_str().unwrap_or_default())
                    .unwrap_or_default();
                let hash = bs58::encode(&wire[1..65]).into_string();
                s.sent.push(hash.clone());
                Ok(json!(hash))
            }
        },
        "getSignatureStatuses" => {
            let statuses: Vec<Value> = params[0]
                .as_array()
                .map(|hashes| {
                    hashes
                        .iter()
                        .map(|h| {
                            h.as_str()
                                .and_then(|h| s.statuses.get(h).cloned())
                                .unwrap_or(Value::Null)
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(json!({ "context": context, "value": statuses }))
        }
        "getTransaction" => Ok(params[0]
            .as_str()
            .and_then(|h| s.transactions.get(h).cloned())
            .unwrap_or(Value::Null)),
        "getTokenAccountsByOwner" => Ok(json!({ "context": context, "value": s.token_accounts })),
        "getSignaturesForAddress" => {
            let limit = params[1]["limit"].as_u64().unwrap_or(1000) as usize;
            Ok(json!(s.signatures.iter().take(limit).cloned().collect::<Vec<_>>()))
        }
        _ => Err(json!({ "code": -32601, "message": "Method not found" })),
    };

    let body = match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    };
    (200, body.to_string())
}
