//! Scripted in-memory `ChainRpc` used by unit tests.

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::rpc::types::{RpcError, RpcResult, RpcSimulation, SignatureInfo, SignatureStatus, TokenAccount};
use crate::rpc::ChainRpc;
use crate::transaction::{Checkpoint, Pubkey};

pub(crate) struct MockRpc {
    pub balance: Mutex<u64>,
    pub checkpoint: Checkpoint,
    pub simulation: Mutex<RpcSimulation>,
    /// Consumed front to back; once empty, sends succeed and echo the signature.
    pub send_script: Mutex<VecDeque<RpcError>>,
    pub statuses: Mutex<HashMap<String, SignatureStatus>>,
    pub status_error: Mutex<Option<RpcError>>,
    pub health_delay: Mutex<Duration>,
    pub health_error: Mutex<Option<RpcError>>,
    /// Known transactions for `getTransaction`.
    pub transactions: Mutex<HashMap<String, Value>>,
    /// Per-method errors, consumed front to back before answering normally.
    pub failures: Mutex<HashMap<&'static str, VecDeque<RpcError>>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(10_000_000_000),
            checkpoint: Checkpoint::from_bytes([7u8; 32]),
            simulation: Mutex::new(RpcSimulation {
                err: None,
                logs: Some(vec!["Program 11111111111111111111111111111111 success".into()]),
                units_consumed: Some(150),
            }),
            send_script: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(HashMap::new()),
            status_error: Mutex::new(None),
            health_delay: Mutex::new(Duration::ZERO),
            health_error: Mutex::new(None),
            transactions: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn fail_next(&self, method: &'static str, error: RpcError) {
        self.failures.lock().unwrap().entry(method).or_default().push_back(error);
    }

    /// Log the call and return the next scripted failure for it, if any.
    fn record(&self, method: &'static str) -> RpcResult<()> {
        self.calls.lock().unwrap().push(method);
        match self.failures.lock().unwrap().get_mut(method).and_then(VecDeque::pop_front) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_health(&self) -> RpcResult<()> {
        self.record("getHealth")?;
        let delay = *self.health_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        match self.health_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn get_balance(&self, _owner: &Pubkey) -> RpcResult<u64> {
        self.record("getBalance")?;
        Ok(*self.balance.lock().unwrap())
    }

    async fn get_token_accounts_by_owner(&self, _owner: &Pubkey) -> RpcResult<Vec<TokenAccount>> {
        self.record("getTokenAccountsByOwner")?;
        Ok(Vec::new())
    }

    async fn get_transaction(&self, hash: &str) -> RpcResult<Option<Value>> {
        self.record("getTransaction")?;
        Ok(self.transactions.lock().unwrap().get(hash).cloned())
    }

    async fn get_latest_checkpoint(&self) -> RpcResult<Checkpoint> {
        self.record("getLatestBlockhash")?;
        Ok(self.checkpoint)
    }

    async fn simulate_transaction(&self, _wire_base64: &str) -> RpcResult<RpcSimulation> {
        self.record("simulateTransaction")?;
        Ok(self.simulation.lock().unwrap().clone())
    }

    async fn send_transaction(&self, wire_base64: &str) -> RpcResult<String> {
        self.record("sendTransaction")?;
        if let Some(e) = self.send_script.lock().unwrap().pop_front() {
            return Err(e);
        }
        let wire = base64::engine::general_purpose::STANDARD
            .decode(wire_base64)
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        Ok(bs58::encode(&wire[1..65]).into_string())
    }

    async fn get_signature_statuses(
        &self,
        hashes: &[String],
    ) -> RpcResult<Vec<Option<SignatureStatus>>> {
        self.record("getSignatureStatuses")?;
        if let Some(e) = self.status_error.lock().unwrap().clone() {
            return Err(e);
        }
        let statuses = self.statuses.lock().unwrap();
        Ok(hashes.iter().map(|h| statuses.get(h).cloned()).collect())
    }

    async fn get_signatures_for_address(
        &self,
        _address: &Pubkey,
        _limit: usize,
    ) -> RpcResult<Vec<SignatureInfo>> {
        self.record("getSignaturesForAddress")?;
        Ok(Vec::new())
    }
}
