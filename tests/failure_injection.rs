//! Failure injection tests: endpoint outages, chain rejections, slow probes.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wallet_core::config::{EndpointsConfig, HealthCheckConfig, WalletConfig};
use wallet_core::health::{
    ConnectivityFlag, EndpointHealth, EndpointHealthMonitor, EndpointRole, EndpointSelector,
};
use wallet_core::rpc::{ChainRpc, JsonRpcClient, RpcError};
use wallet_core::store::TransactionStatus;
use wallet_core::transaction::Pubkey;
use wallet_core::{SubmitRequest, WalletError, WalletRuntime};

mod common;
use common::{MockChain, PHRASE};

fn selector(primary: &MockChain, fallback: &MockChain, custom: Option<&MockChain>) -> Arc<EndpointSelector> {
    Arc::new(EndpointSelector::new(&EndpointsConfig {
        primary_url: primary.url.clone(),
        fallback_url: fallback.url.clone(),
        custom_url: custom.map(|c| c.url.clone()),
    }))
}

fn config(primary: &MockChain, fallback: &MockChain) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.endpoints.primary_url = primary.url.clone();
    config.endpoints.fallback_url = fallback.url.clone();
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 20;
    config.timeouts.rpc_ms = 2_000;
    config
}

fn transfer(amount: u64) -> SubmitRequest {
    SubmitRequest {
        recipient: Pubkey::from_bytes([2u8; 32]).to_string(),
        amount,
        memo: None,
        priority_fee: None,
    }
}

#[tokio::test]
async fn test_client_follows_active_endpoint() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| s.balance = 1);
    fallback.with(|s| s.balance = 2);

    let selector = selector(&primary, &fallback, None);
    let client = Arc::new(JsonRpcClient::new(selector.clone(), Duration::from_secs(2)).unwrap());
    let owner = Pubkey::from_bytes([1u8; 32]);
    assert_eq!(client.get_balance(&owner).await.unwrap(), 1);

    primary.with(|s| {
        s.http_failures.insert("getHealth", 503);
    });
    let monitor = EndpointHealthMonitor::new(
        selector,
        client.clone(),
        Arc::new(ConnectivityFlag::default()),
        HealthCheckConfig::default(),
    );
    let health = monitor.probe_once().await;

    assert!(matches!(health, EndpointHealth::Down(_)), "got {:?}", health);
    assert_eq!(monitor.current_endpoint().role, EndpointRole::Fallback);
    assert_eq!(client.get_balance(&owner).await.unwrap(), 2);
}

#[tokio::test]
async fn test_chain_error_object_is_typed_and_final() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| {
        s.send_error = Some(json!({
            "code": -32002,
            "message": "Transaction simulation failed: Blockhash not found",
            "data": { "err": "BlockhashNotFound" }
        }))
    });

    let client = JsonRpcClient::new(selector(&primary, &fallback, None), Duration::from_secs(2)).unwrap();
    match client.send_transaction("AQ==").await.unwrap_err() {
        RpcError::Response { code, data, .. } => {
            assert_eq!(code, -32002);
            assert_eq!(data.unwrap()["err"], "BlockhashNotFound");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unhealthy_reply_marks_endpoint_down() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    let custom = MockChain::start().await;
    primary.with(|s| s.health = "behind");

    let selector = selector(&primary, &fallback, Some(&custom));
    let client = Arc::new(JsonRpcClient::new(selector.clone(), Duration::from_secs(2)).unwrap());
    let monitor = EndpointHealthMonitor::new(
        selector,
        client,
        Arc::new(ConnectivityFlag::default()),
        HealthCheckConfig::default(),
    );

    assert!(matches!(monitor.probe_once().await, EndpointHealth::Down(_)));
    assert_eq!(monitor.current_endpoint().role, EndpointRole::Fallback);
    assert!(matches!(monitor.probe_once().await, EndpointHealth::Healthy(_)));
    assert_eq!(monitor.current_endpoint().role, EndpointRole::Fallback);
}

#[tokio::test]
async fn test_broadcast_fails_over_to_fallback() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| {
        s.http_failures.insert("sendTransaction", 503);
    });

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();

    let record = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, TransactionStatus::Pending);
    assert_eq!(primary.count("sendTransaction"), 1);
    assert_eq!(fallback.with(|s| s.sent.clone()), vec![record.hash.clone()]);
    assert_eq!(runtime.health.current_endpoint().role, EndpointRole::Fallback);
}

#[tokio::test]
async fn test_simulation_outage_fails_over_before_broadcast() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| {
        s.http_failures.insert("simulateTransaction", 503);
    });

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();

    let first = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap();
    let second = runtime
        .coordinator
        .submit(&transfer(2_000_000), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(primary.count("simulateTransaction"), 1);
    assert_eq!(fallback.count("simulateTransaction"), 2);
    assert_eq!(primary.count("sendTransaction"), 0);
    assert_eq!(fallback.with(|s| s.sent.clone()), vec![first.hash, second.hash]);
    assert_eq!(runtime.health.current_endpoint().role, EndpointRole::Fallback);
}

#[tokio::test]
async fn test_all_endpoints_down_surfaces_broadcast_error() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    for chain in [&primary, &fallback] {
        chain.with(|s| {
            s.http_failures.insert("sendTransaction", 503);
        });
    }

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();

    let err = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::Broadcast(_)), "{:?}", err);
    // Three attempts: primary, fallback, then primary again (custom defaults to primary).
    assert_eq!(primary.count("sendTransaction") + fallback.count("sendTransaction"), 3);
    assert!(runtime.store.query_pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_broadcast_is_not_retried() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| {
        s.send_error = Some(json!({ "code": -32003, "message": "Transaction signature verification failure" }))
    });

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();

    let err = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WalletError::Broadcast(ref m) if m.contains("verification failure")));
    assert_eq!(primary.count("sendTransaction"), 1);
    assert_eq!(fallback.count("sendTransaction"), 0);
    assert_eq!(runtime.health.current_endpoint().role, EndpointRole::Primary);
}

#[tokio::test]
async fn test_simulation_error_stops_before_broadcast() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;
    primary.with(|s| s.simulation_error = Some(json!({ "InstructionError": [0, { "Custom": 1 }] })));

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();

    let err = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        WalletError::SimulationFailure { message, logs } => {
            assert_eq!(message, r#"{"InstructionError":[0,{"Custom":1}]}"#);
            assert_eq!(logs.len(), 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(primary.count("getLatestBlockhash"), 0);
    assert_eq!(primary.count("sendTransaction"), 0);
}

#[tokio::test]
async fn test_status_poll_outage_defers_and_recovers() {
    let primary = MockChain::start().await;
    let fallback = MockChain::start().await;

    let runtime = WalletRuntime::build(config(&primary, &fallback), Arc::new(ConnectivityFlag::default())).unwrap();
    runtime.wallets.import(PHRASE, "main").await.unwrap();
    let record = runtime
        .coordinator
        .submit(&transfer(1_000_000), &CancellationToken::new())
        .await
        .unwrap();

    primary.with(|s| {
        s.http_failures.insert("getSignatureStatuses", 503);
        s.http_failures.insert("getHealth", 503);
    });
    fallback.finalize(&record.hash);

    let summary = runtime.confirmations.poll_once().await;
    assert_eq!(summary.skipped, 1);
    // The failed poll triggered a re-probe, which rotated away from the primary.
    assert_eq!(runtime.health.current_endpoint().role, EndpointRole::Fallback);

    let summary = runtime.confirmations.poll_once().await;
    assert_eq!(summary.confirmed, 1);
    let stored = runtime.store.get(&record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Confirmed);
}
