//! Startup orchestration: the composition root.
//!
//! # Responsibilities
//! - Validate configuration
//! - Construct every component in dependency order and pass collaborators
//!   through constructors
//! - Spawn the background loops (endpoint health, confirmations)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing here is global; tests build as many runtimes as they like
//! - Shutdown has a deadline: loops that do not exit in time are abandoned

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::accounts::WalletManager;
use crate::config::{validate_config, ValidationError, WalletConfig};
use crate::confirmations::ConfirmationMonitor;
use crate::coordinator::{Collaborators, TransactionCoordinator};
use crate::events::TransactionFeed;
use crate::health::{Connectivity, EndpointHealthMonitor, EndpointSelector};
use crate::keys::DerivationScheme;
use crate::lifecycle::shutdown::Shutdown;
use crate::risk::{ConfirmationGate, PolicyRiskScanner, RejectUnsafe};
use crate::rpc::{ChainRpc, JsonRpcClient, RpcError};
use crate::store::{MemoryStore, StoreError, TransactionStore};
use crate::transaction::Pubkey;
use crate::vault::{KeyVault, SecureEnclave, SoftwareEnclave, VaultError};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),

    #[error("failed to open key storage: {0}")]
    Vault(#[from] VaultError),

    #[error("failed to open transaction store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to create RPC client: {0}")]
    Rpc(#[from] RpcError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every long-lived component, wired.
pub struct WalletRuntime {
    pub config: WalletConfig,
    pub shutdown: Shutdown,
    pub health: Arc<EndpointHealthMonitor>,
    pub coordinator: Arc<TransactionCoordinator>,
    pub confirmations: Arc<ConfirmationMonitor>,
    pub wallets: WalletManager,
    pub store: Arc<dyn TransactionStore>,
    pub feed: TransactionFeed,
}

impl WalletRuntime {
    /// Build with the default confirmation gate.
    pub fn build(
        config: WalletConfig,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, StartupError> {
        Self::build_with_gate(config, connectivity, Arc::new(RejectUnsafe))
    }

    pub fn build_with_gate(
        config: WalletConfig,
        connectivity: Arc<dyn Connectivity>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Result<Self, StartupError> {
        validate_config(&config).map_err(StartupError::Config)?;

        if config.keys.derivation_scheme == DerivationScheme::RawSeedSlice {
            tracing::warn!(
                "Derivation scheme raw_seed_slice is active: recovery phrases will not \
                 produce the same addresses as standard wallets"
            );
        }

        let selector = Arc::new(EndpointSelector::new(&config.endpoints));
        let rpc: Arc<dyn ChainRpc> = Arc::new(JsonRpcClient::new(
            Arc::clone(&selector),
            Duration::from_millis(config.timeouts.rpc_ms),
        )?);
        let health = Arc::new(EndpointHealthMonitor::new(
            selector,
            Arc::clone(&rpc),
            connectivity,
            config.health_check.clone(),
        ));

        let enclave: Arc<dyn SecureEnclave> = match &config.storage.enclave_key_path {
            Some(path) => Arc::new(SoftwareEnclave::open_file(path)?),
            None => {
                tracing::warn!("No enclave key path configured, keys will not survive a restart");
                Arc::new(SoftwareEnclave::ephemeral())
            }
        };
        let vault = Arc::new(match &config.storage.vault_path {
            Some(path) => KeyVault::open(enclave, path)?,
            None => KeyVault::new(enclave),
        });
        let store: Arc<dyn TransactionStore> = match &config.storage.records_path {
            Some(path) => Arc::new(MemoryStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        // Validation already rejected malformed entries.
        let blocked = config
            .risk
            .blocked_addresses
            .iter()
            .filter_map(|a| a.parse::<Pubkey>().ok());
        let feed = TransactionFeed::default();

        let coordinator = Arc::new(TransactionCoordinator::new(
            Collaborators {
                rpc: Arc::clone(&rpc),
                health: Arc::clone(&health),
                vault: Arc::clone(&vault),
                store: Arc::clone(&store),
                scanner: Arc::new(PolicyRiskScanner::new(blocked)),
                gate,
                feed: feed.clone(),
            },
            config.transfer.clone(),
            config.retries.clone(),
        ));
        let confirmations = Arc::new(ConfirmationMonitor::new(
            rpc,
            Arc::clone(&store),
            Arc::clone(&health),
            feed.clone(),
            config.confirmations.clone(),
        ));
        let wallets = WalletManager::new(vault, Arc::clone(&store), config.keys.derivation_scheme);

        tracing::info!(
            endpoint = %health.current_endpoint().url,
            persistent = config.storage.records_path.is_some(),
            "Wallet runtime ready"
        );

        Ok(Self {
            config,
            shutdown: Shutdown::new(),
            health,
            coordinator,
            confirmations,
            wallets,
            store,
            feed,
        })
    }

    /// Start the health probe and confirmation loops.
    pub fn spawn_background(&self) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(Arc::clone(&self.health).run(self.shutdown.subscribe())),
            tokio::spawn(Arc::clone(&self.confirmations).run(self.shutdown.subscribe())),
        ]
    }

    /// Trigger shutdown and wait for the loops, up to a deadline.
    pub async fn stop(&self, handles: Vec<JoinHandle<()>>) {
        self.shutdown.trigger();
        match tokio::time::timeout(SHUTDOWN_DEADLINE, join_all(handles)).await {
            Ok(results) => {
                for e in results.into_iter().filter_map(Result::err) {
                    tracing::error!(error = %e, "Background task ended abnormally");
                }
            }
            Err(_) => tracing::warn!(
                deadline_secs = SHUTDOWN_DEADLINE.as_secs(),
                "Background tasks did not stop in time"
            ),
        }
    }
}
