//! Wallet lifecycle: create, import, activate and remove.
//!
//! Private keys go straight from derivation into the vault; only the public
//! key and display metadata reach the store.

use std::sync::Arc;
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};
use crate::keys::{self, DerivationScheme, Keypair};
use crate::store::{now_millis, TransactionStore, Wallet};
use crate::vault::KeyVault;

/// A freshly generated wallet and the phrase to show the user once.
pub struct CreatedWallet {
    pub wallet: Wallet,
    pub mnemonic: Zeroizing<String>,
}

impl std::fmt::Debug for CreatedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedWallet")
            .field("wallet", &self.wallet)
            .field("mnemonic", &"[REDACTED]")
            .finish()
    }
}

pub struct WalletManager {
    vault: Arc<KeyVault>,
    store: Arc<dyn TransactionStore>,
    scheme: DerivationScheme,
}

impl WalletManager {
    pub fn new(vault: Arc<KeyVault>, store: Arc<dyn TransactionStore>, scheme: DerivationScheme) -> Self {
        Self { vault, store, scheme }
    }

    /// Generate a 12-word wallet, store its key and make it active.
    pub async fn create(&self, label: &str) -> WalletResult<CreatedWallet> {
        let (mnemonic, keypair) = keys::generate(self.scheme);
        let wallet = self.register(label, keypair).await?;
        Ok(CreatedWallet { wallet, mnemonic })
    }

    /// Restore a wallet from a 12- or 24-word phrase and make it active.
    pub async fn import(&self, phrase: &str, label: &str) -> WalletResult<Wallet> {
        let keypair = keys::from_mnemonic(phrase, self.scheme)
            .map_err(|e| WalletError::Validation(e.to_string()))?;

        let pubkey = keypair.pubkey();
        if self
            .store
            .list_wallets()
            .await?
            .iter()
            .any(|w| w.public_key == pubkey)
        {
            return Err(WalletError::Validation(format!(
                "wallet {} is already imported",
                pubkey
            )));
        }
        self.register(label, keypair).await
    }

    async fn register(&self, label: &str, keypair: Keypair) -> WalletResult<Wallet> {
        let wallet = Wallet {
            id: uuid::Uuid::new_v4().to_string(),
            public_key: keypair.pubkey(),
            label: label.to_string(),
            is_active: false,
            derivation: self.scheme,
            created_at: now_millis(),
        };

        let mut secret = keypair.secret_bytes();
        drop(keypair);
        self.vault.store(&wallet.id, &mut secret[..])?;

        if let Err(e) = self.store.insert_wallet(wallet.clone()).await {
            if let Err(cleanup) = self.vault.delete(&wallet.id) {
                tracing::error!(wallet_id = %wallet.id, error = %cleanup, "Failed to remove orphaned key");
            }
            return Err(e.into());
        }

        let active = self.store.activate_wallet(&wallet.id).await?;
        tracing::info!(
            wallet_id = %active.id,
            public_key = %active.public_key,
            scheme = ?self.scheme,
            "Wallet registered and activated"
        );
        Ok(active)
    }

    pub async fn activate(&self, wallet_id: &str) -> WalletResult<Wallet> {
        let wallet = self.store.activate_wallet(wallet_id).await?;
        tracing::info!(wallet_id, "Wallet activated");
        Ok(wallet)
    }

    /// Delete the key and the wallet row. Transaction history is kept.
    pub async fn remove(&self, wallet_id: &str) -> WalletResult<()> {
        self.vault.delete(wallet_id)?;
        self.store.remove_wallet(wallet_id).await?;
        tracing::info!(wallet_id, "Wallet removed");
        Ok(())
    }

    pub async fn list(&self) -> WalletResult<Vec<Wallet>> {
        Ok(self.store.list_wallets().await?)
    }

    pub async fn active(&self) -> WalletResult<Wallet> {
        self.store
            .get_active_wallet()
            .await?
            .ok_or(WalletError::NoActiveWallet)
    }
}
