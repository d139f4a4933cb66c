//! `wallet-core` command line.

use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroizing;

use wallet_core::config::{load_config, WalletConfig};
use wallet_core::health::ConnectivityFlag;
use wallet_core::lifecycle::shutdown_on_signal;
use wallet_core::observability::{init_logging, init_metrics};
use wallet_core::rpc::Commitment;
use wallet_core::transaction::SimulationOutcome;
use wallet_core::units::{format_native, parse_native_amount};
use wallet_core::{SubmitRequest, WalletRuntime};

#[derive(Parser)]
#[command(name = "wallet-core")]
#[command(about = "Self-custody wallet transaction engine", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the health and confirmation loops until interrupted
    Run,
    /// Generate a new wallet and make it active
    Create {
        #[arg(short, long, default_value = "Main wallet")]
        label: String,
    },
    /// Import a wallet; the recovery phrase is read from stdin
    Import {
        #[arg(short, long, default_value = "Imported wallet")]
        label: String,
    },
    /// Make a wallet the active one
    Activate { wallet_id: String },
    /// List wallets
    Wallets,
    /// Show the active wallet's balance
    Balance,
    /// Send a native transfer from the active wallet
    Send(TransferArgs),
    /// Dry-run a transfer without signing
    Simulate(TransferArgs),
    /// Probe the active endpoint
    Health,
    /// Recent transactions of the active wallet
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Signatures the network has for the active wallet, including incoming ones
    Activity {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Token accounts of the active wallet
    Tokens,
    /// Look up a transaction by hash
    Show { hash: String },
}

#[derive(Args)]
struct TransferArgs {
    /// Recipient address (base58)
    #[arg(long)]
    to: String,
    /// Amount in native units, e.g. 0.001
    #[arg(long)]
    amount: String,
    #[arg(long)]
    memo: Option<String>,
    /// Compute-unit price in micro-units
    #[arg(long)]
    priority_fee: Option<u64>,
}

impl TransferArgs {
    fn request(&self) -> Result<SubmitRequest, Box<dyn std::error::Error>> {
        Ok(SubmitRequest {
            recipient: self.to.clone(),
            amount: parse_native_amount(&self.amount)?,
            memo: self.memo.clone(),
            priority_fee: self.priority_fee,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WalletConfig::default(),
    };
    init_logging(&config.observability);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let runtime = WalletRuntime::build(config, Arc::new(ConnectivityFlag::default()))?;

    match cli.command {
        Commands::Run => run(&runtime).await,
        Commands::Create { label } => {
            let created = runtime.wallets.create(&label).await?;
            println!("wallet    {}", created.wallet.id);
            println!("address   {}", created.wallet.public_key);
            println!("recovery phrase (write it down, it is shown once):");
            println!("{}", created.mnemonic.as_str());
        }
        Commands::Import { label } => {
            let mut phrase = Zeroizing::new(String::new());
            std::io::stdin().lock().read_line(&mut phrase)?;
            let wallet = runtime.wallets.import(&phrase, &label).await?;
            println!("wallet    {}", wallet.id);
            println!("address   {}", wallet.public_key);
        }
        Commands::Activate { wallet_id } => {
            let wallet = runtime.wallets.activate(&wallet_id).await?;
            println!("active    {} ({})", wallet.id, wallet.public_key);
        }
        Commands::Wallets => {
            for wallet in runtime.wallets.list().await? {
                let marker = if wallet.is_active { "*" } else { " " };
                println!("{} {}  {}  {}", marker, wallet.id, wallet.public_key, wallet.label);
            }
        }
        Commands::Balance => {
            let balance = runtime.coordinator.balance().await?;
            println!("{}", format_native(balance));
        }
        Commands::Send(args) => {
            let request = args.request()?;
            let cancel = runtime.shutdown.submission_token();
            let submit = runtime.coordinator.submit(&request, &cancel);
            tokio::pin!(submit);
            let record = tokio::select! {
                result = &mut submit => result?,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    submit.await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Simulate(args) => {
            let request = args.request()?;
            let cancel = runtime.shutdown.submission_token();
            match runtime.coordinator.simulate(&request, &cancel).await? {
                SimulationOutcome::Ok {
                    logs,
                    units_consumed,
                } => {
                    println!("ok (compute units: {})", units_consumed.unwrap_or_default());
                    logs.iter().for_each(|l| println!("  {}", l));
                }
                SimulationOutcome::Failed { error, logs } => {
                    println!("failed: {}", error);
                    logs.iter().for_each(|l| println!("  {}", l));
                }
            }
        }
        Commands::Health => {
            let health = runtime.health.probe_once().await;
            let endpoint = runtime.health.current_endpoint();
            println!("{}  {}  {}", endpoint.role, endpoint.url, health);
        }
        Commands::History { limit } => {
            for record in runtime.coordinator.history(limit).await? {
                println!(
                    "{}  {:<9}  {:>14}  {}  {}",
                    record.timestamp,
                    record.status.as_str(),
                    format_native(record.amount),
                    record.to,
                    record.hash
                );
            }
        }
        Commands::Activity { limit } => {
            for entry in runtime.coordinator.chain_activity(limit).await? {
                let known = runtime.store.find_by_hash(&entry.signature).await?.is_some();
                let status = match (&entry.err, entry.confirmation_status) {
                    (Some(_), _) => "failed",
                    (None, Some(Commitment::Finalized)) => "finalized",
                    (None, Some(Commitment::Confirmed)) => "confirmed",
                    (None, _) => "processed",
                };
                println!(
                    "{:>10}  {:<9}  {}  {}",
                    entry.slot,
                    status,
                    if known { "local " } else { "remote" },
                    entry.signature
                );
            }
        }
        Commands::Tokens => {
            for account in runtime.coordinator.token_accounts().await? {
                let info = &account.account["data"]["parsed"]["info"];
                println!(
                    "{}  {}  {}",
                    account.pubkey,
                    info["mint"].as_str().unwrap_or("?"),
                    info["tokenAmount"]["uiAmountString"].as_str().unwrap_or("?")
                );
            }
        }
        Commands::Show { hash } => match runtime.coordinator.lookup_transaction(&hash).await? {
            Some(transaction) => println!("{}", serde_json::to_string_pretty(&transaction)?),
            None => println!("{} is not known to the network", hash),
        },
    }

    Ok(())
}

async fn run(runtime: &WalletRuntime) {
    tracing::info!("wallet-core v{} starting", env!("CARGO_PKG_VERSION"));
    let handles = runtime.spawn_background();

    let mut updates = runtime.feed.subscribe();
    let signal = shutdown_on_signal(&runtime.shutdown);
    tokio::pin!(signal);
    loop {
        tokio::select! {
            _ = &mut signal => break,
            Some(record) = updates.next() => {
                tracing::info!(id = %record.id, hash = %record.hash, status = %record.status, "Record updated");
            }
        }
    }

    runtime.stop(handles).await;
    tracing::info!("Shutdown complete");
}
