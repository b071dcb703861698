use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payout_service::application::service::PayoutService;
use payout_service::application::worker::{ProcessingWorker, processing_queue};
use payout_service::config::ServiceConfig;
use payout_service::domain::money::MinorUnits;
use payout_service::domain::payout::MerchantId;
use payout_service::domain::ports::{BalanceGatewayBox, LedgerGatewayBox, PayoutStoreBox};
use payout_service::infrastructure::http::{HttpBalanceGateway, HttpLedgerGateway};
use payout_service::infrastructure::in_memory::{
    InMemoryBalanceGateway, InMemoryLedgerGateway, InMemoryPayoutStore,
};
use payout_service::interfaces::csv::command_reader::{CommandReader, PayoutCommand};
use payout_service::interfaces::csv::payout_writer::PayoutWriter;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payout commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Base URL of the merchant balance service. A sandbox balance is used when absent.
    #[arg(long, env = "MERCHANT_SERVICE_URL")]
    merchant_service_url: Option<String>,

    /// Base URL of the transaction ledger service. An in-memory ledger is used when absent.
    #[arg(long, env = "TRANSACTION_SERVICE_URL")]
    transaction_service_url: Option<String>,

    /// Sandbox opening balance per merchant and currency, in display units.
    #[arg(long, default_value = "0")]
    sandbox_balance: Decimal,

    /// Delay before a created payout is auto-processed.
    #[arg(long, default_value_t = 5_000)]
    processing_delay_ms: u64,

    /// Timeout for each balance or ledger request.
    #[arg(long, default_value_t = 10_000)]
    gateway_timeout_ms: u64,

    /// Maximum number of payouts listed per merchant.
    #[arg(long, default_value_t = 50)]
    page_size: usize,
}

fn open_store(db_path: Option<&Path>) -> Result<PayoutStoreBox> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = db_path {
        use payout_service::infrastructure::rocksdb::RocksDBPayoutStore;
        return Ok(Box::new(RocksDBPayoutStore::open(path).into_diagnostic()?));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    Ok(Box::new(InMemoryPayoutStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "payout_service=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ServiceConfig::default()
        .with_processing_delay(Duration::from_millis(cli.processing_delay_ms))
        .with_gateway_timeout(Duration::from_millis(cli.gateway_timeout_ms))
        .with_list_page_size(cli.page_size);

    let store = open_store(cli.db_path.as_deref())?;

    let balances: BalanceGatewayBox = match &cli.merchant_service_url {
        Some(url) => Box::new(HttpBalanceGateway::new(url, config.gateway_timeout).into_diagnostic()?),
        None => {
            let opening = MinorUnits::from_display(cli.sandbox_balance).into_diagnostic()?;
            info!(opening_balance = %opening, "using sandbox balance service");
            Box::new(InMemoryBalanceGateway::with_opening_balance(opening))
        }
    };
    let ledger: LedgerGatewayBox = match &cli.transaction_service_url {
        Some(url) => Box::new(HttpLedgerGateway::new(url, config.gateway_timeout).into_diagnostic()?),
        None => Box::new(InMemoryLedgerGateway::new()),
    };

    let (scheduler, queue) = processing_queue();
    let service = Arc::new(PayoutService::new(
        store,
        balances,
        ledger,
        Box::new(scheduler),
        config,
    ));
    let worker = ProcessingWorker::spawn(service.clone(), queue);
    service.recover_pending().await.into_diagnostic()?;

    // Apply commands in file order
    let file = File::open(&cli.input).into_diagnostic()?;
    let mut merchants = BTreeSet::new();
    for command in CommandReader::new(file).commands() {
        match command {
            Ok(command) => {
                if let Err(e) = apply(&service, command, &mut merchants).await {
                    error!("Error processing command: {}", e);
                }
            }
            Err(e) => error!("Error reading command: {}", e),
        }
    }

    // Let scheduled processing finish before reporting
    worker.drain().await.into_diagnostic()?;

    let mut payouts = Vec::new();
    for merchant in merchants {
        payouts.extend(service.list(merchant).await.into_diagnostic()?);
    }

    let stdout = io::stdout();
    let mut writer = PayoutWriter::new(stdout.lock());
    writer.write_payouts(payouts).into_diagnostic()?;

    Ok(())
}

async fn apply(
    service: &PayoutService,
    command: PayoutCommand,
    merchants: &mut BTreeSet<MerchantId>,
) -> payout_service::error::Result<()> {
    let target = match &command {
        PayoutCommand::Create(_) => None,
        PayoutCommand::UpdateStatus { payout, .. } | PayoutCommand::Cancel { payout } => {
            Some(*payout)
        }
    };
    let result = match command {
        PayoutCommand::Create(request) => service.create(request).await,
        PayoutCommand::UpdateStatus { payout, status } => {
            service.update_status(payout, &status).await
        }
        PayoutCommand::Cancel { payout } => service.cancel(payout).await,
    };

    match result {
        Ok(view) => {
            merchants.insert(view.merchant_id);
            Ok(())
        }
        Err(e) => {
            // A failed update may still have changed the payout, e.g. to failed
            if let Some(id) = target
                && let Ok(Some(view)) = service.get(id).await
            {
                merchants.insert(view.merchant_id);
            }
            Err(e)
        }
    }
}
