use anyhow::Context;
use clap::Parser;
use einvoice_ledger::config::EngineConfig;
use einvoice_ledger::dispatch::Dispatcher;
use einvoice_ledger::service::InvoiceService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Invoke one e-invoice ledger function against the configured store
#[derive(Debug, Parser)]
#[command(name = "einvoice", version)]
struct Cli {
    /// Configuration file, defaults to config/einvoice.toml when present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ledger function, e.g. saveNormalEInvoice or queryEInvoice
    function: String,
    /// One JSON payload, or the invoice code and number for queries
    args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("parsing log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = config
        .store
        .open()
        .with_context(|| format!("opening ledger at {}", config.store.path.display()))?;
    let dispatcher = Dispatcher::new(InvoiceService::new(Arc::new(store)));

    let output = dispatcher.invoke(&cli.function, &cli.args)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
