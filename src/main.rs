use std::{env, fs::File, path::Path};

use tracing_subscriber::EnvFilter;

use timebank_ledger::{
    CsvReader, InMemoryBalances, InMemoryJournal, LedgerConfig, SettlementEngine,
    TracingAuditSink, TracingNotifier, output,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays a clean balance snapshot.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let ops_path = args
        .next()
        .ok_or("usage: timebank_ledger <operations.csv> [config.json]")?;

    let config: LedgerConfig = match args.next() {
        Some(path) => serde_json::from_reader(File::open(Path::new(&path))?)?,
        None => LedgerConfig::default(),
    };
    let decimal_places = config.fees.decimal_places;

    let mut ingestion = CsvReader::new(File::open(Path::new(&ops_path))?)?;
    let mut engine = SettlementEngine::new(
        config,
        InMemoryBalances::new(),
        InMemoryJournal::new(),
        TracingAuditSink::default(),
        TracingNotifier::default(),
    )?;

    engine.process(&mut ingestion).await?;

    output::write_balances(engine.balances(), decimal_places, std::io::stdout())?;

    Ok(())
}
