//! One-shot note transfer.
//!
//! Reads `config.toml` (or `JOURNAL_SYNC_CONFIG`), runs a single transfer and
//! prints a JSON report. Exits non-zero when the run fails.

use dotenv::dotenv;
use journal_sync::config::env_vars;
use journal_sync::credentials::Credentials;
use journal_sync::docs::DocsClient;
use journal_sync::notes::KeepRelayClient;
use journal_sync::{http, Config, SyncResult, Transfer};
use journal_sync_types::{RpcResponse, SyncSummary};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let report: RpcResponse<SyncSummary> = match run().await {
        Ok(summary) => RpcResponse::ok(summary),
        Err(e) => {
            log::error!("Sync failed: {}", e);
            RpcResponse::err(e.to_string())
        }
    };

    match serde_json::to_string(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize run report: {}", e),
    }

    if !report.success {
        std::process::exit(1);
    }
}

async fn run() -> SyncResult<SyncSummary> {
    let config = Config::load()?;
    let credentials = Credentials::from_file(&config.credentials_file)?
        .with_docs_token(std::env::var(env_vars::DOCS_TOKEN).ok());

    let client = http::build_client(config.request_timeout())?;
    let mut notes = KeepRelayClient::new(&config.notes_url, client.clone());
    let docs = DocsClient::new(&config.docs_url, credentials.docs_token()?, client);

    let mut transfer = Transfer::new(&config, &credentials, &mut notes, &docs);
    transfer.run().await
}
