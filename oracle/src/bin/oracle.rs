use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use eth_oracle::provider::{MultiChainClient, TransportOpts};
use eth_oracle::server;

mod oracle {
    pub mod cli;
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    eth_oracle::tracing::init();

    let args = oracle::cli::Cli::parse();

    let opts = TransportOpts {
        backoff: args.backoff,
        max_retries: args.max_retries,
        timeout: Duration::from_millis(args.timeout_ms),
    };
    let client = if args.chains.is_empty() {
        MultiChainClient::from_env(&opts)?
    } else {
        MultiChainClient::new(args.chains, &opts)
    };

    server::serve(args.port, client).await
}
