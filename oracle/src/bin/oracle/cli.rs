use clap::Parser;
use eth_oracle::provider::ChainSpec;

/// Foreign-call oracle server config
#[derive(Parser)]
#[command(version)]
pub(crate) struct Cli {
    /// Port the JSON-RPC server listens on.
    #[arg(short, long, env = "ORACLE_PORT", default_value_t = 5555)]
    pub(crate) port: u16,

    /// One `chain_id=url` endpoint binding, repeatable. When no binding is
    /// given the table is read from ORACLE_RPC_URLS instead.
    #[arg(short, long = "chain")]
    pub(crate) chains: Vec<ChainSpec>,

    /// Base backoff for transport-level retries, in milliseconds.
    #[arg(long, env = "ORACLE_BACKOFF", default_value_t = 250)]
    pub(crate) backoff: u64,

    /// Maximum number of transport-level retries per upstream call.
    #[arg(long, env = "ORACLE_MAX_RETRIES", default_value_t = 2)]
    pub(crate) max_retries: u32,

    /// Upper bound on any single upstream call, in milliseconds.
    #[arg(long, env = "ORACLE_TIMEOUT_MS", default_value_t = 30_000)]
    pub(crate) timeout_ms: u64,
}
