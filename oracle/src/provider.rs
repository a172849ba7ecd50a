//! Chain-id to RPC endpoint resolution.
//!
//! The chain table is built once at startup and never mutated afterwards, so
//! lookups need no locking and the whole structure can be shared across
//! concurrent requests behind an `Arc`.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use alloy::{
    primitives::{Address, B256},
    providers::{Provider, RootProvider},
    rpc::types::eth::{Block, BlockTransactionsKind, EIP1186AccountProofResponse, TransactionReceipt},
    transports::TransportError,
};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::retry::{build_http_backoff_provider, OracleTransport};

/// Default bound applied to every upstream call so a stalled endpoint cannot
/// hang witness generation indefinitely.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding comma-separated `chain_id=url` pairs.
pub const RPC_URLS_ENV: &str = "ORACLE_RPC_URLS";

/// An error from the upstream Ethereum JSON-RPC endpoint or its transport.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("upstream rpc call timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not reach upstream rpc endpoint: {0}")]
    ConnectionFailed(String),

    #[error("upstream rpc error (code {code}): {message}")]
    UpstreamRpc { code: i64, message: String },

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("transaction index {index} out of range for block {block}")]
    TxIndexOutOfRange { block: u64, index: usize },
}

impl ClientError {
    fn from_transport(err: TransportError) -> Self {
        match err {
            TransportError::ErrorResp(payload) => ClientError::UpstreamRpc {
                code: payload.code,
                message: payload.message,
            },
            other => ClientError::ConnectionFailed(other.to_string()),
        }
    }
}

/// One `chain_id=url` binding, parseable straight from a CLI flag.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainSpec {
    pub chain_id: u64,
    pub rpc_url: Url,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChainSpecParseError {
    #[error("missing `=` separator, expecting `chain_id=url`")]
    MissingSeparator,
    #[error("invalid chain id: {0:?}")]
    InvalidChainId(String),
    #[error("invalid rpc url: {0:?}")]
    InvalidUrl(String),
}

impl FromStr for ChainSpec {
    type Err = ChainSpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, url) = s
            .split_once('=')
            .ok_or(ChainSpecParseError::MissingSeparator)?;
        let chain_id = id
            .trim()
            .parse()
            .map_err(|_| ChainSpecParseError::InvalidChainId(id.to_string()))?;
        let rpc_url = url
            .trim()
            .parse()
            .map_err(|_| ChainSpecParseError::InvalidUrl(url.to_string()))?;
        Ok(ChainSpec { chain_id, rpc_url })
    }
}

/// Transport tuning shared by every chain client.
#[derive(Clone, Copy, Debug)]
pub struct TransportOpts {
    /// Base backoff for transport-level retries, in milliseconds.
    pub backoff: u64,
    /// Maximum number of transport-level retries (0 disables retrying).
    pub max_retries: u32,
    /// Upper bound on any single upstream call.
    pub timeout: Duration,
}

impl Default for TransportOpts {
    fn default() -> Self {
        Self {
            backoff: 250,
            max_retries: 2,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

/// Process-lifetime handle to one configured chain's RPC endpoint.
pub struct ChainClient {
    chain_id: u64,
    provider: RootProvider<OracleTransport>,
    timeout: Duration,
}

impl ChainClient {
    fn new(spec: ChainSpec, opts: &TransportOpts) -> Self {
        Self {
            chain_id: spec.chain_id,
            provider: build_http_backoff_provider(spec.rpc_url, opts.backoff, opts.max_retries),
            timeout: opts.timeout,
        }
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Applies the configured timeout to one upstream call and maps the
    /// transport error into the client taxonomy.
    async fn bounded<F, T>(&self, call: F) -> Result<T, ClientError>
    where
        F: std::future::IntoFuture<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(ClientError::from_transport)
    }

    /// Fetches a block by number. The block must exist.
    pub async fn get_block(&self, number: u64) -> Result<Block, ClientError> {
        self.bounded(
            self.provider
                .get_block(number.into(), BlockTransactionsKind::Hashes),
        )
        .await?
        .ok_or(ClientError::BlockNotFound(number))
    }

    /// Fetches a block by number with full transaction bodies.
    pub async fn get_block_full(&self, number: u64) -> Result<Block, ClientError> {
        self.bounded(
            self.provider
                .get_block(number.into(), BlockTransactionsKind::Full),
        )
        .await?
        .ok_or(ClientError::BlockNotFound(number))
    }

    /// Fetches an `eth_getProof` response for one account and its storage
    /// keys at the given block.
    pub async fn get_proof(
        &self,
        address: Address,
        storage_keys: Vec<B256>,
        block_number: u64,
    ) -> Result<EIP1186AccountProofResponse, ClientError> {
        self.bounded(
            self.provider
                .get_proof(address, storage_keys)
                .block_id(block_number.into()),
        )
        .await
    }

    /// Fetches all receipts of a block.
    pub async fn get_block_receipts(
        &self,
        block_number: u64,
    ) -> Result<Vec<TransactionReceipt>, ClientError> {
        self.bounded(self.provider.get_block_receipts(block_number.into()))
            .await?
            .ok_or(ClientError::BlockNotFound(block_number))
    }
}

/// Read-only table of chain clients, built once at startup.
pub struct MultiChainClient {
    clients: HashMap<u64, ChainClient>,
}

impl MultiChainClient {
    pub fn new(specs: impl IntoIterator<Item = ChainSpec>, opts: &TransportOpts) -> Self {
        let clients: HashMap<u64, ChainClient> = specs
            .into_iter()
            .map(|spec| (spec.chain_id, ChainClient::new(spec, opts)))
            .collect();
        info!(
            chains = ?clients.keys().collect::<Vec<_>>(),
            "configured chain clients"
        );
        Self { clients }
    }

    /// Builds the table from the `ORACLE_RPC_URLS` environment variable.
    pub fn from_env(opts: &TransportOpts) -> anyhow::Result<Self> {
        let raw = std::env::var(RPC_URLS_ENV)
            .map_err(|_| anyhow::anyhow!("{RPC_URLS_ENV} is not set and no --chain was given"))?;
        let specs = raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<ChainSpec>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(specs, opts))
    }

    /// Pure lookup; unconfigured chain ids surface as `UnknownChain` at
    /// request time rather than at construction.
    pub fn get_client(&self, chain_id: u64) -> Result<&ChainClient, crate::error::OracleError> {
        self.clients
            .get(&chain_id)
            .ok_or(crate::error::OracleError::UnknownChain(chain_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_parses_chain_specs() {
        let spec: ChainSpec = "11155111=https://rpc.sepolia.example".parse().unwrap();
        assert_eq!(spec.chain_id, 11155111);
        assert_eq!(spec.rpc_url.as_str(), "https://rpc.sepolia.example/");
    }

    #[test]
    fn it_rejects_malformed_chain_specs() {
        assert_eq!(
            "11155111".parse::<ChainSpec>().unwrap_err(),
            ChainSpecParseError::MissingSeparator
        );
        assert_eq!(
            "sepolia=https://rpc.example".parse::<ChainSpec>().unwrap_err(),
            ChainSpecParseError::InvalidChainId("sepolia".to_string())
        );
        assert_eq!(
            "1=not a url".parse::<ChainSpec>().unwrap_err(),
            ChainSpecParseError::InvalidUrl("not a url".to_string())
        );
    }

    #[test]
    fn unknown_chains_fail_at_lookup_time() {
        let client = MultiChainClient::new(
            ["1=https://rpc.example".parse::<ChainSpec>().unwrap()],
            &TransportOpts::default(),
        );
        assert!(client.get_client(1).is_ok());
        assert!(matches!(
            client.get_client(5),
            Err(crate::error::OracleError::UnknownChain(5))
        ));
    }
}
