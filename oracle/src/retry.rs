//! Bounded, exponentially backed-off retries at the transport layer.
//!
//! Oracle handlers never retry: every upstream call is a read, so retrying
//! is safe, but it belongs here, below the handlers, where it is invisible
//! to the foreign-call semantics. A `max_retries` of 0 disables retries
//! entirely.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use alloy::{
    providers::{ProviderBuilder, RootProvider},
    rpc::{
        client::ClientBuilder,
        json_rpc::{RequestPacket, ResponsePacket},
    },
    transports::TransportError,
};
use tower::{retry::Policy, Layer, Service};

/// Transport type used by every chain client.
pub type OracleTransport = BackoffService<alloy::transports::http::ReqwestTransport>;

#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    base_backoff: tokio::time::Duration,
    attempt: u32,
    max_retries: u32,
}

impl BackoffPolicy {
    pub const fn new(base_backoff: tokio::time::Duration, max_retries: u32) -> Self {
        Self {
            base_backoff,
            attempt: 0,
            max_retries,
        }
    }

    /// Delay before the next attempt: doubles after every failure.
    fn backoff(&self) -> tokio::time::Sleep {
        tokio::time::sleep(self.base_backoff * 2u32.saturating_pow(self.attempt))
    }
}

impl Policy<RequestPacket, ResponsePacket, TransportError> for BackoffPolicy {
    type Future = Pin<Box<dyn Future<Output = Self> + Send + 'static>>;

    fn retry(
        &self,
        _req: &RequestPacket,
        result: Result<&ResponsePacket, &TransportError>,
    ) -> Option<Self::Future> {
        match result {
            Ok(_) => None,
            // An error response from the node is a definitive answer, not a
            // transient transport failure. Only the latter is retried.
            Err(TransportError::ErrorResp(_)) => None,
            Err(_) if self.attempt < self.max_retries => {
                let mut policy = self.clone();
                Some(Box::pin(async move {
                    policy.backoff().await;
                    policy.attempt += 1;
                    policy
                }))
            }
            Err(_) => None,
        }
    }

    fn clone_request(&self, req: &RequestPacket) -> Option<RequestPacket> {
        Some(req.clone())
    }
}

pub struct BackoffLayer {
    policy: BackoffPolicy,
}

impl BackoffLayer {
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for BackoffLayer {
    type Service = BackoffService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BackoffService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BackoffService<S> {
    inner: S,
    policy: BackoffPolicy,
}

impl<S> Service<RequestPacket> for BackoffService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Send
        + 'static
        + Clone,
    S::Future: Send + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        let inner = self.inner.clone();
        let mut policy = self.policy.clone();

        let mut inner = std::mem::replace(&mut self.inner, inner);
        Box::pin(async move {
            let mut res = inner.call(req.clone()).await;

            while let Some(next) = policy.retry(&req, res.as_ref()) {
                policy = next.await;
                res = inner.call(req.clone()).await;
            }

            res
        })
    }
}

/// Builds an HTTP provider whose transport retries transient failures with
/// exponential backoff, up to `max_retries` additional attempts.
pub fn build_http_backoff_provider(
    rpc_url: url::Url,
    base_backoff_ms: u64,
    max_retries: u32,
) -> RootProvider<OracleTransport> {
    let layer = BackoffLayer::new(BackoffPolicy::new(
        tokio::time::Duration::from_millis(base_backoff_ms),
        max_retries,
    ));
    let client = ClientBuilder::default().layer(layer).http(rpc_url);
    ProviderBuilder::new().on_client(client)
}
