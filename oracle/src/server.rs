//! The JSON-RPC 2.0 endpoint the circuit runtime talks to during witness
//! generation.
//!
//! One POST route serves two calling conventions: `resolve_foreign_call`,
//! whose single param is a foreign-call envelope, and the legacy convention
//! where the oracle function name is the JSON-RPC method and `params` is the
//! raw input array. Both run through the same normalization and dispatch.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::codec::DecodeError;
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, ForeignCallRequest, ForeignCallResult};
use crate::oracles::{self, OracleFunction};
use crate::provider::MultiChainClient;

pub const RESOLVE_FOREIGN_CALL: &str = "resolve_foreign_call";

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    params: Value,
    /// Absent id marks a notification: the caller wants no response body.
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<ForeignCallResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

pub async fn serve(port: u16, client: MultiChainClient) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("oracle listening on {addr}");

    let app = router(Arc::new(client));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    Ok(axum::serve(listener, app).await?)
}

pub fn router(client: Arc<MultiChainClient>) -> Router {
    Router::new().route("/", post(handle)).with_state(client)
}

async fn handle(
    State(client): State<Arc<MultiChainClient>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let outcome = dispatch(&client, &request).await;
    match request.id {
        None => {
            if let Err(err) = outcome {
                error!(method = %request.method, %err, "notification failed");
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Some(id) => {
            let response = match outcome {
                Ok(result) => JsonRpcResponse {
                    jsonrpc: "2.0",
                    result: Some(result),
                    error: None,
                    id,
                },
                Err(err) => {
                    error!(method = %request.method, %err, "foreign call failed");
                    JsonRpcResponse {
                        jsonrpc: "2.0",
                        result: None,
                        error: Some(JsonRpcError {
                            code: err.json_rpc_code(),
                            message: err.to_string(),
                        }),
                        id,
                    }
                }
            };
            Json(response).into_response()
        }
    }
}

async fn dispatch(
    client: &MultiChainClient,
    request: &JsonRpcRequest,
) -> Result<ForeignCallResult, OracleError> {
    if request.method == RESOLVE_FOREIGN_CALL {
        let call = decode_foreign_call(&request.params)?;
        debug!(
            function = %call.function,
            session = call.session_id,
            package = %call.package_name,
            "resolving foreign call"
        );
        let function = OracleFunction::parse(&call.function)?;
        oracles::resolve(client, function, &call.inputs).await
    } else {
        let function = OracleFunction::parse(&request.method)?;
        debug!(function = function.name(), "resolving direct call");
        let inputs: Vec<ForeignCallParam> = serde_json::from_value(request.params.clone())
            .map_err(|err| DecodeError::InvalidPayload(err.to_string()))?;
        oracles::resolve(client, function, &inputs).await
    }
}

/// `resolve_foreign_call` carries exactly one envelope in its params array.
fn decode_foreign_call(params: &Value) -> Result<ForeignCallRequest, OracleError> {
    let calls: Vec<ForeignCallRequest> = serde_json::from_value(params.clone())
        .map_err(|err| DecodeError::InvalidPayload(err.to_string()))?;
    match <[ForeignCallRequest; 1]>::try_from(calls) {
        Ok([call]) => Ok(call),
        Err(calls) => Err(DecodeError::BadArity {
            expected: 1,
            actual: calls.len(),
        }
        .into()),
    }
}
