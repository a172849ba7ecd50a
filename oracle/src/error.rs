//! The oracle-wide error taxonomy.
//!
//! Every failure is terminal for its request and surfaced verbatim as a
//! JSON-RPC error: a masked error would let the circuit proceed with wrong
//! or zeroed witness data and produce a proof that is syntactically valid
//! but semantically meaningless.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::provider::ClientError;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unknown chain id: {0}")]
    UnknownChain(u64),

    #[error("unknown oracle function: {0:?}")]
    UnknownFunction(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("{what} of {len} bytes exceeds its fixed-width budget of {max}")]
    EncodingOverflow {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("upstream returned inconsistent data: {0}")]
    InconsistentUpstream(String),
}

impl OracleError {
    /// JSON-RPC 2.0 error code for this failure class. Standard codes where
    /// one fits, the implementation-defined `-32000..` range otherwise.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            OracleError::Decode(_) => -32602,
            OracleError::UnknownFunction(_) => -32601,
            OracleError::UnknownChain(_) => -32001,
            OracleError::Client(ClientError::Timeout(_)) => -32002,
            OracleError::Client(_) => -32003,
            OracleError::EncodingOverflow { .. } => -32004,
            OracleError::InconsistentUpstream(_) => -32005,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_classes_map_to_distinct_codes() {
        let errors = [
            OracleError::Decode(DecodeError::BadArity {
                expected: 2,
                actual: 1,
            }),
            OracleError::UnknownFunction("get_blob".to_string()),
            OracleError::UnknownChain(5),
            OracleError::Client(ClientError::Timeout(std::time::Duration::from_secs(1))),
            OracleError::Client(ClientError::ConnectionFailed("boom".to_string())),
            OracleError::EncodingOverflow {
                what: "header rlp",
                len: 800,
                max: 708,
            },
            OracleError::InconsistentUpstream("hash mismatch".to_string()),
        ];
        let mut codes: Vec<i64> = errors.iter().map(OracleError::json_rpc_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
