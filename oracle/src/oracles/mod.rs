//! The oracle functions the circuit may invoke through foreign calls.
//!
//! Dispatch is a closed enum rather than a string-keyed map: adding a new
//! foreign-call function means adding a variant here and a handler module,
//! and the compiler checks every match site.

use crate::codec::{decode_u64_field, DecodeError, ADDRESS_LEN, BYTES32_LEN};
use crate::error::OracleError;
use crate::foreign_call::{
    normalize_arguments, ArgShape, ForeignCallParam, ForeignCallResult, NoirArgument,
    ResultValues,
};
use crate::provider::MultiChainClient;

pub mod account;
pub mod header;
pub mod proof;
pub mod receipt;
pub mod storage;
pub mod transaction;

/// Every foreign-call function this oracle resolves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OracleFunction {
    GetHeader,
    GetAccount,
    GetProof,
    GetReceipt,
    GetTransaction,
    GetStorageRecursive,
    GetBlockHeaderAndAccount,
}

impl OracleFunction {
    pub fn parse(name: &str) -> Result<Self, OracleError> {
        match name {
            "get_header" => Ok(Self::GetHeader),
            "get_account" => Ok(Self::GetAccount),
            "get_proof" => Ok(Self::GetProof),
            "get_receipt" => Ok(Self::GetReceipt),
            "get_transaction" => Ok(Self::GetTransaction),
            "get_storage_recursive" => Ok(Self::GetStorageRecursive),
            "get_block_header_and_account" => Ok(Self::GetBlockHeaderAndAccount),
            other => Err(OracleError::UnknownFunction(other.to_string())),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::GetHeader => "get_header",
            Self::GetAccount => "get_account",
            Self::GetProof => "get_proof",
            Self::GetReceipt => "get_receipt",
            Self::GetTransaction => "get_transaction",
            Self::GetStorageRecursive => "get_storage_recursive",
            Self::GetBlockHeaderAndAccount => "get_block_header_and_account",
        }
    }

    /// Fixed input arity and per-argument shape, validated before any
    /// network call.
    pub const fn signature(self) -> &'static [ArgShape] {
        use ArgShape::{Bytes, Scalar};
        match self {
            Self::GetHeader => &[Scalar, Scalar],
            Self::GetAccount | Self::GetBlockHeaderAndAccount => {
                &[Scalar, Scalar, Bytes(ADDRESS_LEN)]
            }
            Self::GetProof | Self::GetStorageRecursive => {
                &[Scalar, Scalar, Bytes(ADDRESS_LEN), Bytes(BYTES32_LEN)]
            }
            Self::GetReceipt | Self::GetTransaction => &[Scalar, Scalar, Scalar],
        }
    }
}

/// Normalizes the raw inputs against the function signature and runs the
/// matching handler.
pub async fn resolve(
    client: &MultiChainClient,
    function: OracleFunction,
    inputs: &[ForeignCallParam],
) -> Result<ForeignCallResult, OracleError> {
    let args = normalize_arguments(inputs, function.signature())?;
    match function {
        OracleFunction::GetHeader => header::get_header_oracle(client, &args).await.map(Into::into),
        OracleFunction::GetAccount => account::get_account_oracle(client, &args)
            .await
            .map(Into::into),
        OracleFunction::GetProof => proof::get_proof_oracle(client, &args).await.map(Into::into),
        OracleFunction::GetReceipt => receipt::get_receipt_oracle(client, &args)
            .await
            .map(Into::into),
        OracleFunction::GetTransaction => transaction::get_transaction_oracle(client, &args)
            .await
            .map(Into::into),
        OracleFunction::GetStorageRecursive => {
            storage::get_storage_recursive_oracle(client, &args)
                .await
                .map(Into::into)
        }
        OracleFunction::GetBlockHeaderAndAccount => {
            // Two independent upstream calls, issued concurrently.
            let (block_header, account) = futures::try_join!(
                header::get_header_oracle(client, &args[..2]),
                account::get_account_oracle(client, &args),
            )?;
            Ok(ForeignCallResult {
                values: ResultValues::HeaderAndAccount {
                    block_header,
                    account,
                },
            })
        }
    }
}

pub(crate) fn expect_arity(args: &[NoirArgument], expected: usize) -> Result<(), OracleError> {
    if args.len() != expected {
        return Err(DecodeError::BadArity {
            expected,
            actual: args.len(),
        }
        .into());
    }
    Ok(())
}

/// Decodes the `(chain_id, block_number, tx_index)` triple shared by the
/// transaction-level functions.
pub(crate) fn decode_tx_locator(
    args: &[NoirArgument],
) -> Result<(u64, u64, usize), OracleError> {
    expect_arity(args, 3)?;
    let chain_id = decode_u64_field(scalar_arg(args, 0)?)?;
    let block_number = decode_u64_field(scalar_arg(args, 1)?)?;
    let tx_index = decode_u64_field(scalar_arg(args, 2)?)? as usize;
    Ok((chain_id, block_number, tx_index))
}

/// Reads an argument slot that must hold a single scalar value.
pub(crate) fn scalar_arg(args: &[NoirArgument], index: usize) -> Result<&str, OracleError> {
    let slot = &args[index];
    match slot.as_slice() {
        [value] => Ok(value),
        _ => Err(DecodeError::InvalidLength {
            expected: 1,
            actual: slot.len(),
        }
        .into()),
    }
}
