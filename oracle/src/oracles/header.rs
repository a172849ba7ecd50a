//! `get_header`: fetch one block header and re-encode it for the circuit.
//!
//! The circuit consumes the raw header RLP (right-padded to a fixed width)
//! plus the handful of fields it constrains directly. The RLP is rebuilt
//! locally and its keccak must equal the hash the node reported, otherwise
//! the upstream answer is rejected.

use alloy::{
    consensus,
    primitives::{keccak256, B256},
    rpc::types::eth::Header as RpcHeader,
};

use super::{expect_arity, scalar_arg};
use crate::codec::{decode_u64_field, encode_field, encode_hex, pad_array, Side, ZERO_PAD_VALUE};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::MultiChainClient;

/// Fixed width of the padded header RLP, in bytes.
pub const MAX_HEADER_RLP_LEN: usize = 708;

pub async fn get_header_oracle(
    client: &MultiChainClient,
    args: &[NoirArgument],
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let (chain_id, block_number) = decode_get_header_arguments(args)?;
    let chain = client.get_client(chain_id)?;
    let block = chain.get_block(block_number).await?;
    encode_block_header(&block.header)
}

pub(crate) fn decode_get_header_arguments(
    args: &[NoirArgument],
) -> Result<(u64, u64), OracleError> {
    expect_arity(args, 2)?;
    let chain_id = decode_u64_field(scalar_arg(args, 0)?)?;
    let block_number = decode_u64_field(scalar_arg(args, 1)?)?;
    Ok((chain_id, block_number))
}

fn encode_block_header(header: &RpcHeader) -> Result<Vec<ForeignCallParam>, OracleError> {
    encode_consensus_header(&derive_consensus_header(header), header.hash)
}

/// Rebuilds the consensus-layer header from the JSON-RPC view. Pre-merge
/// blocks may omit `mix_hash`/`nonce`; both RLP-encode as their zero values.
fn derive_consensus_header(header: &RpcHeader) -> consensus::Header {
    consensus::Header {
        parent_hash: header.parent_hash,
        ommers_hash: header.uncles_hash,
        beneficiary: header.miner,
        state_root: header.state_root,
        transactions_root: header.transactions_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom,
        difficulty: header.difficulty,
        number: header.number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: header.extra_data.clone(),
        mix_hash: header.mix_hash.unwrap_or_default(),
        nonce: header.nonce.unwrap_or_default(),
        base_fee_per_gas: header.base_fee_per_gas,
        withdrawals_root: header.withdrawals_root,
        blob_gas_used: header.blob_gas_used,
        excess_blob_gas: header.excess_blob_gas,
        parent_beacon_block_root: header.parent_beacon_block_root,
        requests_root: header.requests_root,
    }
}

/// Fixed output order: number, hash, state root, transactions root,
/// receipts root, padded RLP, real RLP length.
pub(crate) fn encode_consensus_header(
    header: &consensus::Header,
    reported_hash: B256,
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let rlp = alloy::rlp::encode(header);
    if rlp.len() > MAX_HEADER_RLP_LEN {
        return Err(OracleError::EncodingOverflow {
            what: "header rlp",
            len: rlp.len(),
            max: MAX_HEADER_RLP_LEN,
        });
    }
    let computed_hash = keccak256(&rlp);
    if computed_hash != reported_hash {
        return Err(OracleError::InconsistentUpstream(format!(
            "header rlp for block {} hashes to {computed_hash}, node reported {reported_hash}",
            header.number
        )));
    }

    Ok(vec![
        ForeignCallParam::Single(encode_field(header.number)),
        ForeignCallParam::Array(encode_hex(computed_hash.as_slice())),
        ForeignCallParam::Array(encode_hex(header.state_root.as_slice())),
        ForeignCallParam::Array(encode_hex(header.transactions_root.as_slice())),
        ForeignCallParam::Array(encode_hex(header.receipts_root.as_slice())),
        ForeignCallParam::Array(pad_array(
            encode_hex(&rlp),
            MAX_HEADER_RLP_LEN,
            ZERO_PAD_VALUE,
            Side::Right,
        )),
        ForeignCallParam::Single(encode_field(rlp.len() as u64)),
    ])
}
