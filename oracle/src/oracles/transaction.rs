//! `get_transaction`: one transaction located by block number and index,
//! re-encoded as its EIP-2718 binary form.

use alloy::providers::network::{eip2718::Encodable2718, Ethereum, Network};

use super::decode_tx_locator;
use crate::codec::{encode_field, encode_hex, pad_array, Side, ZERO_PAD_VALUE};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::{ClientError, MultiChainClient};

/// Fixed width of the padded transaction encoding, in bytes.
pub const MAX_TX_RLP_LEN: usize = 1024;

pub async fn get_transaction_oracle(
    client: &MultiChainClient,
    args: &[NoirArgument],
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let (chain_id, block_number, tx_index) = decode_tx_locator(args)?;
    let chain = client.get_client(chain_id)?;
    let block = chain.get_block_full(block_number).await?;
    let transactions = block.transactions.as_transactions().ok_or_else(|| {
        OracleError::InconsistentUpstream(
            "node returned a block without full transaction bodies".to_string(),
        )
    })?;
    let tx = transactions
        .get(tx_index)
        .ok_or(ClientError::TxIndexOutOfRange {
            block: block_number,
            index: tx_index,
        })?;

    let envelope = <Ethereum as Network>::TxEnvelope::try_from(tx.clone()).map_err(|err| {
        OracleError::InconsistentUpstream(format!(
            "cannot rebuild the signed transaction envelope: {err}"
        ))
    })?;
    let encoded = envelope.encoded_2718();
    if encoded.len() > MAX_TX_RLP_LEN {
        return Err(OracleError::EncodingOverflow {
            what: "transaction rlp",
            len: encoded.len(),
            max: MAX_TX_RLP_LEN,
        });
    }

    Ok(vec![
        ForeignCallParam::Array(encode_hex(tx.hash.as_slice())),
        ForeignCallParam::Array(pad_array(
            encode_hex(&encoded),
            MAX_TX_RLP_LEN,
            ZERO_PAD_VALUE,
            Side::Right,
        )),
        ForeignCallParam::Single(encode_field(encoded.len() as u64)),
    ])
}
