//! `get_receipt`: one transaction receipt, re-encoded as its EIP-2718
//! binary form plus the fields the circuit reads without parsing RLP.

use alloy::{
    consensus::{Receipt, ReceiptEnvelope},
    providers::network::eip2718::Encodable2718,
    rpc::types::eth::ReceiptWithBloom,
};

use super::decode_tx_locator;
use crate::codec::{encode_field, encode_hex, pad_array, Side, ZERO_PAD_VALUE};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::{ClientError, MultiChainClient};

/// Fixed width of the padded receipt encoding, in bytes.
pub const MAX_RECEIPT_RLP_LEN: usize = 1024;

pub async fn get_receipt_oracle(
    client: &MultiChainClient,
    args: &[NoirArgument],
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let (chain_id, block_number, tx_index) = decode_tx_locator(args)?;
    let chain = client.get_client(chain_id)?;
    let receipts = chain.get_block_receipts(block_number).await?;
    let receipt = receipts.get(tx_index).ok_or(ClientError::TxIndexOutOfRange {
        block: block_number,
        index: tx_index,
    })?;

    let status = receipt.status();
    let envelope = map_receipt_envelope(receipt.inner.clone())?;
    encode_receipt(status, &envelope)
}

/// Output order: status, cumulative gas, padded encoding, real length.
fn encode_receipt(
    status: bool,
    envelope: &ReceiptEnvelope<alloy::primitives::Log>,
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let cumulative_gas_used = envelope
        .as_receipt()
        .map(|receipt| receipt.cumulative_gas_used)
        .unwrap_or_default();
    let encoded = envelope.encoded_2718();
    if encoded.len() > MAX_RECEIPT_RLP_LEN {
        return Err(OracleError::EncodingOverflow {
            what: "receipt rlp",
            len: encoded.len(),
            max: MAX_RECEIPT_RLP_LEN,
        });
    }

    Ok(vec![
        ForeignCallParam::Single(encode_field(u64::from(status))),
        ForeignCallParam::Single(encode_field(cumulative_gas_used)),
        ForeignCallParam::Array(pad_array(
            encode_hex(&encoded),
            MAX_RECEIPT_RLP_LEN,
            ZERO_PAD_VALUE,
            Side::Right,
        )),
        ForeignCallParam::Single(encode_field(encoded.len() as u64)),
    ])
}

/// Moves a receipt envelope from RPC logs to consensus logs so it can be
/// 2718-encoded. Receipt types this oracle does not know how to encode are
/// an upstream inconsistency rather than a panic.
fn map_receipt_envelope(
    rpc: ReceiptEnvelope<alloy::rpc::types::eth::Log>,
) -> Result<ReceiptEnvelope<alloy::primitives::Log>, OracleError> {
    Ok(match rpc {
        ReceiptEnvelope::Legacy(it) => ReceiptEnvelope::Legacy(map_receipt_with_bloom(it)),
        ReceiptEnvelope::Eip2930(it) => ReceiptEnvelope::Eip2930(map_receipt_with_bloom(it)),
        ReceiptEnvelope::Eip1559(it) => ReceiptEnvelope::Eip1559(map_receipt_with_bloom(it)),
        ReceiptEnvelope::Eip4844(it) => ReceiptEnvelope::Eip4844(map_receipt_with_bloom(it)),
        other => {
            return Err(OracleError::InconsistentUpstream(format!(
                "unsupported receipt type: {other:?}"
            )))
        }
    })
}

fn map_receipt_with_bloom(
    rpc: ReceiptWithBloom<alloy::rpc::types::eth::Log>,
) -> ReceiptWithBloom<alloy::primitives::Log> {
    let ReceiptWithBloom {
        receipt:
            Receipt {
                status,
                cumulative_gas_used,
                logs,
            },
        logs_bloom,
    } = rpc;
    ReceiptWithBloom {
        receipt: Receipt {
            status,
            cumulative_gas_used,
            logs: logs.into_iter().map(|it| it.inner).collect(),
        },
        logs_bloom,
    }
}

#[cfg(test)]
mod test {
    use alloy::consensus::Eip658Value;
    use alloy::primitives::{Bloom, Log, U256};

    use super::*;
    use crate::codec::decode_field;

    fn envelope(success: bool, gas: u128, logs: Vec<Log>) -> ReceiptEnvelope<Log> {
        ReceiptEnvelope::Eip1559(ReceiptWithBloom {
            receipt: Receipt {
                status: Eip658Value::Eip658(success),
                cumulative_gas_used: gas,
                logs,
            },
            logs_bloom: Bloom::default(),
        })
    }

    #[test]
    fn it_encodes_a_receipt_with_its_type_prefix() {
        let envelope = envelope(true, 321_000, vec![]);
        let encoded = envelope.encoded_2718();
        let values = encode_receipt(true, &envelope).unwrap();

        assert_eq!(values[0], ForeignCallParam::Single("0x1".to_string()));
        assert_eq!(
            values[1],
            ForeignCallParam::Single(encode_field(321_000u64))
        );

        let ForeignCallParam::Array(padded) = &values[2] else {
            panic!("receipt rlp must be an array param");
        };
        assert_eq!(padded.len(), MAX_RECEIPT_RLP_LEN);
        // EIP-1559 receipts start with their transaction type byte.
        assert_eq!(padded[0], "0x02");
        assert_eq!(padded[..encoded.len()], encode_hex(&encoded)[..]);
        assert!(padded[encoded.len()..].iter().all(|b| b == ZERO_PAD_VALUE));

        let ForeignCallParam::Single(len) = &values[3] else {
            panic!("rlp length must be a single param");
        };
        assert_eq!(decode_field(len).unwrap(), U256::from(encoded.len()));
    }

    #[test]
    fn a_failed_receipt_reports_status_zero() {
        let values = encode_receipt(false, &envelope(false, 21_000, vec![])).unwrap();
        assert_eq!(values[0], ForeignCallParam::Single("0x0".to_string()));
    }
}
