//! `get_account`: account state plus its state-trie membership proof,
//! without any storage slot.

use alloy::primitives::Address;

use super::proof::{encode_account, encode_state_proof};
use super::{expect_arity, scalar_arg};
use crate::codec::{decode_address, decode_u64_field};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::MultiChainClient;

pub async fn get_account_oracle(
    client: &MultiChainClient,
    args: &[NoirArgument],
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let (chain_id, block_number, address) = decode_get_account_arguments(args)?;
    let chain = client.get_client(chain_id)?;
    // No storage keys: the node still returns the account and its proof.
    let proof = chain.get_proof(address, vec![], block_number).await?;

    let mut values = encode_account(&proof);
    values.push(encode_state_proof(&proof)?);
    Ok(values)
}

pub(crate) fn decode_get_account_arguments(
    args: &[NoirArgument],
) -> Result<(u64, u64, Address), OracleError> {
    expect_arity(args, 3)?;
    let chain_id = decode_u64_field(scalar_arg(args, 0)?)?;
    let block_number = decode_u64_field(scalar_arg(args, 1)?)?;
    let address = decode_address(&args[2])?;
    Ok((chain_id, block_number, address))
}
