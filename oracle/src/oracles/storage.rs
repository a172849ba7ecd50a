//! `get_storage_recursive`: the storage-trie half of `get_proof`, used when
//! the circuit walks nested mappings and only needs slot membership proofs
//! against an already-proven storage root.

use super::proof::{decode_get_proof_arguments, encode_storage_proof};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::MultiChainClient;

pub async fn get_storage_recursive_oracle(
    client: &MultiChainClient,
    args: &[NoirArgument],
) -> Result<Vec<ForeignCallParam>, OracleError> {
    let (chain_id, block_number, address, storage_key) = decode_get_proof_arguments(args)?;
    let chain = client.get_client(chain_id)?;
    let proof = chain
        .get_proof(address, vec![storage_key], block_number)
        .await?;
    let storage_proof = proof.storage_proof.first().ok_or_else(|| {
        OracleError::InconsistentUpstream(
            "eth_getProof returned no proof for the requested storage key".to_string(),
        )
    })?;

    Ok(vec![encode_storage_proof(storage_key, storage_proof)?])
}
