//! `get_proof`: fetch an `eth_getProof` response and re-encode the account
//! state and both Merkle-Patricia proofs into the circuit's fixed geometry.
//!
//! Geometry is entirely static. Each trie node occupies a fixed stride of
//! [`MAX_TRIE_NODE_LEN`] entries and the node region always holds
//! `max_depth - 1` strides, so the circuit can index node `i` at offset
//! `i * MAX_TRIE_NODE_LEN` regardless of the proof's real depth. The real
//! depth travels as the last element and tells the circuit how many strides
//! carry data.

use alloy::{
    primitives::{keccak256, Address, B256},
    rpc::types::eth::{EIP1186AccountProofResponse, EIP1186StorageProof},
};

use super::{expect_arity, scalar_arg};
use crate::codec::{
    decode_address, decode_bytes32, decode_u64_field, encode_field, encode_hex, pad_array, Side,
    ZERO_PAD_VALUE,
};
use crate::error::OracleError;
use crate::foreign_call::{ForeignCallParam, NoirArgument};
use crate::provider::MultiChainClient;

/// Fixed stride of one padded trie node, in entries.
pub const MAX_TRIE_NODE_LEN: usize = 532;
/// Upper bound on the RLP of one account state, in bytes.
pub const MAX_ACCOUNT_STATE_LEN: usize = 134;

/// In a two-item leaf node RLP, the value sits at this index.
const RLP_VALUE_INDEX: usize = 1;

/// Static geometry of one proof kind. All derived sizes are computable at
/// compile time, so the circuit and the oracle agree by construction.
#[derive(Clone, Copy, Debug)]
pub struct ProofConfig {
    /// Key length in bytes before nibble expansion.
    pub key_len: usize,
    /// Fixed width of the encoded value, in bytes.
    pub value_len: usize,
    /// Maximum number of trie levels, leaf included.
    pub max_depth: usize,
}

impl ProofConfig {
    /// Key expanded to nibbles plus the two-nibble HP prefix.
    pub const fn max_prefixed_key_nibble_len(&self) -> usize {
        2 * self.key_len + 2
    }

    /// Worst-case leaf RLP: list header (3 bytes when the payload crosses 55
    /// bytes) plus the encoded path and the encoded value, each with up to 2
    /// bytes of string header.
    pub const fn max_leaf_len(&self) -> usize {
        3 + (self.key_len + 2) + (self.value_len + 2)
    }

    /// Size of the node region: every level except the leaf, one stride each.
    pub const fn max_nodes_len(&self) -> usize {
        (self.max_depth - 1) * MAX_TRIE_NODE_LEN
    }
}

/// State trie: the value is a full account state RLP.
pub const ACCOUNT_PROOF: ProofConfig = ProofConfig {
    key_len: 32,
    value_len: MAX_ACCOUNT_STATE_LEN,
    max_depth: 11,
};

/// Storage trie: the value is one 32-byte word.
pub const STORAGE_PROOF: ProofConfig = ProofConfig {
    key_len: 32,
    value_len: 32,
    max_depth: 8,
};

pub async fn get_proof_oracle(
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

    let mut values = encode_account(&proof);
    values.push(encode_state_proof(&proof)?);
    values.push(encode_storage_proof(storage_key, storage_proof)?);
    Ok(values)
}

pub(crate) fn decode_get_proof_arguments(
    args: &[NoirArgument],
) -> Result<(u64, u64, Address, B256), OracleError> {
    expect_arity(args, 4)?;
    let chain_id = decode_u64_field(scalar_arg(args, 0)?)?;
    let block_number = decode_u64_field(scalar_arg(args, 1)?)?;
    let address = decode_address(&args[2])?;
    let storage_key = decode_bytes32(&args[3])?;
    Ok((chain_id, block_number, address, storage_key))
}

/// Account state fields in circuit order: nonce, balance, storage root,
/// code hash.
pub(crate) fn encode_account(proof: &EIP1186AccountProofResponse) -> Vec<ForeignCallParam> {
    vec![
        ForeignCallParam::Single(encode_field(proof.nonce)),
        ForeignCallParam::Single(encode_field(proof.balance)),
        ForeignCallParam::Array(encode_hex(proof.storage_hash.as_slice())),
        ForeignCallParam::Array(encode_hex(proof.code_hash.as_slice())),
    ]
}

/// Encodes the account proof against the state trie. The value is the
/// account RLP carried by the leaf node, left-padded to its fixed width.
pub(crate) fn encode_state_proof(
    proof: &EIP1186AccountProofResponse,
) -> Result<ForeignCallParam, OracleError> {
    let Some((leaf, inner_nodes)) = proof.account_proof.split_last() else {
        return Err(OracleError::InconsistentUpstream(
            "eth_getProof returned an empty account proof".to_string(),
        ));
    };
    let value = leaf_value(leaf)?;
    encode_trie_proof(
        &ACCOUNT_PROOF,
        keccak256(proof.address),
        &value,
        inner_nodes,
        leaf,
        proof.account_proof.len(),
    )
}

/// Encodes one storage proof against the account's storage trie. A proof
/// whose trie holds a single node (or an absent/zero slot) degenerates to
/// depth 1 with an all-padding node region.
pub(crate) fn encode_storage_proof(
    storage_key: B256,
    storage_proof: &EIP1186StorageProof,
) -> Result<ForeignCallParam, OracleError> {
    let value = storage_proof.value.to_be_bytes::<32>();
    let (leaf, inner_nodes): (&[u8], &[alloy::primitives::Bytes]) =
        match storage_proof.proof.as_slice() {
            [] => {
                return Err(OracleError::InconsistentUpstream(
                    "eth_getProof returned an empty storage proof".to_string(),
                ))
            }
            // The root is the leaf itself: no intermediate nodes exist.
            [only] => (only, &[]),
            [inner @ .., leaf] => (leaf, inner),
        };
    encode_trie_proof(
        &STORAGE_PROOF,
        keccak256(storage_key),
        &value,
        inner_nodes,
        leaf,
        storage_proof.proof.len(),
    )
}

/// Flat layout consumed by the circuit:
/// `key ++ value ++ nodes ++ leaf ++ [depth]`.
fn encode_trie_proof(
    cfg: &ProofConfig,
    hashed_key: B256,
    value: &[u8],
    inner_nodes: &[alloy::primitives::Bytes],
    leaf: &[u8],
    depth: usize,
) -> Result<ForeignCallParam, OracleError> {
    if depth > cfg.max_depth {
        return Err(OracleError::EncodingOverflow {
            what: "trie proof depth",
            len: depth,
            max: cfg.max_depth,
        });
    }
    if value.len() > cfg.value_len {
        return Err(OracleError::EncodingOverflow {
            what: "trie leaf value",
            len: value.len(),
            max: cfg.value_len,
        });
    }
    if leaf.len() > cfg.max_leaf_len() {
        return Err(OracleError::EncodingOverflow {
            what: "trie leaf node",
            len: leaf.len(),
            max: cfg.max_leaf_len(),
        });
    }

    let key = pad_array(
        encode_hex(hashed_key.as_slice()),
        cfg.max_prefixed_key_nibble_len(),
        ZERO_PAD_VALUE,
        Side::Left,
    );
    let value = pad_array(encode_hex(value), cfg.value_len, ZERO_PAD_VALUE, Side::Left);

    let mut nodes = Vec::with_capacity(cfg.max_nodes_len());
    for node in inner_nodes {
        if node.len() > MAX_TRIE_NODE_LEN {
            return Err(OracleError::EncodingOverflow {
                what: "trie node",
                len: node.len(),
                max: MAX_TRIE_NODE_LEN,
            });
        }
        nodes.extend(pad_array(
            encode_hex(node),
            MAX_TRIE_NODE_LEN,
            ZERO_PAD_VALUE,
            Side::Right,
        ));
    }
    let nodes = pad_array(nodes, cfg.max_nodes_len(), ZERO_PAD_VALUE, Side::Right);
    let leaf = pad_array(
        encode_hex(leaf),
        cfg.max_leaf_len(),
        ZERO_PAD_VALUE,
        Side::Right,
    );

    let mut out = key;
    out.extend(value);
    out.extend(nodes);
    out.extend(leaf);
    out.push(encode_field(depth as u64));
    Ok(ForeignCallParam::Array(out))
}

/// Extracts the value item of a two-item leaf node RLP.
fn leaf_value(leaf: &[u8]) -> Result<Vec<u8>, OracleError> {
    let node = rlp::Rlp::new(leaf);
    node.at(RLP_VALUE_INDEX)
        .and_then(|item| item.data().map(<[u8]>::to_vec))
        .map_err(|err| {
            OracleError::InconsistentUpstream(format!("malformed trie leaf node rlp: {err}"))
        })
}

#[cfg(test)]
mod test {
    use alloy::primitives::{Bytes, U256};

    use super::*;
    use crate::codec::{decode_field, decode_hex_byte};

    /// Total entry count of one encoded proof param.
    const fn proof_entries(cfg: &ProofConfig) -> usize {
        cfg.max_prefixed_key_nibble_len() + cfg.value_len + cfg.max_nodes_len() + cfg.max_leaf_len() + 1
    }

    fn leaf_node(value: &[u8]) -> Bytes {
        let mut stream = rlp::RlpStream::new_list(2);
        stream.append(&&b"\x20abcd"[..]);
        stream.append(&value);
        Bytes::from(stream.out().to_vec())
    }

    fn account_proof_response(account_proof: Vec<Bytes>) -> EIP1186AccountProofResponse {
        EIP1186AccountProofResponse {
            address: Address::repeat_byte(0x42),
            balance: U256::from(1_000_000_000u64),
            code_hash: B256::repeat_byte(0xcc),
            nonce: 7,
            storage_hash: B256::repeat_byte(0x55),
            account_proof,
            storage_proof: vec![],
        }
    }

    #[test]
    fn geometry_matches_the_circuit_constants() {
        assert_eq!(ACCOUNT_PROOF.max_prefixed_key_nibble_len(), 66);
        assert_eq!(ACCOUNT_PROOF.max_leaf_len(), 173);
        assert_eq!(ACCOUNT_PROOF.max_nodes_len(), 10 * MAX_TRIE_NODE_LEN);
        assert_eq!(STORAGE_PROOF.max_leaf_len(), 71);
        assert_eq!(STORAGE_PROOF.max_nodes_len(), 7 * MAX_TRIE_NODE_LEN);
    }

    #[test]
    fn it_encodes_account_fields_in_circuit_order() {
        let response = account_proof_response(vec![]);
        let values = encode_account(&response);
        assert_eq!(values[0], ForeignCallParam::Single("0x7".to_string()));
        assert_eq!(values[1], ForeignCallParam::Single("0x3b9aca00".to_string()));
        assert_eq!(
            values[2],
            ForeignCallParam::Array(encode_hex(&[0x55; 32]))
        );
        assert_eq!(
            values[3],
            ForeignCallParam::Array(encode_hex(&[0xcc; 32]))
        );
    }

    #[test]
    fn it_encodes_a_state_proof_with_the_fixed_layout() {
        let account_rlp = vec![0xaa; 70];
        let branch = Bytes::from(vec![0xde; 100]);
        let leaf = leaf_node(&account_rlp);
        let response = account_proof_response(vec![branch.clone(), leaf.clone()]);

        let ForeignCallParam::Array(entries) = encode_state_proof(&response).unwrap() else {
            panic!("state proof must be an array param");
        };
        assert_eq!(entries.len(), proof_entries(&ACCOUNT_PROOF));

        // Key region: keccak(address) left-padded to 66 entries.
        let key = &entries[..66];
        assert!(key[..34].iter().all(|b| b == ZERO_PAD_VALUE));
        assert_eq!(
            key[34..],
            encode_hex(keccak256(Address::repeat_byte(0x42)).as_slice())[..]
        );

        // Value region: the leaf's account rlp, left-padded to 134 entries.
        let value = &entries[66..200];
        assert!(value[..134 - 70].iter().all(|b| b == ZERO_PAD_VALUE));
        assert_eq!(value[134 - 70..], encode_hex(&account_rlp)[..]);

        // First node stride holds the branch, right-padded; the second
        // stride is pure padding.
        let nodes = &entries[200..200 + ACCOUNT_PROOF.max_nodes_len()];
        assert_eq!(nodes[..100], encode_hex(&branch)[..]);
        assert!(nodes[100..2 * MAX_TRIE_NODE_LEN].iter().all(|b| b == ZERO_PAD_VALUE));

        // Depth is the final entry and counts the leaf.
        assert_eq!(decode_field(entries.last().unwrap()).unwrap(), U256::from(2));
    }

    #[test]
    fn a_single_node_storage_proof_has_depth_one_and_padding_nodes() {
        let key = B256::repeat_byte(0x01);
        let storage_proof = EIP1186StorageProof {
            key: B256::ZERO.into(),
            value: U256::ZERO,
            proof: vec![leaf_node(&[])],
        };

        let ForeignCallParam::Array(entries) = encode_storage_proof(key, &storage_proof).unwrap()
        else {
            panic!("storage proof must be an array param");
        };
        assert_eq!(entries.len(), proof_entries(&STORAGE_PROOF));

        // A zero slot still occupies the full 32-entry value region.
        let value = &entries[66..98];
        assert!(value.iter().all(|b| b == ZERO_PAD_VALUE));

        let nodes = &entries[98..98 + STORAGE_PROOF.max_nodes_len()];
        assert!(nodes.iter().all(|b| b == ZERO_PAD_VALUE));

        assert_eq!(decode_field(entries.last().unwrap()).unwrap(), U256::from(1));
    }

    #[test]
    fn it_encodes_a_storage_slot_value_big_endian_left_padded() {
        let key = B256::repeat_byte(0x01);
        let storage_proof = EIP1186StorageProof {
            key: B256::ZERO.into(),
            value: U256::from(0xdeadbeefu64),
            proof: vec![Bytes::from(vec![0x11; 60]), leaf_node(&[0xde, 0xad])],
        };

        let ForeignCallParam::Array(entries) = encode_storage_proof(key, &storage_proof).unwrap()
        else {
            panic!("storage proof must be an array param");
        };
        let value: Vec<u8> = entries[66..98]
            .iter()
            .map(|e| decode_hex_byte(e).unwrap())
            .collect();
        assert_eq!(value, U256::from(0xdeadbeefu64).to_be_bytes::<32>());
        assert_eq!(decode_field(entries.last().unwrap()).unwrap(), U256::from(2));
    }

    #[test]
    fn proofs_deeper_than_the_geometry_are_rejected() {
        let leaf = leaf_node(&[0x01]);
        let mut nodes: Vec<Bytes> = (0..11).map(|_| Bytes::from(vec![0xde; 50])).collect();
        nodes.push(leaf);
        let response = account_proof_response(nodes);
        assert!(matches!(
            encode_state_proof(&response).unwrap_err(),
            OracleError::EncodingOverflow {
                what: "trie proof depth",
                len: 12,
                max: 11
            }
        ));
    }

    #[test]
    fn malformed_leaf_nodes_are_an_upstream_inconsistency() {
        let response = account_proof_response(vec![Bytes::from(vec![0xff, 0x00])]);
        assert!(matches!(
            encode_state_proof(&response).unwrap_err(),
            OracleError::InconsistentUpstream(_)
        ));
    }
}
