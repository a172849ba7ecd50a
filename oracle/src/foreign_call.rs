//! Wire types for Noir foreign calls and the normalization that turns the
//! three argument shapes the circuit side may emit (single hex string,
//! comma-joined string, nested byte array) into fixed-size byte arrays.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::{encode_hex, pad_array, DecodeError, Side, ADDRESS_LEN, ZERO_PAD_VALUE};
use crate::error::OracleError;

/// One decoded argument slot: a scalar is a single-element entry list.
pub type NoirArgument = Vec<String>;
/// Ordered argument slots, shape-validated against the function signature.
pub type NoirArguments = Vec<NoirArgument>;

/// A foreign-call input or output value as it appears on the wire.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ForeignCallParam {
    Single(String),
    Array(Vec<String>),
}

/// The one-element `params` payload of a `resolve_foreign_call` request.
#[derive(Debug, Deserialize)]
pub struct ForeignCallRequest {
    pub function: String,
    #[serde(default)]
    pub inputs: Vec<ForeignCallParam>,
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub root_path: String,
    #[serde(default)]
    pub package_name: String,
}

/// The result envelope handed back to the circuit runtime.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForeignCallResult {
    pub values: ResultValues,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValues {
    /// The usual case: a flat list mirroring the input convention.
    Flat(Vec<ForeignCallParam>),
    /// Tagged union returned by the composite header-and-account function.
    /// The key names are the consumer's contract.
    HeaderAndAccount {
        #[serde(rename = "blockHeader")]
        block_header: Vec<ForeignCallParam>,
        #[serde(rename = "accountData")]
        account: Vec<ForeignCallParam>,
    },
}

impl From<Vec<ForeignCallParam>> for ForeignCallResult {
    fn from(values: Vec<ForeignCallParam>) -> Self {
        Self {
            values: ResultValues::Flat(values),
        }
    }
}

/// Expected shape of one argument slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgShape {
    /// A single field value.
    Scalar,
    /// A byte array of exactly this many entries after normalization.
    Bytes(usize),
}

/// Validates arity and normalizes every slot to its expected shape. Runs
/// before any network call so malformed requests fail fast.
pub fn normalize_arguments(
    inputs: &[ForeignCallParam],
    shapes: &[ArgShape],
) -> Result<NoirArguments, OracleError> {
    if inputs.len() != shapes.len() {
        return Err(DecodeError::BadArity {
            expected: shapes.len(),
            actual: inputs.len(),
        }
        .into());
    }
    inputs
        .iter()
        .zip(shapes)
        .map(|(input, shape)| match *shape {
            ArgShape::Scalar => normalize_scalar(input),
            ArgShape::Bytes(len) => normalize_byte_array(input, len),
        })
        .collect()
}

fn normalize_scalar(input: &ForeignCallParam) -> Result<NoirArgument, OracleError> {
    match input {
        ForeignCallParam::Single(s) => Ok(vec![s.trim().to_string()]),
        ForeignCallParam::Array(items) if items.len() == 1 => {
            Ok(vec![items[0].trim().to_string()])
        }
        ForeignCallParam::Array(items) => Err(DecodeError::InvalidLength {
            expected: 1,
            actual: items.len(),
        }
        .into()),
    }
}

/// Normalizes a byte-array argument to exactly `expected_len` hex-byte
/// entries, whichever of the three wire shapes it arrived in.
pub fn normalize_byte_array(
    input: &ForeignCallParam,
    expected_len: usize,
) -> Result<NoirArgument, OracleError> {
    let bytes = match input {
        ForeignCallParam::Array(items) => items
            .iter()
            .map(|it| low_byte(it))
            .collect::<Result<Vec<_>, _>>()?,
        ForeignCallParam::Single(s) if s.contains(',') => s
            .split(',')
            .map(low_byte)
            .collect::<Result<Vec<_>, _>>()?,
        ForeignCallParam::Single(s) => hex_literal_bytes(s.trim(), expected_len)?,
    };
    Ok(fit_length(bytes, expected_len))
}

/// Extracts the low byte of one entry. Circuit-side serializers are free to
/// emit full-field-width entries, so only the last two hex digits count.
fn low_byte(entry: &str) -> Result<String, DecodeError> {
    let digits = entry.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidByte(entry.to_string()));
    }
    let low = &digits[digits.len().saturating_sub(2)..];
    let byte = u8::from_str_radix(low, 16).map_err(|_| DecodeError::InvalidByte(entry.into()))?;
    Ok(format!("0x{byte:02x}"))
}

/// Splits one bare hex literal into byte entries. A mixed-case 40-digit
/// literal destined for an address slot must carry a valid EIP-55 checksum.
fn hex_literal_bytes(literal: &str, expected_len: usize) -> Result<Vec<String>, DecodeError> {
    let digits = literal.strip_prefix("0x").unwrap_or(literal);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidByte(literal.to_string()));
    }

    let mixed_case = digits.bytes().any(|b| b.is_ascii_uppercase())
        && digits.bytes().any(|b| b.is_ascii_lowercase());
    if expected_len == ADDRESS_LEN && digits.len() == 2 * ADDRESS_LEN && mixed_case {
        alloy::primitives::Address::parse_checksummed(format!("0x{digits}"), None)
            .map_err(|_| DecodeError::InvalidChecksum(literal.to_string()))?;
    }

    let padded = if digits.len() % 2 == 0 {
        digits.to_string()
    } else {
        format!("0{digits}")
    };
    let bytes =
        hex::decode(&padded).map_err(|_| DecodeError::InvalidByte(literal.to_string()))?;
    Ok(encode_hex(&bytes))
}

/// Bounded length fixup: zero left-pad if short, truncate from the front if
/// long. Either path indicates a caller/circuit mismatch, so both warn.
fn fit_length(mut bytes: Vec<String>, expected_len: usize) -> Vec<String> {
    use std::cmp::Ordering;
    match bytes.len().cmp(&expected_len) {
        Ordering::Equal => bytes,
        Ordering::Less => {
            warn!(
                got = bytes.len(),
                expected = expected_len,
                "short byte-array argument, left-padding with zero bytes"
            );
            pad_array(bytes, expected_len, ZERO_PAD_VALUE, Side::Left)
        }
        Ordering::Greater => {
            warn!(
                got = bytes.len(),
                expected = expected_len,
                "oversized byte-array argument, truncating from the front"
            );
            bytes.split_off(bytes.len() - expected_len)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDRESS: &str = "f39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn address_entries() -> Vec<String> {
        encode_hex(&hex_literal::hex!(
            "f39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        ))
    }

    #[test]
    fn normalization_is_shape_invariant_for_addresses() {
        let expected = address_entries();

        let as_literal = ForeignCallParam::Single(ADDRESS.to_string());
        let as_csv = ForeignCallParam::Single(expected.join(","));
        let as_array = ForeignCallParam::Array(
            expected
                .iter()
                .map(|b| format!("0x00000000000000000000000000{}", &b[2..]))
                .collect(),
        );

        for shape in [as_literal, as_csv, as_array] {
            assert_eq!(normalize_byte_array(&shape, ADDRESS_LEN).unwrap(), expected);
        }
    }

    #[test]
    fn short_arrays_are_left_padded_with_zero_bytes() {
        let input = ForeignCallParam::Array(vec!["0x7f".to_string()]);
        let out = normalize_byte_array(&input, 4).unwrap();
        assert_eq!(out, vec!["0x00", "0x00", "0x00", "0x7f"]);
    }

    #[test]
    fn long_arrays_are_truncated_from_the_front() {
        let input = ForeignCallParam::Array(
            (0u8..6).map(|b| format!("0x{b:02x}")).collect::<Vec<_>>(),
        );
        let out = normalize_byte_array(&input, 4).unwrap();
        assert_eq!(out, vec!["0x02", "0x03", "0x04", "0x05"]);
    }

    #[test]
    fn mixed_case_address_literals_must_be_checksummed() {
        // Valid EIP-55 form of the test address.
        let good = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
        assert!(normalize_byte_array(
            &ForeignCallParam::Single(good.to_string()),
            ADDRESS_LEN
        )
        .is_ok());

        // Same digits with one case flipped: checksum no longer matches.
        let bad = "0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
        assert!(matches!(
            normalize_byte_array(&ForeignCallParam::Single(bad.to_string()), ADDRESS_LEN),
            Err(OracleError::Decode(DecodeError::InvalidChecksum(_)))
        ));
    }

    #[test]
    fn arity_mismatch_is_a_hard_error() {
        let err = normalize_arguments(
            &[ForeignCallParam::Single("aa36a7".to_string())],
            &[ArgShape::Scalar, ArgShape::Scalar],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OracleError::Decode(DecodeError::BadArity {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn scalars_reject_multi_element_arrays() {
        let input = ForeignCallParam::Array(vec!["0x01".to_string(), "0x02".to_string()]);
        assert!(normalize_scalar(&input).is_err());
    }

    #[test]
    fn result_envelope_serializes_flat_and_composite_shapes() {
        let flat: ForeignCallResult = vec![ForeignCallParam::Single("0x01".to_string())].into();
        assert_eq!(
            serde_json::to_value(&flat).unwrap(),
            serde_json::json!({ "values": ["0x01"] })
        );

        let composite = ForeignCallResult {
            values: ResultValues::HeaderAndAccount {
                block_header: vec![ForeignCallParam::Single("0x01".to_string())],
                account: vec![ForeignCallParam::Array(vec!["0x02".to_string()])],
            },
        };
        assert_eq!(
            serde_json::to_value(&composite).unwrap(),
            serde_json::json!({
                "values": { "blockHeader": ["0x01"], "accountData": [["0x02"]] }
            })
        );
    }
}
