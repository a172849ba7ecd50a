//! Conversions between the circuit's hex-byte-string representation and
//! native Ethereum types, plus the fixed-width padding used to fit
//! variable-length data into the circuit's static array sizes.

use alloy::primitives::{ruint::UintTryFrom, Address, B256, U256};
use thiserror::Error;

/// Number of entries in a byte-array argument carrying an address.
pub const ADDRESS_LEN: usize = 20;
/// Number of entries in a byte-array argument carrying a 32-byte word.
pub const BYTES32_LEN: usize = 32;

/// Fill element used when padding circuit byte arrays.
pub const ZERO_PAD_VALUE: &str = "0x00";

/// BN254 scalar field modulus. Field arguments decoded from the wire must be
/// strictly below this, since the consumer is a Noir circuit over BN254.
const FIELD_MODULUS: U256 = U256::from_limbs([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// An error decoding a circuit-facing argument.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid byte array length: expected {expected} entries, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex byte: {0:?}")]
    InvalidByte(String),

    #[error("invalid address checksum: {0:?}")]
    InvalidChecksum(String),

    #[error("invalid field element: {0:?}")]
    InvalidField(String),

    #[error("wrong argument count: expected {expected} arguments, got {actual}")]
    BadArity { expected: usize, actual: usize },

    #[error("malformed foreign call payload: {0}")]
    InvalidPayload(String),
}

/// Which end of the array receives the padding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

/// Parses a single `0xNN` (or bare `NN`) hex-byte entry.
pub fn decode_hex_byte(entry: &str) -> Result<u8, DecodeError> {
    let digits = entry.strip_prefix("0x").unwrap_or(entry);
    if digits.is_empty() || digits.len() > 2 {
        return Err(DecodeError::InvalidByte(entry.to_string()));
    }
    u8::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidByte(entry.to_string()))
}

/// Parses a byte-array argument of an exact length into raw bytes.
pub fn decode_bytes(arg: &[String], expected: usize) -> Result<Vec<u8>, DecodeError> {
    if arg.len() != expected {
        return Err(DecodeError::InvalidLength {
            expected,
            actual: arg.len(),
        });
    }
    arg.iter().map(|entry| decode_hex_byte(entry)).collect()
}

/// Decodes a 20-entry byte-array argument into an address.
pub fn decode_address(arg: &[String]) -> Result<Address, DecodeError> {
    let bytes = decode_bytes(arg, ADDRESS_LEN)?;
    Ok(Address::from_slice(&bytes))
}

/// Decodes a 32-entry byte-array argument into a 32-byte word.
pub fn decode_bytes32(arg: &[String]) -> Result<B256, DecodeError> {
    let bytes = decode_bytes(arg, BYTES32_LEN)?;
    Ok(B256::from_slice(&bytes))
}

/// Decodes a field element from any of the three encodings the circuit side
/// is allowed to use: `0x`-prefixed hex, a decimal numeral, or bare hex.
/// Tried in that order; the value must fit the BN254 scalar field.
pub fn decode_field(arg: &str) -> Result<U256, DecodeError> {
    let invalid = || DecodeError::InvalidField(arg.to_string());

    let value = if let Some(digits) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        U256::from_str_radix(digits, 16).map_err(|_| invalid())?
    } else if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) {
        U256::from_str_radix(arg, 10).map_err(|_| invalid())?
    } else {
        U256::from_str_radix(arg, 16).map_err(|_| invalid())?
    };

    if value >= FIELD_MODULUS {
        return Err(invalid());
    }
    Ok(value)
}

/// Decodes a field element that must additionally fit in a `u64` (chain ids,
/// block numbers, transaction indices).
pub fn decode_u64_field(arg: &str) -> Result<u64, DecodeError> {
    let value = decode_field(arg)?;
    value
        .try_into()
        .map_err(|_| DecodeError::InvalidField(arg.to_string()))
}

/// Splits raw bytes into one `0xNN` entry per byte, preserving order.
pub fn encode_hex(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| format!("0x{b:02x}")).collect()
}

/// Encodes a field element as a single `0x`-prefixed hex string.
pub fn encode_field<T>(value: T) -> String
where
    U256: UintTryFrom<T>,
{
    format!("0x{:x}", U256::from(value))
}

/// Pads `input` with `fill` on the given side until it is `target_len` long.
///
/// Inputs longer than `target_len` are a caller contract violation: sizes
/// must have been validated upstream, so this panics rather than truncating.
pub fn pad_array(input: Vec<String>, target_len: usize, fill: &str, side: Side) -> Vec<String> {
    assert!(
        input.len() <= target_len,
        "pad_array input of {} entries exceeds target of {}",
        input.len(),
        target_len
    );
    let missing = target_len - input.len();
    let mut padded = Vec::with_capacity(target_len);
    match side {
        Side::Left => {
            padded.extend(std::iter::repeat(fill.to_string()).take(missing));
            padded.extend(input);
        }
        Side::Right => {
            padded.extend(input);
            padded.extend(std::iter::repeat(fill.to_string()).take(missing));
        }
    }
    padded
}
