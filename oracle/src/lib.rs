//! An Ethereum oracle for Noir circuits.
//!
//! During witness generation a circuit runtime may issue foreign calls for
//! chain data it cannot compute itself. This crate serves those calls over
//! JSON-RPC: it fetches blocks, accounts, Merkle-Patricia proofs, receipts
//! and transactions from configured Ethereum endpoints and re-encodes them
//! into the fixed-width hex-byte arrays the circuit's static types require.

pub mod codec;
pub mod error;
pub mod foreign_call;
pub mod oracles;
pub mod provider;
pub mod retry;
pub mod server;
pub mod tracing;
