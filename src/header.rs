//! x402 payment header wire format.
//!
//! A payment header is a base64-encoded UTF-8 JSON object carrying an
//! EIP-3009 transfer authorization. Decoding is pure deserialization; the
//! signature inside the payload is never re-verified here, that is the
//! receiving party's job.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::types::ShieldError;

/// Protocol version carried in every header.
pub const X402_VERSION: u32 = 1;
/// The only authorization scheme this crate emits.
pub const SCHEME_EIP3009: &str = "eip3009";

/// Signed, time-boxed permission for a facilitator to move a specific token
/// amount on the signer's behalf. Terminal, stateless value: constructed once
/// by the facilitator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHeader {
    #[serde(rename = "x402Version")]
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: AuthorizationPayload,
}

/// The EIP-3009 authorization fields. `value` keeps the caller's exact
/// decimal string; `nonce` and `signature` are lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPayload {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: String,
    pub signature: String,
    pub asset: String,
}

impl PaymentHeader {
    /// Serialize to the canonical JSON-then-base64 wire form.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("payment header serializes to JSON");
        general_purpose::STANDARD.encode(json)
    }

    /// Decode a base64 payment header. Fails with [`ShieldError::MalformedHeader`]
    /// on bad base64, bad JSON, or a missing required field.
    pub fn decode(encoded: &str) -> Result<Self, ShieldError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ShieldError::MalformedHeader(format!("invalid base64: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ShieldError::MalformedHeader(format!("invalid JSON payload: {}", e)))
    }
}
