//! EIP-3009 payment header generation.
//!
//! Builds and signs `TransferWithAuthorization` messages so a facilitator can
//! move tokens on the signer's behalf without the signer paying gas. Signing
//! is plain EIP-712 over the token's domain separator, so any third party can
//! verify the result against on-chain data. This module performs no network
//! I/O.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::{
    primitives::{address, Address, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
    sol,
    sol_types::{eip712_domain, SolStruct},
};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use tracing::debug;

use crate::header::{AuthorizationPayload, PaymentHeader, SCHEME_EIP3009, X402_VERSION};
use crate::types::ShieldError;

/// Default validity window for a payment authorization.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

// Domain used for assets with no registry entry. Signing against the fallback
// is deliberate behavior for unknown assets, never an error.
const FALLBACK_DOMAIN_NAME: &str = "Bridged USDC (Stargate)";
const FALLBACK_DOMAIN_VERSION: &str = "1";

sol! {
    /// EIP-3009 authorization message. Field order is part of the type hash
    /// and must not change.
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

/// EIP-712 signing domain parameters for one token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDomain {
    pub name: String,
    pub version: String,
}

impl TokenDomain {
    fn fallback() -> Self {
        Self {
            name: FALLBACK_DOMAIN_NAME.to_string(),
            version: FALLBACK_DOMAIN_VERSION.to_string(),
        }
    }
}

/// Generates x402 payment headers for one network.
pub struct Facilitator {
    network: String,
    chain_id: u64,
    domains: HashMap<Address, TokenDomain>,
}

impl Facilitator {
    /// Create a facilitator for a known network name.
    pub fn new(network: &str) -> Self {
        let chain_id = if network == "cronos-testnet" { 338 } else { 25 };
        Self::with_chain_id(network, chain_id)
    }

    /// Create a facilitator with an explicit chain id, for networks outside
    /// the built-in table.
    pub fn with_chain_id(network: &str, chain_id: u64) -> Self {
        Self {
            network: network.to_string(),
            chain_id,
            domains: default_domains(network),
        }
    }

    /// Register (or override) the signing domain for an asset.
    pub fn register_domain(&mut self, asset: Address, domain: TokenDomain) {
        self.domains.insert(asset, domain);
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Resolve the signing domain for an asset. Deterministic: a registered
    /// asset always yields its table entry, anything else the fallback.
    pub fn token_domain(&self, asset: &Address) -> TokenDomain {
        self.domains.get(asset).cloned().unwrap_or_else(TokenDomain::fallback)
    }

    /// Derive the checksummed signer address from a private key.
    pub fn signer_address(&self, private_key: &str) -> Result<String, ShieldError> {
        let signer = parse_private_key(private_key)?;
        Ok(signer.address().to_checksum(None))
    }

    /// Generate a signed, base64-encoded x402 payment header.
    ///
    /// The `from` address is derived from `private_key`; a caller-supplied
    /// sender is never trusted. `amount` must be a non-negative integer in
    /// the token's base units, as a decimal string.
    pub fn generate_payment_header(
        &self,
        private_key: &str,
        pay_to: &str,
        asset: &str,
        amount: &str,
        timeout_seconds: Option<u64>,
    ) -> Result<String, ShieldError> {
        let signer = parse_private_key(private_key)?;
        let from = signer.address();
        let to = parse_address(pay_to)?;
        let asset_addr = parse_address(asset)?;

        let amount = amount.trim();
        // from_str_radix maps "" to zero, so screen empties first.
        if amount.is_empty() {
            return Err(ShieldError::InvalidAmount("amount must not be empty".to_string()));
        }
        let value = U256::from_str_radix(amount, 10).map_err(|e| {
            ShieldError::InvalidAmount(format!("{:?} is not a base-unit integer: {}", amount, e))
        })?;

        let nonce = generate_nonce();
        let valid_after: u64 = 0;
        let timeout = timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let valid_before = Utc::now().timestamp() as u64 + timeout;

        let token_domain = self.token_domain(&asset_addr);
        debug!(
            asset = %asset_addr,
            domain_name = %token_domain.name,
            domain_version = %token_domain.version,
            "resolved signing domain"
        );

        let domain = eip712_domain! {
            name: token_domain.name,
            version: token_domain.version,
            chain_id: self.chain_id,
            verifying_contract: asset_addr,
        };

        let message = TransferWithAuthorization {
            from,
            to,
            value,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
            nonce,
        };

        let digest = message.eip712_signing_hash(&domain);
        let signature = signer
            .sign_hash_sync(&digest)
            .map_err(|e| ShieldError::Signing(e.to_string()))?;

        let header = PaymentHeader {
            x402_version: X402_VERSION,
            scheme: SCHEME_EIP3009.to_string(),
            network: self.network.clone(),
            payload: AuthorizationPayload {
                from: from.to_checksum(None),
                to: to.to_checksum(None),
                value: amount.to_string(),
                valid_after,
                valid_before,
                nonce: format!("0x{}", hex::encode(nonce)),
                signature: format!("0x{}", hex::encode(signature.as_bytes())),
                asset: asset_addr.to_checksum(None),
            },
        };

        Ok(header.encode())
    }

    /// Decode a payment header. Pure deserialization, no signature check.
    pub fn decode_payment_header(&self, encoded: &str) -> Result<PaymentHeader, ShieldError> {
        PaymentHeader::decode(encoded)
    }
}

/// Parse a hex address of either case. Checksums are re-derived downstream,
/// so case-insensitive inputs compare equal once normalized.
pub fn parse_address(raw: &str) -> Result<Address, ShieldError> {
    Address::from_str(raw.trim())
        .map_err(|e| ShieldError::InvalidInput(format!("invalid address {:?}: {}", raw, e)))
}

fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, ShieldError> {
    PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| ShieldError::InvalidKey(e.to_string()))
}

/// Fresh 32 random bytes per call; reuse would break the single-use guarantee
/// the verifying contract enforces per nonce.
fn generate_nonce() -> B256 {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    B256::from(bytes)
}

fn default_domains(network: &str) -> HashMap<Address, TokenDomain> {
    let mut domains = HashMap::new();
    let usdce = TokenDomain {
        name: "Bridged USDC (Stargate)".to_string(),
        version: "1".to_string(),
    };
    match network {
        "cronos-testnet" => {
            // devUSDC.e from the testnet faucet
            domains.insert(address!("c01efAaF7C5C61bEbFAeb358E1161b537b8bC0e0"), usdce);
        }
        "cronos-mainnet" => {
            domains.insert(address!("c21223249CA28397B4B6541dfFaEcC539BfF0141"), usdce);
        }
        _ => {}
    }
    domains
}
