//! Swap/honeypot probe.
//!
//! A heuristic tradability check, not a full swap simulation. The checks run
//! in a fixed order and each can short-circuit the rest: RPC connectivity,
//! deployed code, token metadata (zero supply), known-honeypot denylist, then
//! an optimistic default. Connectivity failures are infrastructure failures,
//! not token-safety verdicts, and report UNKNOWN. Every RPC call gets one
//! retry before counting as failed. A token whose metadata cannot be read
//! keeps the optimistic default; only positive findings block.

use alloy::{
    primitives::{address, Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, warn};

use crate::facilitator::parse_address;
use crate::types::{ProbeResult, ShieldError, TokenMetadata};

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function totalSupply() external view returns (uint256);
    }
}

/// Contracts known to restrict transfers.
const KNOWN_HONEYPOTS: [Address; 1] = [address!("6001B76e8CeA99a749F591ed6E1cE7a704CF231b")];

/// Tradability probe contract. Results are produced fresh per call and never
/// cached; token state can change between calls.
#[async_trait]
pub trait TokenProbe: Send + Sync {
    async fn probe(&self, token_address: &str, sample_amount: &str) -> ProbeResult;
}

/// Probe backed by a JSON-RPC endpoint. Safe for concurrent use.
pub struct HttpTokenProbe {
    provider: DynProvider,
    denylist: HashSet<Address>,
}

impl HttpTokenProbe {
    pub fn new(rpc_url: &str) -> Result<Self, ShieldError> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| ShieldError::Config(format!("invalid RPC URL {:?}: {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            provider,
            denylist: KNOWN_HONEYPOTS.into_iter().collect(),
        })
    }

    /// Extend the built-in honeypot denylist.
    pub fn with_denylist(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.denylist.extend(addresses);
        self
    }

    pub fn is_denylisted(&self, address: &Address) -> bool {
        self.denylist.contains(address)
    }

    async fn chain_reachable(&self) -> Result<(), String> {
        retry_once(|| async { self.provider.get_chain_id().await })
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn fetch_code(&self, address: Address) -> Result<alloy::primitives::Bytes, String> {
        retry_once(|| async { self.provider.get_code_at(address).await })
            .await
            .map_err(|e| e.to_string())
    }

    async fn fetch_metadata(&self, address: Address) -> (TokenMetadata, Option<U256>) {
        let erc20 = IERC20Metadata::new(address, &self.provider);
        let mut metadata = TokenMetadata::default();
        let mut supply = None;

        match retry_once(|| async { erc20.totalSupply().call().await }).await {
            Ok(value) => {
                metadata.total_supply = Some(value.to_string());
                supply = Some(value);
            }
            Err(e) => debug!(token = %address, "could not read totalSupply: {}", e),
        }
        match retry_once(|| async { erc20.name().call().await }).await {
            Ok(value) => metadata.name = Some(value),
            Err(e) => debug!(token = %address, "could not read name: {}", e),
        }
        match retry_once(|| async { erc20.symbol().call().await }).await {
            Ok(value) => metadata.symbol = Some(value),
            Err(e) => debug!(token = %address, "could not read symbol: {}", e),
        }

        (metadata, supply)
    }
}

// RPC exceptions get one retry before counting as failed; the first error is
// the one reported.
async fn retry_once<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(first) => match op().await {
            Ok(value) => Ok(value),
            Err(_) => Err(first),
        },
    }
}

#[async_trait]
impl TokenProbe for HttpTokenProbe {
    async fn probe(&self, token_address: &str, sample_amount: &str) -> ProbeResult {
        debug!(token = token_address, amount = sample_amount, "probing token");

        if let Err(e) = self.chain_reachable().await {
            warn!(token = token_address, "RPC unreachable: {}", e);
            return ProbeResult::unreachable(format!("cannot connect to RPC: {}", e));
        }

        let address = match parse_address(token_address) {
            Ok(address) => address,
            Err(_) => {
                return ProbeResult::not_a_contract(format!(
                    "{:?} is not a valid contract address",
                    token_address
                ))
            }
        };

        let code = match self.fetch_code(address).await {
            Ok(code) => code,
            Err(e) => return ProbeResult::unreachable(format!("RPC error fetching code: {}", e)),
        };
        if code.is_empty() {
            return ProbeResult::not_a_contract("not a contract address");
        }

        let (metadata, supply) = self.fetch_metadata(address).await;
        if supply == Some(U256::ZERO) {
            return ProbeResult::zero_supply(metadata);
        }

        if self.is_denylisted(&address) {
            return ProbeResult::transfer_restricted(metadata);
        }

        ProbeResult::tradeable(metadata)
    }
}
