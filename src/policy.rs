//! Policy-rules collaborator.
//!
//! The pipeline only depends on the boolean-plus-reason contract in
//! [`PolicyRules`]; rule representation is the collaborator's business.
//! [`StaticPolicy`] is the built-in implementation: a per-transaction amount
//! limit, a recipient denylist, and an optional per-caller rate-limit window.
//! Unlike the risk judge, policy failures are fail-closed.

use alloy::primitives::U256;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::types::{PolicyRequest, PolicyVerdict, ShieldError};

#[async_trait]
pub trait PolicyRules: Send + Sync {
    /// Check one pending payment against the rules.
    async fn check(&self, request: &PolicyRequest) -> Result<PolicyVerdict, ShieldError>;
}

/// In-process policy rules driven by static configuration.
pub struct StaticPolicy {
    max_amount: Option<U256>,
    /// Lowercased recipient addresses that are never payable.
    denylist: HashSet<String>,
    rate_limit: Option<RateLimit>,
}

struct RateLimit {
    max_calls: usize,
    window: Duration,
    // One mutual-exclusion boundary shared across concurrent requests; the
    // map is keyed by caller address.
    calls: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl StaticPolicy {
    pub fn new(
        max_amount: Option<&str>,
        denylist: impl IntoIterator<Item = String>,
    ) -> Result<Self, ShieldError> {
        let max_amount = match max_amount {
            Some(raw) => Some(U256::from_str_radix(raw.trim(), 10).map_err(|e| {
                ShieldError::Config(format!("invalid policy amount limit {:?}: {}", raw, e))
            })?),
            None => None,
        };
        let denylist = denylist.into_iter().map(|a| a.trim().to_lowercase()).collect();
        Ok(Self { max_amount, denylist, rate_limit: None })
    }

    /// Cap each caller to `max_calls` checks per `window`.
    pub fn with_rate_limit(mut self, max_calls: usize, window: Duration) -> Self {
        self.rate_limit = Some(RateLimit {
            max_calls,
            window,
            calls: Mutex::new(HashMap::new()),
        });
        self
    }
}

#[async_trait]
impl PolicyRules for StaticPolicy {
    async fn check(&self, request: &PolicyRequest) -> Result<PolicyVerdict, ShieldError> {
        // Denylist first; a blocked recipient fails regardless of amount.
        if !request.to.is_empty() && self.denylist.contains(&request.to.to_lowercase()) {
            return Ok(PolicyVerdict::fail(format!(
                "recipient {} is denylisted",
                request.to
            )));
        }

        if let Some(limit) = self.max_amount {
            let value = match U256::from_str_radix(request.value.trim(), 10) {
                Ok(value) => value,
                Err(_) => {
                    return Ok(PolicyVerdict::fail(format!(
                        "value {:?} is not an integer amount",
                        request.value
                    )))
                }
            };
            if value > limit {
                return Ok(PolicyVerdict::fail(format!(
                    "amount {} exceeds policy limit {}",
                    value, limit
                )));
            }
        }

        if let Some(rate_limit) = &self.rate_limit {
            let now = Instant::now();
            let mut calls = rate_limit.calls.lock().await;
            let window = calls.entry(request.from.clone()).or_default();
            while let Some(oldest) = window.front() {
                if now.duration_since(*oldest) > rate_limit.window {
                    window.pop_front();
                } else {
                    break;
                }
            }
            if window.len() >= rate_limit.max_calls {
                return Ok(PolicyVerdict::fail(format!(
                    "rate limit exceeded: {} calls within {:?}",
                    rate_limit.max_calls, rate_limit.window
                )));
            }
            window.push_back(now);
        }

        debug!(to = %request.to, value = %request.value, "policy checks passed");
        Ok(PolicyVerdict::pass("within policy limits"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(to: &str, value: &str) -> PolicyRequest {
        PolicyRequest {
            from: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
            to: to.to_string(),
            value: value.to_string(),
            data: "0x".to_string(),
            context: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn amount_within_limit_passes() {
        let policy = StaticPolicy::new(Some("1000000"), Vec::new()).unwrap();
        let verdict = policy.check(&request("0xabc0000000000000000000000000000000000abc", "1")).await.unwrap();
        assert!(verdict.passed);
    }

    #[tokio::test]
    async fn amount_over_limit_fails() {
        let policy = StaticPolicy::new(Some("1"), Vec::new()).unwrap();
        let verdict = policy.check(&request("0xabc0000000000000000000000000000000000abc", "100")).await.unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("exceeds policy limit"));
    }

    #[tokio::test]
    async fn denylisted_recipient_fails_regardless_of_amount() {
        let zero = "0x0000000000000000000000000000000000000000";
        let policy = StaticPolicy::new(Some("1000000"), vec![zero.to_string()]).unwrap();
        let verdict = policy.check(&request(zero, "1")).await.unwrap();
        assert!(!verdict.passed);
        assert!(verdict.reason.contains("denylisted"));
    }

    #[tokio::test]
    async fn denylist_is_case_insensitive() {
        let policy = StaticPolicy::new(
            None,
            vec!["0xABC0000000000000000000000000000000000ABC".to_string()],
        )
        .unwrap();
        let verdict = policy.check(&request("0xabc0000000000000000000000000000000000abc", "1")).await.unwrap();
        assert!(!verdict.passed);
    }

    #[tokio::test]
    async fn rate_limit_window_caps_calls() {
        let policy = StaticPolicy::new(None, Vec::new())
            .unwrap()
            .with_rate_limit(2, Duration::from_secs(60));
        let req = request("0xabc0000000000000000000000000000000000abc", "1");
        assert!(policy.check(&req).await.unwrap().passed);
        assert!(policy.check(&req).await.unwrap().passed);
        let third = policy.check(&req).await.unwrap();
        assert!(!third.passed);
        assert!(third.reason.contains("rate limit"));
    }

    #[tokio::test]
    async fn non_integer_value_fails_closed() {
        let policy = StaticPolicy::new(Some("1000000"), Vec::new()).unwrap();
        let verdict = policy.check(&request("0xabc0000000000000000000000000000000000abc", "1.5")).await.unwrap();
        assert!(!verdict.passed);
    }
}
