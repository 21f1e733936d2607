//! Risk-judge collaborator adapter.
//!
//! The judge is an opaque classifier (an LLM in production) reached over
//! HTTP. The pipeline treats an unreachable judge as a documented fail-open:
//! the stage passes with risk UNKNOWN instead of blocking indefinitely.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{RiskAssessment, RiskLevel, ShieldError};

/// Fixed request/response contract the pipeline expects from any judge.
#[async_trait]
pub trait RiskJudge: Send + Sync {
    /// Assess a natural-language description of a pending action.
    async fn assess(&self, description: &str) -> Result<RiskAssessment, ShieldError>;
}

/// HTTP-backed judge client.
pub struct HttpRiskJudge {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct JudgeRequest<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JudgeResponse {
    risk_level: RiskLevel,
    confidence: u8,
    reason: String,
    #[serde(default)]
    indicators: Vec<String>,
}

impl HttpRiskJudge {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ShieldError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShieldError::Config(format!("failed to build judge client: {}", e)))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl RiskJudge for HttpRiskJudge {
    async fn assess(&self, description: &str) -> Result<RiskAssessment, ShieldError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&JudgeRequest { description })
            .send()
            .await?
            .error_for_status()
            .map_err(ShieldError::from)?;

        let body: JudgeResponse = response.json().await?;
        Ok(RiskAssessment {
            risk_level: body.risk_level,
            confidence: body.confidence.min(100),
            reason: body.reason,
            indicators: body.indicators,
        })
    }
}
