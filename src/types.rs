use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Core types shared across the validation pipeline and the facilitator.

/// What an agent is asking to do with funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentAction {
    Transfer,
    Swap,
    Query,
}

impl fmt::Display for IntentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentAction::Transfer => write!(f, "transfer"),
            IntentAction::Swap => write!(f, "swap"),
            IntentAction::Query => write!(f, "query"),
        }
    }
}

/// Structured transfer/swap intent, produced once by the intent parser (or
/// built directly by the facade) and then consumed read-only by every
/// pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub action: IntentAction,
    /// Token symbol or contract address the intent operates on.
    pub token: String,
    /// Decimal amount as written by the caller; units depend on context.
    pub amount: String,
    /// Recipient for transfers.
    pub to: Option<String>,
    /// Input token for swaps.
    pub token_in: Option<String>,
    /// Output token for swaps.
    pub token_out: Option<String>,
    /// Raw text carried along for query intents.
    pub query: Option<String>,
    pub network: String,
}

/// Risk classification shared by the judge and the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    /// Only HIGH and CRITICAL verdicts block the pipeline; LOW, MEDIUM and
    /// UNKNOWN all pass through.
    pub fn is_blocking(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Verdict from the risk-judge collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// 0-100.
    pub confidence: u8,
    pub reason: String,
    pub indicators: Vec<String>,
}

impl RiskAssessment {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            risk_level: RiskLevel::Unknown,
            confidence: 0,
            reason: reason.into(),
            indicators: Vec::new(),
        }
    }
}

/// Token metadata resolved by the probe, where readable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_supply: Option<String>,
}

/// Result of one buy/sell tradability probe. `None` for `can_buy`/`can_sell`
/// means the probe could not reach a verdict (infrastructure failure), which
/// is distinct from a negative token-safety verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub can_buy: Option<bool>,
    pub can_sell: Option<bool>,
    pub risk: RiskLevel,
    pub reason: String,
    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

impl ProbeResult {
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            can_buy: None,
            can_sell: None,
            risk: RiskLevel::Unknown,
            reason: reason.into(),
            metadata: TokenMetadata::default(),
        }
    }

    pub fn not_a_contract(reason: impl Into<String>) -> Self {
        Self {
            can_buy: Some(false),
            can_sell: Some(false),
            risk: RiskLevel::High,
            reason: reason.into(),
            metadata: TokenMetadata::default(),
        }
    }

    pub fn zero_supply(metadata: TokenMetadata) -> Self {
        Self {
            can_buy: Some(false),
            can_sell: Some(false),
            risk: RiskLevel::High,
            reason: "token has zero supply".to_string(),
            metadata,
        }
    }

    pub fn transfer_restricted(metadata: TokenMetadata) -> Self {
        Self {
            can_buy: Some(true),
            can_sell: Some(false),
            risk: RiskLevel::High,
            reason: "token has transfer restrictions (honeypot)".to_string(),
            metadata,
        }
    }

    pub fn tradeable(metadata: TokenMetadata) -> Self {
        Self {
            can_buy: Some(true),
            can_sell: Some(true),
            risk: RiskLevel::Low,
            reason: "token appears to be standard ERC-20".to_string(),
            metadata,
        }
    }

    /// True when neither direction is known to be blocked.
    pub fn is_safe(&self) -> bool {
        self.can_buy != Some(false) && self.can_sell != Some(false)
    }

    /// True when the probe could not reach the chain at all.
    pub fn is_unknown(&self) -> bool {
        self.can_buy.is_none() && self.can_sell.is_none()
    }
}

/// The validation stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Parsed,
    IntentJudged,
    PolicyChecked,
    ProbeChecked,
    RiskAnalyzed,
}

impl PipelineStage {
    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Parsed => "Parsed",
            PipelineStage::IntentJudged => "IntentJudged",
            PipelineStage::PolicyChecked => "PolicyChecked",
            PipelineStage::ProbeChecked => "ProbeChecked",
            PipelineStage::RiskAnalyzed => "RiskAnalyzed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of a single pipeline stage, kept for the caller's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: PipelineStage,
    pub passed: bool,
    pub reason: String,
    pub evidence: serde_json::Value,
}

impl StageOutcome {
    pub fn passed(
        stage: PipelineStage,
        reason: impl Into<String>,
        evidence: serde_json::Value,
    ) -> Self {
        Self { stage, passed: true, reason: reason.into(), evidence }
    }

    pub fn failed(
        stage: PipelineStage,
        reason: impl Into<String>,
        evidence: serde_json::Value,
    ) -> Self {
        Self { stage, passed: false, reason: reason.into(), evidence }
    }
}

/// Result of one full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub approved: bool,
    pub failed_stage: Option<PipelineStage>,
    pub stages: Vec<StageOutcome>,
}

impl PipelineResult {
    pub fn approved(stages: Vec<StageOutcome>) -> Self {
        Self { approved: true, failed_stage: None, stages }
    }

    pub fn blocked(stage: PipelineStage, stages: Vec<StageOutcome>) -> Self {
        Self { approved: false, failed_stage: Some(stage), stages }
    }

    /// Reason attached to the failing stage, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        let failed = self.failed_stage?;
        self.stages
            .iter()
            .find(|outcome| outcome.stage == failed && !outcome.passed)
            .map(|outcome| outcome.reason.as_str())
    }
}

/// Request handed to the policy-rules collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRequest {
    /// Caller's own (signer) address, where derivable.
    pub from: String,
    pub to: String,
    /// Amount as a decimal string.
    pub value: String,
    /// Calldata; token payments carry "0x".
    pub data: String,
    pub context: HashMap<String, String>,
}

/// Boolean-plus-explanation contract returned by policy rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub passed: bool,
    pub reason: String,
}

impl PolicyVerdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self { passed: true, reason: reason.into() }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self { passed: false, reason: reason.into() }
    }
}

/// What the safe facade hands back to the caller. Either a complete payment
/// header is present, or a reason is; never a partial signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub approved: bool,
    pub payment_header: Option<String>,
    pub reason: Option<String>,
    /// Stage that rejected the request. `None` on approval, and also `None`
    /// when validation passed but signing itself failed.
    pub failed_stage: Option<PipelineStage>,
    pub stages: Vec<StageOutcome>,
}

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum ShieldError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Malformed payment header: {0}")]
    MalformedHeader(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ShieldError {
    fn from(err: reqwest::Error) -> Self {
        ShieldError::CollaboratorUnavailable(err.to_string())
    }
}
