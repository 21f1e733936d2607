//! Multi-stage validation pipeline.
//!
//! Stages run strictly in order — Parsed, IntentJudged, PolicyChecked,
//! ProbeChecked (swaps only), RiskAnalyzed — and the first failure blocks the
//! run; no later stage executes. Stage outcomes are typed values chained into
//! a [`PipelineResult`] for the caller's audit trail, never errors thrown
//! past the pipeline boundary.
//!
//! Exactly two failure modes are fail-open: an unreachable risk judge and a
//! probe that cannot reach its RPC. Everything else fails closed.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::judge::RiskJudge;
use crate::policy::PolicyRules;
use crate::probe::TokenProbe;
use crate::types::{
    IntentAction, PipelineResult, PipelineStage, PolicyRequest, RiskLevel, StageOutcome,
    TransferIntent,
};

/// Tickers screened when a swap target cannot be resolved to a contract
/// address, so obviously poisoned symbols still fail the probe stage.
const SUSPICIOUS_TICKERS: [&str; 4] = ["SCAM", "FAKE", "RUG", "HONEYPOT"];

/// Orchestrates the stages. Collaborators are injected; the pipeline itself
/// holds no mutable state, so one instance serves concurrent validations.
pub struct ValidationPipeline {
    judge: Arc<dyn RiskJudge>,
    policy: Arc<dyn PolicyRules>,
    probe: Arc<dyn TokenProbe>,
    /// Ticker -> contract address, for resolving swap targets.
    tokens: HashMap<String, String>,
}

impl ValidationPipeline {
    pub fn new(
        judge: Arc<dyn RiskJudge>,
        policy: Arc<dyn PolicyRules>,
        probe: Arc<dyn TokenProbe>,
    ) -> Self {
        Self { judge, policy, probe, tokens: HashMap::new() }
    }

    /// Register ticker-to-address mappings used by the probe stage.
    pub fn with_token_registry(mut self, tokens: HashMap<String, String>) -> Self {
        self.tokens = tokens
            .into_iter()
            .map(|(ticker, address)| (ticker.to_uppercase(), address))
            .collect();
        self
    }

    /// Run every stage against the intent. `caller` is the signer's own
    /// address, where derivable, and is handed to the policy rules.
    pub async fn validate(&self, intent: &TransferIntent, caller: &str) -> PipelineResult {
        let mut stages = Vec::new();

        stages.push(StageOutcome::passed(
            PipelineStage::Parsed,
            format!("parsed {} intent", intent.action),
            json!({ "intent": intent }),
        ));

        let outcome = self
            .judge_stage(PipelineStage::IntentJudged, &describe_intent(intent))
            .await;
        if !push_and_continue(&mut stages, outcome) {
            return PipelineResult::blocked(PipelineStage::IntentJudged, stages);
        }

        let outcome = self.policy_stage(intent, caller).await;
        if !push_and_continue(&mut stages, outcome) {
            return PipelineResult::blocked(PipelineStage::PolicyChecked, stages);
        }

        let outcome = if intent.action == IntentAction::Swap {
            let target = intent.token_out.as_deref().unwrap_or(&intent.token);
            self.probe_stage(target, &intent.amount).await
        } else {
            // Vacuously passed for transfer/query intents.
            StageOutcome::passed(
                PipelineStage::ProbeChecked,
                "skipped for non-swap intent",
                json!({ "skipped": true }),
            )
        };
        if !push_and_continue(&mut stages, outcome) {
            return PipelineResult::blocked(PipelineStage::ProbeChecked, stages);
        }

        let outcome = self
            .judge_stage(PipelineStage::RiskAnalyzed, &describe_result(intent, &stages))
            .await;
        if !push_and_continue(&mut stages, outcome) {
            return PipelineResult::blocked(PipelineStage::RiskAnalyzed, stages);
        }

        info!(action = %intent.action, "all validation stages passed");
        PipelineResult::approved(stages)
    }

    async fn judge_stage(&self, stage: PipelineStage, description: &str) -> StageOutcome {
        match self.judge.assess(description).await {
            Ok(assessment) => {
                let evidence = json!({
                    "riskLevel": assessment.risk_level,
                    "confidence": assessment.confidence,
                    "indicators": assessment.indicators,
                });
                if assessment.risk_level.is_blocking() {
                    StageOutcome::failed(
                        stage,
                        format!(
                            "risk judge flagged {}: {}",
                            assessment.risk_level, assessment.reason
                        ),
                        evidence,
                    )
                } else {
                    StageOutcome::passed(stage, assessment.reason, evidence)
                }
            }
            // Fail-open: an unreachable judge must not block the pipeline.
            Err(e) => {
                warn!(stage = %stage, "risk judge unavailable, continuing with risk UNKNOWN: {}", e);
                StageOutcome::passed(
                    stage,
                    format!("risk judge unavailable ({}), treated as UNKNOWN", e),
                    json!({ "riskLevel": RiskLevel::Unknown }),
                )
            }
        }
    }

    async fn policy_stage(&self, intent: &TransferIntent, caller: &str) -> StageOutcome {
        let mut context = HashMap::new();
        context.insert("action".to_string(), intent.action.to_string());
        context.insert("token".to_string(), intent.token.clone());
        context.insert("network".to_string(), intent.network.clone());

        let request = PolicyRequest {
            from: caller.to_string(),
            to: intent.to.clone().unwrap_or_default(),
            value: intent.amount.clone(),
            data: "0x".to_string(),
            context,
        };

        match self.policy.check(&request).await {
            Ok(verdict) if verdict.passed => StageOutcome::passed(
                PipelineStage::PolicyChecked,
                verdict.reason,
                json!({ "request": request }),
            ),
            Ok(verdict) => StageOutcome::failed(
                PipelineStage::PolicyChecked,
                verdict.reason,
                json!({ "request": request }),
            ),
            // Fail-closed: unreachable policy rules block the payment.
            Err(e) => StageOutcome::failed(
                PipelineStage::PolicyChecked,
                format!("policy rules unavailable: {}", e),
                json!({ "request": request }),
            ),
        }
    }

    async fn probe_stage(&self, token: &str, amount: &str) -> StageOutcome {
        let resolved = if token.starts_with("0x") {
            Some(token.to_string())
        } else {
            self.tokens.get(&token.to_uppercase()).cloned()
        };

        let Some(address) = resolved else {
            // No contract address to probe; screen the ticker itself.
            let ticker = token.to_uppercase();
            if SUSPICIOUS_TICKERS.iter().any(|t| ticker.contains(t)) {
                return StageOutcome::failed(
                    PipelineStage::ProbeChecked,
                    format!("honeypot token detected: {} cannot be sold", ticker),
                    json!({ "token": ticker }),
                );
            }
            return StageOutcome::passed(
                PipelineStage::ProbeChecked,
                format!("no contract address known for {}", ticker),
                json!({ "token": ticker, "resolved": false }),
            );
        };

        let result = self.probe.probe(&address, amount).await;
        let evidence = serde_json::to_value(&result).unwrap_or(serde_json::Value::Null);

        if result.is_unknown() {
            // Fail-open: connectivity failure is not a token-safety verdict.
            warn!(token = %address, "probe inconclusive: {}", result.reason);
            StageOutcome::passed(
                PipelineStage::ProbeChecked,
                format!("probe inconclusive: {}", result.reason),
                evidence,
            )
        } else if !result.is_safe() {
            StageOutcome::failed(PipelineStage::ProbeChecked, result.reason.clone(), evidence)
        } else {
            StageOutcome::passed(PipelineStage::ProbeChecked, result.reason.clone(), evidence)
        }
    }
}

fn push_and_continue(stages: &mut Vec<StageOutcome>, outcome: StageOutcome) -> bool {
    let passed = outcome.passed;
    if passed {
        info!(stage = %outcome.stage, "stage passed: {}", outcome.reason);
    } else {
        warn!(stage = %outcome.stage, "stage failed: {}", outcome.reason);
    }
    stages.push(outcome);
    passed
}

/// Natural-language summary of the intent for the pre-check judge call.
fn describe_intent(intent: &TransferIntent) -> String {
    match intent.action {
        IntentAction::Transfer => format!(
            "transfer of {} {} to {} on {}",
            intent.amount,
            intent.token,
            intent.to.as_deref().unwrap_or("an unspecified recipient"),
            intent.network
        ),
        IntentAction::Swap => format!(
            "swap of {} {} into {} on {}",
            intent.amount,
            intent.token_in.as_deref().unwrap_or("?"),
            intent.token_out.as_deref().unwrap_or(&intent.token),
            intent.network
        ),
        IntentAction::Query => format!(
            "read-only query on {}: {}",
            intent.network,
            intent.query.as_deref().unwrap_or("")
        ),
    }
}

/// Summary of the run so far for the post-check judge call.
fn describe_result(intent: &TransferIntent, stages: &[StageOutcome]) -> String {
    let summary: Vec<String> = stages
        .iter()
        .map(|outcome| format!("{}: {}", outcome.stage, outcome.reason))
        .collect();
    format!(
        "final review of {}; prior stages: {}",
        describe_intent(intent),
        summary.join("; ")
    )
}
