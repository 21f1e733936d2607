//! Safe authorization facade.
//!
//! The public entry point: runs the validation pipeline and only signs on
//! approval. Either a complete payment header comes back, or none does with
//! a reason attached; there is no partial signing.

use std::collections::HashMap;

use alloy::primitives::U256;
use tracing::{info, warn};

use crate::facilitator::{parse_address, Facilitator};
use crate::intent::parse_intent;
use crate::pipeline::ValidationPipeline;
use crate::types::{
    AuthorizationDecision, IntentAction, PipelineResult, ShieldError, TransferIntent,
};

/// Facilitator wrapped with the validation pipeline.
pub struct SafeFacilitator {
    facilitator: Facilitator,
    pipeline: ValidationPipeline,
    private_key: String,
}

impl SafeFacilitator {
    pub fn new(
        facilitator: Facilitator,
        pipeline: ValidationPipeline,
        private_key: impl Into<String>,
    ) -> Self {
        Self { facilitator, pipeline, private_key: private_key.into() }
    }

    pub fn network(&self) -> &str {
        self.facilitator.network()
    }

    /// Validate a payment and, only on approval, generate the signed header.
    ///
    /// Malformed addresses or a non-integer amount are rejected with an
    /// error before any stage runs. A pipeline rejection comes back as
    /// `approved = false` with the failing stage set; a signing failure after
    /// a fully approved run also comes back as `approved = false`, but with
    /// `failed_stage = None` so callers can tell the two apart.
    pub async fn authorize(
        &self,
        pay_to: &str,
        asset: &str,
        amount: &str,
        context: HashMap<String, String>,
        timeout_seconds: Option<u64>,
    ) -> Result<AuthorizationDecision, ShieldError> {
        let to = parse_address(pay_to)
            .map_err(|e| ShieldError::InvalidInput(format!("invalid recipient: {}", e)))?;
        let asset_addr = parse_address(asset)
            .map_err(|e| ShieldError::InvalidInput(format!("invalid asset: {}", e)))?;
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(ShieldError::InvalidInput("amount must not be empty".to_string()));
        }
        U256::from_str_radix(amount, 10).map_err(|e| {
            ShieldError::InvalidInput(format!("amount {:?} is not an integer: {}", amount, e))
        })?;

        let mut context = context;
        context.insert("payment_type".to_string(), "x402".to_string());
        context.insert("recipient".to_string(), to.to_checksum(None));
        context.insert("token".to_string(), asset_addr.to_checksum(None));
        context.insert("amount".to_string(), amount.to_string());
        context.insert("network".to_string(), self.network().to_string());

        let intent = TransferIntent {
            action: IntentAction::Transfer,
            token: asset_addr.to_checksum(None),
            amount: amount.to_string(),
            to: Some(to.to_checksum(None)),
            token_in: None,
            token_out: None,
            query: None,
            network: self.network().to_string(),
        };

        // Address derivation failure surfaces later as a signing failure, so
        // an invalid key still exercises the full pipeline first.
        let caller = self.facilitator.signer_address(&self.private_key).unwrap_or_default();

        let result = self.pipeline.validate(&intent, &caller).await;
        if !result.approved {
            let reason = result
                .failure_reason()
                .unwrap_or("validation failed")
                .to_string();
            warn!(failed_stage = ?result.failed_stage, "payment blocked: {}", reason);
            return Ok(AuthorizationDecision {
                approved: false,
                payment_header: None,
                reason: Some(reason),
                failed_stage: result.failed_stage,
                stages: result.stages,
            });
        }

        match self.facilitator.generate_payment_header(
            &self.private_key,
            pay_to,
            asset,
            amount,
            timeout_seconds,
        ) {
            Ok(header) => {
                info!(to = %pay_to, amount = %amount, "payment header generated");
                Ok(AuthorizationDecision {
                    approved: true,
                    payment_header: Some(header),
                    reason: None,
                    failed_stage: None,
                    stages: result.stages,
                })
            }
            // The one place a passed validation still ends with no
            // credential. failed_stage stays None so this is distinguishable
            // from a pipeline rejection.
            Err(e) => {
                warn!("validation passed but signing failed: {}", e);
                Ok(AuthorizationDecision {
                    approved: false,
                    payment_header: None,
                    reason: Some(format!("failed to generate payment header: {}", e)),
                    failed_stage: None,
                    stages: result.stages,
                })
            }
        }
    }

    /// Parse a free-text command and run it through the pipeline without
    /// signing anything. Useful for screening swap/query instructions that
    /// never reach the facilitator.
    pub async fn validate_command(&self, command: &str) -> PipelineResult {
        let intent = parse_intent(command, self.network());
        let caller = self.facilitator.signer_address(&self.private_key).unwrap_or_default();
        self.pipeline.validate(&intent, &caller).await
    }

    /// Generate a payment header with NO validation.
    ///
    /// This bypasses every pipeline stage. Only call it for payments already
    /// validated through another mechanism; the name is deliberately loud so
    /// it is never reached by accident.
    pub fn generate_unsafe_payment_header(
        &self,
        pay_to: &str,
        asset: &str,
        amount: &str,
        timeout_seconds: Option<u64>,
    ) -> Result<String, ShieldError> {
        warn!(to = %pay_to, "generating payment header WITHOUT validation");
        self.facilitator.generate_payment_header(
            &self.private_key,
            pay_to,
            asset,
            amount,
            timeout_seconds,
        )
    }
}
