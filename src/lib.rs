//! payshield
//!
//! Staged risk validation and gasless x402 payment authorization for
//! autonomous agents. An agent's transfer request only becomes a signed
//! EIP-3009 payment header after every validation stage approves it:
//! intent judging, policy rules, honeypot probing, and a final risk review.
//!
//! # Example
//!
//! ```no_run
//! use std::{collections::HashMap, sync::Arc, time::Duration};
//! use payshield::{
//!     Facilitator, HttpRiskJudge, HttpTokenProbe, SafeFacilitator, StaticPolicy,
//!     ValidationPipeline,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let judge = Arc::new(HttpRiskJudge::new(
//!         "http://localhost:8000/assess",
//!         Duration::from_secs(10),
//!     )?);
//!     let policy = Arc::new(StaticPolicy::new(Some("100000000"), Vec::new())?);
//!     let probe = Arc::new(HttpTokenProbe::new("https://evm-t3.cronos.org")?);
//!
//!     let pipeline = ValidationPipeline::new(judge, policy, probe);
//!     let safe = SafeFacilitator::new(
//!         Facilitator::new("cronos-testnet"),
//!         pipeline,
//!         std::env::var("WALLET_PRIVATE_KEY")?,
//!     );
//!
//!     let decision = safe
//!         .authorize(
//!             "0x742D35CC6634c0532925A3b844BC9E7595F0BEb0",
//!             "0xc01efAaF7C5C61bEbFAeb358E1161b537b8bC0e0",
//!             "1000000",
//!             HashMap::new(),
//!             None,
//!         )
//!         .await?;
//!
//!     if decision.approved {
//!         println!("payment header: {}", decision.payment_header.unwrap());
//!     } else {
//!         println!("blocked: {}", decision.reason.unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod facilitator;
pub mod header;
pub mod intent;
pub mod judge;
pub mod pipeline;
pub mod policy;
pub mod probe;
pub mod safe;
pub mod types;

pub use config::ShieldConfig;
pub use facilitator::{Facilitator, TokenDomain, DEFAULT_TIMEOUT_SECONDS};
pub use header::{AuthorizationPayload, PaymentHeader, SCHEME_EIP3009, X402_VERSION};
pub use intent::parse_intent;
pub use judge::{HttpRiskJudge, RiskJudge};
pub use pipeline::ValidationPipeline;
pub use policy::{PolicyRules, StaticPolicy};
pub use probe::{HttpTokenProbe, TokenProbe};
pub use safe::SafeFacilitator;
pub use types::{
    AuthorizationDecision, IntentAction, PipelineResult, PipelineStage, PolicyRequest,
    PolicyVerdict, ProbeResult, RiskAssessment, RiskLevel, ShieldError, StageOutcome,
    TokenMetadata, TransferIntent,
};
