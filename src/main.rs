use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use payshield::{
    facilitator::parse_address, Facilitator, HttpRiskJudge, HttpTokenProbe, PaymentHeader,
    SafeFacilitator, ShieldConfig, StaticPolicy, ValidationPipeline,
};

// Throwaway development key; never holds funds.
const DEV_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const DEMO_RECIPIENT: &str = "0x742D35CC6634c0532925A3b844BC9E7595F0BEb0";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Parser)]
#[command(name = "payshield", about = "Validated x402 payment authorization demo")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PAYSHIELD_CONFIG_FILE")]
    config: Option<String>,

    /// Wallet private key
    #[arg(long, env = "WALLET_PRIVATE_KEY")]
    private_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ShieldConfig::load(cli.config.as_deref())?;

    let private_key = cli
        .private_key
        .or_else(|| config.signing.private_key.clone())
        .unwrap_or_else(|| {
            warn!("no private key configured, using throwaway development key");
            DEV_PRIVATE_KEY.to_string()
        });

    let judge = Arc::new(HttpRiskJudge::new(
        config.judge.endpoint.clone(),
        Duration::from_secs(config.judge.timeout_secs),
    )?);

    let mut policy = StaticPolicy::new(
        config.policy.max_amount.as_deref(),
        config.policy.denylist.iter().cloned(),
    )?;
    if config.rate_limit_enabled() {
        policy = policy.with_rate_limit(
            config.policy.rate_limit_max_calls.unwrap_or(10),
            Duration::from_secs(config.policy.rate_limit_window_secs.unwrap_or(60)),
        );
    }
    let policy = Arc::new(policy);

    let denylist = config
        .policy
        .denylist
        .iter()
        .filter_map(|raw| parse_address(raw).ok())
        .collect::<Vec<_>>();
    let probe = Arc::new(HttpTokenProbe::new(&config.network.rpc_url)?.with_denylist(denylist));

    let pipeline = ValidationPipeline::new(judge, policy, probe)
        .with_token_registry(config.network.tokens.clone());
    let facilitator = Facilitator::with_chain_id(&config.network.name, config.network.chain_id);
    let safe = SafeFacilitator::new(facilitator, pipeline, private_key);

    let asset = "0xc01efAaF7C5C61bEbFAeb358E1161b537b8bC0e0"; // devUSDC.e

    info!("payshield validated payment demo");
    info!("================================");

    // Scenario 1: a small payment that should clear every stage.
    info!("scenario 1: pay 1 USDC for API access");
    let decision = safe
        .authorize(
            DEMO_RECIPIENT,
            asset,
            "1000000",
            HashMap::from([(
                "user_intent".to_string(),
                "Pay for API access".to_string(),
            )]),
            Some(config.signing.timeout_seconds),
        )
        .await?;
    report(&decision.approved, &decision.reason, &decision.failed_stage);
    if let Some(header) = &decision.payment_header {
        let decoded = PaymentHeader::decode(header)?;
        info!(
            "   header: scheme={} from={} valid for {}s",
            decoded.scheme,
            decoded.payload.from,
            decoded.payload.valid_before - decoded.payload.valid_after
        );
    }

    // Scenario 2: an amount over the policy limit is blocked at PolicyChecked.
    info!("scenario 2: excessive transfer amount");
    let decision = safe
        .authorize(DEMO_RECIPIENT, asset, "100000000000", HashMap::new(), None)
        .await?;
    report(&decision.approved, &decision.reason, &decision.failed_stage);

    // Scenario 3: a suspicious swap command never reaches signing.
    info!("scenario 3: agent asks to buy a honeypot token");
    let result = safe.validate_command("Buy 100 SCAM").await;
    report(
        &result.approved,
        &result.failure_reason().map(str::to_string),
        &result.failed_stage,
    );

    // Scenario 4: denylisted recipient (requires `policy.denylist` to contain
    // the zero address; the default config does not).
    info!("scenario 4: transfer to the zero address");
    let decision = safe
        .authorize(ZERO_ADDRESS, asset, "1", HashMap::new(), None)
        .await?;
    report(&decision.approved, &decision.reason, &decision.failed_stage);

    info!("demo complete");
    Ok(())
}

fn report(
    approved: &bool,
    reason: &Option<String>,
    failed_stage: &Option<payshield::PipelineStage>,
) {
    if *approved {
        info!("   APPROVED");
    } else {
        match failed_stage {
            Some(stage) => warn!(
                "   BLOCKED at {}: {}",
                stage,
                reason.as_deref().unwrap_or("no reason given")
            ),
            None => warn!("   FAILED: {}", reason.as_deref().unwrap_or("no reason given")),
        }
    }
}
