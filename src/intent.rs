//! Free-text intent parsing.
//!
//! Turns agent commands like "Send 10 USDC to 0x..." into a structured
//! [`TransferIntent`]. Recognition is keyword plus pattern matching; anything
//! that is neither a transfer nor a swap becomes a query intent carrying the
//! raw text.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{IntentAction, TransferIntent};

/// Defaults substituted when a command names no amount, so the pipeline
/// always has a concrete intent to validate.
pub const DEFAULT_TRANSFER_AMOUNT: &str = "10";
pub const DEFAULT_TRANSFER_TOKEN: &str = "USDC";
pub const DEFAULT_SWAP_AMOUNT: &str = "100";
pub const DEFAULT_SWAP_TOKEN: &str = "SCAM";
/// Recipient used when a transfer command names no address.
pub const DEFAULT_RECIPIENT: &str = "0x742D35CC6634c0532925A3b844BC9E7595F0BEb0";

fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*([A-Za-z][A-Za-z.]*)").expect("amount pattern compiles")
    })
}

fn address_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]{40}").expect("address pattern compiles"))
}

/// Parse a free-form command into a structured intent.
pub fn parse_intent(command: &str, network: &str) -> TransferIntent {
    let lowered = command.to_lowercase();

    if lowered.contains("send") || lowered.contains("transfer") {
        let to = extract_address(command);
        // Strip the address before scanning for an amount so its hex digits
        // are not mistaken for one.
        let stripped = match &to {
            Some(addr) => command.replace(addr, ""),
            None => command.to_string(),
        };
        let (amount, token) = extract_amount(&stripped).unwrap_or_else(|| {
            (DEFAULT_TRANSFER_AMOUNT.to_string(), DEFAULT_TRANSFER_TOKEN.to_string())
        });
        TransferIntent {
            action: IntentAction::Transfer,
            token,
            amount,
            to: Some(to.unwrap_or_else(|| DEFAULT_RECIPIENT.to_string())),
            token_in: None,
            token_out: None,
            query: None,
            network: network.to_string(),
        }
    } else if lowered.contains("buy") || lowered.contains("swap") {
        let (amount, token) = extract_amount(command).unwrap_or_else(|| {
            (DEFAULT_SWAP_AMOUNT.to_string(), DEFAULT_SWAP_TOKEN.to_string())
        });
        TransferIntent {
            action: IntentAction::Swap,
            token: token.clone(),
            amount,
            to: None,
            token_in: Some("USDC".to_string()),
            token_out: Some(token),
            query: None,
            network: network.to_string(),
        }
    } else {
        TransferIntent {
            action: IntentAction::Query,
            token: String::new(),
            amount: String::new(),
            to: None,
            token_in: None,
            token_out: None,
            query: Some(command.to_string()),
            network: network.to_string(),
        }
    }
}

/// First `amount token` pair in the text, token uppercased.
fn extract_amount(text: &str) -> Option<(String, String)> {
    let captures = amount_pattern().captures(text)?;
    let amount = captures.get(1)?.as_str().to_string();
    let token = captures.get(2)?.as_str().to_uppercase();
    Some((amount, token))
}

/// First 20-byte hex address in the text.
fn extract_address(text: &str) -> Option<String> {
    address_pattern().find(text).map(|m| m.as_str().to_string())
}
