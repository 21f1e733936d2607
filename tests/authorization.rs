//! End-to-end tests for payment header generation and decoding. No network
//! access: the facilitator signs locally.

use chrono::Utc;
use payshield::{Facilitator, PaymentHeader, ShieldError, SCHEME_EIP3009, X402_VERSION};

// Throwaway development key; the derived address is fixed.
const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

const RECIPIENT: &str = "0x742D35CC6634c0532925A3b844BC9E7595F0BEb0";
const ASSET: &str = "0xc01efAaF7C5C61bEbFAeb358E1161b537b8bC0e0";

fn generate(amount: &str, timeout: Option<u64>) -> String {
    Facilitator::new("cronos-testnet")
        .generate_payment_header(TEST_KEY, RECIPIENT, ASSET, amount, timeout)
        .unwrap()
}

#[test]
fn header_round_trips_losslessly() {
    let encoded = generate("1000000", None);
    let decoded = PaymentHeader::decode(&encoded).unwrap();
    let re_encoded = decoded.encode();
    assert_eq!(PaymentHeader::decode(&re_encoded).unwrap(), decoded);
}

#[test]
fn header_carries_protocol_constants() {
    let decoded = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    assert_eq!(decoded.x402_version, X402_VERSION);
    assert_eq!(decoded.scheme, SCHEME_EIP3009);
    assert_eq!(decoded.network, "cronos-testnet");
}

#[test]
fn value_keeps_its_exact_text() {
    let decoded = PaymentHeader::decode(&generate("0500", None)).unwrap();
    assert_eq!(decoded.payload.value, "0500");
}

#[test]
fn validity_window_is_zero_to_now_plus_timeout() {
    // validAfter is anchored at zero; validBefore is an absolute timestamp
    // `timeout` seconds past issuance.
    let issued = Utc::now().timestamp() as u64;
    let decoded = PaymentHeader::decode(&generate("1000000", Some(120))).unwrap();
    let now = Utc::now().timestamp() as u64;
    assert_eq!(decoded.payload.valid_after, 0);
    assert!(decoded.payload.valid_before >= issued + 120);
    assert!(decoded.payload.valid_before <= now + 120);
}

#[test]
fn default_timeout_is_five_minutes() {
    let issued = Utc::now().timestamp() as u64;
    let decoded = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    let now = Utc::now().timestamp() as u64;
    assert!(decoded.payload.valid_before >= issued + 300);
    assert!(decoded.payload.valid_before <= now + 300);
}

#[test]
fn from_is_derived_from_the_key() {
    let decoded = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    assert_eq!(decoded.payload.from, TEST_ADDRESS);
}

#[test]
fn addresses_are_checksum_normalized() {
    // Lowercase inputs must come back in EIP-55 mixed case.
    let encoded = Facilitator::new("cronos-testnet")
        .generate_payment_header(
            TEST_KEY,
            &RECIPIENT.to_lowercase(),
            &ASSET.to_lowercase(),
            "1000000",
            None,
        )
        .unwrap();
    let decoded = PaymentHeader::decode(&encoded).unwrap();
    assert_eq!(decoded.payload.to, RECIPIENT);
    assert_eq!(decoded.payload.asset, ASSET);
}

#[test]
fn nonce_and_signature_are_prefixed_lowercase_hex() {
    let decoded = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    for field in [&decoded.payload.nonce, &decoded.payload.signature] {
        assert!(field.starts_with("0x"));
        assert!(field[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
    // 32-byte nonce, 65-byte signature.
    assert_eq!(decoded.payload.nonce.len(), 2 + 64);
    assert_eq!(decoded.payload.signature.len(), 2 + 130);
}

#[test]
fn nonces_are_fresh_within_the_same_second() {
    let first = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    let second = PaymentHeader::decode(&generate("1000000", None)).unwrap();
    assert_ne!(first.payload.nonce, second.payload.nonce);
}

#[test]
fn signature_is_deterministic_modulo_nonce_and_clock() {
    // Same inputs, two runs: everything except nonce, signature and the
    // validity timestamp must be identical.
    let first = PaymentHeader::decode(&generate("1000000", Some(60))).unwrap();
    let second = PaymentHeader::decode(&generate("1000000", Some(60))).unwrap();
    assert_eq!(first.payload.from, second.payload.from);
    assert_eq!(first.payload.to, second.payload.to);
    assert_eq!(first.payload.asset, second.payload.asset);
    assert_eq!(first.payload.value, second.payload.value);
}

#[test]
fn invalid_key_and_amount_are_reported_distinctly() {
    let facilitator = Facilitator::new("cronos-testnet");
    let key_err = facilitator
        .generate_payment_header("garbage", RECIPIENT, ASSET, "1", None)
        .unwrap_err();
    assert!(matches!(key_err, ShieldError::InvalidKey(_)));

    // "" and whitespace would otherwise slip through as zero.
    for amount in ["1.25", "", "   "] {
        let amount_err = facilitator
            .generate_payment_header(TEST_KEY, RECIPIENT, ASSET, amount, None)
            .unwrap_err();
        assert!(matches!(amount_err, ShieldError::InvalidAmount(_)), "amount {:?}", amount);
    }
}
