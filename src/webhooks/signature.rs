//! Webhook signature verification (HMAC-SHA256).
//!
//! GitHub signs each delivery body with the app's webhook secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Verification
//! must run over the exact bytes received; a parsed-then-reserialized body can
//! differ in key order or whitespace and would not match.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Hub-Signature-256` header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Parses a signature header (e.g. `"sha256=abc123..."`) into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex).
///
/// # Examples
///
/// ```
/// use famiglio::webhooks::parse_signature_header;
///
/// assert_eq!(parse_signature_header("sha256=abcd"), Some(vec![0xab, 0xcd]));
/// assert!(parse_signature_header("abcd").is_none());
/// assert!(parse_signature_header("sha1=abcd").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix(SIGNATURE_PREFIX)?;
    hex::decode(hex_sig).ok()
}

/// Computes the raw HMAC-SHA256 of `payload` keyed with `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a raw signature as a header value: `sha256=<lowercase hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(signature))
}

/// Signs `payload` the way GitHub does, returning the header value.
///
/// # Examples
///
/// ```
/// use famiglio::webhooks::{sign, verify_signature};
///
/// let header = sign(b"{\"zen\":\"test\"}", b"secret");
/// assert!(header.starts_with("sha256="));
/// assert!(verify_signature(b"{\"zen\":\"test\"}", b"secret", Some(header.as_str())));
/// ```
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    format_signature_header(&compute_signature(payload, secret))
}

/// Verifies a delivery signature.
///
/// Returns `false`, never an error, when the header is absent, malformed,
/// or does not match. The comparison is constant-time with respect to the
/// signature content; a length mismatch is rejected up front.
pub fn verify_signature(payload: &[u8], secret: &[u8], signature_header: Option<&str>) -> bool {
    let Some(expected) = signature_header.and_then(parse_signature_header) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    // verify_slice checks the length first, then compares in constant time.
    mac.verify_slice(&expected).is_ok()
}
