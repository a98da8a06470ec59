use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::HookscanError;

type HmacSha256 = Hmac<Sha256>;

/// Verify the provider's `sha256=<hex>` signature over the raw request body.
/// Comparison happens inside `verify_slice`, which is constant-time.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), HookscanError> {
    let header = header
        .ok_or_else(|| HookscanError::SignatureRejected("missing signature header".into()))?;

    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| HookscanError::SignatureRejected("unsupported signature scheme".into()))?;

    let claimed = hex::decode(hex_digest)
        .map_err(|_| HookscanError::SignatureRejected("signature is not valid hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| HookscanError::Internal(format!("HMAC key setup failed: {}", e)))?;
    mac.update(body);
    mac.verify_slice(&claimed)
        .map_err(|_| HookscanError::SignatureRejected("signature mismatch".into()))
}

/// Compute the `sha256=<hex>` header value for a body. Used by tests and
/// useful for local delivery tooling.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    #[test]
    fn test_verify_known_vector() {
        // Vector from GitHub's webhook validation docs.
        let expected =
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert_eq!(sign_body(SECRET, BODY), expected);
        assert!(verify_signature(SECRET, BODY, Some(expected)).is_ok());
    }

    #[test]
    fn test_single_byte_mutation_fails() {
        let header = sign_body(SECRET, BODY);
        let mut mutated = BODY.to_vec();
        for i in 0..mutated.len() {
            mutated[i] ^= 0x01;
            let err = verify_signature(SECRET, &mutated, Some(&header)).unwrap_err();
            assert_eq!(err.kind(), "signature_rejected");
            mutated[i] ^= 0x01;
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = verify_signature(SECRET, BODY, None).unwrap_err();
        assert_eq!(err.kind(), "signature_rejected");
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let err = verify_signature(SECRET, BODY, Some("sha1=abcdef")).unwrap_err();
        assert_eq!(err.kind(), "signature_rejected");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign_body(SECRET, BODY);
        let err = verify_signature("other secret", BODY, Some(&header)).unwrap_err();
        assert_eq!(err.kind(), "signature_rejected");
    }

    #[test]
    fn test_non_hex_signature_rejected() {
        let err = verify_signature(SECRET, BODY, Some("sha256=zzzz")).unwrap_err();
        assert_eq!(err.kind(), "signature_rejected");
    }
}
