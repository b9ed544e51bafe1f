//! Interaction signature verification
//!
//! Discord signs `timestamp || body` with the application's Ed25519 key and
//! sends the result hex-encoded in `X-Signature-Ed25519`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::config::ConfigError;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid {
            name: "DISCORD_PUBLIC_KEY",
            value: public_key.to_string(),
        };

        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| invalid())?;
        Ok(Self { key })
    }

    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        let Ok(raw) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&raw) else {
            return false;
        };

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::from_hex(&hex::encode(signing_key().verifying_key().to_bytes())).unwrap()
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"type":1}"#;
        let signature = signing_key().sign(&[b"1700000000".as_slice(), body].concat());

        assert!(verifier().verify(&hex::encode(signature.to_bytes()), "1700000000", body));
    }

    #[test]
    fn test_tampered_body_or_timestamp() {
        let body = br#"{"type":1}"#;
        let signature = hex::encode(signing_key().sign(&[b"1700000000".as_slice(), body].concat()).to_bytes());
        let verifier = verifier();

        assert!(!verifier.verify(&signature, "1700000001", body));
        assert!(!verifier.verify(&signature, "1700000000", br#"{"type":2}"#));
        assert!(!verifier.verify("not-hex", "1700000000", body));
    }

    #[test]
    fn test_bad_public_key() {
        assert!(SignatureVerifier::from_hex("abcd").is_err());
        assert!(SignatureVerifier::from_hex("zz").is_err());
    }
}
