//! Auditor signing keys.
//!
//! Auditors authenticate external search requests by signing the keyword
//! hash they search for with an Ed25519 key. The server only ever stores the
//! public half; the private half is handed back once at creation or rotation.
//!
//! Keys and signatures travel as lowercase hex:
//! - public key: 32 bytes (64 hex chars)
//! - private key: 32-byte seed (64 hex chars)
//! - signature: 64 bytes (128 hex chars)

use crate::error::{CryptoError, CryptoResult};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroizing;

/// Ed25519 keypair for an auditor.
///
/// The signing key zeroizes itself on drop (from ed25519-dalek).
pub struct AuditorKeyPair {
    signing: SigningKey,
}

impl AuditorKeyPair {
    /// Generates a fresh keypair from a random seed.
    pub fn generate() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(&mut seed[..]);
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    /// Reconstructs a keypair from a hex-encoded private key.
    pub fn from_private_hex(private_hex: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(private_hex.trim())
                .map_err(|e| CryptoError::InvalidPrivateKey(format!("hex decode: {e}")))?,
        );
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes);
        Ok(Self {
            signing: SigningKey::from_bytes(&seed),
        })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().as_bytes())
    }

    /// Private key seed as lowercase hex. Wiped when the returned buffer drops.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing.to_bytes()))
    }

    /// Signs a keyword hash the way an auditor client does: the message is
    /// the UTF-8 bytes of the hex string.
    pub fn sign_keyword_hash(&self, keyword_hash: &str) -> String {
        hex::encode(self.signing.sign(keyword_hash.as_bytes()).to_bytes())
    }
}

/// Parses a hex-encoded Ed25519 public key.
pub fn parse_public_key(public_hex: &str) -> CryptoResult<VerifyingKey> {
    let bytes = hex::decode(public_hex.trim())
        .map_err(|e| CryptoError::InvalidPublicKey(format!("hex decode: {e}")))?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
    VerifyingKey::from_bytes(&arr).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Verifies a hex signature over the UTF-8 bytes of `keyword_hash`.
///
/// Malformed hex, a wrong signature length and a signature that does not
/// verify all return [`CryptoError::InvalidSignature`].
pub fn verify_keyword_signature(
    public_key: &VerifyingKey,
    keyword_hash: &str,
    signature_hex: &str,
) -> CryptoResult<()> {
    let bytes = hex::decode(signature_hex.trim())
        .map_err(|e| CryptoError::InvalidSignature(format!("hex decode: {e}")))?;
    let signature = Signature::from_slice(&bytes)
        .map_err(|_| CryptoError::InvalidSignature(format!("bad length {}", bytes.len())))?;

    public_key
        .verify_strict(keyword_hash.as_bytes(), &signature)
        .map_err(|_| CryptoError::InvalidSignature("verification failed".to_string()))
}
