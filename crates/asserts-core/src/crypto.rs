//! Cryptographic primitives for assertions.
//!
//! Keys are Ed25519. Key identifiers and fingerprints are SHA3-384 digests of
//! the encoded public key; signatures and keys travel base64-encoded with a
//! leading format version byte.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_384, Sha3_512};

use crate::error::CryptoError;

/// Format version byte prefixed to encoded keys.
pub const KEY_FORMAT_V1: u8 = 0x01;

/// Format version byte prefixed to encoded signatures.
pub const SIGNATURE_FORMAT_V1: u8 = 0x01;

/// Digest algorithms usable in digest-valued headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha3_384,
    Sha3_512,
}

impl DigestAlgorithm {
    /// Digest length in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Sha3_384 => 48,
            Self::Sha3_512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha3_384 => Sha3_384::digest(data).to_vec(),
            Self::Sha3_512 => Sha3_512::digest(data).to_vec(),
        }
    }
}

/// A 48-byte SHA3-384 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha3_384Digest(pub [u8; 48]);

impl Sha3_384Digest {
    /// Compute the SHA3-384 digest of the given data.
    pub fn hash(data: &[u8]) -> Self {
        let mut out = [0u8; 48];
        out.copy_from_slice(&Sha3_384::digest(data));
        Self(out)
    }

    pub const fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// URL-safe unpadded base64, the form used in headers.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for Sha3_384Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha3_384({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha3_384Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a digest for embedding in a header.
///
/// The digest length must match the algorithm.
pub fn encode_digest(algorithm: DigestAlgorithm, digest: &[u8]) -> Result<String, CryptoError> {
    if digest.len() != algorithm.size() {
        return Err(CryptoError::DigestLength {
            algorithm: algorithm.name(),
            expected: algorithm.size(),
        });
    }
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

/// An Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Create from raw key bytes, rejecting invalid curve points.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|e| CryptoError::DecodePublicKey(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Version byte followed by the key bytes.
    fn raw_encoding(&self) -> [u8; 33] {
        let mut raw = [0u8; 33];
        raw[0] = KEY_FORMAT_V1;
        raw[1..].copy_from_slice(self.0.as_bytes());
        raw
    }

    fn digest(&self) -> Sha3_384Digest {
        Sha3_384Digest::hash(&self.raw_encoding())
    }

    /// The key identifier used in `sign-key-sha3-384` style headers.
    pub fn id(&self) -> String {
        self.digest().to_base64url()
    }

    /// Hex fingerprint for display.
    pub fn fingerprint(&self) -> String {
        self.digest().to_hex()
    }

    /// Verify an encoded signature over `content`.
    pub fn verify(&self, content: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let text: Vec<u8> = signature
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if text.is_empty() {
            return Err(CryptoError::DecodeSignature("no data".into()));
        }
        let raw = STANDARD
            .decode(&text)
            .map_err(|e| CryptoError::DecodeSignature(e.to_string()))?;
        let sig = match raw.split_first() {
            Some((&SIGNATURE_FORMAT_V1, sig)) => sig,
            Some((version, _)) => {
                return Err(CryptoError::DecodeSignature(format!(
                    "unsupported format version: {version}"
                )))
            }
            None => return Err(CryptoError::DecodeSignature("no data".into())),
        };
        let bytes: [u8; 64] = sig.try_into().map_err(|_| {
            CryptoError::DecodeSignature(format!("expected 64 signature bytes, got {}", sig.len()))
        })?;
        self.0
            .verify(content, &Signature::from_bytes(&bytes))
            .map_err(|_| CryptoError::SignatureMismatch)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.id())
    }
}

/// Encode a public key for embedding in a header or account-key body.
pub fn encode_public_key(key: &PublicKey) -> String {
    STANDARD.encode(key.raw_encoding())
}

/// Decode a public key produced by [`encode_public_key`].
///
/// Whitespace is ignored, so keys folded over several header lines decode.
pub fn decode_public_key(encoded: &[u8]) -> Result<PublicKey, CryptoError> {
    let text: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if text.is_empty() {
        return Err(CryptoError::DecodePublicKey("no data".into()));
    }
    let raw = STANDARD
        .decode(&text)
        .map_err(|e| CryptoError::DecodePublicKey(e.to_string()))?;
    let key = match raw.split_first() {
        Some((&KEY_FORMAT_V1, key)) => key,
        Some((version, _)) => {
            return Err(CryptoError::DecodePublicKey(format!(
                "unsupported format version: {version}"
            )))
        }
        None => return Err(CryptoError::DecodePublicKey("no data".into())),
    };
    let bytes: [u8; 32] = key.try_into().map_err(|_| {
        CryptoError::DecodePublicKey(format!("expected 32 key bytes, got {}", key.len()))
    })?;
    PublicKey::from_bytes(&bytes)
}

/// An Ed25519 private key.
///
/// There is no accessor for the secret material; persistence goes through
/// [`encode_private_key`].
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key())
    }

    /// Sign `content`, returning the encoded signature.
    pub fn sign(&self, content: &[u8]) -> Vec<u8> {
        let sig = self.signing_key.sign(content);
        let mut raw = Vec::with_capacity(65);
        raw.push(SIGNATURE_FORMAT_V1);
        raw.extend_from_slice(&sig.to_bytes());
        STANDARD.encode(raw).into_bytes()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key().id())
    }
}

/// Encode a private key for a keypair manager's own storage.
pub fn encode_private_key(key: &PrivateKey) -> String {
    let mut raw = Vec::with_capacity(33);
    raw.push(KEY_FORMAT_V1);
    raw.extend_from_slice(&key.signing_key.to_bytes());
    STANDARD.encode(raw)
}

/// Decode a private key produced by [`encode_private_key`].
pub fn decode_private_key(encoded: &[u8]) -> Result<PrivateKey, CryptoError> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::DecodePrivateKey(e.to_string()))?;
    match raw.split_first() {
        Some((&KEY_FORMAT_V1, seed)) => {
            let seed: [u8; 32] = seed.try_into().map_err(|_| {
                CryptoError::DecodePrivateKey(format!("expected 32 seed bytes, got {}", seed.len()))
            })?;
            Ok(PrivateKey::from_seed(&seed))
        }
        Some((version, _)) => Err(CryptoError::DecodePrivateKey(format!(
            "unsupported format version: {version}"
        ))),
        None => Err(CryptoError::DecodePrivateKey("no data".into())),
    }
}
