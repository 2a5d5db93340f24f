//! Request signature verification.
//!
//! Signed requests carry `x-public-key`, `x-nonce`, and `x-signature`
//! headers; the signed payload is `(additional_data ?? "") + nonce`. The
//! HTTP middleware itself is out of scope here; these are the verification
//! primitives it calls into.
//!
//! - solana / ed25519 keys verify with Ed25519.
//! - arweave keys are RSA moduli; signatures are RSA-PSS over SHA-256 with
//!   a 32-byte salt, falling back to a zero-length salt for older signers.
//! - ethereum-family signatures use signed-message recovery, which lives
//!   with the middleware's EVM tooling.

use base64::Engine;
use ring::signature::{UnparsedPublicKey, ED25519};
use rsa::{pss::Pss, BigUint, RsaPublicKey};
use sha2::{Digest, Sha256};

const RSA_EXPONENT: u32 = 65537;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("malformed public key")]
    BadPublicKey,
}

/// The exact byte string a client signs.
pub fn signature_data(additional_data: Option<&str>, nonce: &str) -> Vec<u8> {
    let mut data =
        additional_data.unwrap_or_default().as_bytes().to_vec();
    data.extend_from_slice(nonce.as_bytes());
    data
}

/// Verifies an Ed25519 signature (solana and raw ed25519 signers).
pub fn verify_ed25519(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), AuthError> {
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(message, signature)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Verifies an Arweave RSA-PSS signature. `owner_modulus` is the raw
/// big-endian RSA modulus (the decoded `owner` field of the signer's key).
pub fn verify_arweave(
    owner_modulus: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), AuthError> {
    let public_key = RsaPublicKey::new(
        BigUint::from_bytes_be(owner_modulus),
        BigUint::from(RSA_EXPONENT),
    )
    .map_err(|_| AuthError::BadPublicKey)?;
    let digest = Sha256::digest(message);

    // Salt length 32 is what current signers produce; fall back to the
    // zero-salt form some older wallets emit.
    public_key
        .verify(Pss::new_with_salt::<Sha256>(32), &digest, signature)
        .or_else(|_| {
            public_key.verify(
                Pss::new_with_salt::<Sha256>(0),
                &digest,
                signature,
            )
        })
        .map_err(|_| AuthError::InvalidSignature)
}

/// The native Arweave address of an RSA public key:
/// `base64url(sha256(modulus))`.
pub fn arweave_address(owner_modulus: &[u8]) -> String {
    let digest = Sha256::digest(owner_modulus);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod test {
    use rand::rngs::OsRng;
    use ring::{
        rand::SystemRandom,
        signature::{Ed25519KeyPair, KeyPair},
    };
    use rsa::{traits::PublicKeyParts, RsaPrivateKey};

    use super::*;

    #[test]
    fn ed25519_sign_verify_roundtrip() {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap();
        let public_key = key_pair.public_key().as_ref();

        let message = signature_data(Some("payload"), "nonce-123");
        let signature = key_pair.sign(&message);

        verify_ed25519(public_key, &message, signature.as_ref()).unwrap();

        // Tampering with any byte flips the result.
        let mut tampered = message.clone();
        tampered[0] ^= 0x01;
        assert!(
            verify_ed25519(public_key, &tampered, signature.as_ref())
                .is_err()
        );
        let mut bad_signature = signature.as_ref().to_vec();
        bad_signature[0] ^= 0x01;
        assert!(
            verify_ed25519(public_key, &message, &bad_signature).is_err()
        );
    }

    #[test]
    fn arweave_rsa_pss_roundtrip_with_salt_fallback() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let modulus = private_key.n().to_bytes_be();

        let message = signature_data(None, "nonce-456");
        let digest = Sha256::digest(&message);

        // Current signers: 32-byte salt.
        let signature = private_key
            .sign_with_rng(
                &mut rng,
                Pss::new_with_salt::<Sha256>(32),
                &digest,
            )
            .unwrap();
        verify_arweave(&modulus, &message, &signature).unwrap();

        // Legacy signers: zero-length salt, accepted via the fallback.
        let legacy_signature = private_key
            .sign_with_rng(
                &mut rng,
                Pss::new_with_salt::<Sha256>(0),
                &digest,
            )
            .unwrap();
        verify_arweave(&modulus, &message, &legacy_signature).unwrap();

        // Tampered message fails both salt lengths.
        let mut tampered = message.clone();
        tampered[0] ^= 0x01;
        assert!(verify_arweave(&modulus, &tampered, &signature).is_err());
    }

    #[test]
    fn signature_data_concatenates() {
        assert_eq!(signature_data(Some("abc"), "123"), b"abc123");
        assert_eq!(signature_data(None, "123"), b"123");
    }

    #[test]
    fn arweave_address_is_b64url_of_key_digest() {
        let address = arweave_address(b"modulus-bytes");
        // 32-byte digest, base64url without padding.
        assert_eq!(address.len(), 43);
        assert!(!address.contains('='));
        assert!(!address.contains('+'));
        assert!(!address.contains('/'));
    }
}
