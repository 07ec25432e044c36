//! PKCE (RFC 7636) and CSRF state for the consent flow

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{distributions::Alphanumeric, Rng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes behind the verifier; 48 bytes encode to 64 characters
const VERIFIER_BYTES: usize = 48;

const STATE_LENGTH: usize = 32;

/// Verifier kept locally, challenge sent with the authorization request
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = challenge_for(&verifier);
        Self { verifier, challenge }
    }
}

/// S256 method: BASE64URL(SHA256(verifier))
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Opaque value echoed back by the provider on redirect
pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_is_rfc_compliant() {
        let pair = PkcePair::generate();
        assert!(pair.verifier.len() >= 43 && pair.verifier.len() <= 128);
        assert!(pair
            .verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let pair = PkcePair::generate();
        assert_eq!(pair.challenge.len(), 43);
        assert_eq!(pair.challenge, challenge_for(&pair.verifier));
    }

    #[test]
    fn test_known_challenge() {
        // Appendix B of RFC 7636
        let challenge = challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_state_is_unique() {
        let s1 = random_state();
        assert_eq!(s1.len(), STATE_LENGTH);
        assert_ne!(s1, random_state());
    }
}
