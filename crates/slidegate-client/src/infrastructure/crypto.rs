//! Challenge solver backed by `crypto_box` (X25519 + XSalsa20-Poly1305).
//!
//! The user's secret key arrives as standard base64 in the page URL
//! fragment.  The controller announces its public key in the config push.
//! A challenge is the base64 encoding of
//!
//! ```text
//! nonce (24 bytes) ‖ ciphertext ‖ tag (16 bytes)
//! ```
//!
//! sealed between the two keys.  The response is the base64 encoding of the
//! decrypted plaintext; the controller checks it against the hash it kept.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::{aead::AeadInPlace, Nonce, PublicKey, SalsaBox, SecretKey, Tag};
use thiserror::Error;
use tracing::{debug, warn};

use slidegate_core::{ChallengeSolver, CryptoPanel};

pub const NONCE_SIZE: usize = 24;
pub const TAG_SIZE: usize = 16;
pub const KEY_SIZE: usize = crypto_box::KEY_SIZE;

/// Reasons a key or challenge was rejected.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("expected a 32 byte key, got {0} bytes")]
    KeyLength(usize),

    #[error("no secret key loaded")]
    MissingSecretKey,

    #[error("controller public key not announced yet")]
    MissingPublicKey,

    #[error("challenge is {0} bytes, shorter than nonce and tag")]
    ChallengeTooShort(usize),

    #[error("challenge failed authentication")]
    Decrypt,
}

impl From<crypto_box::aead::Error> for SolverError {
    fn from(_: crypto_box::aead::Error) -> Self {
        SolverError::Decrypt
    }
}

/// Decodes a base64 key into its fixed-size byte form.
pub fn decode_key(material: &str) -> Result<[u8; KEY_SIZE], SolverError> {
    let bytes = STANDARD.decode(material.trim())?;
    <[u8; KEY_SIZE]>::try_from(bytes.as_slice()).map_err(|_| SolverError::KeyLength(bytes.len()))
}

/// Opens a sealed challenge and returns the plaintext.
pub fn open_challenge(salsa: &SalsaBox, sealed: &[u8]) -> Result<Vec<u8>, SolverError> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SolverError::ChallengeTooShort(sealed.len()));
    }
    let (nonce, rest) = sealed.split_at(NONCE_SIZE);
    let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);

    let nonce = Nonce::clone_from_slice(nonce);
    let tag = Tag::clone_from_slice(tag);
    let mut buf = ciphertext.to_vec();
    salsa.decrypt_in_place_detached(&nonce, &[], &mut buf, &tag)?;
    Ok(buf)
}

/// [`ChallengeSolver`] holding the user's secret key.
#[derive(Default)]
pub struct BoxSolver {
    secret: Option<SecretKey>,
}

impl BoxSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_key(&self) -> bool {
        self.secret.is_some()
    }

    fn solve(&self, panel: &CryptoPanel) -> Result<String, SolverError> {
        let secret = self.secret.as_ref().ok_or(SolverError::MissingSecretKey)?;
        let public = panel
            .public_key
            .as_deref()
            .ok_or(SolverError::MissingPublicKey)?;
        let public = PublicKey::from(decode_key(public)?);

        let sealed = STANDARD.decode(panel.challenge.trim())?;
        let salsa = SalsaBox::new(&public, secret);
        let plain = open_challenge(&salsa, &sealed)?;
        Ok(STANDARD.encode(plain))
    }
}

impl ChallengeSolver for BoxSolver {
    fn validate_key(&mut self, key_material: &str) -> bool {
        match decode_key(key_material) {
            Ok(bytes) => {
                self.secret = Some(SecretKey::from(bytes));
                true
            }
            Err(e) => {
                debug!("rejecting key material: {e}");
                self.secret = None;
                false
            }
        }
    }

    fn solve_challenge(&mut self, panel: &mut CryptoPanel) -> bool {
        match self.solve(panel) {
            Ok(response) => {
                panel.response = response;
                true
            }
            Err(e) => {
                warn!("cannot solve challenge: {e}");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
