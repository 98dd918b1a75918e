//! Contract with the local cryptographic module.
//!
//! The command protocol treats the crypto module as a black box with two
//! boolean operations.  Inputs and outputs travel through a [`CryptoPanel`]:
//! the protocol writes the controller's public key and the challenge into it,
//! the solver writes its response back.  The same panel is what the
//! inspection view displays.

/// The designated input/output fields shared with the crypto module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CryptoPanel {
    /// Controller public key from the last config push.
    pub public_key: Option<String>,
    /// Key material last handed to [`ChallengeSolver::validate_key`].
    pub key_material: String,
    /// Challenge currently being solved.
    pub challenge: String,
    /// Response produced by the last successful solve.
    pub response: String,
}

/// Local cryptographic module.
///
/// Implementations live in the infrastructure layer of the client crate.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait ChallengeSolver: Send {
    /// Checks and loads the user's key material.
    ///
    /// Returns `false` when the material is absent or malformed; the solver
    /// must then fail every subsequent solve until a valid key is loaded.
    fn validate_key(&mut self, key_material: &str) -> bool;

    /// Solves `panel.challenge`, writing the answer into `panel.response`.
    ///
    /// Returns `false` on any failure; `panel.response` is meaningless then.
    fn solve_challenge(&mut self, panel: &mut CryptoPanel) -> bool;
}
