//! Status shown alongside the controls.
//!
//! The surface is what a front end renders besides the sliders: whether the
//! session is offline, what the crypto module thinks of the configured key,
//! and whether the raw key/challenge inspection panel replaces the controls.

use std::fmt;

/// Outcome of the last key validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoStatus {
    /// No key has been validated yet.
    Starting,
    Ok,
    MissingKey,
}

impl fmt::Display for CryptoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CryptoStatus::Starting => "crypto: STARTING",
            CryptoStatus::Ok => "crypto: OK",
            CryptoStatus::MissingKey => "crypto: MISSING KEY",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Set while the transport is down; cleared on open and on config push.
    pub offline: bool,
    pub crypto_status: CryptoStatus,
    /// When set the inspection panel is shown and the controls are hidden.
    pub panel_visible: bool,
}

impl Surface {
    pub fn controls_visible(&self) -> bool {
        !self.panel_visible
    }

    pub fn toggle_panel(&mut self) {
        self.panel_visible = !self.panel_visible;
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            offline: false,
            crypto_status: CryptoStatus::Starting,
            panel_visible: false,
        }
    }
}
