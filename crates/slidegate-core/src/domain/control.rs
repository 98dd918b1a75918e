//! The actuatable target shown to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a control, chosen by the controller (e.g. `"front"`).
///
/// Identity of a [`Control`] is its id alone; two controls with the same id
/// and different labels are the same control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as it travels on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControlId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ControlId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An actuatable target (for example a door) with its display label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    pub id: ControlId,
    pub label: String,
}

impl Control {
    pub fn new(id: impl Into<ControlId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl PartialEq for Control {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Control {}

// ── Tests ─────────────────────────────────────────────────────────────────────
