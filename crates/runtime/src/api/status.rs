//! Game server status codes.
//!
//! Every game action answers with an HTTP status. The agent only interprets a
//! handful of them; everything else is forwarded to the decision engine as an
//! opaque per-character failure.
use std::fmt;

/// Status code returned by the game server for an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const NOT_FOUND: Self = Self(404);
    /// A bank transaction for this account is already running.
    pub const BANK_TRANSACTION_IN_PROGRESS: Self = Self(461);
    /// The character is locked by another action.
    pub const CHARACTER_LOCKED: Self = Self(486);
    pub const INVENTORY_FULL: Self = Self(497);
    pub const CHARACTER_NOT_FOUND: Self = Self(498);
    pub const IN_COOLDOWN: Self = Self(499);

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == Self::OK.0
    }

    pub const fn is_inventory_full(self) -> bool {
        self.0 == Self::INVENTORY_FULL.0
    }

    /// The character does not exist yet and can be created.
    pub const fn is_missing_character(self) -> bool {
        self.0 == Self::CHARACTER_NOT_FOUND.0 || self.0 == Self::NOT_FOUND.0
    }

    /// Transient server conditions worth replaying after a short pause.
    pub const fn is_retryable(self) -> bool {
        matches!(self.0, 461 | 486 | 499) || self.0 >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}
