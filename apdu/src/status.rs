// Copyright (c) 2024-2025 The dmk developers

//! APDU status words

use core::fmt;

/// Status word trailing every response APDU
///
/// Known values get constants below, everything else is carried verbatim so
/// callers can still log and match on vendor specific codes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Command succeeded
    pub const OK: StatusWord = StatusWord(0x9000);

    /// Device is locked, command not attempted
    pub const LOCKED: StatusWord = StatusWord(0x5515);

    /// User refused the action on the device
    pub const ACTION_REFUSED: StatusWord = StatusWord(0x5501);

    /// PIN has not been validated
    pub const PIN_NOT_VALIDATED: StatusWord = StatusWord(0x5502);

    /// Security status not satisfied
    pub const SECURITY_NOT_SATISFIED: StatusWord = StatusWord(0x6982);

    /// Conditions of use not satisfied (typically a consent denial)
    pub const CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord(0x6985);

    /// Incorrect data, also returned for an unknown application name
    pub const INCORRECT_DATA: StatusWord = StatusWord(0x6a81);

    /// Instruction not supported by the running application
    pub const INS_NOT_SUPPORTED: StatusWord = StatusWord(0x6d00);

    /// Class not supported, the expected application is not open
    pub const CLA_NOT_SUPPORTED: StatusWord = StatusWord(0x6e00);

    /// Strict success check, `0x9000` only
    pub fn is_success(&self) -> bool {
        *self == Self::OK
    }

    /// Whether this status reports a locked device
    pub fn is_locked(&self) -> bool {
        *self == Self::LOCKED
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for StatusWord {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusWord(0x{:04x})", self.0)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn success_is_strict() {
        assert!(StatusWord::OK.is_success());
        assert!(!StatusWord(0x9001).is_success());
        assert!(!StatusWord::LOCKED.is_success());
    }

    #[test]
    fn unknown_codes_survive() {
        let sw = StatusWord(0x6f42);
        assert_eq!(sw.to_bytes(), [0x6f, 0x42]);
        assert_eq!(sw.to_string(), "0x6f42");
    }
}
