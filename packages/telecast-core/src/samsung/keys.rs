//! Remote key names understood by the TV.
//!
//! The spelling of each key is a wire contract with the device and is sent
//! verbatim over both protocols.

use std::fmt;

/// Keys the reconciliation loop knows how to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteKey {
    /// Power toggle.
    Power,
    /// One volume step up.
    VolumeUp,
    /// One volume step down.
    VolumeDown,
    /// Mute toggle.
    Mute,
    /// Transport pause.
    Pause,
    /// Transport play.
    Play,
    /// Confirm / OK.
    Ok,
}

impl RemoteKey {
    /// Returns the exact key name sent to the TV.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Power => "KEY_POWER",
            Self::VolumeUp => "KEY_VOLUP",
            Self::VolumeDown => "KEY_VOLDOWN",
            Self::Mute => "KEY_MUTE",
            Self::Pause => "KEY_PAUSE",
            Self::Play => "KEY_PLAY",
            Self::Ok => "KEY_OK",
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for RemoteKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
