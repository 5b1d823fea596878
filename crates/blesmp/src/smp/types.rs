//! Type definitions for the Security Manager Protocol
use super::constants::*;
use std::fmt;
use thiserror::Error;

/// Outcome of a failed pairing attempt
///
/// The taxonomy mirrors the SMP reason-code space, plus a handful of
/// local-only conditions (exit, timeout, user decline) that are never
/// reported over the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PairingFailure {
    #[error("passkey entry failed")]
    PasskeyEntryFailed,

    #[error("OOB data not available")]
    OobNotAvailable,

    #[error("authentication requirements cannot be met")]
    AuthenticationRequirements,

    #[error("confirm value failed")]
    ConfirmValueFailed,

    #[error("pairing not supported")]
    PairingNotSupported,

    #[error("encryption key size too small")]
    EncryptionKeySize,

    #[error("command not supported")]
    CommandNotSupported,

    #[error("unspecified reason")]
    UnspecifiedReason,

    #[error("too many pairing attempts")]
    RepeatedAttempts,

    #[error("invalid parameters")]
    InvalidParameters,

    #[error("DHKey check failed")]
    DhKeyCheckFailed,

    #[error("numeric comparison failed")]
    NumericComparisonFailed,

    #[error("BR/EDR pairing in progress")]
    BrEdrPairingInProgress,

    #[error("cross-transport key derivation not allowed")]
    CrossTransportKeyNotAllowed,

    /// Peer sent PAIRING_FAILED carrying this reason code. Never echoed
    /// back on the wire.
    #[error("peer failed pairing, reason code {0:#04x}")]
    PeerFailed(u8),

    /// The session was cancelled from outside or a wait hit the 30 s
    /// timeout. Never reported over the wire.
    #[error("pairing exited or timed out")]
    Exited,

    /// The user declined the pairing-accept prompt. The abort is silent.
    #[error("pairing rejected by user")]
    UserDeclined,

    /// An event arrived that the current wait cannot accept.
    #[error("unexpected event: {0}")]
    UnexpectedEvent(String),

    /// An inbound packet failed strict length/opcode validation.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

impl PairingFailure {
    /// Reason code to send in an outbound PAIRING_FAILED, if this failure
    /// should be reported to the peer at all.
    pub fn wire_reason(&self) -> Option<u8> {
        match self {
            PairingFailure::PasskeyEntryFailed => Some(SMP_REASON_PASSKEY_ENTRY_FAILED),
            PairingFailure::OobNotAvailable => Some(SMP_REASON_OOB_NOT_AVAILABLE),
            PairingFailure::AuthenticationRequirements => {
                Some(SMP_REASON_AUTHENTICATION_REQUIREMENTS)
            }
            PairingFailure::ConfirmValueFailed => Some(SMP_REASON_CONFIRM_VALUE_FAILED),
            PairingFailure::PairingNotSupported => Some(SMP_REASON_PAIRING_NOT_SUPPORTED),
            PairingFailure::EncryptionKeySize => Some(SMP_REASON_ENCRYPTION_KEY_SIZE),
            PairingFailure::CommandNotSupported => Some(SMP_REASON_COMMAND_NOT_SUPPORTED),
            PairingFailure::UnspecifiedReason => Some(SMP_REASON_UNSPECIFIED_REASON),
            PairingFailure::RepeatedAttempts => Some(SMP_REASON_REPEATED_ATTEMPTS),
            PairingFailure::InvalidParameters => Some(SMP_REASON_INVALID_PARAMETERS),
            PairingFailure::DhKeyCheckFailed => Some(SMP_REASON_DHKEY_CHECK_FAILED),
            PairingFailure::NumericComparisonFailed => Some(SMP_REASON_NUMERIC_COMPARISON_FAILED),
            PairingFailure::BrEdrPairingInProgress => Some(SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS),
            PairingFailure::CrossTransportKeyNotAllowed => {
                Some(SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED)
            }
            PairingFailure::UnexpectedEvent(_) | PairingFailure::MalformedPacket(_) => {
                Some(SMP_REASON_UNSPECIFIED_REASON)
            }
            PairingFailure::PeerFailed(_)
            | PairingFailure::Exited
            | PairingFailure::UserDeclined => None,
        }
    }
}

/// Result type for SMP operations
pub type SmpResult<T> = Result<T, PairingFailure>;

/// Local device role on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Link-layer Central; pairing initiator
    Central,
    /// Link-layer Peripheral; pairing responder
    Peripheral,
}

/// IO Capability types for pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCapability {
    /// Display only capability
    DisplayOnly,
    /// Display with yes/no capability
    DisplayYesNo,
    /// Keyboard only
    KeyboardOnly,
    /// No input, no output
    NoInputNoOutput,
    /// Both keyboard and display
    KeyboardDisplay,
}

impl IoCapability {
    pub fn to_u8(&self) -> u8 {
        match self {
            IoCapability::DisplayOnly => SMP_IO_CAPABILITY_DISPLAY_ONLY,
            IoCapability::DisplayYesNo => SMP_IO_CAPABILITY_DISPLAY_YES_NO,
            IoCapability::KeyboardOnly => SMP_IO_CAPABILITY_KEYBOARD_ONLY,
            IoCapability::NoInputNoOutput => SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT,
            IoCapability::KeyboardDisplay => SMP_IO_CAPABILITY_KEYBOARD_DISPLAY,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            SMP_IO_CAPABILITY_DISPLAY_ONLY => Some(IoCapability::DisplayOnly),
            SMP_IO_CAPABILITY_DISPLAY_YES_NO => Some(IoCapability::DisplayYesNo),
            SMP_IO_CAPABILITY_KEYBOARD_ONLY => Some(IoCapability::KeyboardOnly),
            SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT => Some(IoCapability::NoInputNoOutput),
            SMP_IO_CAPABILITY_KEYBOARD_DISPLAY => Some(IoCapability::KeyboardDisplay),
            _ => None,
        }
    }
}

impl fmt::Display for IoCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoCapability::DisplayOnly => write!(f, "Display Only"),
            IoCapability::DisplayYesNo => write!(f, "Display Yes/No"),
            IoCapability::KeyboardOnly => write!(f, "Keyboard Only"),
            IoCapability::NoInputNoOutput => write!(f, "No Input No Output"),
            IoCapability::KeyboardDisplay => write!(f, "Keyboard Display"),
        }
    }
}

/// Authentication requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthRequirements {
    /// Whether bonding is requested
    pub bonding: bool,
    /// Whether MITM protection is required
    pub mitm: bool,
    /// Whether Secure Connections is supported
    pub secure_connections: bool,
    /// Whether keypress notifications are supported
    pub keypress_notifications: bool,
    /// Whether the CT2 feature is supported
    pub ct2: bool,
}

impl AuthRequirements {
    pub fn new(bonding: bool, mitm: bool, secure_connections: bool) -> Self {
        Self {
            bonding,
            mitm,
            secure_connections,
            keypress_notifications: false,
            ct2: false,
        }
    }

    pub fn to_u8(&self) -> u8 {
        let mut value = 0;

        if self.bonding {
            value |= SMP_AUTH_REQ_BONDING;
        }

        if self.mitm {
            value |= SMP_AUTH_REQ_MITM;
        }

        if self.secure_connections {
            value |= SMP_AUTH_REQ_SC;
        }

        if self.keypress_notifications {
            value |= SMP_AUTH_REQ_KEYPRESS;
        }

        if self.ct2 {
            value |= SMP_AUTH_REQ_CT2;
        }

        value
    }

    pub fn from_u8(value: u8) -> Self {
        Self {
            bonding: (value & SMP_AUTH_REQ_BONDING) != 0,
            mitm: (value & SMP_AUTH_REQ_MITM) != 0,
            secure_connections: (value & SMP_AUTH_REQ_SC) != 0,
            keypress_notifications: (value & SMP_AUTH_REQ_KEYPRESS) != 0,
            ct2: (value & SMP_AUTH_REQ_CT2) != 0,
        }
    }
}

/// Key distribution preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyDistribution {
    /// Encryption key (LTK, EDIV, Rand)
    pub encryption_key: bool,
    /// Identity key (IRK, identity address)
    pub identity_key: bool,
    /// Signing key (CSRK)
    pub signing_key: bool,
    /// Link key derivation; carried on the wire, ignored by this core
    pub link_key: bool,
}

impl KeyDistribution {
    pub fn new(encryption_key: bool, identity_key: bool, signing_key: bool) -> Self {
        Self {
            encryption_key,
            identity_key,
            signing_key,
            link_key: false,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn to_u8(&self) -> u8 {
        let mut value = 0;

        if self.encryption_key {
            value |= SMP_KEY_DIST_ENC;
        }

        if self.identity_key {
            value |= SMP_KEY_DIST_ID;
        }

        if self.signing_key {
            value |= SMP_KEY_DIST_SIGN;
        }

        if self.link_key {
            value |= SMP_KEY_DIST_LINK;
        }

        value
    }

    pub fn from_u8(value: u8) -> Self {
        Self {
            encryption_key: (value & SMP_KEY_DIST_ENC) != 0,
            identity_key: (value & SMP_KEY_DIST_ID) != 0,
            signing_key: (value & SMP_KEY_DIST_SIGN) != 0,
            link_key: (value & SMP_KEY_DIST_LINK) != 0,
        }
    }

    /// Intersection of what was offered and what the other side requested
    pub fn intersect(&self, other: &KeyDistribution) -> KeyDistribution {
        KeyDistribution {
            encryption_key: self.encryption_key && other.encryption_key,
            identity_key: self.identity_key && other.identity_key,
            signing_key: self.signing_key && other.signing_key,
            link_key: self.link_key && other.link_key,
        }
    }
}

/// Which side of the link shows the passkey during Passkey Entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasskeyRole {
    /// The initiator displays, the responder types it in
    InitiatorDisplays,
    /// The responder displays, the initiator types it in
    ResponderDisplays,
    /// Neither side can display; the user types the same passkey on both
    BothInput,
}

/// The association model selected by the feature exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationModel {
    /// No user interaction; unauthenticated
    JustWorks,
    /// Both sides display a 6-digit value the user compares (SC only)
    NumericComparison,
    /// A 6-digit passkey shown on one side and typed on the other
    PasskeyEntry(PasskeyRole),
    /// Authentication material exchanged out of band
    OutOfBand,
}

impl fmt::Display for AssociationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationModel::JustWorks => write!(f, "Just Works"),
            AssociationModel::NumericComparison => write!(f, "Numeric Comparison"),
            AssociationModel::PasskeyEntry(_) => write!(f, "Passkey Entry"),
            AssociationModel::OutOfBand => write!(f, "Out of Band"),
        }
    }
}

/// User responses routed into the session through
/// [`super::PairingSession::on_ui`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    /// Answer to the pairing-accept prompt; non-zero value accepts
    PairingAccepted,
    /// Answer to the numeric-comparison prompt; zero means "no",
    /// otherwise the echoed 6-digit value
    ConfirmYesNo,
    /// The passkey the user typed (0..=999999)
    Passkey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_req_bitfield_roundtrip() {
        let auth = AuthRequirements {
            bonding: true,
            mitm: true,
            secure_connections: true,
            keypress_notifications: false,
            ct2: true,
        };
        let raw = auth.to_u8();
        assert_eq!(raw, 0x2D);
        assert_eq!(AuthRequirements::from_u8(raw), auth);
    }

    #[test]
    fn test_key_dist_intersect() {
        let offered = KeyDistribution::from_u8(SMP_KEY_DIST_ENC | SMP_KEY_DIST_ID);
        let requested = KeyDistribution::from_u8(SMP_KEY_DIST_ID | SMP_KEY_DIST_SIGN);
        let negotiated = offered.intersect(&requested);
        assert!(!negotiated.encryption_key);
        assert!(negotiated.identity_key);
        assert!(!negotiated.signing_key);
        assert_eq!(negotiated.to_u8(), SMP_KEY_DIST_ID);
    }

    #[test]
    fn test_wire_reason_mapping() {
        assert_eq!(
            PairingFailure::ConfirmValueFailed.wire_reason(),
            Some(SMP_REASON_CONFIRM_VALUE_FAILED)
        );
        assert_eq!(
            PairingFailure::UnexpectedEvent("x".into()).wire_reason(),
            Some(SMP_REASON_UNSPECIFIED_REASON)
        );
        assert_eq!(PairingFailure::PeerFailed(0x04).wire_reason(), None);
        assert_eq!(PairingFailure::Exited.wire_reason(), None);
        assert_eq!(PairingFailure::UserDeclined.wire_reason(), None);
    }

    #[test]
    fn test_io_capability_roundtrip() {
        for value in 0x00..=0x04 {
            let cap = IoCapability::from_u8(value).unwrap();
            assert_eq!(cap.to_u8(), value);
        }
        assert!(IoCapability::from_u8(0x05).is_none());
    }
}
