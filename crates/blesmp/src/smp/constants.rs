//! Constants for the Security Manager Protocol
use std::time::Duration;

// SMP command codes (L2CAP CID 0x0006)
pub const SMP_PAIRING_REQUEST: u8 = 0x01;
pub const SMP_PAIRING_RESPONSE: u8 = 0x02;
pub const SMP_PAIRING_CONFIRM: u8 = 0x03;
pub const SMP_PAIRING_RANDOM: u8 = 0x04;
pub const SMP_PAIRING_FAILED: u8 = 0x05;
pub const SMP_ENCRYPTION_INFORMATION: u8 = 0x06;
pub const SMP_CENTRAL_IDENTIFICATION: u8 = 0x07;
pub const SMP_IDENTITY_INFORMATION: u8 = 0x08;
pub const SMP_IDENTITY_ADDRESS_INFORMATION: u8 = 0x09;
pub const SMP_SIGNING_INFORMATION: u8 = 0x0A;
pub const SMP_SECURITY_REQUEST: u8 = 0x0B;
pub const SMP_PAIRING_PUBLIC_KEY: u8 = 0x0C;
pub const SMP_PAIRING_DH_KEY_CHECK: u8 = 0x0D;
pub const SMP_KEYPRESS_NOTIFICATION: u8 = 0x0E;

/// SMP fixed channel ID
pub const SMP_CID: u16 = 0x0006;

// IO Capability values
pub const SMP_IO_CAPABILITY_DISPLAY_ONLY: u8 = 0x00;
pub const SMP_IO_CAPABILITY_DISPLAY_YES_NO: u8 = 0x01;
pub const SMP_IO_CAPABILITY_KEYBOARD_ONLY: u8 = 0x02;
pub const SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT: u8 = 0x03;
pub const SMP_IO_CAPABILITY_KEYBOARD_DISPLAY: u8 = 0x04;

// Authentication Requirements bit masks
pub const SMP_AUTH_REQ_BONDING: u8 = 0x01;
pub const SMP_AUTH_REQ_MITM: u8 = 0x04;
pub const SMP_AUTH_REQ_SC: u8 = 0x08;
pub const SMP_AUTH_REQ_KEYPRESS: u8 = 0x10;
pub const SMP_AUTH_REQ_CT2: u8 = 0x20;

// Pairing Failed reason codes
pub const SMP_REASON_PASSKEY_ENTRY_FAILED: u8 = 0x01;
pub const SMP_REASON_OOB_NOT_AVAILABLE: u8 = 0x02;
pub const SMP_REASON_AUTHENTICATION_REQUIREMENTS: u8 = 0x03;
pub const SMP_REASON_CONFIRM_VALUE_FAILED: u8 = 0x04;
pub const SMP_REASON_PAIRING_NOT_SUPPORTED: u8 = 0x05;
pub const SMP_REASON_ENCRYPTION_KEY_SIZE: u8 = 0x06;
pub const SMP_REASON_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SMP_REASON_UNSPECIFIED_REASON: u8 = 0x08;
pub const SMP_REASON_REPEATED_ATTEMPTS: u8 = 0x09;
pub const SMP_REASON_INVALID_PARAMETERS: u8 = 0x0A;
pub const SMP_REASON_DHKEY_CHECK_FAILED: u8 = 0x0B;
pub const SMP_REASON_NUMERIC_COMPARISON_FAILED: u8 = 0x0C;
pub const SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS: u8 = 0x0D;
pub const SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED: u8 = 0x0E;

// Key distribution bit masks
pub const SMP_KEY_DIST_ENC: u8 = 0x01;
pub const SMP_KEY_DIST_ID: u8 = 0x02;
pub const SMP_KEY_DIST_SIGN: u8 = 0x04;
pub const SMP_KEY_DIST_LINK: u8 = 0x08;

// Encryption key size limits
pub const SMP_MIN_ENCRYPTION_KEY_SIZE: u8 = 7;
pub const SMP_MAX_ENCRYPTION_KEY_SIZE: u8 = 16;

// Keypress notification types
pub const SMP_KEYPRESS_ENTRY_STARTED: u8 = 0x00;
pub const SMP_KEYPRESS_DIGIT_ENTERED: u8 = 0x01;
pub const SMP_KEYPRESS_DIGIT_ERASED: u8 = 0x02;
pub const SMP_KEYPRESS_CLEARED: u8 = 0x03;
pub const SMP_KEYPRESS_ENTRY_COMPLETED: u8 = 0x04;

/// Per-wait timeout; a wait that exceeds it aborts the pairing
pub const SMP_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of confirm/random rounds in Secure Connections Passkey Entry
pub const SMP_PASSKEY_ROUNDS: usize = 20;

/// Human-readable name of an SMP command code, for failure messages
pub fn code_text(code: u8) -> &'static str {
    match code {
        SMP_PAIRING_REQUEST => "Pairing Request",
        SMP_PAIRING_RESPONSE => "Pairing Response",
        SMP_PAIRING_CONFIRM => "Pairing Confirm",
        SMP_PAIRING_RANDOM => "Pairing Random",
        SMP_PAIRING_FAILED => "Pairing Failed",
        SMP_ENCRYPTION_INFORMATION => "Encryption Information",
        SMP_CENTRAL_IDENTIFICATION => "Central Identification",
        SMP_IDENTITY_INFORMATION => "Identity Information",
        SMP_IDENTITY_ADDRESS_INFORMATION => "Identity Address Information",
        SMP_SIGNING_INFORMATION => "Signing Information",
        SMP_SECURITY_REQUEST => "Security Request",
        SMP_PAIRING_PUBLIC_KEY => "Pairing Public Key",
        SMP_PAIRING_DH_KEY_CHECK => "Pairing DHKey Check",
        SMP_KEYPRESS_NOTIFICATION => "Keypress Notification",
        _ => "Unknown",
    }
}
