//! HCI protocol constants consumed by the pairing session

// HCI event codes
pub const EVT_ENCRYPTION_CHANGE: u8 = 0x08;
pub const EVT_ENCRYPTION_KEY_REFRESH_COMPLETE: u8 = 0x30;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE meta subevent codes
pub const EVT_LE_LONG_TERM_KEY_REQUEST: u8 = 0x05;

// HCI status
pub const STATUS_SUCCESS: u8 = 0x00;
