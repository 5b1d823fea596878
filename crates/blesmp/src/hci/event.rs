//! Typed views over raw HCI event packets
use super::constants::*;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// A raw HCI event packet: event code, parameter length, parameters
#[derive(Debug, Clone)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes (`[code, len, params...]`)
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1] as usize;

        if data.len() < parameter_total_length + 2 {
            return None;
        }

        Some(HciEvent {
            event_code,
            parameters: data[2..parameter_total_length + 2].to_vec(),
        })
    }
}

/// Encryption Change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionChange {
    pub status: u8,
    pub connection_handle: u16,
    pub encryption_enabled: u8,
}

impl EncryptionChange {
    pub fn parse_from_event(event: &HciEvent) -> Option<Self> {
        if event.event_code != EVT_ENCRYPTION_CHANGE {
            return None;
        }

        let mut cursor = Cursor::new(event.parameters.as_slice());
        let status = cursor.read_u8().ok()?;
        let connection_handle = cursor.read_u16::<LittleEndian>().ok()?;
        let encryption_enabled = cursor.read_u8().ok()?;

        Some(Self {
            status,
            connection_handle,
            encryption_enabled,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS && self.encryption_enabled != 0
    }
}

/// Encryption Key Refresh Complete event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionKeyRefreshComplete {
    pub status: u8,
    pub connection_handle: u16,
}

impl EncryptionKeyRefreshComplete {
    pub fn parse_from_event(event: &HciEvent) -> Option<Self> {
        if event.event_code != EVT_ENCRYPTION_KEY_REFRESH_COMPLETE {
            return None;
        }

        let mut cursor = Cursor::new(event.parameters.as_slice());
        let status = cursor.read_u8().ok()?;
        let connection_handle = cursor.read_u16::<LittleEndian>().ok()?;

        Some(Self {
            status,
            connection_handle,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// LE Long Term Key Request meta event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeLongTermKeyRequest {
    pub connection_handle: u16,
    pub random_number: [u8; 8],
    pub ediv: u16,
}

impl LeLongTermKeyRequest {
    pub fn parse_from_meta_event(event: &HciEvent) -> Option<Self> {
        if event.event_code != EVT_LE_META_EVENT || event.parameters.is_empty() {
            return None;
        }

        if event.parameters[0] != EVT_LE_LONG_TERM_KEY_REQUEST {
            return None;
        }

        let mut cursor = Cursor::new(&event.parameters[1..]);
        let connection_handle = cursor.read_u16::<LittleEndian>().ok()?;
        let mut random_number = [0u8; 8];
        cursor.read_exact(&mut random_number).ok()?;
        let ediv = cursor.read_u16::<LittleEndian>().ok()?;

        Some(Self {
            connection_handle,
            random_number,
            ediv,
        })
    }
}

/// The HCI events the pairing session reacts to
#[derive(Debug, Clone)]
pub enum SecurityEvent {
    EncryptionChange(EncryptionChange),
    KeyRefreshComplete(EncryptionKeyRefreshComplete),
    LongTermKeyRequest(LeLongTermKeyRequest),
}

impl SecurityEvent {
    /// Classify a raw HCI event packet; `None` for events the pairing
    /// session does not care about.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let event = HciEvent::parse(data)?;

        match event.event_code {
            EVT_ENCRYPTION_CHANGE => {
                EncryptionChange::parse_from_event(&event).map(SecurityEvent::EncryptionChange)
            }
            EVT_ENCRYPTION_KEY_REFRESH_COMPLETE => {
                EncryptionKeyRefreshComplete::parse_from_event(&event)
                    .map(SecurityEvent::KeyRefreshComplete)
            }
            EVT_LE_META_EVENT => LeLongTermKeyRequest::parse_from_meta_event(&event)
                .map(SecurityEvent::LongTermKeyRequest),
            _ => None,
        }
    }
}
