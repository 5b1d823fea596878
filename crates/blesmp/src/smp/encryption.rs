//! Link-encryption handoff between Phase 2 and Phase 3
//!
//! The Central submits LE Start Encryption with the freshly derived key;
//! the Peripheral answers the controller's LE Long Term Key Request.
//! Both then wait for Encryption Change (or Key Refresh Complete) before
//! any bonding key may travel.

use super::queue::PairingEvent;
use super::session::Pairing;
use super::types::*;
use crate::hci::{LeLongTermKeyRequest, SecurityEvent};

impl Pairing {
    pub(crate) fn enable_encryption(&mut self, key: &[u8; 16]) -> SmpResult<()> {
        if self.is_initiator() {
            // Rand and EDIV are zero: the key was just agreed on, not
            // looked up from a bond
            self.info
                .le_security
                .le_start_encryption(self.info.connection_handle, [0u8; 8], 0, *key);
        } else {
            self.wait_ltk_request()?;
            self.info
                .le_security
                .le_ltk_reply(self.info.connection_handle, *key);
        }

        self.wait_encryption_changed()
    }

    /// Wait for Encryption Change or Encryption Key Refresh Complete
    fn wait_encryption_changed(&mut self) -> SmpResult<()> {
        let event = match self.wait_event() {
            PairingEvent::Exit => return Err(PairingFailure::Exited),
            PairingEvent::Hci(bytes) => bytes,
            _ => {
                return Err(PairingFailure::UnexpectedEvent(
                    "was expecting an HCI encryption event".into(),
                ))
            }
        };

        match SecurityEvent::parse(&event) {
            Some(SecurityEvent::EncryptionChange(change)) if change.is_success() => Ok(()),
            Some(SecurityEvent::EncryptionChange(change)) => Err(
                PairingFailure::UnexpectedEvent(format!(
                    "link encryption failed with status {:#04x}",
                    change.status
                )),
            ),
            Some(SecurityEvent::KeyRefreshComplete(refresh)) if refresh.is_success() => Ok(()),
            Some(SecurityEvent::KeyRefreshComplete(refresh)) => Err(
                PairingFailure::UnexpectedEvent(format!(
                    "key refresh failed with status {:#04x}",
                    refresh.status
                )),
            ),
            _ => Err(PairingFailure::UnexpectedEvent(
                "was expecting Encryption Change or Key Refresh Complete".into(),
            )),
        }
    }

    /// Wait for the controller's LE Long Term Key Request (Peripheral
    /// side)
    fn wait_ltk_request(&mut self) -> SmpResult<LeLongTermKeyRequest> {
        let event = match self.wait_event() {
            PairingEvent::Exit => return Err(PairingFailure::Exited),
            PairingEvent::Hci(bytes) => bytes,
            _ => {
                return Err(PairingFailure::UnexpectedEvent(
                    "was expecting LE Long Term Key Request".into(),
                ))
            }
        };

        match SecurityEvent::parse(&event) {
            Some(SecurityEvent::LongTermKeyRequest(request)) => Ok(request),
            _ => Err(PairingFailure::UnexpectedEvent(
                "was expecting LE Long Term Key Request".into(),
            )),
        }
    }
}
