//! HCI event parsing
//!
//! Only the slice of HCI the pairing session consumes lives here: the
//! Encryption Change / Encryption Key Refresh Complete events and the
//! LE Long Term Key Request meta event. Commands travel the other way
//! through the [`crate::smp::LeSecurityInterface`] trait and are built by
//! the surrounding stack.

pub mod constants;
mod event;

pub use self::event::{
    EncryptionChange, EncryptionKeyRefreshComplete, HciEvent, LeLongTermKeyRequest, SecurityEvent,
};
