//! blesmp - Bluetooth LE Security Manager Protocol pairing
//!
//! This library implements the SMP pairing state machine for a single
//! Bluetooth Low Energy link: feature exchange, authentication (Legacy and
//! LE Secure Connections with Just Works / Numeric Comparison / Passkey
//! Entry / Out of Band), link encryption and bonding-key distribution.
//! On success a pairing session yields a Long Term Key plus whatever
//! identity and signing material the peer distributed.
//!
//! The surrounding stack (L2CAP transport, HCI command submission, the
//! pairing UI) is injected through small traits; the library itself owns
//! no sockets and no controller.

pub mod gap;
pub mod hci;
pub mod smp;

// Re-export common types for convenience
pub use gap::{AddressType, AddressWithType, BdAddr};
pub use smp::{
    AssociationModel, AuthRequirements, DistributedKeys, InitialInformations, IoCapability,
    KeyDistribution, LeSecurityInterface, MyOobData, PairingFailure, PairingOutcome,
    PairingResult, PairingSession, PairingUi, PasskeyRole, RemoteOobData, Role, SmpPduChannel,
    SmpResult, UiAction,
};
