//! Security Manager Protocol (SMP) pairing
//!
//! One [`PairingSession`] drives one bonding attempt over a freshly
//! established LE link:
//! - Phase 1: pairing feature exchange and association-model selection
//! - Phase 2: authentication, Legacy or LE Secure Connections
//! - link encryption with the agreed key
//! - Phase 3: distribution of bonding keys
//!
//! The worker blocks on a single serialized event stream; peer PDUs, HCI
//! events and UI answers are pushed in from the outside and every wait is
//! bounded by a 30 second timeout.

pub mod codec;
pub mod constants;
pub mod crypto;
mod encryption;
mod keydist;
mod keys;
mod legacy;
mod phase1;
mod queue;
mod sc;
mod session;
mod types;


// Re-export the public API
pub use self::crypto::MyOobData;
pub use self::keys::{DistributedKeys, IdentityKey, LongTermKey, PairingOutcome};
pub use self::session::{
    InitialInformations, LeSecurityInterface, PairingResult, PairingSession, PairingUi,
    RemoteOobData, SmpPduChannel,
};
pub use self::types::{
    AssociationModel, AuthRequirements, IoCapability, KeyDistribution, PairingFailure,
    PasskeyRole, Role, SmpResult, UiAction,
};
