//! Phase 3: key distribution over the encrypted link
//!
//! The Peripheral distributes first, then the Central; within one side
//! the order is fixed: Encryption Information + Central Identification,
//! Identity Information + Identity Address Information, Signing
//! Information. With Secure Connections the encryption key is never
//! transmitted, both sides already derived it.

use super::codec::{
    CentralIdentification, EncryptionInformation, IdentityAddressInformation,
    IdentityInformation, SigningInformation,
};
use super::constants::*;
use super::crypto;
use super::keys::{DistributedKeys, IdentityKey, LongTermKey};
use super::phase1::NegotiatedFeatures;
use super::session::Pairing;
use super::types::*;
use crate::gap::{AddressType, AddressWithType};
use log::debug;

impl Pairing {
    /// Run Phase 3 and return the keys the peer distributed
    pub(crate) fn distribute_keys(
        &mut self,
        features: &NegotiatedFeatures,
        ltk: [u8; 16],
    ) -> SmpResult<DistributedKeys> {
        let (mut keys_i_send, mut keys_i_receive) = if self.is_initiator() {
            (features.initiator_key_dist, features.responder_key_dist)
        } else {
            (features.responder_key_dist, features.initiator_key_dist)
        };

        if features.secure_connections {
            // The LTK came out of f5 on both sides already
            keys_i_send.encryption_key = false;
            keys_i_receive.encryption_key = false;
        }

        // The Peripheral distributes its keys first
        let mut received = if self.is_initiator() {
            let received = self.receive_keys(&keys_i_receive)?;
            self.send_keys(&keys_i_send);
            received
        } else {
            self.send_keys(&keys_i_send);
            self.receive_keys(&keys_i_receive)?
        };

        if features.secure_connections {
            received.remote_ltk = Some(LongTermKey::secure_connections(ltk));
        }

        Ok(received)
    }

    fn send_keys(&mut self, keys: &KeyDistribution) {
        if keys.encryption_key {
            // A fresh key for the peer to store against future
            // reconnections
            let ltk = crypto::generate_random_128();
            let rand = crypto::generate_random_64();
            let ediv_bytes = crypto::generate_random_64();
            let ediv = u16::from_le_bytes([ediv_bytes[0], ediv_bytes[1]]);

            debug!("distributing encryption key, ediv {:#06x}", ediv);
            self.send_pdu(&EncryptionInformation::new(ltk).serialize());
            self.send_pdu(&CentralIdentification::new(ediv, rand).serialize());
        }

        if keys.identity_key {
            debug!("distributing identity key");
            self.send_pdu(&IdentityInformation::new(self.info.local_irk).serialize());
            self.send_pdu(
                &IdentityAddressInformation::new(
                    self.info.local_identity_address.address_type.wire_value(),
                    self.info.local_identity_address.address,
                )
                .serialize(),
            );
        }

        if keys.signing_key {
            debug!("distributing signing key");
            self.send_pdu(&SigningInformation::new(self.info.local_csrk).serialize());
        }
    }

    fn receive_keys(&mut self, keys: &KeyDistribution) -> SmpResult<DistributedKeys> {
        let mut received = DistributedKeys::default();

        if keys.encryption_key {
            let enc =
                EncryptionInformation::parse(&self.wait_packet(SMP_ENCRYPTION_INFORMATION)?)?;
            let id =
                CentralIdentification::parse(&self.wait_packet(SMP_CENTRAL_IDENTIFICATION)?)?;

            received.remote_ltk = Some(LongTermKey::new(enc.ltk, id.ediv, id.rand));
        }

        if keys.identity_key {
            let identity =
                IdentityInformation::parse(&self.wait_packet(SMP_IDENTITY_INFORMATION)?)?;
            let address = IdentityAddressInformation::parse(
                &self.wait_packet(SMP_IDENTITY_ADDRESS_INFORMATION)?,
            )?;

            let address_type = AddressType::from_wire_value(address.addr_type)
                .ok_or(PairingFailure::InvalidParameters)?;

            received.remote_identity = Some(IdentityKey {
                irk: identity.irk,
                identity_address: AddressWithType::new(address.bd_addr, address_type),
            });
        }

        if keys.signing_key {
            let signing = SigningInformation::parse(&self.wait_packet(SMP_SIGNING_INFORMATION)?)?;
            received.remote_csrk = Some(signing.csrk);
        }

        Ok(received)
    }
}
