//! Phase 2, LE Secure Connections
//!
//! Public-key exchange, the authentication stage for the selected
//! association model, and the DHKey check that derives the LTK.

use super::codec::{
    KeypressNotification, PairingConfirm, PairingDhKeyCheck, PairingPublicKey, PairingRandom,
};
use super::constants::*;
use super::crypto;
use super::crypto::EcdhKeypair;
use super::keys::truncate_key;
use super::phase1::NegotiatedFeatures;
use super::session::Pairing;
use super::types::*;

/// The values Stage 1 feeds into the DHKey check: both nonces and both
/// commitment inputs
pub(crate) struct Stage1Output {
    pub na: [u8; 16],
    pub nb: [u8; 16],
    pub ra: [u8; 16],
    pub rb: [u8; 16],
}

impl Pairing {
    /// Run the whole Secure Connections authentication phase and return
    /// the truncated LTK
    pub(crate) fn secure_connections_phase2(
        &mut self,
        features: &NegotiatedFeatures,
    ) -> SmpResult<[u8; 16]> {
        // OOB data binds the public key that was handed out with it, so
        // a session that distributed OOB data must reuse that keypair
        let keypair = match &self.info.local_oob_data {
            Some(oob) => EcdhKeypair::from_private_bytes(&oob.private_key).ok_or(
                PairingFailure::UnexpectedEvent("local OOB private key is invalid".into()),
            )?,
            None => EcdhKeypair::generate(),
        };

        let local_pk = PairingPublicKey::from_bytes(keypair.public_key());

        // The initiator reveals its public key first
        let peer_pk = if self.is_initiator() {
            self.send_pdu(&local_pk.serialize());
            PairingPublicKey::parse(&self.wait_packet(SMP_PAIRING_PUBLIC_KEY)?)?
        } else {
            let peer = PairingPublicKey::parse(&self.wait_packet(SMP_PAIRING_PUBLIC_KEY)?)?;
            self.send_pdu(&local_pk.serialize());
            peer
        };

        let dhkey = keypair.dh_key(&peer_pk.to_bytes())?;

        let (pka, pkb) = if self.is_initiator() {
            (local_pk, peer_pk)
        } else {
            (peer_pk, local_pk)
        };

        let stage1 = match features.association_model {
            AssociationModel::JustWorks | AssociationModel::NumericComparison => {
                self.sc_stage1_numeric(features, &pka, &pkb)?
            }
            AssociationModel::PasskeyEntry(role) => {
                self.sc_stage1_passkey(features, &pka, &pkb, role)?
            }
            AssociationModel::OutOfBand => self.sc_stage1_oob(features, &pka, &pkb)?,
        };

        self.sc_stage2(features, &stage1, &dhkey)
    }

    /// Just Works and Numeric Comparison share the single
    /// confirm/random exchange; Numeric Comparison adds the user check
    /// on top.
    fn sc_stage1_numeric(
        &mut self,
        features: &NegotiatedFeatures,
        pka: &PairingPublicKey,
        pkb: &PairingPublicKey,
    ) -> SmpResult<Stage1Output> {
        let (na, nb) = if self.is_initiator() {
            let cb = self.wait_pairing_confirm()?;

            let na = crypto::generate_random_128();
            self.send_pdu(&PairingRandom::new(na).serialize());

            let nb = self.wait_pairing_random()?.random_value;

            let expected = crypto::f4(&pkb.x, &pka.x, &nb, 0);
            if !crypto::constant_time_eq(&cb.confirm_value, &expected) {
                return Err(PairingFailure::ConfirmValueFailed);
            }

            (na, nb)
        } else {
            let nb = crypto::generate_random_128();
            let cb = crypto::f4(&pkb.x, &pka.x, &nb, 0);
            self.send_pdu(&PairingConfirm::new(cb).serialize());

            let na = self.wait_pairing_random()?.random_value;
            self.send_pdu(&PairingRandom::new(nb).serialize());

            (na, nb)
        };

        if features.association_model == AssociationModel::NumericComparison {
            let value = crypto::g2(&pka.x, &pkb.x, &na, &nb);
            self.info.ui.prompt_numeric_comparison(value);

            let answer = self.wait_ui_numeric_confirm()?;
            if answer == 0 || answer != value {
                return Err(PairingFailure::NumericComparisonFailed);
            }
        }

        Ok(Stage1Output {
            na,
            nb,
            ra: [0; 16],
            rb: [0; 16],
        })
    }

    /// Twenty rounds of bit commitment over the shared passkey
    fn sc_stage1_passkey(
        &mut self,
        features: &NegotiatedFeatures,
        pka: &PairingPublicKey,
        pkb: &PairingPublicKey,
        role: PasskeyRole,
    ) -> SmpResult<Stage1Output> {
        let we_display = matches!(
            (role, self.is_initiator()),
            (PasskeyRole::InitiatorDisplays, true) | (PasskeyRole::ResponderDisplays, false)
        );

        let passkey = if we_display {
            let passkey = crypto::generate_passkey();
            self.info.ui.display_passkey(passkey);
            passkey
        } else {
            self.keypress_notification(features, SMP_KEYPRESS_ENTRY_STARTED);
            self.info.ui.prompt_passkey_entry();
            let passkey = self.wait_ui_passkey()?;
            self.keypress_notification(features, SMP_KEYPRESS_ENTRY_COMPLETED);
            passkey
        };

        let mut r = [0u8; 16];
        r[0..4].copy_from_slice(&passkey.to_le_bytes());

        let mut na = [0u8; 16];
        let mut nb = [0u8; 16];

        for round in 0..SMP_PASSKEY_ROUNDS {
            let ri = 0x80 | ((passkey >> round) & 1) as u8;

            if self.is_initiator() {
                na = crypto::generate_random_128();
                let cai = crypto::f4(&pka.x, &pkb.x, &na, ri);
                self.send_pdu(&PairingConfirm::new(cai).serialize());

                let cbi = self.wait_pairing_confirm()?;

                self.send_pdu(&PairingRandom::new(na).serialize());
                let nbi = self.wait_pairing_random()?.random_value;

                let expected = crypto::f4(&pkb.x, &pka.x, &nbi, ri);
                if !crypto::constant_time_eq(&cbi.confirm_value, &expected) {
                    return Err(PairingFailure::ConfirmValueFailed);
                }

                nb = nbi;
            } else {
                let cai = self.wait_pairing_confirm()?;

                nb = crypto::generate_random_128();
                let cbi = crypto::f4(&pkb.x, &pka.x, &nb, ri);
                self.send_pdu(&PairingConfirm::new(cbi).serialize());

                let nai = self.wait_pairing_random()?.random_value;

                let expected = crypto::f4(&pka.x, &pkb.x, &nai, ri);
                if !crypto::constant_time_eq(&cai.confirm_value, &expected) {
                    return Err(PairingFailure::ConfirmValueFailed);
                }

                self.send_pdu(&PairingRandom::new(nb).serialize());

                na = nai;
            }
        }

        Ok(Stage1Output { na, nb, ra: r, rb: r })
    }

    /// Out of Band: the confirm exchange already happened over the OOB
    /// channel; on air only the nonces travel
    fn sc_stage1_oob(
        &mut self,
        features: &NegotiatedFeatures,
        pka: &PairingPublicKey,
        pkb: &PairingPublicKey,
    ) -> SmpResult<Stage1Output> {
        // Each side's OOB flag says it holds the *peer's* data
        let (our_flag, peer_flag) = if self.is_initiator() {
            (
                features.request.oob_data_present != 0,
                features.response.oob_data_present != 0,
            )
        } else {
            (
                features.response.oob_data_present != 0,
                features.request.oob_data_present != 0,
            )
        };

        let peer_r = if our_flag {
            let oob = self
                .info
                .remote_oob_data
                .ok_or(PairingFailure::OobNotAvailable)?;

            let peer_pk_x = if self.is_initiator() { &pkb.x } else { &pka.x };
            let expected = crypto::f4(peer_pk_x, peer_pk_x, &oob.le_sc_random, 0);
            if !crypto::constant_time_eq(&oob.le_sc_confirm, &expected) {
                return Err(PairingFailure::ConfirmValueFailed);
            }

            oob.le_sc_random
        } else {
            [0; 16]
        };

        let local_r = if peer_flag {
            match &self.info.local_oob_data {
                Some(oob) => oob.r,
                None => return Err(PairingFailure::OobNotAvailable),
            }
        } else {
            [0; 16]
        };

        let (na, nb) = if self.is_initiator() {
            let na = crypto::generate_random_128();
            self.send_pdu(&PairingRandom::new(na).serialize());
            let nb = self.wait_pairing_random()?.random_value;
            (na, nb)
        } else {
            let na = self.wait_pairing_random()?.random_value;
            let nb = crypto::generate_random_128();
            self.send_pdu(&PairingRandom::new(nb).serialize());
            (na, nb)
        };

        let (ra, rb) = if self.is_initiator() {
            (local_r, peer_r)
        } else {
            (peer_r, local_r)
        };

        Ok(Stage1Output { na, nb, ra, rb })
    }

    /// Stage 2: derive MacKey and LTK with f5, exchange and verify the f6
    /// check values, truncate the LTK
    fn sc_stage2(
        &mut self,
        features: &NegotiatedFeatures,
        stage1: &Stage1Output,
        dhkey: &[u8; 32],
    ) -> SmpResult<[u8; 16]> {
        let (initiator_addr, responder_addr) = self.pairing_addresses();
        let a1 = initiator_addr.to_crypto_bytes();
        let a2 = responder_addr.to_crypto_bytes();

        let (mac_key, mut ltk) = crypto::f5(dhkey, &stage1.na, &stage1.nb, &a1, &a2);

        let io_cap_a = crypto::io_cap(
            features.request.auth_req,
            features.request.oob_data_present,
            features.request.io_capability,
        );
        let io_cap_b = crypto::io_cap(
            features.response.auth_req,
            features.response.oob_data_present,
            features.response.io_capability,
        );

        let ea = crypto::f6(
            &mac_key, &stage1.na, &stage1.nb, &stage1.rb, &io_cap_a, &a1, &a2,
        );
        let eb = crypto::f6(
            &mac_key, &stage1.nb, &stage1.na, &stage1.ra, &io_cap_b, &a2, &a1,
        );

        if self.is_initiator() {
            self.send_pdu(&PairingDhKeyCheck::new(ea).serialize());

            let peer = PairingDhKeyCheck::parse(&self.wait_packet(SMP_PAIRING_DH_KEY_CHECK)?)?;
            if !crypto::constant_time_eq(&peer.check, &eb) {
                return Err(PairingFailure::DhKeyCheckFailed);
            }
        } else {
            let peer = PairingDhKeyCheck::parse(&self.wait_packet(SMP_PAIRING_DH_KEY_CHECK)?)?;
            if !crypto::constant_time_eq(&peer.check, &ea) {
                return Err(PairingFailure::DhKeyCheckFailed);
            }

            self.send_pdu(&PairingDhKeyCheck::new(eb).serialize());
        }

        truncate_key(&mut ltk, features.max_key_size);
        Ok(ltk)
    }

    /// Wait for PAIRING_RANDOM
    pub(crate) fn wait_pairing_random(&mut self) -> SmpResult<PairingRandom> {
        PairingRandom::parse(&self.wait_packet(SMP_PAIRING_RANDOM)?)
    }

    /// Emit a keypress notification when both sides negotiated them
    pub(crate) fn keypress_notification(
        &mut self,
        features: &NegotiatedFeatures,
        notification_type: u8,
    ) {
        if features.keypress {
            self.send_pdu(
                &KeypressNotification::new(notification_type).serialize(),
            );
        }
    }
}
