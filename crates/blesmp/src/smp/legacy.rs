//! Phase 2, LE Legacy pairing
//!
//! Stage 1 settles the Temporary Key (all zeroes, a passkey, or the OOB
//! value); Stage 2 runs the c1 confirm/random exchange and derives the
//! STK with s1.

use super::codec::{PairingConfirm, PairingRandom};
use super::crypto;
use super::constants::*;
use super::keys::truncate_key;
use super::phase1::NegotiatedFeatures;
use super::session::Pairing;
use super::types::*;

impl Pairing {
    /// Run Legacy authentication and return the truncated STK
    pub(crate) fn legacy_phase2(&mut self, features: &NegotiatedFeatures) -> SmpResult<[u8; 16]> {
        let tk = self.legacy_stage1(features)?;
        self.legacy_stage2(features, &tk)
    }

    fn legacy_stage1(&mut self, features: &NegotiatedFeatures) -> SmpResult<[u8; 16]> {
        match features.association_model {
            AssociationModel::JustWorks => Ok([0u8; 16]),

            AssociationModel::PasskeyEntry(role) => {
                let we_display = matches!(
                    (role, self.is_initiator()),
                    (PasskeyRole::InitiatorDisplays, true)
                        | (PasskeyRole::ResponderDisplays, false)
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

                let mut tk = [0u8; 16];
                tk[0..4].copy_from_slice(&passkey.to_le_bytes());
                Ok(tk)
            }

            AssociationModel::OutOfBand => self
                .info
                .remote_oob_data
                .map(|oob| oob.security_manager_tk)
                .ok_or(PairingFailure::OobNotAvailable),

            // Numeric Comparison is only selectable with Secure
            // Connections
            AssociationModel::NumericComparison => Err(PairingFailure::AuthenticationRequirements),
        }
    }

    fn legacy_stage2(
        &mut self,
        features: &NegotiatedFeatures,
        tk: &[u8; 16],
    ) -> SmpResult<[u8; 16]> {
        let preq = features.request.to_bytes(true);
        let pres = features.response.to_bytes(false);

        let (initiator_addr, responder_addr) = self.pairing_addresses();
        let iat = initiator_addr.address_type.wire_value();
        let rat = responder_addr.address_type.wire_value();
        let ia = initiator_addr.address.bytes;
        let ra = responder_addr.address.bytes;

        let confirm_of =
            |rand: &[u8; 16]| crypto::c1(tk, rand, &preq, &pres, iat, &ia, rat, &ra);

        let (srand, mrand) = if self.is_initiator() {
            let mrand = crypto::generate_random_128();
            self.send_pdu(&PairingConfirm::new(confirm_of(&mrand)).serialize());

            let sconfirm = self.wait_pairing_confirm()?;

            self.send_pdu(&PairingRandom::new(mrand).serialize());
            let srand = self.wait_pairing_random()?.random_value;

            if !crypto::constant_time_eq(&sconfirm.confirm_value, &confirm_of(&srand)) {
                return Err(PairingFailure::ConfirmValueFailed);
            }

            (srand, mrand)
        } else {
            let mconfirm = self.wait_pairing_confirm()?;

            let srand = crypto::generate_random_128();
            self.send_pdu(&PairingConfirm::new(confirm_of(&srand)).serialize());

            let mrand = self.wait_pairing_random()?.random_value;

            if !crypto::constant_time_eq(&mconfirm.confirm_value, &confirm_of(&mrand)) {
                return Err(PairingFailure::ConfirmValueFailed);
            }

            self.send_pdu(&PairingRandom::new(srand).serialize());

            (srand, mrand)
        };

        let mut stk = crypto::s1(tk, &srand, &mrand);
        truncate_key(&mut stk, features.max_key_size);
        Ok(stk)
    }
}
