//! Phase 1: pairing feature exchange
//!
//! The initiator transmits its Pairing Request, the responder answers with
//! a Pairing Response, and both sides derive the same negotiated feature
//! set from the two commands: Secure Connections vs Legacy, MITM, the
//! encryption key size, the key-distribution masks and the association
//! model.

use super::codec::PairingRequest;
use super::constants::*;
use super::session::Pairing;
use super::types::*;
use log::debug;

/// Everything both sides agree on after the feature exchange
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NegotiatedFeatures {
    /// The initiator's command, captured verbatim for c1 and f6
    pub request: PairingRequest,
    /// The responder's command, captured verbatim for c1 and f6
    pub response: PairingRequest,
    pub secure_connections: bool,
    pub mitm: bool,
    pub max_key_size: u8,
    pub initiator_key_dist: KeyDistribution,
    pub responder_key_dist: KeyDistribution,
    pub association_model: AssociationModel,
    /// Both sides negotiated keypress notifications
    pub keypress: bool,
}

impl NegotiatedFeatures {
    /// Whether the selected association model protects against MITM
    pub fn authenticated(&self) -> bool {
        !matches!(self.association_model, AssociationModel::JustWorks)
    }
}

impl Pairing {
    pub(crate) fn exchange_pairing_features(&mut self) -> SmpResult<NegotiatedFeatures> {
        let (request, response) = if self.is_initiator() {
            let request = self.local_pairing_command();
            self.send_pdu(&request.serialize(true));

            let response_bytes = self.wait_packet(SMP_PAIRING_RESPONSE)?;
            let response = PairingRequest::parse_response(&response_bytes)?;

            (request, response)
        } else {
            let request = match self.take_initial_request() {
                Some(bytes) => PairingRequest::parse_request(&bytes)?,
                None => {
                    let bytes = self.wait_packet(SMP_PAIRING_REQUEST)?;
                    PairingRequest::parse_request(&bytes)?
                }
            };

            // The responder only claims keys the initiator asked about
            let mut response = self.local_pairing_command();
            response.initiator_key_dist &= request.initiator_key_dist;
            response.responder_key_dist &= request.responder_key_dist;
            self.send_pdu(&response.serialize(false));

            (request, response)
        };

        negotiate(&request, &response)
    }

    /// The pairing command describing the local device
    fn local_pairing_command(&self) -> PairingRequest {
        let mut auth_req = self.info.auth_req;
        // CT2 stays cleared; cross-transport key derivation is handled
        // outside this core
        auth_req.ct2 = false;

        PairingRequest {
            io_capability: self.info.io_capability.to_u8(),
            oob_data_present: u8::from(self.info.remote_oob_data.is_some()),
            auth_req: auth_req.to_u8(),
            max_key_size: self
                .info
                .max_encryption_key_size
                .min(SMP_MAX_ENCRYPTION_KEY_SIZE),
            initiator_key_dist: self.info.initiator_key_distribution.to_u8(),
            responder_key_dist: self.info.responder_key_distribution.to_u8(),
        }
    }

    /// The packet that triggered the session, when it is the initiator's
    /// Pairing Request. A Security Request that got a Central session
    /// started carries no features and is dropped here.
    fn take_initial_request(&mut self) -> Option<Vec<u8>> {
        let packet = self.info.initial_packet.take()?;

        if packet.first() == Some(&SMP_PAIRING_REQUEST) {
            Some(packet)
        } else {
            debug!("initial packet is not a Pairing Request, ignoring");
            None
        }
    }
}

/// Derive the negotiated feature set from the two verbatim pairing
/// commands. Pure; both sides compute identical results.
pub(crate) fn negotiate(
    request: &PairingRequest,
    response: &PairingRequest,
) -> SmpResult<NegotiatedFeatures> {
    let request_auth = request.auth_requirements();
    let response_auth = response.auth_requirements();

    let secure_connections =
        request_auth.secure_connections && response_auth.secure_connections;
    let mitm = request_auth.mitm || response_auth.mitm;

    if request.max_key_size > SMP_MAX_ENCRYPTION_KEY_SIZE
        || response.max_key_size > SMP_MAX_ENCRYPTION_KEY_SIZE
    {
        return Err(PairingFailure::InvalidParameters);
    }

    let max_key_size = request.max_key_size.min(response.max_key_size);
    if max_key_size < SMP_MIN_ENCRYPTION_KEY_SIZE {
        return Err(PairingFailure::EncryptionKeySize);
    }

    let initiator_io = IoCapability::from_u8(request.io_capability)
        .ok_or(PairingFailure::InvalidParameters)?;
    let responder_io = IoCapability::from_u8(response.io_capability)
        .ok_or(PairingFailure::InvalidParameters)?;

    let association_model = select_association_model(
        initiator_io,
        responder_io,
        request.oob_data_present != 0,
        response.oob_data_present != 0,
        mitm,
        secure_connections,
    );

    Ok(NegotiatedFeatures {
        request: *request,
        response: *response,
        secure_connections,
        mitm,
        max_key_size,
        initiator_key_dist: KeyDistribution::from_u8(request.initiator_key_dist)
            .intersect(&KeyDistribution::from_u8(response.initiator_key_dist)),
        responder_key_dist: KeyDistribution::from_u8(request.responder_key_dist)
            .intersect(&KeyDistribution::from_u8(response.responder_key_dist)),
        association_model,
        keypress: request_auth.keypress_notifications && response_auth.keypress_notifications,
    })
}

/// The IO capabilities mapping from the BT Core spec (Vol 3, Part H,
/// 2.3.5.1), a pure function of both capability sets and the OOB/MITM/SC
/// flags.
pub(crate) fn select_association_model(
    initiator_io: IoCapability,
    responder_io: IoCapability,
    initiator_oob: bool,
    responder_oob: bool,
    mitm: bool,
    secure_connections: bool,
) -> AssociationModel {
    use AssociationModel::*;
    use IoCapability::*;
    use PasskeyRole::*;

    // OOB wins over IO capabilities. With Secure Connections one side
    // holding the other's data is enough; Legacy needs both.
    if secure_connections {
        if initiator_oob || responder_oob {
            return OutOfBand;
        }
    } else if initiator_oob && responder_oob {
        return OutOfBand;
    }

    if !mitm {
        return JustWorks;
    }

    match (initiator_io, responder_io) {
        (NoInputNoOutput, _) | (_, NoInputNoOutput) => JustWorks,

        (DisplayOnly, DisplayOnly)
        | (DisplayOnly, DisplayYesNo)
        | (DisplayYesNo, DisplayOnly) => JustWorks,

        (DisplayYesNo, DisplayYesNo)
        | (DisplayYesNo, KeyboardDisplay)
        | (KeyboardDisplay, DisplayYesNo)
        | (KeyboardDisplay, KeyboardDisplay)
            if secure_connections =>
        {
            NumericComparison
        }
        (DisplayYesNo, DisplayYesNo) => JustWorks,

        (KeyboardOnly, KeyboardOnly) => PasskeyEntry(BothInput),
        (KeyboardOnly, _) => PasskeyEntry(ResponderDisplays),
        (_, KeyboardOnly) => PasskeyEntry(InitiatorDisplays),

        (DisplayOnly, KeyboardDisplay) | (DisplayYesNo, KeyboardDisplay) => {
            PasskeyEntry(InitiatorDisplays)
        }
        (KeyboardDisplay, DisplayOnly) | (KeyboardDisplay, DisplayYesNo) => {
            PasskeyEntry(ResponderDisplays)
        }
        (KeyboardDisplay, KeyboardDisplay) => PasskeyEntry(InitiatorDisplays),
    }
}
