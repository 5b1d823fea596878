//! SMP PDU encoding and decoding
//!
//! One struct per command. Parsing is strict: the opcode must match and
//! the length must be exactly the size defined for the command; anything
//! else is a [`PairingFailure::MalformedPacket`].

use super::constants::*;
use super::types::*;
use crate::gap::BdAddr;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Extract the fixed-size payload of a PDU after validating opcode and
/// exact length.
fn payload<const N: usize>(data: &[u8], code: u8) -> SmpResult<[u8; N]> {
    if data.is_empty() || data[0] != code {
        return Err(PairingFailure::MalformedPacket(format!(
            "expected {} opcode",
            code_text(code)
        )));
    }

    if data.len() != N + 1 {
        return Err(PairingFailure::MalformedPacket(format!(
            "{} has length {}, expected {}",
            code_text(code),
            data.len(),
            N + 1
        )));
    }

    let mut out = [0u8; N];
    out.copy_from_slice(&data[1..]);
    Ok(out)
}

/// Pairing Request / Pairing Response body (the two commands share their
/// six-byte layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingRequest {
    /// IO capability
    pub io_capability: u8,
    /// OOB data flag
    pub oob_data_present: u8,
    /// Authentication requirements
    pub auth_req: u8,
    /// Maximum encryption key size
    pub max_key_size: u8,
    /// Initiator key distribution
    pub initiator_key_dist: u8,
    /// Responder key distribution
    pub responder_key_dist: u8,
}

impl PairingRequest {
    pub fn parse_request(data: &[u8]) -> SmpResult<Self> {
        Self::parse(data, SMP_PAIRING_REQUEST)
    }

    pub fn parse_response(data: &[u8]) -> SmpResult<Self> {
        Self::parse(data, SMP_PAIRING_RESPONSE)
    }

    fn parse(data: &[u8], code: u8) -> SmpResult<Self> {
        let body: [u8; 6] = payload(data, code)?;

        Ok(Self {
            io_capability: body[0],
            oob_data_present: body[1],
            auth_req: body[2],
            max_key_size: body[3],
            initiator_key_dist: body[4],
            responder_key_dist: body[5],
        })
    }

    pub fn serialize(&self, is_request: bool) -> Vec<u8> {
        self.to_bytes(is_request).to_vec()
    }

    /// The verbatim 7-byte command, as needed for the c1 `preq`/`pres`
    /// inputs.
    pub fn to_bytes(&self, is_request: bool) -> [u8; 7] {
        [
            if is_request {
                SMP_PAIRING_REQUEST
            } else {
                SMP_PAIRING_RESPONSE
            },
            self.io_capability,
            self.oob_data_present,
            self.auth_req,
            self.max_key_size,
            self.initiator_key_dist,
            self.responder_key_dist,
        ]
    }

    pub fn auth_requirements(&self) -> AuthRequirements {
        AuthRequirements::from_u8(self.auth_req)
    }
}

/// Pairing Confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingConfirm {
    pub confirm_value: [u8; 16],
}

impl PairingConfirm {
    pub fn new(confirm_value: [u8; 16]) -> Self {
        Self { confirm_value }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            confirm_value: payload(data, SMP_PAIRING_CONFIRM)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_PAIRING_CONFIRM);
        packet.extend_from_slice(&self.confirm_value);
        packet
    }
}

/// Pairing Random
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingRandom {
    pub random_value: [u8; 16],
}

impl PairingRandom {
    pub fn new(random_value: [u8; 16]) -> Self {
        Self { random_value }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            random_value: payload(data, SMP_PAIRING_RANDOM)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_PAIRING_RANDOM);
        packet.extend_from_slice(&self.random_value);
        packet
    }
}

/// Pairing Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingFailed {
    pub reason: u8,
}

impl PairingFailed {
    pub fn new(reason: u8) -> Self {
        Self { reason }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 1] = payload(data, SMP_PAIRING_FAILED)?;
        Ok(Self { reason: body[0] })
    }

    pub fn serialize(&self) -> Vec<u8> {
        vec![SMP_PAIRING_FAILED, self.reason]
    }
}

/// Encryption Information (LTK)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionInformation {
    pub ltk: [u8; 16],
}

impl EncryptionInformation {
    pub fn new(ltk: [u8; 16]) -> Self {
        Self { ltk }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            ltk: payload(data, SMP_ENCRYPTION_INFORMATION)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_ENCRYPTION_INFORMATION);
        packet.extend_from_slice(&self.ltk);
        packet
    }
}

/// Central Identification (EDIV + Rand)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralIdentification {
    pub ediv: u16,
    pub rand: [u8; 8],
}

impl CentralIdentification {
    pub fn new(ediv: u16, rand: [u8; 8]) -> Self {
        Self { ediv, rand }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 10] = payload(data, SMP_CENTRAL_IDENTIFICATION)?;

        let mut cursor = Cursor::new(&body[..]);
        let ediv = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| PairingFailure::MalformedPacket("failed to read EDIV".into()))?;

        let mut rand = [0u8; 8];
        cursor
            .read_exact(&mut rand)
            .map_err(|_| PairingFailure::MalformedPacket("failed to read Rand".into()))?;

        Ok(Self { ediv, rand })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(11);
        packet.push(SMP_CENTRAL_IDENTIFICATION);
        packet.extend_from_slice(&self.ediv.to_le_bytes());
        packet.extend_from_slice(&self.rand);
        packet
    }
}

/// Identity Information (IRK)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityInformation {
    pub irk: [u8; 16],
}

impl IdentityInformation {
    pub fn new(irk: [u8; 16]) -> Self {
        Self { irk }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            irk: payload(data, SMP_IDENTITY_INFORMATION)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_IDENTITY_INFORMATION);
        packet.extend_from_slice(&self.irk);
        packet
    }
}

/// Identity Address Information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityAddressInformation {
    /// Address type (0 = public, 1 = static random)
    pub addr_type: u8,
    /// Address in wire order
    pub bd_addr: BdAddr,
}

impl IdentityAddressInformation {
    pub fn new(addr_type: u8, bd_addr: BdAddr) -> Self {
        Self { addr_type, bd_addr }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 7] = payload(data, SMP_IDENTITY_ADDRESS_INFORMATION)?;

        let addr_type = body[0];
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&body[1..7]);

        Ok(Self {
            addr_type,
            bd_addr: BdAddr::new(addr),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(8);
        packet.push(SMP_IDENTITY_ADDRESS_INFORMATION);
        packet.push(self.addr_type);
        packet.extend_from_slice(&self.bd_addr.bytes);
        packet
    }
}

/// Signing Information (CSRK)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningInformation {
    pub csrk: [u8; 16],
}

impl SigningInformation {
    pub fn new(csrk: [u8; 16]) -> Self {
        Self { csrk }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            csrk: payload(data, SMP_SIGNING_INFORMATION)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_SIGNING_INFORMATION);
        packet.extend_from_slice(&self.csrk);
        packet
    }
}

/// Security Request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityRequest {
    pub auth_req: u8,
}

impl SecurityRequest {
    pub fn new(auth_req: AuthRequirements) -> Self {
        Self {
            auth_req: auth_req.to_u8(),
        }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 1] = payload(data, SMP_SECURITY_REQUEST)?;
        Ok(Self { auth_req: body[0] })
    }

    pub fn serialize(&self) -> Vec<u8> {
        vec![SMP_SECURITY_REQUEST, self.auth_req]
    }

    pub fn auth_requirements(&self) -> AuthRequirements {
        AuthRequirements::from_u8(self.auth_req)
    }
}

/// Pairing Public Key (P-256 X and Y coordinates, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingPublicKey {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl PairingPublicKey {
    pub fn from_bytes(key: &[u8; 64]) -> Self {
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];

        x.copy_from_slice(&key[0..32]);
        y.copy_from_slice(&key[32..64]);

        Self { x, y }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut key = [0u8; 64];

        key[0..32].copy_from_slice(&self.x);
        key[32..64].copy_from_slice(&self.y);

        key
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 64] = payload(data, SMP_PAIRING_PUBLIC_KEY)?;
        Ok(Self::from_bytes(&body))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(65);
        packet.push(SMP_PAIRING_PUBLIC_KEY);
        packet.extend_from_slice(&self.x);
        packet.extend_from_slice(&self.y);
        packet
    }
}

/// Pairing DHKey Check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingDhKeyCheck {
    pub check: [u8; 16],
}

impl PairingDhKeyCheck {
    pub fn new(check: [u8; 16]) -> Self {
        Self { check }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        Ok(Self {
            check: payload(data, SMP_PAIRING_DH_KEY_CHECK)?,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(17);
        packet.push(SMP_PAIRING_DH_KEY_CHECK);
        packet.extend_from_slice(&self.check);
        packet
    }
}

/// Keypress Notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypressNotification {
    pub notification_type: u8,
}

impl KeypressNotification {
    pub fn new(notification_type: u8) -> Self {
        Self { notification_type }
    }

    pub fn parse(data: &[u8]) -> SmpResult<Self> {
        let body: [u8; 1] = payload(data, SMP_KEYPRESS_NOTIFICATION)?;
        Ok(Self {
            notification_type: body[0],
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        vec![SMP_KEYPRESS_NOTIFICATION, self.notification_type]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_request_roundtrip() {
        let req = PairingRequest {
            io_capability: SMP_IO_CAPABILITY_DISPLAY_YES_NO,
            oob_data_present: 0,
            auth_req: SMP_AUTH_REQ_BONDING | SMP_AUTH_REQ_SC,
            max_key_size: 16,
            initiator_key_dist: SMP_KEY_DIST_ENC | SMP_KEY_DIST_ID,
            responder_key_dist: SMP_KEY_DIST_ID,
        };

        let wire = req.serialize(true);
        assert_eq!(wire.len(), 7);
        assert_eq!(PairingRequest::parse_request(&wire).unwrap(), req);

        let wire = req.serialize(false);
        assert_eq!(PairingRequest::parse_response(&wire).unwrap(), req);
        assert!(PairingRequest::parse_request(&wire).is_err());
    }

    #[test]
    fn test_confirm_and_random_roundtrip() {
        let confirm = PairingConfirm::new([0xAB; 16]);
        assert_eq!(
            PairingConfirm::parse(&confirm.serialize()).unwrap(),
            confirm
        );

        let random = PairingRandom::new([0x5A; 16]);
        assert_eq!(PairingRandom::parse(&random.serialize()).unwrap(), random);
    }

    #[test]
    fn test_central_identification_roundtrip() {
        let id = CentralIdentification::new(0xBEEF, [1, 2, 3, 4, 5, 6, 7, 8]);
        let wire = id.serialize();
        assert_eq!(wire[1..3], [0xEF, 0xBE]);
        assert_eq!(CentralIdentification::parse(&wire).unwrap(), id);
    }

    #[test]
    fn test_identity_address_roundtrip() {
        let id = IdentityAddressInformation::new(
            0x00,
            BdAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]),
        );
        assert_eq!(
            IdentityAddressInformation::parse(&id.serialize()).unwrap(),
            id
        );
    }

    #[test]
    fn test_public_key_roundtrip() {
        let mut raw = [0u8; 64];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let pk = PairingPublicKey::from_bytes(&raw);
        assert_eq!(PairingPublicKey::parse(&pk.serialize()).unwrap(), pk);
        assert_eq!(pk.to_bytes(), raw);
    }

    #[test]
    fn test_security_request_roundtrip() {
        let req = SecurityRequest::new(AuthRequirements::new(true, true, true));
        let wire = req.serialize();
        assert_eq!(wire, vec![SMP_SECURITY_REQUEST, 0x0D]);

        let parsed = SecurityRequest::parse(&wire).unwrap();
        assert!(parsed.auth_requirements().secure_connections);
    }

    #[test]
    fn test_keypress_and_failed_roundtrip() {
        let keypress = KeypressNotification::new(SMP_KEYPRESS_ENTRY_STARTED);
        assert_eq!(
            KeypressNotification::parse(&keypress.serialize()).unwrap(),
            keypress
        );

        let failed = PairingFailed::new(SMP_REASON_CONFIRM_VALUE_FAILED);
        assert_eq!(PairingFailed::parse(&failed.serialize()).unwrap(), failed);
    }

    #[test]
    fn test_strict_length_enforced() {
        // One byte short
        let mut wire = PairingConfirm::new([0u8; 16]).serialize();
        wire.pop();
        assert!(PairingConfirm::parse(&wire).is_err());

        // One byte of trailing garbage
        let mut wire = PairingRandom::new([0u8; 16]).serialize();
        wire.push(0x00);
        assert!(PairingRandom::parse(&wire).is_err());

        // Wrong opcode
        let wire = PairingConfirm::new([0u8; 16]).serialize();
        assert!(PairingRandom::parse(&wire).is_err());

        // Empty packet
        assert!(PairingFailed::parse(&[]).is_err());
    }
}
