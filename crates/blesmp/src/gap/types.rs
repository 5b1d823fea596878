//! Device address types
use std::fmt;

/// Bluetooth device address
///
/// The bytes are stored in wire (little-endian) order, i.e. `bytes[0]` is
/// the least significant octet, exactly as the address travels in HCI and
/// SMP packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BdAddr {
    pub bytes: [u8; 6],
}

impl BdAddr {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() >= 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&slice[0..6]);
            Some(Self { bytes })
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Type of a device address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// Public device address
    Public,
    /// Static random address
    RandomStatic,
    /// Resolvable private address
    ResolvablePrivate,
}

impl AddressType {
    /// Address-type octet as it appears in SMP packets and the crypto
    /// functions (0 = public, 1 = random).
    pub fn wire_value(&self) -> u8 {
        match self {
            AddressType::Public => 0x00,
            AddressType::RandomStatic | AddressType::ResolvablePrivate => 0x01,
        }
    }

    pub fn from_wire_value(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(AddressType::Public),
            0x01 => Some(AddressType::RandomStatic),
            _ => None,
        }
    }
}

/// A device address together with its type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWithType {
    pub address: BdAddr,
    pub address_type: AddressType,
}

impl AddressWithType {
    pub fn new(address: BdAddr, address_type: AddressType) -> Self {
        Self {
            address,
            address_type,
        }
    }

    /// 56-bit address form used by the f5 and f6 functions: the six
    /// address octets in wire order followed by the address-type octet.
    pub fn to_crypto_bytes(&self) -> [u8; 7] {
        let mut out = [0u8; 7];
        out[0..6].copy_from_slice(&self.address.bytes);
        out[6] = self.address_type.wire_value();
        out
    }
}

impl fmt::Display for AddressWithType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address_type {
            AddressType::Public => write!(f, "{} (public)", self.address),
            AddressType::RandomStatic => write!(f, "{} (random)", self.address),
            AddressType::ResolvablePrivate => write!(f, "{} (rpa)", self.address),
        }
    }
}
