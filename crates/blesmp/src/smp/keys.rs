//! Key material produced by a pairing session
use crate::gap::AddressWithType;

/// Long Term Key together with its identifiers
///
/// For Secure Connections pairing both EDIV and Rand are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongTermKey {
    /// Key value, wire order
    pub key: [u8; 16],
    /// Encrypted Diversifier
    pub ediv: u16,
    /// Random number
    pub rand: [u8; 8],
}

impl LongTermKey {
    pub fn new(key: [u8; 16], ediv: u16, rand: [u8; 8]) -> Self {
        Self { key, ediv, rand }
    }

    /// An LTK derived by Secure Connections pairing (EDIV and Rand are
    /// not used)
    pub fn secure_connections(key: [u8; 16]) -> Self {
        Self {
            key,
            ediv: 0,
            rand: [0; 8],
        }
    }
}

/// Identity Resolving Key with the peer's identity address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityKey {
    pub irk: [u8; 16],
    pub identity_address: AddressWithType,
}

/// The bonding keys received from the peer during Phase 3, keyed by the
/// negotiated distribution masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistributedKeys {
    /// Peer LTK, EDIV and Rand (Encryption Information + Central
    /// Identification)
    pub remote_ltk: Option<LongTermKey>,
    /// Peer IRK and identity address (Identity Information + Identity
    /// Address Information)
    pub remote_identity: Option<IdentityKey>,
    /// Peer CSRK (Signing Information)
    pub remote_csrk: Option<[u8; 16]>,
}

/// The success value of a pairing session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingOutcome {
    /// The key the link was encrypted with: the Secure Connections LTK,
    /// or the STK for Legacy pairing. Truncated to `key_size`.
    pub ltk: [u8; 16],
    /// Negotiated encryption key size in bytes (7..=16)
    pub key_size: u8,
    /// Whether the association model provided MITM protection
    pub authenticated: bool,
    /// Whether LE Secure Connections was used
    pub secure_connections: bool,
    /// Keys the peer distributed in Phase 3
    pub distributed_keys: DistributedKeys,
}

/// Zero the high `16 - key_size` bytes of a key, per the negotiated
/// maximum encryption key size. The key is in wire (little-endian) order,
/// so the high bytes are at the tail.
pub fn truncate_key(key: &mut [u8; 16], key_size: u8) {
    for byte in key.iter_mut().skip(key_size as usize) {
        *byte = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_key_zeroes_high_bytes() {
        for key_size in 7..=16u8 {
            let mut key = [0xFFu8; 16];
            truncate_key(&mut key, key_size);
            assert!(key[..key_size as usize].iter().all(|&b| b == 0xFF));
            assert!(key[key_size as usize..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_sc_ltk_has_zero_identifiers() {
        let ltk = LongTermKey::secure_connections([7u8; 16]);
        assert_eq!(ltk.ediv, 0);
        assert_eq!(ltk.rand, [0u8; 8]);
    }
}
