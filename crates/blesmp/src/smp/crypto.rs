//! Cryptographic functions for the Security Manager Protocol
//!
//! AES-128 (security function `e`), AES-CMAC, the Secure Connections
//! functions f4/f5/f6/g2, the Legacy functions c1/s1, and the helper
//! functions h6/ah, plus P-256 ECDH key handling.
//!
//! Convention: every 128-bit and 256-bit value crosses this API in
//! little-endian byte order, matching the SMP wire format, so callers can
//! feed packet fields in unchanged. CMAC messages are byte strings with no
//! endianness of their own. The functions reverse into the big-endian
//! form required by AES internally.

use super::types::{PairingFailure, SmpResult};
use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};
use p256::elliptic_curve::sec1::{Coordinates, FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::PrimeField;
use p256::EncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;

/// Salt used by f5 (BT Core Vol 3, Part H, 2.2.7), most significant byte
/// first.
const F5_SALT: [u8; 16] = [
    0x6C, 0x88, 0x83, 0x91, 0xAA, 0xF5, 0xA5, 0x38, 0x60, 0x37, 0x0B, 0xDB, 0x5A, 0x60, 0x83,
    0xBE,
];

/// keyID "btle" used by f5
const F5_KEY_ID: &[u8; 4] = b"btle";

fn reversed<const N: usize>(bytes: &[u8; N]) -> [u8; N] {
    let mut out = *bytes;
    out.reverse();
    out
}

/// AES-CMAC over a big-endian key and message, big-endian output
fn cmac_be(key: &[u8; 16], message: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<Aes128> as KeyInit>::new(&(*key).into());
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Generate a 128-bit random value from the OS CSPRNG
pub fn generate_random_128() -> [u8; 16] {
    let mut out = [0u8; 16];
    OsRng.fill_bytes(&mut out);
    out
}

/// Generate a 64-bit random value from the OS CSPRNG
pub fn generate_random_64() -> [u8; 8] {
    let mut out = [0u8; 8];
    OsRng.fill_bytes(&mut out);
    out
}

/// Compare two authentication values without leaking the mismatch
/// position through timing
pub fn constant_time_eq(a: &[u8; 16], b: &[u8; 16]) -> bool {
    use subtle::ConstantTimeEq;
    bool::from(a.ct_eq(b))
}

/// Generate a random 6-digit passkey (0..=999999)
pub fn generate_passkey() -> u32 {
    OsRng.next_u32() % 1_000_000
}

/// Security function e: AES-128 of a single block
/// (BT Core Spec Vol 3, Part H, 2.2.1)
pub fn e(key: &[u8; 16], plain_text: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new(&reversed(key).into());

    let mut block = GenericArray::from(reversed(plain_text));
    cipher.encrypt_block(&mut block);

    let out: [u8; 16] = block.into();
    reversed(&out)
}

/// AES-CMAC (BT Core Spec Vol 3, Part H, 2.2.5 / RFC 4493)
///
/// The key and the returned MAC are little-endian; `message` is an
/// arbitrary-length byte string used as-is.
pub fn aes_cmac(key: &[u8; 16], message: &[u8]) -> [u8; 16] {
    reversed(&cmac_be(&reversed(key), message))
}

/// Function c1 for LE Legacy Pairing (BT Core Spec Vol 3, Part H, 2.2.3)
///
/// `preq` and `pres` are the verbatim 7-byte Pairing Request/Response
/// commands including the opcode; addresses are in wire order.
#[allow(clippy::too_many_arguments)]
pub fn c1(
    tk: &[u8; 16],
    r: &[u8; 16],
    preq: &[u8; 7],
    pres: &[u8; 7],
    init_addr_type: u8,
    init_addr: &[u8; 6],
    resp_addr_type: u8,
    resp_addr: &[u8; 6],
) -> [u8; 16] {
    // p1 = pres || preq || rat || iat, assembled least significant byte
    // first
    let mut p1 = [0u8; 16];
    p1[0] = init_addr_type;
    p1[1] = resp_addr_type;
    p1[2..9].copy_from_slice(preq);
    p1[9..16].copy_from_slice(pres);

    // p2 = padding || ia || ra, likewise
    let mut p2 = [0u8; 16];
    p2[0..6].copy_from_slice(resp_addr);
    p2[6..12].copy_from_slice(init_addr);

    let mut tmp = [0u8; 16];
    for i in 0..16 {
        tmp[i] = r[i] ^ p1[i];
    }

    let inner = e(tk, &tmp);

    for i in 0..16 {
        tmp[i] = inner[i] ^ p2[i];
    }

    e(tk, &tmp)
}

/// Function s1 for LE Legacy Pairing (BT Core Spec Vol 3, Part H, 2.2.4)
///
/// `STK = e(TK, r1' || r2')` with the least significant 64 bits of Srand
/// and Mrand.
pub fn s1(tk: &[u8; 16], srand: &[u8; 16], mrand: &[u8; 16]) -> [u8; 16] {
    let mut r_prime = [0u8; 16];
    r_prime[0..8].copy_from_slice(&mrand[0..8]);
    r_prime[8..16].copy_from_slice(&srand[0..8]);

    e(tk, &r_prime)
}

/// Function f4 for LE Secure Connections (BT Core Spec Vol 3, Part H,
/// 2.2.6): confirm value over two public-key X coordinates and a nonce
pub fn f4(u: &[u8; 32], v: &[u8; 32], x: &[u8; 16], z: u8) -> [u8; 16] {
    let mut message = Vec::with_capacity(65);
    message.extend_from_slice(&reversed(u));
    message.extend_from_slice(&reversed(v));
    message.push(z);

    reversed(&cmac_be(&reversed(x), &message))
}

/// Function f5 for LE Secure Connections (BT Core Spec Vol 3, Part H,
/// 2.2.7): derives `(MacKey, LTK)` from the DH key, both nonces and both
/// addresses.
///
/// `a1`/`a2` are the 7-byte address forms from
/// [`crate::gap::AddressWithType::to_crypto_bytes`].
pub fn f5(
    dhkey: &[u8; 32],
    n1: &[u8; 16],
    n2: &[u8; 16],
    a1: &[u8; 7],
    a2: &[u8; 7],
) -> ([u8; 16], [u8; 16]) {
    let t = cmac_be(&F5_SALT, &reversed(dhkey));

    let half = |counter: u8| -> [u8; 16] {
        let mut message = Vec::with_capacity(53);
        message.push(counter);
        message.extend_from_slice(F5_KEY_ID);
        message.extend_from_slice(&reversed(n1));
        message.extend_from_slice(&reversed(n2));
        message.extend_from_slice(&reversed(a1));
        message.extend_from_slice(&reversed(a2));
        message.extend_from_slice(&256u16.to_be_bytes());

        cmac_be(&t, &message)
    };

    let mac_key = half(0);
    let ltk = half(1);

    (reversed(&mac_key), reversed(&ltk))
}

/// Function f6 for LE Secure Connections (BT Core Spec Vol 3, Part H,
/// 2.2.8): DHKey check value
#[allow(clippy::too_many_arguments)]
pub fn f6(
    mac_key: &[u8; 16],
    n1: &[u8; 16],
    n2: &[u8; 16],
    r: &[u8; 16],
    io_cap: &[u8; 3],
    a1: &[u8; 7],
    a2: &[u8; 7],
) -> [u8; 16] {
    let mut message = Vec::with_capacity(65);
    message.extend_from_slice(&reversed(n1));
    message.extend_from_slice(&reversed(n2));
    message.extend_from_slice(&reversed(r));
    message.extend_from_slice(&reversed(io_cap));
    message.extend_from_slice(&reversed(a1));
    message.extend_from_slice(&reversed(a2));

    reversed(&cmac_be(&reversed(mac_key), &message))
}

/// The 3-byte IOcap parameter of f6 in this module's little-endian
/// convention: IO capability, OOB data flag, AuthReq.
pub fn io_cap(auth_req: u8, oob_data_present: u8, io_capability: u8) -> [u8; 3] {
    [io_capability, oob_data_present, auth_req]
}

/// Function g2 for LE Secure Connections (BT Core Spec Vol 3, Part H,
/// 2.2.9): returns the 6-digit numeric comparison value
pub fn g2(u: &[u8; 32], v: &[u8; 32], x: &[u8; 16], y: &[u8; 16]) -> u32 {
    let mut message = Vec::with_capacity(80);
    message.extend_from_slice(&reversed(u));
    message.extend_from_slice(&reversed(v));
    message.extend_from_slice(&reversed(y));

    let mac = cmac_be(&reversed(x), &message);

    // 32 least significant bits, reduced to 6 decimal digits
    let mut lsb = [0u8; 4];
    lsb.copy_from_slice(&mac[12..16]);
    u32::from_be_bytes(lsb) % 1_000_000
}

/// Function h6 (BT Core Spec Vol 3, Part H, 2.2.10): key conversion with a
/// 32-bit keyID. Exposed as a primitive; no cross-transport derivation is
/// built on it here.
pub fn h6(w: &[u8; 16], key_id: u32) -> [u8; 16] {
    reversed(&cmac_be(&reversed(w), &key_id.to_be_bytes()))
}

/// Random address hash function ah (BT Core Spec Vol 3, Part H, 2.2.2)
pub fn ah(k: &[u8; 16], prand: &[u8; 3]) -> [u8; 3] {
    let mut block = [0u8; 16];
    block[0..3].copy_from_slice(prand);

    let out = e(k, &block);
    [out[0], out[1], out[2]]
}

/// A P-256 keypair for the Secure Connections public-key exchange
///
/// The public key is kept as the 64-byte X‖Y form in wire (little-endian)
/// order.
pub struct EcdhKeypair {
    secret: p256::NonZeroScalar,
    public: [u8; 64],
}

impl EcdhKeypair {
    /// Generate a fresh keypair from the OS CSPRNG
    pub fn generate() -> Self {
        let secret = p256::NonZeroScalar::random(&mut OsRng);
        let public = Self::public_from_scalar(&secret);

        Self { secret, public }
    }

    /// Reconstruct a keypair from a big-endian private scalar, as stored
    /// in OOB data
    pub fn from_private_bytes(private_key: &[u8; 32]) -> Option<Self> {
        let secret: Option<p256::NonZeroScalar> =
            p256::NonZeroScalar::from_repr((*private_key).into()).into();
        let secret = secret?;
        let public = Self::public_from_scalar(&secret);

        Some(Self { secret, public })
    }

    fn public_from_scalar(secret: &p256::NonZeroScalar) -> [u8; 64] {
        let point = p256::PublicKey::from_secret_scalar(secret).to_encoded_point(false);

        match point.coordinates() {
            Coordinates::Uncompressed { x, y } => {
                let mut out = [0u8; 64];
                out[0..32].copy_from_slice(x);
                out[0..32].reverse();
                out[32..64].copy_from_slice(y);
                out[32..64].reverse();
                out
            }
            _ => unreachable!("uncompressed encoding requested"),
        }
    }

    /// The local public key, X‖Y in wire order
    pub fn public_key(&self) -> &[u8; 64] {
        &self.public
    }

    /// The private scalar, big-endian, for inclusion in generated OOB
    /// data
    pub fn private_bytes(&self) -> [u8; 32] {
        self.secret.to_repr().into()
    }

    /// ECDH shared secret with a peer public key in wire order, returned
    /// little-endian.
    ///
    /// A peer key equal to the local public key (key-reflection guard), a
    /// point not on the curve, and a zero result are all rejected as
    /// [`PairingFailure::DhKeyCheckFailed`].
    pub fn dh_key(&self, peer_public: &[u8; 64]) -> SmpResult<[u8; 32]> {
        if peer_public == &self.public {
            return Err(PairingFailure::DhKeyCheckFailed);
        }

        let mut x = [0u8; 32];
        x.copy_from_slice(&peer_public[0..32]);
        x.reverse();
        let mut y = [0u8; 32];
        y.copy_from_slice(&peer_public[32..64]);
        y.reverse();

        let point =
            EncodedPoint::from_affine_coordinates(&x.into(), &y.into(), false);
        let peer_key: Option<p256::PublicKey> =
            p256::PublicKey::from_encoded_point(&point).into();
        let peer_key = peer_key.ok_or(PairingFailure::DhKeyCheckFailed)?;

        let shared = p256::ecdh::diffie_hellman(&self.secret, peer_key.as_affine());

        let mut dhkey = [0u8; 32];
        dhkey.copy_from_slice(shared.raw_secret_bytes().as_slice());
        dhkey.reverse();

        if dhkey.iter().all(|&b| b == 0) {
            return Err(PairingFailure::DhKeyCheckFailed);
        }

        Ok(dhkey)
    }
}

/// Out-of-band pairing material generated locally and handed to the peer
/// over the OOB channel
///
/// The keypair is retained because the confirm value binds the public key:
/// a session started with this data must reuse it.
pub struct MyOobData {
    /// Private scalar, big-endian
    pub private_key: [u8; 32],
    /// Public key X‖Y, wire order
    pub public_key: [u8; 64],
    /// Random value r
    pub r: [u8; 16],
    /// Confirm value `c = f4(PKx, PKx, r, 0)`
    pub c: [u8; 16],
}

/// Generate the data to hand to the remote device over the OOB channel
pub fn generate_oob_data() -> MyOobData {
    let keypair = EcdhKeypair::generate();
    let r = generate_random_128();

    let mut pk_x = [0u8; 32];
    pk_x.copy_from_slice(&keypair.public_key()[0..32]);
    let c = f4(&pk_x, &pk_x, &r, 0);

    MyOobData {
        private_key: keypair.private_bytes(),
        public_key: *keypair.public_key(),
        r,
        c,
    }
}

/// Tests
///
/// The known-answer vectors come from the Bluetooth Core specification
/// (Vol 3 Part H Appendix D, Vol 2 Part G 7.1.2) and RFC 4493. Vectors are
/// written as the spec prints them (most significant part first) and
/// converted to this module's little-endian convention.
#[cfg(test)]
mod tests {
    use super::*;

    fn le16(v: u128) -> [u8; 16] {
        v.to_le_bytes()
    }

    fn le32(hi: u128, lo: u128) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..16].copy_from_slice(&lo.to_le_bytes());
        out[16..32].copy_from_slice(&hi.to_le_bytes());
        out
    }

    fn be32(hi: u128, lo: u128) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..16].copy_from_slice(&hi.to_be_bytes());
        out[16..32].copy_from_slice(&lo.to_be_bytes());
        out
    }

    #[test]
    fn test_e_known_answer() {
        // From RFC 4493 subkey generation: AES-128(K, 0)
        let key = le16(0x2b7e1516_28aed2a6_abf71588_09cf4f3c);
        let out = e(&key, &le16(0));
        assert_eq!(out, le16(0x7df76b0c_1ab899b3_3e42f047_b91b546f));
    }

    #[test]
    fn test_aes_cmac_rfc4493() {
        let key = le16(0x2b7e1516_28aed2a6_abf71588_09cf4f3c);
        let m: [u8; 64] = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a, 0xae, 0x2d, 0x8a, 0x57, 0x1e, 0x03, 0xac, 0x9c, 0x9e, 0xb7, 0x6f, 0xac,
            0x45, 0xaf, 0x8e, 0x51, 0x30, 0xc8, 0x1c, 0x46, 0xa3, 0x5c, 0xe4, 0x11, 0xe5, 0xfb,
            0xc1, 0x19, 0x1a, 0x0a, 0x52, 0xef, 0xf6, 0x9f, 0x24, 0x45, 0xdf, 0x4f, 0x9b, 0x17,
            0xad, 0x2b, 0x41, 0x7b, 0xe6, 0x6c, 0x37, 0x10,
        ];

        assert_eq!(
            aes_cmac(&key, &m[..0]),
            le16(0xbb1d6929_e9593728_7fa37d12_9b756746)
        );
        assert_eq!(
            aes_cmac(&key, &m[..16]),
            le16(0x070a16b4_6b4d4144_f79bdd9d_d04a287c)
        );
        assert_eq!(
            aes_cmac(&key, &m[..40]),
            le16(0xdfa66747_de9ae630_30ca3261_1497c827)
        );
        assert_eq!(
            aes_cmac(&key, &m[..]),
            le16(0x51f0bebf_7e3b9d92_fc497417_79363cfe)
        );
    }

    // Public key X coordinates from the BT Core P-256 data set 1
    fn pka_x() -> [u8; 32] {
        le32(
            0x20b003d2_f297be2c_5e2c83a7_e9f9a5b9,
            0xeff49111_acf4fddb_cc030148_0e359de6,
        )
    }

    fn pkb_x() -> [u8; 32] {
        le32(
            0x55188b3d_32f6bb9a_900afcfb_eed4e72a,
            0x59cb9ac2_f19d7cfb_6b4fdd49_f47fc5fd,
        )
    }

    #[test]
    fn test_f4_vector() {
        let x = le16(0xd5cb8454_d177733e_ffffb2ec_712baeab);
        assert_eq!(
            f4(&pka_x(), &pkb_x(), &x, 0),
            le16(0xf2c916f1_07a9bd1c_f1eda1be_a974872d)
        );
    }

    #[test]
    fn test_f5_vector() {
        let dhkey = le32(
            0xec0234a3_57c8ad05_341010a6_0a397d9b,
            0x99796b13_b4f866f1_868d34f3_73bfa698,
        );
        let n1 = le16(0xd5cb8454_d177733e_ffffb2ec_712baeab);
        let n2 = le16(0xa6e8e7cc_25a75f6e_216583f7_ff3dc4cf);
        let a1 = [0xce, 0xbf, 0x37, 0x37, 0x12, 0x56, 0x00];
        let a2 = [0xc1, 0xcf, 0x2d, 0x70, 0x13, 0xa7, 0x00];

        let (mac_key, ltk) = f5(&dhkey, &n1, &n2, &a1, &a2);
        assert_eq!(mac_key, le16(0x2965f176_a1084a02_fd3f6a20_ce636e20));
        assert_eq!(ltk, le16(0x69867911_69d7cd23_980522b5_94750a38));
    }

    #[test]
    fn test_f6_vector() {
        let mac_key = le16(0x2965f176_a1084a02_fd3f6a20_ce636e20);
        let n1 = le16(0xd5cb8454_d177733e_ffffb2ec_712baeab);
        let n2 = le16(0xa6e8e7cc_25a75f6e_216583f7_ff3dc4cf);
        let r = le16(0x12a3343b_b453bb54_08da42d2_0c2d0fc8);
        // IOcap = 0x010102: AuthReq 0x01, OOB 0x01, IO capability 0x02
        let cap = io_cap(0x01, 0x01, 0x02);
        let a1 = [0xce, 0xbf, 0x37, 0x37, 0x12, 0x56, 0x00];
        let a2 = [0xc1, 0xcf, 0x2d, 0x70, 0x13, 0xa7, 0x00];

        assert_eq!(
            f6(&mac_key, &n1, &n2, &r, &cap, &a1, &a2),
            le16(0xe3c47398_9cd0e8c5_d26c0b09_da958f61)
        );
    }

    #[test]
    fn test_g2_vector() {
        let x = le16(0xd5cb8454_d177733e_ffffb2ec_712baeab);
        let y = le16(0xa6e8e7cc_25a75f6e_216583f7_ff3dc4cf);
        assert_eq!(g2(&pka_x(), &pkb_x(), &x, &y), 0x2f9ed5ba_u32 % 1_000_000);
    }

    #[test]
    fn test_c1_vector() {
        // From BT Core Vol 3 Part H 2.2.3: k = 0, p1 and p2 as in the
        // spec example
        let tk = le16(0);
        let r = le16(0x5783D521_56AD6F0E_6388274E_C6702EE0);
        let preq = [0x01, 0x01, 0x00, 0x00, 0x10, 0x07, 0x07];
        let pres = [0x02, 0x03, 0x00, 0x00, 0x08, 0x00, 0x05];
        let ia = [0xA6, 0xA5, 0xA4, 0xA3, 0xA2, 0xA1];
        let ra = [0xB6, 0xB5, 0xB4, 0xB3, 0xB2, 0xB1];

        let confirm = c1(&tk, &r, &preq, &pres, 0x01, &ia, 0x00, &ra);
        assert_eq!(confirm, le16(0x1E1E3FEF_878988EA_D2A74DC5_BEF13B86));
    }

    #[test]
    fn test_s1_layout() {
        let tk = le16(0x00112233_44556677_8899AABB_CCDDEEFF);
        let srand = le16(0x000F0E0D_0C0B0A09_11223344_55667788);
        let mrand = le16(0x01020304_05060708_090A0B0C_0D0E0F00);

        // s1 is e(TK, r1' || r2') over the low halves; verify against a
        // hand-assembled block
        let mut r_prime = [0u8; 16];
        r_prime[0..8].copy_from_slice(&mrand[0..8]);
        r_prime[8..16].copy_from_slice(&srand[0..8]);
        assert_eq!(s1(&tk, &srand, &mrand), e(&tk, &r_prime));

        // and it must be sensitive to argument order
        assert_ne!(s1(&tk, &srand, &mrand), s1(&tk, &mrand, &srand));
    }

    #[test]
    fn test_ah_vector() {
        let irk = le16(0xec0234a3_57c8ad05_341010a6_0a397d9b);
        let prand = [0x94, 0x81, 0x70];
        assert_eq!(ah(&irk, &prand), [0xaa, 0xfb, 0x0d]);
    }

    #[test]
    fn test_h6_matches_cmac() {
        let w = le16(0xec0234a3_57c8ad05_341010a6_0a397d9b);
        let key_id = u32::from_be_bytes(*b"lebr");
        assert_eq!(h6(&w, key_id), aes_cmac(&w, b"lebr"));
    }

    #[test]
    fn test_ecdh_dataset_1() {
        let ska = EcdhKeypair::from_private_bytes(&be32(
            0x3f49f6d4_a3c55f38_74c9b3e3_d2103f50,
            0x4aff607b_eb40b799_5899b8a6_cd3c1abd,
        ))
        .unwrap();
        let skb = EcdhKeypair::from_private_bytes(&be32(
            0x55188b3d_32f6bb9a_900afcfb_eed4e72a,
            0x59cb9ac2_f19d7cfb_6b4fdd49_f47fc5fd,
        ))
        .unwrap();

        assert_eq!(ska.public_key()[0..32], pka_x());
        assert_eq!(skb.public_key()[0..32], pkb_x());

        let dhkey = ska.dh_key(skb.public_key()).unwrap();
        assert_eq!(
            dhkey,
            le32(
                0xec0234a3_57c8ad05_341010a6_0a397d9b,
                0x99796b13_b4f866f1_868d34f3_73bfa698,
            )
        );

        // The shared secret is symmetric
        assert_eq!(dhkey, skb.dh_key(ska.public_key()).unwrap());
    }

    #[test]
    fn test_ecdh_rejects_reflected_key() {
        let skb = EcdhKeypair::from_private_bytes(&be32(
            0x55188b3d_32f6bb9a_900afcfb_eed4e72a,
            0x59cb9ac2_f19d7cfb_6b4fdd49_f47fc5fd,
        ))
        .unwrap();

        assert_eq!(
            skb.dh_key(skb.public_key()),
            Err(PairingFailure::DhKeyCheckFailed)
        );
    }

    #[test]
    fn test_ecdh_rejects_off_curve_point() {
        let keypair = EcdhKeypair::generate();
        let bogus = [0x42u8; 64];
        assert_eq!(
            keypair.dh_key(&bogus),
            Err(PairingFailure::DhKeyCheckFailed)
        );
    }

    #[test]
    fn test_generated_oob_data_confirm_binds_key() {
        let oob = generate_oob_data();

        let mut pk_x = [0u8; 32];
        pk_x.copy_from_slice(&oob.public_key[0..32]);
        assert_eq!(oob.c, f4(&pk_x, &pk_x, &oob.r, 0));

        // and the keypair round-trips through its private bytes
        let restored = EcdhKeypair::from_private_bytes(&oob.private_key).unwrap();
        assert_eq!(restored.public_key(), &oob.public_key);
    }
}
