//! Group operations over the BLS12-381 scalar field and curves.
//!
//! This module wraps the `blst` scalar field and curve types, exposing the
//! operations the signature layer is built from: point addition, scalar
//! multiplication, hashing to the curve, and the pairing product check.
//!
//! # Warning
//!
//! Ensure that points are checked to belong to the correct subgroup
//! (G1 or G2) to prevent small subgroup attacks. This is particularly
//! important when handling deserialized points or points received from
//! untrusted sources: use the checked deserializers in this crate, or call
//! [`G1::validate`]/[`G2::validate`] before trusting a point.

use crate::Error;
use blst::{
    blst_bendian_from_scalar, blst_fr, blst_fr_add, blst_fr_from_scalar, blst_fr_mul,
    blst_hash_to_g2, blst_keygen, blst_p1, blst_p1_add_or_double, blst_p1_affine,
    blst_p1_from_affine, blst_p1_in_g1, blst_p1_is_equal, blst_p1_is_inf, blst_p1_mult,
    blst_p1_on_curve, blst_p1_to_affine, blst_p2, blst_p2_add_or_double, blst_p2_affine,
    blst_p2_from_affine, blst_p2_in_g2, blst_p2_is_equal, blst_p2_is_inf, blst_p2_mult,
    blst_p2_on_curve, blst_p2_to_affine, blst_scalar, blst_scalar_from_fr, blst_scalar_from_uint64,
    Pairing, BLS12_381_G1, BLS12_381_G2, BLS12_381_NEG_G1,
};
use rand::RngCore;
use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    ptr,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain separation tag used when hashing a message to the curve.
///
/// Reference: <https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-bls-signature-05#name-ciphersuites>
pub type DST = &'static [u8];

/// Domain separation tag of the proof-of-possession ciphersuite used by the
/// Ethereum consensus protocol (public keys on G1, signatures on G2, SHA-256
/// message expansion).
pub const MESSAGE: DST = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// An element of a group.
pub trait Element: Clone + Eq + PartialEq + Send + Sync {
    /// Returns the additive identity.
    fn zero() -> Self;

    /// Returns the multiplicative identity (the group generator for points).
    fn one() -> Self;

    /// Adds to self in-place.
    fn add(&mut self, rhs: &Self);

    /// Multiplies self in-place.
    fn mul(&mut self, rhs: &Scalar);
}

/// Wrapper around [`blst_fr`] that represents an element of the BLS12-381
/// scalar field `F_r`.
///
/// The new-type is marked `#[repr(transparent)]`, so it has exactly the same
/// memory layout as the underlying `blst_fr`, allowing safe passage across
/// the C FFI boundary without additional transmutation.
///
/// All arithmetic is performed modulo the prime
/// `r = 0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001`,
/// the order of the BLS12-381 G1/G2 groups.
#[derive(Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct Scalar(pub(crate) blst_fr);

/// Number of bytes in the canonical big-endian encoding of a secret key.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Effective bit-length of the field modulus `r` (`ceil(log2 r) = 255`).
///
/// Scalar multiplications always iterate over this many bits so the work
/// done never depends on the scalar's value.
const SCALAR_BITS: usize = 255;

/// `R = 2^256 mod r` in little-endian Montgomery form, which is equivalent
/// to 1 in little-endian non-Montgomery form:
///
/// ```txt
/// mod(2^256, 0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001) = 0x1824b159acc5056f998c4fefecbc4ff55884b7fa0003480200000001fffffffe
/// ```
///
/// Reference: <https://github.com/filecoin-project/blstrs/blob/ffbb41d1495d84e40a712583346439924603b49a/src/scalar.rs#L77-L89>
const BLST_FR_ONE: Scalar = Scalar(blst_fr {
    l: [
        0x0000_0001_ffff_fffe,
        0x5884_b7fa_0003_4802,
        0x998c_4fef_ecbc_4ff5,
        0x1824_b159_acc5_056f,
    ],
});

/// A point on the BLS12-381 G1 curve.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct G1(pub(crate) blst_p1);

/// The size in bytes of a compressed G1 element.
pub const G1_ELEMENT_BYTE_LENGTH: usize = 48;

/// A point on the BLS12-381 G2 curve.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct G2(pub(crate) blst_p2);

/// The size in bytes of a compressed G2 element.
pub const G2_ELEMENT_BYTE_LENGTH: usize = 96;

/// The secret key type.
pub type SecretKey = Scalar;

/// The public key type (G1).
pub type PublicKey = G1;

/// The public key length (compressed).
pub const PUBLIC_KEY_LENGTH: usize = G1_ELEMENT_BYTE_LENGTH;

/// The signature type (G2).
pub type Signature = G2;

/// The signature length (compressed).
pub const SIGNATURE_LENGTH: usize = G2_ELEMENT_BYTE_LENGTH;

impl Scalar {
    /// Generates a random non-zero scalar using the provided RNG.
    pub fn rand<R: RngCore>(rng: &mut R) -> Self {
        // Generate a random 64 byte buffer
        let mut ikm = [0u8; 64];
        rng.fill_bytes(&mut ikm);

        // Generate a scalar from the randomly populated buffer
        let mut ret = blst_fr::default();
        unsafe {
            let mut sc = blst_scalar::default();
            blst_keygen(&mut sc, ikm.as_ptr(), ikm.len(), ptr::null(), 0);
            blst_fr_from_scalar(&mut ret, &sc);
            sc.b.zeroize();
        }

        // Zeroize the ikm buffer
        ikm.zeroize();
        Self(ret)
    }

    /// Checks that the scalar is usable as a secret key.
    ///
    /// A scalar is always reduced modulo `r`, so the only invalid state a
    /// constructed scalar can be in is zero ([`Error::ZeroSecretKey`]).
    /// Out-of-range encodings are rejected at deserialization.
    pub fn validate(&self) -> Result<(), Error> {
        if *self == Self::zero() {
            return Err(Error::ZeroSecretKey);
        }
        Ok(())
    }

    /// Encodes the scalar into a big-endian byte array.
    pub(crate) fn as_slice(&self) -> [u8; SECRET_KEY_LENGTH] {
        let mut slice = [0u8; SECRET_KEY_LENGTH];
        unsafe {
            let mut scalar = blst_scalar::default();
            blst_scalar_from_fr(&mut scalar, &self.0);
            blst_bendian_from_scalar(slice.as_mut_ptr(), &scalar);
            scalar.b.zeroize();
        }
        slice
    }
}

impl Element for Scalar {
    fn zero() -> Self {
        Self(blst_fr::default())
    }

    fn one() -> Self {
        BLST_FR_ONE
    }

    fn add(&mut self, rhs: &Self) {
        unsafe {
            blst_fr_add(&mut self.0, &self.0, &rhs.0);
        }
    }

    fn mul(&mut self, rhs: &Scalar) {
        unsafe {
            blst_fr_mul(&mut self.0, &self.0, &rhs.0);
        }
    }
}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut slice = self.as_slice();
        state.write(&slice);
        slice.zeroize();
    }
}

impl Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through formatting.
        write!(f, "Scalar(<redacted>)")
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.l.zeroize();
    }
}

impl Drop for Scalar {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for Scalar {}

impl G1 {
    /// Returns whether the point is the identity element.
    pub fn is_zero(&self) -> bool {
        unsafe { blst_p1_is_inf(&self.0) }
    }

    /// Checks that the point is a valid public key: not the identity, on the
    /// curve, and in the prime-order subgroup.
    ///
    /// The subgroup check dominates the cost; callers deserializing with
    /// [`G1::deserialize_unchecked`](crate::group::G1::deserialize_unchecked)
    /// are expected to run this before the point reaches any verification
    /// function.
    pub fn validate(&self) -> Result<(), Error> {
        unsafe {
            if blst_p1_is_inf(&self.0) {
                return Err(Error::PointAtInfinity);
            }
            if !blst_p1_on_curve(&self.0) {
                return Err(Error::PointNotOnCurve);
            }
            if !blst_p1_in_g1(&self.0) {
                return Err(Error::PointNotInSubgroup);
            }
        }
        Ok(())
    }

    /// Multiplies self in-place by a 64-bit weight.
    ///
    /// The iteration count is fixed at 64 bits regardless of the weight's
    /// value.
    pub(crate) fn mul_u64(&mut self, weight: u64) {
        let buffer = [weight, 0, 0, 0];
        let mut scalar = blst_scalar::default();
        unsafe {
            blst_scalar_from_uint64(&mut scalar, buffer.as_ptr());
            blst_p1_mult(&mut self.0, &self.0, scalar.b.as_ptr(), u64::BITS as usize);
        }
    }

    pub(crate) fn as_blst_p1_affine(&self) -> blst_p1_affine {
        let mut affine = blst_p1_affine::default();
        unsafe {
            blst_p1_to_affine(&mut affine, &self.0);
        }
        affine
    }

    pub(crate) fn from_affine(affine: &blst_p1_affine) -> Self {
        let mut ret = blst_p1::default();
        unsafe {
            blst_p1_from_affine(&mut ret, affine);
        }
        Self(ret)
    }
}

impl Element for G1 {
    fn zero() -> Self {
        Self(blst_p1::default())
    }

    fn one() -> Self {
        let mut ret = blst_p1::default();
        unsafe {
            blst_p1_from_affine(&mut ret, &BLS12_381_G1);
        }
        Self(ret)
    }

    fn add(&mut self, rhs: &Self) {
        unsafe {
            blst_p1_add_or_double(&mut self.0, &self.0, &rhs.0);
        }
    }

    fn mul(&mut self, rhs: &Scalar) {
        let mut scalar: blst_scalar = blst_scalar::default();
        unsafe {
            blst_scalar_from_fr(&mut scalar, &rhs.0);
            // To avoid a timing attack during signing, we always perform the same
            // number of iterations during scalar multiplication.
            blst_p1_mult(&mut self.0, &self.0, scalar.b.as_ptr(), SCALAR_BITS);
            scalar.b.zeroize();
        }
    }
}

impl PartialEq for G1 {
    fn eq(&self, other: &Self) -> bool {
        // Compare as group elements: distinct projective representations of
        // the same point are equal.
        unsafe { blst_p1_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G1 {}

impl Hash for G1 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.serialize());
    }
}

impl Debug for G1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.serialize()))
    }
}

impl Display for G1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.serialize()))
    }
}

impl G2 {
    /// Returns whether the point is the identity element.
    pub fn is_zero(&self) -> bool {
        unsafe { blst_p2_is_inf(&self.0) }
    }

    /// Checks that the point is a valid signature: not the identity, on the
    /// twist curve, and in the prime-order subgroup.
    pub fn validate(&self) -> Result<(), Error> {
        unsafe {
            if blst_p2_is_inf(&self.0) {
                return Err(Error::PointAtInfinity);
            }
            if !blst_p2_on_curve(&self.0) {
                return Err(Error::PointNotOnCurve);
            }
            if !blst_p2_in_g2(&self.0) {
                return Err(Error::PointNotInSubgroup);
            }
        }
        Ok(())
    }

    /// Maps the provided message to a G2 element.
    pub fn map(&mut self, dst: DST, message: &[u8]) {
        unsafe {
            blst_hash_to_g2(
                &mut self.0,
                message.as_ptr(),
                message.len(),
                dst.as_ptr(),
                dst.len(),
                ptr::null(),
                0,
            );
        }
    }

    /// Multiplies self in-place by a 64-bit weight.
    pub(crate) fn mul_u64(&mut self, weight: u64) {
        let buffer = [weight, 0, 0, 0];
        let mut scalar = blst_scalar::default();
        unsafe {
            blst_scalar_from_uint64(&mut scalar, buffer.as_ptr());
            blst_p2_mult(&mut self.0, &self.0, scalar.b.as_ptr(), u64::BITS as usize);
        }
    }

    pub(crate) fn as_blst_p2_affine(&self) -> blst_p2_affine {
        let mut affine = blst_p2_affine::default();
        unsafe {
            blst_p2_to_affine(&mut affine, &self.0);
        }
        affine
    }

    pub(crate) fn from_affine(affine: &blst_p2_affine) -> Self {
        let mut ret = blst_p2::default();
        unsafe {
            blst_p2_from_affine(&mut ret, affine);
        }
        Self(ret)
    }
}

impl Element for G2 {
    fn zero() -> Self {
        Self(blst_p2::default())
    }

    fn one() -> Self {
        let mut ret = blst_p2::default();
        unsafe {
            blst_p2_from_affine(&mut ret, &BLS12_381_G2);
        }
        Self(ret)
    }

    fn add(&mut self, rhs: &Self) {
        unsafe {
            blst_p2_add_or_double(&mut self.0, &self.0, &rhs.0);
        }
    }

    fn mul(&mut self, rhs: &Scalar) {
        let mut scalar = blst_scalar::default();
        unsafe {
            blst_scalar_from_fr(&mut scalar, &rhs.0);
            // To avoid a timing attack during signing, we always perform the same
            // number of iterations during scalar multiplication.
            blst_p2_mult(&mut self.0, &self.0, scalar.b.as_ptr(), SCALAR_BITS);
            scalar.b.zeroize();
        }
    }
}

impl PartialEq for G2 {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_p2_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G2 {}

impl Hash for G2 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.serialize());
    }
}

impl Debug for G2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.serialize()))
    }
}

impl Display for G2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.serialize()))
    }
}

/// Verifies that `e(pk,hm)` is equal to `e(G1::one(),sig)` using a single
/// product check with a negated G1 generator (`e(pk,hm) * e(-G1::one(),sig) == 1`).
pub(crate) fn equal(pk: &G1, sig: &G2, hm: &G2) -> bool {
    // Create a pairing context
    //
    // We only handle pre-hashed messages, so we leave the domain separator tag (`DST`) empty.
    let mut pairing = Pairing::new(false, &[]);

    // Convert `sig` into affine and aggregate `e(-G1::one(), sig)`
    let q = sig.as_blst_p2_affine();
    unsafe {
        pairing.raw_aggregate(&q, &BLS12_381_NEG_G1);
    }

    // Convert `pk` and `hm` into affine
    let p = pk.as_blst_p1_affine();
    let q = hm.as_blst_p2_affine();

    // Aggregate `e(pk, hm)`
    pairing.raw_aggregate(&q, &p);

    // Finalize the pairing accumulation and verify the result
    //
    // If `finalverify()` returns `true`, it means `e(pk,hm) * e(-G1::one(),sig) == 1`.
    // This is equivalent to `e(pk,hm) == e(G1::one(),sig)`.
    pairing.commit();
    pairing.finalverify(None)
}
