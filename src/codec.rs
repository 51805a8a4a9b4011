//! Compressed (ZCash-style) codec for BLS12-381 elements.
//!
//! Points are encoded x-only, big-endian, with three metadata bits in the
//! most significant byte: bit 7 marks the compressed form, bit 6 the point
//! at infinity, and bit 5 the sign of y (set iff y is the lexicographically
//! larger of the two roots). A G2 coordinate packs `x.c1` in the first 48
//! bytes and `x.c0` in the second 48.
//!
//! Decoding is implemented over the `blst` base-field primitives rather
//! than `blst_p1_uncompress` so that every failure mode maps to a distinct
//! [`Error`]: malformed metadata, an out-of-range coordinate, an x with no
//! square root, the point at infinity, and (for the checked variants) a
//! point outside the prime-order subgroup are all told apart.
//!
//! Sign recovery is branch-free: the candidate root is conditionally
//! negated with `blst_fp_cneg`/`blst_fp2_cneg` driven by the XOR of the
//! computed and requested lexicographic predicates.

use crate::{
    group::{Scalar, G1, G2, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH},
    Error,
};
use blst::{
    blst_bendian_from_fp, blst_fp, blst_fp2, blst_fp2_add, blst_fp2_cneg, blst_fp2_mul,
    blst_fp2_sqr, blst_fp2_sqrt, blst_fp_add, blst_fp_cneg, blst_fp_from_bendian,
    blst_fp_from_uint64, blst_fp_mul, blst_fp_sqr, blst_fp_sqrt, blst_fr, blst_fr_from_scalar,
    blst_p1_affine, blst_p1_affine_in_g1, blst_p2_affine, blst_p2_affine_in_g2, blst_scalar,
    blst_scalar_fr_check, blst_scalar_from_bendian,
};
use zeroize::Zeroize;

/// Bit 7 of byte 0: the encoding is in compressed form (always set here).
const COMPRESSED_FLAG: u8 = 0b1000_0000;

/// Bit 6 of byte 0: the encoding is the point at infinity.
const INFINITY_FLAG: u8 = 0b0100_0000;

/// Bit 5 of byte 0: y is the lexicographically larger root.
const SIGN_FLAG: u8 = 0b0010_0000;

/// The three metadata bits of byte 0.
const FLAG_MASK: u8 = COMPRESSED_FLAG | INFINITY_FLAG | SIGN_FLAG;

/// The base field modulus `p`, big-endian.
const MODULUS: [u8; 48] = [
    0x1a, 0x01, 0x11, 0xea, 0x39, 0x7f, 0xe6, 0x9a, 0x4b, 0x1b, 0xa7, 0xb6, 0x43, 0x4b, 0xac,
    0xd7, 0x64, 0x77, 0x4b, 0x84, 0xf3, 0x85, 0x12, 0xbf, 0x67, 0x30, 0xd2, 0xa0, 0xf6, 0xb0,
    0xf6, 0x24, 0x1e, 0xab, 0xff, 0xfe, 0xb1, 0x53, 0xff, 0xff, 0xb9, 0xfe, 0xff, 0xff, 0xff,
    0xff, 0xaa, 0xab,
];

/// `(p + 1) / 2`, big-endian. A root y is the lexicographically larger of
/// `{y, -y}` iff `y >= (p + 1) / 2`.
const SIGN_THRESHOLD: [u8; 48] = [
    0x0d, 0x00, 0x88, 0xf5, 0x1c, 0xbf, 0xf3, 0x4d, 0x25, 0x8d, 0xd3, 0xdb, 0x21, 0xa5, 0xd6,
    0x6b, 0xb2, 0x3b, 0xa5, 0xc2, 0x79, 0xc2, 0x89, 0x5f, 0xb3, 0x98, 0x69, 0x50, 0x7b, 0x58,
    0x7b, 0x12, 0x0f, 0x55, 0xff, 0xff, 0x58, 0xa9, 0xff, 0xff, 0xdc, 0xff, 0x7f, 0xff, 0xff,
    0xff, 0xd5, 0x56,
];

/// The curve coefficient 4 as `uint64` limbs (`y^2 = x^3 + 4` on G1; the
/// twist coefficient is `4 + 4u`, i.e. 4 in both components).
const COEFF_B: [u64; 6] = [4, 0, 0, 0, 0, 0];

/// Returns whether `a < b` as big-endian integers of equal width.
///
/// Borrow-chain subtraction; runs in time independent of the values.
fn be_lt(a: &[u8], b: &[u8]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut borrow = 0u8;
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        let d = (*x as i16) - (*y as i16) - (borrow as i16);
        borrow = ((d >> 8) & 1) as u8;
    }
    borrow == 1
}

/// Returns whether every byte is zero, without short-circuiting.
fn be_is_zero(a: &[u8]) -> bool {
    a.iter().fold(0u8, |acc, byte| acc | byte) == 0
}

/// Decodes a big-endian base-field coordinate, rejecting values `>= p`.
fn fp_from_bytes(bytes: &[u8; 48]) -> Result<blst_fp, Error> {
    if !be_lt(bytes, &MODULUS) {
        return Err(Error::CoordinateGreaterOrEqualThanModulus);
    }
    let mut fp = blst_fp::default();
    unsafe {
        blst_fp_from_bendian(&mut fp, bytes.as_ptr());
    }
    Ok(fp)
}

fn fp_to_bytes(fp: &blst_fp) -> [u8; 48] {
    let mut bytes = [0u8; 48];
    unsafe {
        blst_bendian_from_fp(bytes.as_mut_ptr(), fp);
    }
    bytes
}

/// Returns whether y is the lexicographically larger of `{y, -y}`.
fn fp_is_larger_root(y: &blst_fp) -> bool {
    !be_lt(&fp_to_bytes(y), &SIGN_THRESHOLD)
}

/// The Fp2 sign rule: decide on `y.c1`, falling back to `y.c0` under the Fp
/// rule when `y.c1 == 0`. Evaluated as data flow over both components.
fn fp2_is_larger_root(y: &blst_fp2) -> bool {
    let c1 = fp_to_bytes(&y.fp[1]);
    let c1_is_zero = be_is_zero(&c1);
    let c1_larger = !be_lt(&c1, &SIGN_THRESHOLD);
    let c0_larger = !be_lt(&fp_to_bytes(&y.fp[0]), &SIGN_THRESHOLD);
    (c1_is_zero & c0_larger) | (!c1_is_zero & c1_larger)
}

/// Validates the metadata byte and splits out the sign request.
///
/// Returns `Ok(None)` for a well-formed infinity encoding (the caller
/// surfaces [`Error::PointAtInfinity`]), `Ok(Some(sign))` otherwise.
fn read_flags(bytes: &[u8]) -> Result<Option<bool>, Error> {
    if bytes[0] & COMPRESSED_FLAG == 0 {
        return Err(Error::InvalidEncoding);
    }
    if bytes[0] & INFINITY_FLAG != 0 {
        // Every bit other than C and I must be clear.
        if bytes[0] & !(COMPRESSED_FLAG | INFINITY_FLAG) != 0 || !be_is_zero(&bytes[1..]) {
            return Err(Error::InvalidEncoding);
        }
        return Ok(None);
    }
    Ok(Some(bytes[0] & SIGN_FLAG != 0))
}

/// Recovers a G1 affine point from its compressed encoding, without the
/// subgroup check.
fn g1_affine_from_compressed(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<blst_p1_affine, Error> {
    let wanted_larger = match read_flags(bytes)? {
        Some(sign) => sign,
        None => return Err(Error::PointAtInfinity),
    };
    let mut x_bytes = *bytes;
    x_bytes[0] &= !FLAG_MASK;
    let x = fp_from_bytes(&x_bytes)?;

    // y^2 = x^3 + 4
    let mut y2 = blst_fp::default();
    let mut b = blst_fp::default();
    let mut y = blst_fp::default();
    unsafe {
        blst_fp_sqr(&mut y2, &x);
        blst_fp_mul(&mut y2, &y2, &x);
        blst_fp_from_uint64(&mut b, COEFF_B.as_ptr());
        blst_fp_add(&mut y2, &y2, &b);
        if !blst_fp_sqrt(&mut y, &y2) {
            return Err(Error::PointNotOnCurve);
        }
        let computed_larger = fp_is_larger_root(&y);
        blst_fp_cneg(&mut y, &y, computed_larger != wanted_larger);
    }
    Ok(blst_p1_affine { x, y })
}

/// Recovers a G2 affine point from its compressed encoding, without the
/// subgroup check.
fn g2_affine_from_compressed(bytes: &[u8; SIGNATURE_LENGTH]) -> Result<blst_p2_affine, Error> {
    let wanted_larger = match read_flags(bytes)? {
        Some(sign) => sign,
        None => return Err(Error::PointAtInfinity),
    };
    let mut c1_bytes = [0u8; 48];
    c1_bytes.copy_from_slice(&bytes[..48]);
    c1_bytes[0] &= !FLAG_MASK;
    let mut c0_bytes = [0u8; 48];
    c0_bytes.copy_from_slice(&bytes[48..]);
    let x = blst_fp2 {
        fp: [fp_from_bytes(&c0_bytes)?, fp_from_bytes(&c1_bytes)?],
    };

    // y^2 = x^3 + 4(1 + u)
    let mut y2 = blst_fp2::default();
    let mut b = blst_fp2::default();
    let mut y = blst_fp2::default();
    unsafe {
        blst_fp2_sqr(&mut y2, &x);
        blst_fp2_mul(&mut y2, &y2, &x);
        blst_fp_from_uint64(&mut b.fp[0], COEFF_B.as_ptr());
        blst_fp_from_uint64(&mut b.fp[1], COEFF_B.as_ptr());
        blst_fp2_add(&mut y2, &y2, &b);
        if !blst_fp2_sqrt(&mut y, &y2) {
            return Err(Error::PointNotOnCurve);
        }
        let computed_larger = fp2_is_larger_root(&y);
        blst_fp2_cneg(&mut y, &y, computed_larger != wanted_larger);
    }
    Ok(blst_p2_affine { x, y })
}

impl G1 {
    /// Encodes the point in compressed form (48 bytes).
    pub fn serialize(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        if self.is_zero() {
            let mut out = [0u8; PUBLIC_KEY_LENGTH];
            out[0] = COMPRESSED_FLAG | INFINITY_FLAG;
            return out;
        }
        let affine = self.as_blst_p1_affine();
        let mut out = fp_to_bytes(&affine.x);
        out[0] |= COMPRESSED_FLAG;
        if fp_is_larger_root(&affine.y) {
            out[0] |= SIGN_FLAG;
        }
        out
    }

    /// Decodes a compressed point and checks subgroup membership.
    ///
    /// A well-formed encoding of the neutral element is reported as
    /// [`Error::PointAtInfinity`]; consensus callers reject it, aggregation
    /// callers may substitute [`Element::zero`](crate::group::Element::zero).
    pub fn deserialize(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, Error> {
        let affine = g1_affine_from_compressed(bytes)?;
        if !unsafe { blst_p1_affine_in_g1(&affine) } {
            return Err(Error::PointNotInSubgroup);
        }
        Ok(Self::from_affine(&affine))
    }

    /// Decodes a compressed point without the subgroup check.
    ///
    /// # Warning
    ///
    /// The subgroup check is the expensive part of decoding; this variant
    /// exists so it can be amortized (batched or cached) by the caller via
    /// [`G1::validate`]. A point that never passes `validate` must not
    /// reach any verification function: small-subgroup torsion components
    /// would otherwise go undetected.
    pub fn deserialize_unchecked(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, Error> {
        let affine = g1_affine_from_compressed(bytes)?;
        Ok(Self::from_affine(&affine))
    }
}

impl G2 {
    /// Encodes the point in compressed form (96 bytes).
    pub fn serialize(&self) -> [u8; SIGNATURE_LENGTH] {
        if self.is_zero() {
            let mut out = [0u8; SIGNATURE_LENGTH];
            out[0] = COMPRESSED_FLAG | INFINITY_FLAG;
            return out;
        }
        let affine = self.as_blst_p2_affine();
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..48].copy_from_slice(&fp_to_bytes(&affine.x.fp[1]));
        out[48..].copy_from_slice(&fp_to_bytes(&affine.x.fp[0]));
        out[0] |= COMPRESSED_FLAG;
        if fp2_is_larger_root(&affine.y) {
            out[0] |= SIGN_FLAG;
        }
        out
    }

    /// Decodes a compressed point and checks subgroup membership.
    ///
    /// A well-formed encoding of the neutral element is reported as
    /// [`Error::PointAtInfinity`].
    pub fn deserialize(bytes: &[u8; SIGNATURE_LENGTH]) -> Result<Self, Error> {
        let affine = g2_affine_from_compressed(bytes)?;
        if !unsafe { blst_p2_affine_in_g2(&affine) } {
            return Err(Error::PointNotInSubgroup);
        }
        Ok(Self::from_affine(&affine))
    }

    /// Decodes a compressed point without the subgroup check.
    ///
    /// # Warning
    ///
    /// See [`G1::deserialize_unchecked`]; the same contract applies on the
    /// twist.
    pub fn deserialize_unchecked(bytes: &[u8; SIGNATURE_LENGTH]) -> Result<Self, Error> {
        let affine = g2_affine_from_compressed(bytes)?;
        Ok(Self::from_affine(&affine))
    }
}

impl Scalar {
    /// Encodes the scalar as a 32-byte big-endian integer.
    pub fn serialize(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.as_slice()
    }

    /// Decodes a 32-byte big-endian integer, requiring `0 < s < r`.
    ///
    /// No key material survives the error paths.
    pub fn deserialize(bytes: &[u8; SECRET_KEY_LENGTH]) -> Result<Self, Error> {
        let mut scalar = blst_scalar::default();
        let mut fr = blst_fr::default();
        let result = unsafe {
            blst_scalar_from_bendian(&mut scalar, bytes.as_ptr());
            if be_is_zero(bytes) {
                Err(Error::ZeroSecretKey)
            } else if !blst_scalar_fr_check(&scalar) {
                Err(Error::SecretKeyLargerThanCurveOrder)
            } else {
                blst_fr_from_scalar(&mut fr, &scalar);
                Ok(Scalar(fr))
            }
        };
        scalar.b.zeroize();
        result
    }
}
