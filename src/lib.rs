//! BLS12-381 signatures for the Ethereum consensus protocol.
//!
//! This crate implements the core of the IETF BLS signature scheme
//! (`draft-irtf-cfrg-bls-signature-05`) in the proof-of-possession
//! ciphersuite `BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_`: public keys
//! are points on G1 (48 bytes compressed), signatures are points on G2
//! (96 bytes compressed), and messages are hashed to G2 with SHA-256
//! `expand_message_xmd` followed by the simplified SWU map.
//!
//! Curve arithmetic, pairings, and hashing to the curve are provided by
//! [`blst`](https://github.com/supranational/blst). Points are encoded in
//! the "ZCash BLS12-381" compressed format
//! (<https://github.com/supranational/blst/tree/master?tab=readme-ov-file#serialization-format>),
//! implemented here directly over the base-field primitives so that every
//! malformed input is classified by a precise [`Error`] rather than a
//! catch-all decoding failure.
//!
//! # Warning
//!
//! Ensure that points are checked to belong to the correct subgroup
//! (G1 or G2) to prevent small subgroup attacks. This is particularly
//! important when handling deserialized points or points received from
//! untrusted sources: [`group::G1::deserialize`] and
//! [`group::G2::deserialize`] perform the check, the `_unchecked` variants
//! defer it to an explicit `validate` call. Feeding unchecked points to any
//! verification function violates its contract.
//!
//! The aggregation-based verifiers assume the caller has enforced
//! proof-of-possession for every public key (or, for
//! [`ops::aggregate_verify`], message uniqueness); neither rogue-key nor
//! split-zero protection is applied at this layer.
//!
//! # Example
//!
//! ```rust
//! use eth_bls12381::ops;
//! use rand::rngs::OsRng;
//!
//! // Generate a keypair
//! let (private, public) = ops::keypair(&mut OsRng);
//!
//! // Sign a message
//! let message = b"hello world";
//! let signature = ops::sign(&private, message);
//!
//! // Verify the signature
//! ops::verify(&public, message, &signature).expect("signature should be valid");
//! ```

pub mod batch;
mod codec;
pub mod group;
pub mod ops;

pub use group::{
    PublicKey, Scalar, SecretKey, Signature, G1, G2, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};

use thiserror::Error;

/// Errors that can occur when working with BLS12-381 keys, points, and
/// signatures.
///
/// Encoding errors (`InvalidEncoding`, `CoordinateGreaterOrEqualThanModulus`,
/// `ZeroLengthAggregation`, `InconsistentLengthsOfInputs`) describe the shape
/// of the input; validity errors (`ZeroSecretKey`,
/// `SecretKeyLargerThanCurveOrder`, `PointAtInfinity`, `PointNotOnCurve`,
/// `PointNotInSubgroup`) each pinpoint one failed predicate;
/// `VerificationFailure` is the cryptographic outcome for a well-formed but
/// incorrect signature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("invalid encoding")]
    InvalidEncoding,
    #[error("coordinate greater or equal than modulus")]
    CoordinateGreaterOrEqualThanModulus,
    #[error("point at infinity")]
    PointAtInfinity,
    #[error("point not on curve")]
    PointNotOnCurve,
    #[error("point not in subgroup")]
    PointNotInSubgroup,
    #[error("zero secret key")]
    ZeroSecretKey,
    #[error("secret key larger than curve order")]
    SecretKeyLargerThanCurveOrder,
    #[error("zero length aggregation")]
    ZeroLengthAggregation,
    #[error("inconsistent lengths of inputs")]
    InconsistentLengthsOfInputs,
    #[error("verification failure")]
    VerificationFailure,
}
