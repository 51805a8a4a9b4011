//! Digital signatures over the BLS12-381 curve using G1 as the public key
//! (48 bytes) and G2 as the signature (96 bytes).
//!
//! All operations use the proof-of-possession ciphersuite of the Ethereum
//! consensus protocol: messages are hashed to G2 under the domain separator
//! tag `BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_` with no augmentation.
//! You can read more about DSTs [here](https://datatracker.ietf.org/doc/html/draft-irtf-cfrg-bls-signature-05#section-4.2).
//!
//! # Warning
//!
//! Every verification function in this module assumes a group check was
//! already performed on its public keys and signatures (checked
//! deserialization or [`G1::validate`]/[`G2::validate`]). The aggregate
//! verifiers additionally assume the caller has collected a
//! proof-of-possession for each public key (or, for [`aggregate_verify`],
//! enforced message uniqueness): without one, rogue-key and split-zero
//! constructions can make an aggregate verify for messages no honest key
//! ever signed.

use crate::{
    group::{equal, Element, Scalar, G1, G2, MESSAGE},
    Error,
};
use blst::{Pairing, BLS12_381_NEG_G1};
use rand::RngCore;

/// Returns a new keypair derived from the provided randomness.
pub fn keypair<R: RngCore>(rng: &mut R) -> (Scalar, G1) {
    let private = Scalar::rand(rng);
    let public = public_key(&private);
    (private, public)
}

/// Returns the public key corresponding to the provided secret key.
pub fn public_key(private: &Scalar) -> G1 {
    let mut public = G1::one();
    public.mul(private);
    public
}

/// Signs the provided message with the secret key.
///
/// # Determinism
///
/// Signatures produced by this function are deterministic and are safe
/// to use in a consensus-critical context.
pub fn sign(private: &Scalar, message: &[u8]) -> G2 {
    let mut signature = G2::zero();
    signature.map(MESSAGE, message);
    signature.mul(private);
    signature
}

/// Verifies the signature over the message with the provided public key.
///
/// Neutral inputs are rejected with [`Error::PointAtInfinity`] before any
/// pairing work: the identity public key would make every signature over
/// the identity "valid".
pub fn verify(public: &G1, message: &[u8], signature: &G2) -> Result<(), Error> {
    if public.is_zero() || signature.is_zero() {
        return Err(Error::PointAtInfinity);
    }
    let mut hm = G2::zero();
    hm.map(MESSAGE, message);
    if !equal(public, signature, &hm) {
        return Err(Error::VerificationFailure);
    }
    Ok(())
}

/// Aggregates multiple public keys.
///
/// An empty slice aggregates to the neutral element; every verification
/// function rejects it, so the empty case cannot slip through downstream.
///
/// # Warning
///
/// This function assumes a group check was already performed on all
/// `publics`, that each public key is unique, and that the caller has a
/// proof-of-possession for each public key.
pub fn aggregate_public_keys(publics: &[G1]) -> G1 {
    let mut sum = G1::zero();
    for public in publics {
        sum.add(public);
    }
    sum
}

/// Aggregates multiple signatures.
///
/// An empty slice aggregates to the neutral element.
///
/// # Warning
///
/// This function assumes a group check was already performed on each
/// signature.
pub fn aggregate_signatures(signatures: &[G2]) -> G2 {
    let mut sum = G2::zero();
    for signature in signatures {
        sum.add(signature);
    }
    sum
}

/// Verifies an aggregate signature over a single message from multiple
/// public keys.
///
/// We can take advantage of the bilinearity property of pairings to sum the
/// public keys before a single product check (as long as all public keys
/// are unique and backed by a proof-of-possession).
pub fn fast_aggregate_verify(
    publics: &[G1],
    message: &[u8],
    signature: &G2,
) -> Result<(), Error> {
    if publics.is_empty() {
        return Err(Error::ZeroLengthAggregation);
    }
    if signature.is_zero() || publics.iter().any(G1::is_zero) {
        return Err(Error::PointAtInfinity);
    }
    let aggregate = aggregate_public_keys(publics);
    let mut hm = G2::zero();
    hm.map(MESSAGE, message);
    if !equal(&aggregate, signature, &hm) {
        return Err(Error::VerificationFailure);
    }
    Ok(())
}

/// Verifies an aggregate signature over one message per public key.
///
/// Accumulates `e(pk_i, H(msg_i))` terms and `e(-G1::one(), sig)` into a
/// single Miller loop with one final exponentiation, so the cost grows with
/// the number of pairs but only one product check is performed.
///
/// # Warning
///
/// The caller must enforce that messages are distinct or hold a
/// proof-of-possession for every public key; neither is checked here.
pub fn aggregate_verify(
    publics: &[G1],
    messages: &[&[u8]],
    signature: &G2,
) -> Result<(), Error> {
    if publics.is_empty() {
        return Err(Error::ZeroLengthAggregation);
    }
    if publics.len() != messages.len() {
        return Err(Error::InconsistentLengthsOfInputs);
    }
    if signature.is_zero() || publics.iter().any(G1::is_zero) {
        return Err(Error::PointAtInfinity);
    }

    // Create a pairing context
    //
    // We only handle pre-hashed messages, so we leave the domain separator tag (`DST`) empty.
    let mut pairing = Pairing::new(false, &[]);

    // Aggregate `e(-G1::one(), sig)`
    let q = signature.as_blst_p2_affine();
    unsafe {
        pairing.raw_aggregate(&q, &BLS12_381_NEG_G1);
    }

    // Aggregate `e(pk_i, H(msg_i))` for each pair
    for (public, message) in publics.iter().zip(messages) {
        let mut hm = G2::zero();
        hm.map(MESSAGE, message);
        let q = hm.as_blst_p2_affine();
        let p = public.as_blst_p1_affine();
        pairing.raw_aggregate(&q, &p);
    }

    // Finalize the pairing accumulation and verify the result
    pairing.commit();
    if !pairing.finalverify(None) {
        return Err(Error::VerificationFailure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blst::BLST_ERROR;
    use rand::prelude::*;

    /// Verify that a given message signature is valid according to `blst`.
    fn blst_verify(public: &G1, msg: &[u8], signature: &G2) -> Result<(), BLST_ERROR> {
        let public = blst::min_pk::PublicKey::from_bytes(&public.serialize()).unwrap();
        let signature = blst::min_pk::Signature::from_bytes(&signature.serialize()).unwrap();
        match signature.verify(true, msg, MESSAGE, &[], &public, true) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    fn blst_fast_aggregate_verify(
        publics: &[G1],
        msg: &[u8],
        signature: &G2,
    ) -> Result<(), BLST_ERROR> {
        let publics = publics
            .iter()
            .map(|pk| blst::min_pk::PublicKey::from_bytes(&pk.serialize()).unwrap())
            .collect::<Vec<_>>();
        let publics = publics.iter().collect::<Vec<_>>();
        let signature = blst::min_pk::Signature::from_bytes(&signature.serialize()).unwrap();
        match signature.fast_aggregate_verify(true, msg, MESSAGE, &publics) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    fn blst_aggregate_verify(
        publics: &[G1],
        msgs: &[&[u8]],
        signature: &G2,
    ) -> Result<(), BLST_ERROR> {
        let publics = publics
            .iter()
            .map(|pk| blst::min_pk::PublicKey::from_bytes(&pk.serialize()).unwrap())
            .collect::<Vec<_>>();
        let publics = publics.iter().collect::<Vec<_>>();
        let signature = blst::min_pk::Signature::from_bytes(&signature.serialize()).unwrap();
        match signature.aggregate_verify(true, msgs, MESSAGE, &publics, true) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            e => Err(e),
        }
    }

    #[test]
    fn test_sign_verify() {
        let (private, public) = keypair(&mut thread_rng());
        let msg = &[1, 9, 6, 9];
        let sig = sign(&private, msg);
        verify(&public, msg, &sig).expect("signature should be valid");
        blst_verify(&public, msg, &sig).expect("signature should be valid");
    }

    #[test]
    fn test_sign_matches_blst() {
        // Signing and key derivation agree byte-for-byte with the blst
        // reference implementation (and transitively with the Ethereum
        // bls12-381-tests vectors it is validated against).
        let (private, public) = keypair(&mut thread_rng());
        let blst_private = blst::min_pk::SecretKey::from_bytes(&private.serialize()).unwrap();
        assert_eq!(public.serialize(), blst_private.sk_to_pk().to_bytes());

        for msg in [&b"abc"[..], &[0xab; 32][..], &[]] {
            let signature = sign(&private, msg);
            let blst_signature = blst_private.sign(msg, MESSAGE, &[]);
            assert_eq!(signature.serialize(), blst_signature.to_bytes());
        }
    }

    #[test]
    fn test_verify_wrong_message() {
        let (private, public) = keypair(&mut thread_rng());
        let sig = sign(&private, b"message");
        assert_eq!(
            verify(&public, b"other message", &sig),
            Err(Error::VerificationFailure)
        );
    }

    #[test]
    fn test_verify_wrong_public_key() {
        let (private, _) = keypair(&mut thread_rng());
        let (_, public) = keypair(&mut thread_rng());
        let sig = sign(&private, b"message");
        assert_eq!(
            verify(&public, b"message", &sig),
            Err(Error::VerificationFailure)
        );
    }

    #[test]
    fn test_verify_tampered_signature() {
        let (private, public) = keypair(&mut thread_rng());
        let msg = b"message";
        let sig = sign(&private, msg);
        let mut encoded = sig.serialize();
        encoded[95] ^= 1;
        // The tampered encoding either no longer names a usable point or
        // decodes to a point that must fail verification.
        match G2::deserialize(&encoded) {
            Ok(tampered) => {
                assert_eq!(
                    verify(&public, msg, &tampered),
                    Err(Error::VerificationFailure)
                );
            }
            Err(err) => assert!(matches!(
                err,
                Error::PointNotOnCurve | Error::PointNotInSubgroup
            )),
        }
    }

    #[test]
    fn test_verify_rejects_infinity() {
        let (private, public) = keypair(&mut thread_rng());
        let msg = b"message";
        let sig = sign(&private, msg);
        assert_eq!(
            verify(&G1::zero(), msg, &sig),
            Err(Error::PointAtInfinity)
        );
        assert_eq!(
            verify(&public, msg, &G2::zero()),
            Err(Error::PointAtInfinity)
        );
    }

    #[test]
    fn test_aggregate_empty_is_neutral() {
        assert!(aggregate_public_keys(&[]).is_zero());
        assert!(aggregate_signatures(&[]).is_zero());
    }

    #[test]
    fn test_aggregate_matches_scalar_sum() {
        // Aggregating signatures over one message equals signing with the
        // sum of the secret keys.
        let (private1, _) = keypair(&mut thread_rng());
        let (private2, _) = keypair(&mut thread_rng());
        let msg = b"message";
        let aggregate = aggregate_signatures(&[sign(&private1, msg), sign(&private2, msg)]);

        let mut sum = private1.clone();
        sum.add(&private2);
        assert_eq!(aggregate, sign(&sum, msg));
    }

    #[test]
    fn test_fast_aggregate_verify() {
        let (private1, public1) = keypair(&mut thread_rng());
        let (private2, public2) = keypair(&mut thread_rng());
        let (private3, public3) = keypair(&mut thread_rng());
        let msg = b"message";
        let aggregate = aggregate_signatures(&[
            sign(&private1, msg),
            sign(&private2, msg),
            sign(&private3, msg),
        ]);
        let publics = [public1, public2, public3];

        fast_aggregate_verify(&publics, msg, &aggregate).expect("aggregate should be valid");
        blst_fast_aggregate_verify(&publics, msg, &aggregate)
            .expect("aggregate should be valid");

        // Dropping a signer invalidates the aggregate.
        assert_eq!(
            fast_aggregate_verify(&publics[..2], msg, &aggregate),
            Err(Error::VerificationFailure)
        );
    }

    #[test]
    fn test_fast_aggregate_verify_single_matches_verify() {
        let (private, public) = keypair(&mut thread_rng());
        let msg = b"message";
        let sig = sign(&private, msg);
        assert_eq!(
            verify(&public, msg, &sig).is_ok(),
            fast_aggregate_verify(&[public], msg, &sig).is_ok()
        );

        let bad = sign(&private, b"other message");
        assert_eq!(
            verify(&public, msg, &bad).is_err(),
            fast_aggregate_verify(&[public], msg, &bad).is_err()
        );
    }

    #[test]
    fn test_fast_aggregate_verify_shape_errors() {
        let (private, public) = keypair(&mut thread_rng());
        let msg = b"message";
        let sig = sign(&private, msg);
        assert_eq!(
            fast_aggregate_verify(&[], msg, &sig),
            Err(Error::ZeroLengthAggregation)
        );
        assert_eq!(
            fast_aggregate_verify(&[public, G1::zero()], msg, &sig),
            Err(Error::PointAtInfinity)
        );
        assert_eq!(
            fast_aggregate_verify(&[public], msg, &G2::zero()),
            Err(Error::PointAtInfinity)
        );
    }

    #[test]
    fn test_aggregate_verify() {
        let (private1, public1) = keypair(&mut thread_rng());
        let (private2, public2) = keypair(&mut thread_rng());
        let messages: [&[u8]; 2] = [b"message 1", b"message 2"];
        let aggregate = aggregate_signatures(&[
            sign(&private1, messages[0]),
            sign(&private2, messages[1]),
        ]);
        let publics = [public1, public2];

        aggregate_verify(&publics, &messages, &aggregate).expect("aggregate should be valid");
        blst_aggregate_verify(&publics, &messages, &aggregate)
            .expect("aggregate should be valid");

        // Swapping one message invalidates the aggregate.
        let tampered: [&[u8]; 2] = [b"message 1", b"message 3"];
        assert_eq!(
            aggregate_verify(&publics, &tampered, &aggregate),
            Err(Error::VerificationFailure)
        );
    }

    #[test]
    fn test_aggregate_verify_shape_errors() {
        let (private, public) = keypair(&mut thread_rng());
        let sig = sign(&private, b"message");
        let one_message: [&[u8]; 1] = [b"message"];
        let two_messages: [&[u8]; 2] = [b"message", b"message"];

        assert_eq!(
            aggregate_verify(&[], &one_message, &sig),
            Err(Error::ZeroLengthAggregation)
        );
        assert_eq!(
            aggregate_verify(&[public], &two_messages, &sig),
            Err(Error::InconsistentLengthsOfInputs)
        );
        assert_eq!(
            aggregate_verify(&[G1::zero()], &one_message, &sig),
            Err(Error::PointAtInfinity)
        );
        assert_eq!(
            aggregate_verify(&[public], &one_message, &G2::zero()),
            Err(Error::PointAtInfinity)
        );
    }
}
