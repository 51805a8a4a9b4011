//! Batch verification for BLS12-381 signatures.
//!
//! Verifies that every one of `n` independent `(public key, message,
//! signature)` triplets is individually valid with a single multi-pairing,
//! instead of `n` separate product checks.
//!
//! # How It Works
//!
//! Each triplet's verification equation `e(pk_i, H(msg_i)) ==
//! e(G1::one(), sig_i)` is raised to a random non-zero weight `c_i` and the
//! equations are multiplied together:
//!
//! ```txt
//! e(-G1::one(), sum_i(c_i * sig_i)) * prod_i(e(c_i * pk_i, H(msg_i))) == 1
//! ```
//!
//! Without the weights, an attacker could submit invalid signatures whose
//! errors cancel in the product (one "too high", one "too low" by the same
//! amount). With them, cancellation requires predicting the weights before
//! submission, so they are derived from caller-supplied randomness and
//! committed to the entire input.
//!
//! # Security
//!
//! The weights are 64 bits wide, which keeps the extra scalar
//! multiplications cheap while bounding an attacker to a `2^-64` success
//! probability per batch. The caller must not keep one `entropy` value
//! alive across more than `2^64` adversarial submissions, and must draw it
//! from a cryptographically secure source.

use crate::{
    group::{Element, G1, G2, MESSAGE},
    Error,
};
use blst::{Pairing, BLS12_381_NEG_G1};
use sha2::{Digest, Sha256};

/// Derives one non-zero 64-bit weight per triplet from a SHA-256 transcript
/// keyed by the caller's randomness.
///
/// The transcript commits to every input byte, so an attacker choosing any
/// part of a triplet cannot choose its weight independently of the rest of
/// the batch.
fn derive_weights(
    entropy: &[u8; 32],
    publics: &[G1],
    messages: &[&[u8]],
    signatures: &[G2],
) -> Vec<u64> {
    let mut transcript = Sha256::new();
    transcript.update(entropy);
    for ((public, message), signature) in publics.iter().zip(messages).zip(signatures) {
        transcript.update(public.serialize());
        transcript.update((message.len() as u64).to_be_bytes());
        transcript.update(message);
        transcript.update(signature.serialize());
    }
    let key = transcript.finalize();

    (0..publics.len() as u64)
        .map(|index| {
            let mut counter = 0u64;
            loop {
                let mut prf = Sha256::new();
                prf.update(&key);
                prf.update(index.to_be_bytes());
                prf.update(counter.to_be_bytes());
                let digest = prf.finalize();
                let mut weight = [0u8; 8];
                weight.copy_from_slice(&digest[..8]);
                let weight = u64::from_be_bytes(weight);
                if weight != 0 {
                    break weight;
                }
                counter += 1;
            }
        })
        .collect()
}

/// Verifies a batch of independent `(public key, message, signature)`
/// triplets.
///
/// Returns `Ok(())` only when every triplet would verify individually
/// (up to the `2^-64` batch soundness bound); a single invalid triplet
/// fails the whole batch with [`Error::VerificationFailure`].
///
/// # Warning
///
/// This function assumes a group check was already performed on each public
/// key and signature. Duplicate triplets are safe: the weights make each
/// pair's contribution independent.
pub fn verify(
    publics: &[G1],
    messages: &[&[u8]],
    signatures: &[G2],
    entropy: &[u8; 32],
) -> Result<(), Error> {
    if publics.is_empty() {
        return Err(Error::ZeroLengthAggregation);
    }
    if publics.len() != messages.len() || publics.len() != signatures.len() {
        return Err(Error::InconsistentLengthsOfInputs);
    }
    if publics.iter().any(G1::is_zero) || signatures.iter().any(G2::is_zero) {
        return Err(Error::PointAtInfinity);
    }

    let weights = derive_weights(entropy, publics, messages, signatures);

    // Create a pairing context
    //
    // We only handle pre-hashed messages, so we leave the domain separator tag (`DST`) empty.
    let mut pairing = Pairing::new(false, &[]);

    // Aggregate `e(c_i * pk_i, H(msg_i))` for each triplet while summing
    // `c_i * sig_i`.
    let mut combined = G2::zero();
    for (i, weight) in weights.iter().enumerate() {
        let mut scaled_signature = signatures[i];
        scaled_signature.mul_u64(*weight);
        combined.add(&scaled_signature);

        let mut scaled_public = publics[i];
        scaled_public.mul_u64(*weight);
        let mut hm = G2::zero();
        hm.map(MESSAGE, messages[i]);
        let q = hm.as_blst_p2_affine();
        let p = scaled_public.as_blst_p1_affine();
        pairing.raw_aggregate(&q, &p);
    }

    // Aggregate `e(-G1::one(), sum_i(c_i * sig_i))`
    let q = combined.as_blst_p2_affine();
    unsafe {
        pairing.raw_aggregate(&q, &BLS12_381_NEG_G1);
    }

    // Finalize the pairing accumulation and verify the result
    pairing.commit();
    if !pairing.finalverify(None) {
        return Err(Error::VerificationFailure);
    }
    Ok(())
}
