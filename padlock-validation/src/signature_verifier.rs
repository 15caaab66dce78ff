// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compact JWS signature verification.
//!
//! The verification path is:
//! - Parse the token structure and decode the `x5c` chain.
//! - Check the leaf certificate is X.509 DER and take its SubjectPublicKeyInfo.
//! - Resolve `alg` against the closed [`JwsAlgorithm`] set and the caller's allow-list.
//! - Verify the signature over `header_b64 '.' payload_b64`.
//! - Only then decode the payload into [`Claims`].
//!
//! Claims of a token whose signature does not verify are never produced.

use padlock_common::{CertificateChain, Claims, JwsHeader, MalformedTokenError, SignedToken};
use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::pss;
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier;
use tracing::debug;

use crate::algorithms::JwsAlgorithm;
use crate::error::SignatureError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureVerifyOptions {
    /// If set, only these algorithms are accepted. `None` accepts every [`JwsAlgorithm`].
    pub allowed_algorithms: Option<Vec<JwsAlgorithm>>,
}

impl SignatureVerifyOptions {
    pub fn with_allowed_algorithms(algs: impl IntoIterator<Item = JwsAlgorithm>) -> Self {
        Self {
            allowed_algorithms: Some(algs.into_iter().collect()),
        }
    }

    pub fn allows(&self, alg: JwsAlgorithm) -> bool {
        self.allowed_algorithms.as_ref().map_or(true, |list| list.contains(&alg))
    }
}

/// A token whose signature verified under its leaf certificate.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub algorithm: JwsAlgorithm,
    pub header: JwsHeader,
    pub chain: CertificateChain,
    pub claims: Claims,
}

/// Verify a compact JWS and decode its claims.
///
/// Pure: no I/O, no clock, no global state.
pub fn verify_and_decode(token: &[u8], options: &SignatureVerifyOptions) -> Result<DecodedToken, SignatureError> {
    let parsed = SignedToken::parse(token)?;

    let leaf_spki = leaf_spki_der(parsed.certificate_chain().leaf())?;
    let algorithm = resolve_alg(parsed.header(), options)?;

    verify_signature(algorithm, &leaf_spki, &parsed.signing_input(), parsed.signature())
        .map_err(|(code, msg)| {
            debug!(alg = %algorithm, code, "token signature rejected");
            SignatureError::SignatureInvalid(msg)
        })?;

    // Authenticated from here on.
    let claims = Claims::from_json_slice(parsed.payload())?;
    let header = parsed.header().clone();

    Ok(DecodedToken {
        algorithm,
        header,
        chain: parsed.into_certificate_chain(),
        claims,
    })
}

fn resolve_alg(header: &JwsHeader, options: &SignatureVerifyOptions) -> Result<JwsAlgorithm, SignatureError> {
    let name = header
        .alg
        .as_deref()
        .ok_or_else(|| SignatureError::UnsupportedAlgorithm("missing alg header".to_string()))?;

    let alg = JwsAlgorithm::from_name(name).ok_or_else(|| {
        let why = if name.eq_ignore_ascii_case("none") {
            "unsecured JWS".to_string()
        } else if name.starts_with("HS") {
            "symmetric algorithms are not accepted".to_string()
        } else {
            "unknown algorithm".to_string()
        };
        SignatureError::UnsupportedAlgorithm(format!("{name}: {why}"))
    })?;

    if !options.allows(alg) {
        return Err(SignatureError::UnsupportedAlgorithm(format!("{alg}: not in the allowed algorithm list")));
    }

    Ok(alg)
}

/// DER SubjectPublicKeyInfo of the leaf certificate.
fn leaf_spki_der(leaf_der: &[u8]) -> Result<Vec<u8>, MalformedTokenError> {
    let (_, cert) = x509_parser::parse_x509_certificate(leaf_der)
        .map_err(|e| MalformedTokenError::new(format!("x5c leaf certificate is not valid DER: {e}")))?;
    Ok(cert.tbs_certificate.subject_pki.raw.to_vec())
}

/// Dispatch to the per-algorithm verifier.
///
/// Errors are `(code, message)` pairs: `INVALID_PUBLIC_KEY` when the leaf key
/// does not fit the algorithm, `BAD_SIGNATURE` otherwise.
fn verify_signature(alg: JwsAlgorithm, spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), (&'static str, String)> {
    match alg {
        JwsAlgorithm::ES256 => verify_ecdsa_p256(spki, msg, sig),
        JwsAlgorithm::ES384 => verify_ecdsa_p384(spki, msg, sig),
        JwsAlgorithm::ES512 => verify_ecdsa_p521(spki, msg, sig),
        JwsAlgorithm::RS256 => {
            let sig = rsa_pkcs1_signature(alg, sig)?;
            check(&pkcs1v15::VerifyingKey::<Sha256>::new(rsa_public_key(spki)?), msg, &sig)
        }
        JwsAlgorithm::RS384 => {
            let sig = rsa_pkcs1_signature(alg, sig)?;
            check(&pkcs1v15::VerifyingKey::<Sha384>::new(rsa_public_key(spki)?), msg, &sig)
        }
        JwsAlgorithm::RS512 => {
            let sig = rsa_pkcs1_signature(alg, sig)?;
            check(&pkcs1v15::VerifyingKey::<Sha512>::new(rsa_public_key(spki)?), msg, &sig)
        }
        JwsAlgorithm::PS256 => {
            let sig = rsa_pss_signature(alg, sig)?;
            check(&pss::VerifyingKey::<Sha256>::new(rsa_public_key(spki)?), msg, &sig)
        }
        JwsAlgorithm::PS384 => {
            let sig = rsa_pss_signature(alg, sig)?;
            check(&pss::VerifyingKey::<Sha384>::new(rsa_public_key(spki)?), msg, &sig)
        }
        JwsAlgorithm::PS512 => {
            let sig = rsa_pss_signature(alg, sig)?;
            check(&pss::VerifyingKey::<Sha512>::new(rsa_public_key(spki)?), msg, &sig)
        }
    }
}

fn check<S, V: Verifier<S>>(vk: &V, msg: &[u8], sig: &S) -> Result<(), (&'static str, String)> {
    vk.verify(msg, sig)
        .map_err(|_| ("BAD_SIGNATURE", "signature verification failed".to_string()))
}

/// Verify ES256 (P-256 ECDSA).
fn verify_ecdsa_p256(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), (&'static str, String)> {
    let pk = p256::PublicKey::from_public_key_der(spki)
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("leaf key is not a P-256 key: {e}")))?;

    // SEC1 point bytes are what the ECDSA verifying key expects.
    let ep = pk.to_encoded_point(false);
    let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("bad P-256 public key: {e}")))?;

    // JWS carries ECDSA signatures as fixed-width `r || s`, not DER.
    let signature = p256::ecdsa::Signature::from_slice(sig)
        .map_err(|e| ("BAD_SIGNATURE", format!("bad ES256 signature: {e}")))?;
    check(&vk, msg, &signature)
}

/// Verify ES384 (P-384 ECDSA).
fn verify_ecdsa_p384(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), (&'static str, String)> {
    let pk = p384::PublicKey::from_public_key_der(spki)
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("leaf key is not a P-384 key: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p384::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("bad P-384 public key: {e}")))?;
    let signature = p384::ecdsa::Signature::from_slice(sig)
        .map_err(|e| ("BAD_SIGNATURE", format!("bad ES384 signature: {e}")))?;
    check(&vk, msg, &signature)
}

/// Verify ES512 (P-521 ECDSA).
fn verify_ecdsa_p521(spki: &[u8], msg: &[u8], sig: &[u8]) -> Result<(), (&'static str, String)> {
    let pk = p521::PublicKey::from_public_key_der(spki)
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("leaf key is not a P-521 key: {e}")))?;
    let ep = pk.to_encoded_point(false);
    let vk = p521::ecdsa::VerifyingKey::from_sec1_bytes(ep.as_bytes())
        .map_err(|e| ("INVALID_PUBLIC_KEY", format!("bad P-521 public key: {e}")))?;
    let signature = p521::ecdsa::Signature::from_slice(sig)
        .map_err(|e| ("BAD_SIGNATURE", format!("bad ES512 signature: {e}")))?;
    check(&vk, msg, &signature)
}

fn rsa_public_key(spki: &[u8]) -> Result<RsaPublicKey, (&'static str, String)> {
    RsaPublicKey::from_public_key_der(spki).map_err(|e| ("INVALID_PUBLIC_KEY", format!("leaf key is not an RSA key: {e}")))
}

fn rsa_pkcs1_signature(alg: JwsAlgorithm, sig: &[u8]) -> Result<pkcs1v15::Signature, (&'static str, String)> {
    pkcs1v15::Signature::try_from(sig).map_err(|e| ("BAD_SIGNATURE", format!("bad {alg} signature bytes: {e}")))
}

fn rsa_pss_signature(alg: JwsAlgorithm, sig: &[u8]) -> Result<pss::Signature, (&'static str, String)> {
    pss::Signature::try_from(sig).map_err(|e| ("BAD_SIGNATURE", format!("bad {alg} signature bytes: {e}")))
}
