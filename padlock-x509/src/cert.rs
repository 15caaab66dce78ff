// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Owned view of the X.509 fields chain evaluation needs.

use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384, Sha512};
use sha2::Digest as _;
use signature::hazmat::PrehashVerifier as _;
use signature::Verifier as _;
use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use x509_parser::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCert {
    pub der: Vec<u8>,
    /// DER of the subject Name, compared byte-for-byte when linking.
    pub subject_raw: Vec<u8>,
    pub issuer_raw: Vec<u8>,
    /// RFC 4514 rendering, for diagnostics only.
    pub subject_dn: String,
    pub issuer_dn: String,
    pub spki_der: Vec<u8>,
    pub tbs_der: Vec<u8>,
    pub signature_oid: String,
    pub signature: Vec<u8>,
    /// `basicConstraints cA`; `false` when the extension is absent.
    pub is_ca: bool,
    pub not_before_unix_seconds: i64,
    pub not_after_unix_seconds: i64,
}

impl ParsedCert {
    pub fn from_der(der: &[u8]) -> Result<Self, String> {
        let (_, cert) = X509Certificate::from_der(der).map_err(|e| format!("invalid cert DER: {e}"))?;

        let mut is_ca = false;
        for ext in cert.extensions() {
            if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
                is_ca = bc.ca;
            }
        }

        Ok(ParsedCert {
            der: der.to_vec(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            subject_dn: cert.subject().to_string(),
            issuer_dn: cert.issuer().to_string(),
            spki_der: cert.tbs_certificate.subject_pki.raw.to_vec(),
            tbs_der: cert.tbs_certificate.as_ref().to_vec(),
            signature_oid: cert.signature_algorithm.algorithm.to_string(),
            signature: cert.signature_value.data.to_vec(),
            is_ca,
            not_before_unix_seconds: cert.validity().not_before.timestamp(),
            not_after_unix_seconds: cert.validity().not_after.timestamp(),
        })
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Whether `issuer`'s subject is the name this certificate says issued it.
    pub fn names_issuer(&self, issuer: &ParsedCert) -> bool {
        self.issuer_raw == issuer.subject_raw
    }

    /// Verify this certificate's signature with `issuer`'s public key.
    pub fn verify_issued_by(&self, issuer: &ParsedCert) -> Result<(), String> {
        verify_cert_signature(&issuer.spki_der, &self.tbs_der, &self.signature_oid, &self.signature)
    }

    /// `not_before <= now <= not_after`.
    pub fn validity_at(&self, now_unix_seconds: i64) -> ValidityStatus {
        if now_unix_seconds < self.not_before_unix_seconds {
            ValidityStatus::NotYetValid
        } else if now_unix_seconds > self.not_after_unix_seconds {
            ValidityStatus::Expired
        } else {
            ValidityStatus::Valid
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidityStatus {
    Valid,
    NotYetValid,
    Expired,
}

fn rsa_public_key_from_spki(spki_der: &[u8]) -> Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_der(spki_der).map_err(|e| format!("bad RSA public key: {e}"))
}

fn rsa_signature(signature: &[u8]) -> Result<pkcs1v15::Signature, String> {
    pkcs1v15::Signature::try_from(signature).map_err(|e| format!("bad RSA signature bytes: {e}"))
}

fn failed<E>(_: E) -> String {
    "certificate signature verification failed".to_string()
}

/// An issuer's ECDSA key, on whichever supported curve its SPKI names.
enum EcdsaIssuerKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
}

impl EcdsaIssuerKey {
    fn from_spki(spki_der: &[u8]) -> Result<Self, String> {
        if let Ok(pk) = p256::PublicKey::from_public_key_der(spki_der) {
            return p256::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_encoded_point(false).as_bytes())
                .map(Self::P256)
                .map_err(|e| format!("bad P-256 issuer public key: {e}"));
        }
        if let Ok(pk) = p384::PublicKey::from_public_key_der(spki_der) {
            return p384::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_encoded_point(false).as_bytes())
                .map(Self::P384)
                .map_err(|e| format!("bad P-384 issuer public key: {e}"));
        }
        if let Ok(pk) = p521::PublicKey::from_public_key_der(spki_der) {
            return p521::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_encoded_point(false).as_bytes())
                .map(Self::P521)
                .map_err(|e| format!("bad P-521 issuer public key: {e}"));
        }
        Err("issuer public key is not a P-256, P-384 or P-521 key".to_string())
    }
}

/// Verify a DER-encoded ECDSA signature over an already computed digest.
///
/// A digest longer than the curve order is truncated, so any SHA-2 size pairs
/// with any supported curve except SHA-256 on P-521.
fn verify_ecdsa(issuer_spki_der: &[u8], digest: &[u8], signature: &[u8]) -> Result<(), String> {
    let bad_sig = |e: signature::Error| format!("bad ECDSA signature bytes: {e}");
    match EcdsaIssuerKey::from_spki(issuer_spki_der)? {
        EcdsaIssuerKey::P256(vk) => {
            let sig = p256::ecdsa::Signature::from_der(signature).map_err(bad_sig)?;
            vk.verify_prehash(digest, &sig).map_err(failed)
        }
        EcdsaIssuerKey::P384(vk) => {
            let sig = p384::ecdsa::Signature::from_der(signature).map_err(bad_sig)?;
            vk.verify_prehash(digest, &sig).map_err(failed)
        }
        EcdsaIssuerKey::P521(vk) => {
            let sig = p521::ecdsa::Signature::from_der(signature).map_err(bad_sig)?;
            vk.verify_prehash(digest, &sig).map_err(failed)
        }
    }
}

fn verify_cert_signature(issuer_spki_der: &[u8], tbs_der: &[u8], signature_oid: &str, signature: &[u8]) -> Result<(), String> {
    match signature_oid {
        // sha256WithRSAEncryption / sha384WithRSAEncryption / sha512WithRSAEncryption
        "1.2.840.113549.1.1.11" => {
            let vk = pkcs1v15::VerifyingKey::<Sha256>::new(rsa_public_key_from_spki(issuer_spki_der)?);
            vk.verify(tbs_der, &rsa_signature(signature)?).map_err(failed)
        }
        "1.2.840.113549.1.1.12" => {
            let vk = pkcs1v15::VerifyingKey::<Sha384>::new(rsa_public_key_from_spki(issuer_spki_der)?);
            vk.verify(tbs_der, &rsa_signature(signature)?).map_err(failed)
        }
        "1.2.840.113549.1.1.13" => {
            let vk = pkcs1v15::VerifyingKey::<Sha512>::new(rsa_public_key_from_spki(issuer_spki_der)?);
            vk.verify(tbs_der, &rsa_signature(signature)?).map_err(failed)
        }

        // ecdsa-with-SHA256 / SHA384 / SHA512. The OID names the hash only; the
        // curve is whatever the issuer key is on.
        "1.2.840.10045.4.3.2" => verify_ecdsa(issuer_spki_der, &Sha256::digest(tbs_der), signature),
        "1.2.840.10045.4.3.3" => verify_ecdsa(issuer_spki_der, &Sha384::digest(tbs_der), signature),
        "1.2.840.10045.4.3.4" => verify_ecdsa(issuer_spki_der, &Sha512::digest(tbs_der), signature),

        _ => Err(format!("unsupported certificate signature algorithm OID: {signature_oid}")),
    }
}
