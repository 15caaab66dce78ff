// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test-only utilities for building certificate hierarchies and signed tokens.
//!
//! Everything here panics on failure. It exists so integration tests across the
//! workspace can describe scenarios in a few lines.

use std::net::IpAddr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use padlock_common::base64url_encode;
use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, SanType};
use serde_json::{json, Value};
use p256::pkcs8::DecodePrivateKey as _;
use signature::{RandomizedSigner as _, Signer as _};

pub use rcgen;

/// Validity window as `(year, month, day)` pairs.
pub type Validity = ((i32, u8, u8), (i32, u8, u8));

/// A window that comfortably contains "now" for any test run.
pub const ALWAYS_VALID: Validity = ((2000, 1, 1), (4000, 1, 1));

/// Parameters for a CA certificate with a CN-only subject.
pub fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("params");
    params.distinguished_name = dn(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    set_validity(&mut params, ALWAYS_VALID);
    params
}

/// Parameters for an end-entity certificate.
///
/// `sans` entries that parse as IP addresses become `iPAddress` SANs, everything
/// else becomes a `dNSName`. An empty `common_name` leaves the subject without a CN.
pub fn leaf_params(common_name: &str, sans: &[&str]) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("params");
    params.distinguished_name = if common_name.is_empty() {
        let mut d = DistinguishedName::new();
        d.push(DnType::OrganizationName, "Padlock Tests");
        d
    } else {
        dn(common_name)
    };
    for san in sans {
        let entry = match san.parse::<IpAddr>() {
            Ok(ip) => SanType::IpAddress(ip),
            Err(_) => SanType::DnsName((*san).try_into().expect("ia5 dns name")),
        };
        params.subject_alt_names.push(entry);
    }
    params.is_ca = IsCa::ExplicitNoCa;
    set_validity(&mut params, ALWAYS_VALID);
    params
}

pub fn set_validity(params: &mut CertificateParams, validity: Validity) {
    let ((y0, m0, d0), (y1, m1, d1)) = validity;
    params.not_before = rcgen::date_time_ymd(y0, m0, d0);
    params.not_after = rcgen::date_time_ymd(y1, m1, d1);
}

fn dn(common_name: &str) -> DistinguishedName {
    let mut d = DistinguishedName::new();
    d.push(DnType::CommonName, common_name);
    d
}

/// A certificate together with the key pair it certifies.
pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    /// Self-sign `params` with a fresh P-256 key.
    pub fn self_signed(params: CertificateParams) -> Self {
        let key = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).expect("keygen");
        Self::self_signed_with(params, key)
    }

    pub fn self_signed_with(params: CertificateParams, key: KeyPair) -> Self {
        let cert = params.self_signed(&key).expect("self-signed cert");
        Self { cert, key }
    }

    /// Root CA with default validity.
    pub fn root(common_name: &str) -> Self {
        Self::self_signed(ca_params(common_name))
    }

    /// Issue `params` for a fresh P-256 key, signed by `self`.
    pub fn issue(&self, params: CertificateParams) -> Issued {
        let key = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).expect("keygen");
        self.issue_with(params, key)
    }

    pub fn issue_with(&self, params: CertificateParams, key: KeyPair) -> Issued {
        let cert = params.signed_by(&key, &self.cert, &self.key).expect("signed cert");
        Issued { cert, key }
    }

    pub fn intermediate(&self, common_name: &str) -> Issued {
        self.issue(ca_params(common_name))
    }

    pub fn leaf(&self, common_name: &str, sans: &[&str]) -> Issued {
        self.issue(leaf_params(common_name, sans))
    }
}

/// root -> intermediates -> leaf, all P-256.
pub struct TestPki {
    pub root: Issued,
    /// Ordered from the one issued by the root down to the leaf's issuer.
    pub intermediates: Vec<Issued>,
    pub leaf: Issued,
}

impl TestPki {
    pub fn new(intermediates: usize, leaf_cn: &str, leaf_sans: &[&str]) -> Self {
        let root = Issued::root("Padlock Test Root");
        let mut chain: Vec<Issued> = Vec::with_capacity(intermediates);
        for i in 0..intermediates {
            let issuer = chain.last().unwrap_or(&root);
            let next = issuer.intermediate(&format!("Padlock Test Intermediate {}", i + 1));
            chain.push(next);
        }
        let leaf = chain.last().unwrap_or(&root).leaf(leaf_cn, leaf_sans);
        Self { root, intermediates: chain, leaf }
    }

    /// The x5c chain a token would carry: leaf first, root excluded.
    pub fn chain_der(&self) -> Vec<Vec<u8>> {
        let mut out = vec![self.leaf.der()];
        out.extend(self.intermediates.iter().rev().map(Issued::der));
        out
    }

    /// Same as [`Self::chain_der`] with the root appended.
    pub fn chain_der_with_root(&self) -> Vec<Vec<u8>> {
        let mut out = self.chain_der();
        out.push(self.root.der());
        out
    }

    pub fn root_pem(&self) -> String {
        self.root.pem()
    }

    /// ES256 token over `claims`, signed by the leaf key.
    pub fn token(&self, claims: &Value) -> String {
        es256_token(&self.chain_der(), &self.leaf.key, claims)
    }
}

/// JOSE header `{"alg": alg, "x5c": [...]}`.
pub fn x5c_header(alg: &str, chain: &[Vec<u8>]) -> Value {
    let x5c: Vec<String> = chain.iter().map(|c| STANDARD.encode(c)).collect();
    json!({ "alg": alg, "x5c": x5c })
}

/// Build a compact JWS from raw header/payload bytes and a signing function.
pub fn compact_jws(header: &[u8], payload: &[u8], sign: impl FnOnce(&[u8]) -> Vec<u8>) -> String {
    let signing_input = format!("{}.{}", base64url_encode(header), base64url_encode(payload));
    let sig = sign(signing_input.as_bytes());
    format!("{signing_input}.{}", base64url_encode(&sig))
}

pub fn es256_token(chain: &[Vec<u8>], key: &KeyPair, claims: &Value) -> String {
    let header = x5c_header("ES256", chain).to_string();
    compact_jws(header.as_bytes(), claims.to_string().as_bytes(), |m| sign_es256(key, m))
}

/// Fixed-width `r || s` ES256 signature.
pub fn sign_es256(key: &KeyPair, msg: &[u8]) -> Vec<u8> {
    let sk = p256::ecdsa::SigningKey::from_pkcs8_der(&key.serialize_der()).expect("p256 key");
    let sig: p256::ecdsa::Signature = sk.sign(msg);
    sig.to_bytes().to_vec()
}

/// Fixed-width `r || s` ES384 signature.
pub fn sign_es384(key: &KeyPair, msg: &[u8]) -> Vec<u8> {
    let sk = p384::ecdsa::SigningKey::from_pkcs8_der(&key.serialize_der()).expect("p384 key");
    let sig: p384::ecdsa::Signature = sk.sign(msg);
    sig.to_bytes().to_vec()
}

/// A fresh 2048-bit RSA key, as an `rsa` private key for token signing and as
/// an rcgen key pair for certificate issuance.
pub fn rsa_key_pair() -> (rsa::RsaPrivateKey, KeyPair) {
    use rsa::pkcs8::EncodePrivateKey as _;

    let mut rng = rsa::rand_core::OsRng;
    let private = rsa::RsaPrivateKey::new(&mut rng, 2048).expect("rsa keygen");
    let pkcs8 = private.to_pkcs8_der().expect("pkcs8");
    let key_pair = KeyPair::try_from(pkcs8.as_bytes()).expect("rcgen rsa key");
    (private, key_pair)
}

/// Sign `msg` with one of the RS*/PS* JWS algorithms.
pub fn sign_rsa(private: &rsa::RsaPrivateKey, alg: &str, msg: &[u8]) -> Vec<u8> {
    use rsa::{pkcs1v15, pss};
    use sha2::{Sha256, Sha384, Sha512};
    use signature::SignatureEncoding as _;

    let key = private.clone();
    let mut rng = rsa::rand_core::OsRng;
    match alg {
        "RS256" => pkcs1v15::SigningKey::<Sha256>::new(key).sign(msg).to_vec(),
        "RS384" => pkcs1v15::SigningKey::<Sha384>::new(key).sign(msg).to_vec(),
        "RS512" => pkcs1v15::SigningKey::<Sha512>::new(key).sign(msg).to_vec(),
        "PS256" => pss::SigningKey::<Sha256>::new(key).sign_with_rng(&mut rng, msg).to_vec(),
        "PS384" => pss::SigningKey::<Sha384>::new(key).sign_with_rng(&mut rng, msg).to_vec(),
        "PS512" => pss::SigningKey::<Sha512>::new(key).sign_with_rng(&mut rng, msg).to_vec(),
        other => panic!("not an RSA JWS algorithm: {other}"),
    }
}
