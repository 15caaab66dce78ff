// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate chain trust evaluation.
//!
//! A chain (leaf first, as carried in `x5c`) is trusted when:
//! - every certificate parses and the chain has at most [`MAX_CHAIN_LEN`] entries;
//! - each `chain[i]` names `chain[i + 1]` as issuer (raw DN bytes) and its
//!   signature verifies under `chain[i + 1]`'s key;
//! - every issuer asserts `basicConstraints cA`;
//! - the last certificate is a trusted root, or is signed by one whose subject
//!   is the last certificate's issuer;
//! - every certificate, and the anchoring root, is within its validity window.
//!
//! The first violated rule is reported as a [`ChainBreak`] naming its index.

use std::time::{SystemTime, UNIX_EPOCH};

use padlock_common::CertificateChain;
use thiserror::Error;
use tracing::debug;

use crate::cert::{ParsedCert, ValidityStatus};
use crate::trusted_roots::TrustedRootSet;

pub const MAX_CHAIN_LEN: usize = 16;

/// Where and why a chain failed to evaluate.
///
/// `index` is a position in the presented chain. An index equal to the chain
/// length refers to the anchoring root taken from the trusted set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChainBreak {
    InvalidCertificate { index: usize },
    /// `chain[index]`'s issuer is not `chain[index + 1]`'s subject.
    IssuerMismatch { index: usize },
    /// `chain[index]`'s signature does not verify under `chain[index + 1]`'s key.
    BadLinkSignature { index: usize },
    NotACertificateAuthority { index: usize },
    Expired { index: usize },
    NotYetValid { index: usize },
    /// `chain[index]` is the last certificate and no trusted root anchors it.
    UntrustedRoot { index: usize },
    TooLong { len: usize },
}

impl ChainBreak {
    pub fn code(&self) -> &'static str {
        match self {
            ChainBreak::InvalidCertificate { .. } => "CERT_CHAIN_INVALID_CERTIFICATE",
            ChainBreak::IssuerMismatch { .. } => "CERT_CHAIN_ISSUER_MISMATCH",
            ChainBreak::BadLinkSignature { .. } => "CERT_CHAIN_BAD_LINK_SIGNATURE",
            ChainBreak::NotACertificateAuthority { .. } => "CERT_CHAIN_NOT_A_CA",
            ChainBreak::Expired { .. } => "CERT_CHAIN_EXPIRED",
            ChainBreak::NotYetValid { .. } => "CERT_CHAIN_NOT_YET_VALID",
            ChainBreak::UntrustedRoot { .. } => "CERT_CHAIN_UNTRUSTED_ROOT",
            ChainBreak::TooLong { .. } => "CERT_CHAIN_TOO_LONG",
        }
    }

    /// Chain position of the break. `None` for [`ChainBreak::TooLong`].
    pub fn index(&self) -> Option<usize> {
        match *self {
            ChainBreak::InvalidCertificate { index }
            | ChainBreak::IssuerMismatch { index }
            | ChainBreak::BadLinkSignature { index }
            | ChainBreak::NotACertificateAuthority { index }
            | ChainBreak::Expired { index }
            | ChainBreak::NotYetValid { index }
            | ChainBreak::UntrustedRoot { index } => Some(index),
            ChainBreak::TooLong { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("certificate chain untrusted: {message}")]
pub struct ChainUntrustedError {
    pub break_point: ChainBreak,
    pub message: String,
}

impl ChainUntrustedError {
    fn new(break_point: ChainBreak, message: impl Into<String>) -> Self {
        Self {
            break_point,
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.break_point.code()
    }
}

/// A chain that evaluated as trusted.
#[derive(Debug, Clone)]
pub struct TrustedPath {
    /// The presented chain, leaf first.
    pub certificates: Vec<ParsedCert>,
    /// The trusted root the chain terminates at.
    pub anchor: ParsedCert,
    /// Whether `anchor` is the last presented certificate rather than an extra hop.
    pub anchor_in_chain: bool,
}

impl TrustedPath {
    pub fn leaf(&self) -> &ParsedCert {
        // A trusted path always has at least the leaf.
        &self.certificates[0]
    }

    /// Number of certificates from leaf to anchor inclusive.
    pub fn depth(&self) -> usize {
        self.certificates.len() + usize::from(!self.anchor_in_chain)
    }
}

/// Evaluate `chain` against `roots` at the current system time.
pub fn evaluate_trust(chain: &CertificateChain, roots: &TrustedRootSet) -> Result<TrustedPath, ChainUntrustedError> {
    evaluate_trust_at(chain, roots, unix_now())
}

/// Evaluate `chain` against `roots` at `now_unix_seconds`.
pub fn evaluate_trust_at(
    chain: &CertificateChain,
    roots: &TrustedRootSet,
    now_unix_seconds: i64,
) -> Result<TrustedPath, ChainUntrustedError> {
    if chain.len() > MAX_CHAIN_LEN {
        return Err(ChainUntrustedError::new(
            ChainBreak::TooLong { len: chain.len() },
            format!("chain has {} certificates, at most {MAX_CHAIN_LEN} are allowed", chain.len()),
        ));
    }

    let mut certs = Vec::with_capacity(chain.len());
    for (index, der) in chain.iter().enumerate() {
        let parsed = ParsedCert::from_der(der).map_err(|e| {
            ChainUntrustedError::new(ChainBreak::InvalidCertificate { index }, format!("certificate {index}: {e}"))
        })?;
        certs.push(parsed);
    }

    for (index, pair) in certs.windows(2).enumerate() {
        check_link(index, &pair[0], &pair[1])?;
    }

    let (anchor, anchor_in_chain) = find_anchor(&certs, roots)?;

    let last = certs.len() - 1;
    for (index, cert) in certs.iter().enumerate() {
        check_validity(index, cert, now_unix_seconds)?;
    }
    if !anchor_in_chain {
        check_validity(last + 1, &anchor, now_unix_seconds)?;
    }

    debug!(
        chain_len = certs.len(),
        anchor = %anchor.subject_dn,
        anchor_in_chain,
        "certificate chain trusted"
    );

    Ok(TrustedPath {
        certificates: certs,
        anchor,
        anchor_in_chain,
    })
}

fn check_link(index: usize, cert: &ParsedCert, issuer: &ParsedCert) -> Result<(), ChainUntrustedError> {
    if !cert.names_issuer(issuer) {
        return Err(ChainUntrustedError::new(
            ChainBreak::IssuerMismatch { index },
            format!(
                "certificate {index} is issued by '{}' but certificate {} is '{}'",
                cert.issuer_dn,
                index + 1,
                issuer.subject_dn
            ),
        ));
    }

    if let Err(e) = cert.verify_issued_by(issuer) {
        return Err(ChainUntrustedError::new(
            ChainBreak::BadLinkSignature { index },
            format!("certificate {index} is not signed by certificate {}: {e}", index + 1),
        ));
    }

    if !issuer.is_ca {
        let at = index + 1;
        return Err(ChainUntrustedError::new(
            ChainBreak::NotACertificateAuthority { index: at },
            format!("certificate {at} ('{}') issues certificates but is not a CA", issuer.subject_dn),
        ));
    }

    Ok(())
}

/// Locate the trusted root for the last presented certificate.
///
/// Returns the root and whether it is the last presented certificate itself.
fn find_anchor(certs: &[ParsedCert], roots: &TrustedRootSet) -> Result<(ParsedCert, bool), ChainUntrustedError> {
    let last_index = certs.len() - 1;
    let last = &certs[last_index];

    if let Some(root) = roots.find_exact(&last.der) {
        // The presented root already passed the CA check if it issued anything.
        return Ok((root.clone(), true));
    }

    let mut name_matched = false;
    let mut signed_by_non_ca: Option<&ParsedCert> = None;
    for root in roots.candidate_issuers(last) {
        name_matched = true;
        if last.verify_issued_by(root).is_err() {
            continue;
        }
        if !root.is_ca {
            signed_by_non_ca.get_or_insert(root);
            continue;
        }
        return Ok((root.clone(), false));
    }

    if let Some(root) = signed_by_non_ca {
        return Err(ChainUntrustedError::new(
            ChainBreak::NotACertificateAuthority { index: last_index + 1 },
            format!("trusted root '{}' is not a CA", root.subject_dn),
        ));
    }

    let message = if name_matched {
        format!(
            "certificate {last_index} names trusted issuer '{}' but no trusted root with that name signed it",
            last.issuer_dn
        )
    } else if last.is_self_issued() {
        format!("certificate {last_index} is a self-signed root that is not trusted ('{}')", last.subject_dn)
    } else {
        format!("no trusted root found for issuer '{}'", last.issuer_dn)
    };
    Err(ChainUntrustedError::new(ChainBreak::UntrustedRoot { index: last_index }, message))
}

fn check_validity(index: usize, cert: &ParsedCert, now: i64) -> Result<(), ChainUntrustedError> {
    match cert.validity_at(now) {
        ValidityStatus::Valid => Ok(()),
        ValidityStatus::Expired => Err(ChainUntrustedError::new(
            ChainBreak::Expired { index },
            format!("certificate {index} ('{}') has expired", cert.subject_dn),
        )),
        ValidityStatus::NotYetValid => Err(ChainUntrustedError::new(
            ChainBreak::NotYetValid { index },
            format!("certificate {index} ('{}') is not yet valid", cert.subject_dn),
        )),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
