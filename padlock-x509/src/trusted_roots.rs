// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trusted root certificates.
//!
//! A [`TrustedRootSet`] is immutable once built. Reloading goes through
//! [`TrustedRootsHandle`], which swaps in a complete new set so a verification
//! that already took a snapshot keeps using it.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;
use x509_parser::pem::Pem;

use crate::cert::ParsedCert;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustStoreError {
    #[error("no certificates found in trusted root bundle")]
    NoCertificates,

    #[error("invalid PEM in trusted root bundle: {0}")]
    InvalidPem(String),

    #[error("trusted root {index} is not a valid certificate: {reason}")]
    InvalidCertificate { index: usize, reason: String },
}

impl TrustStoreError {
    pub fn error_code(&self) -> &'static str {
        match self {
            TrustStoreError::NoCertificates => "TRUST_STORE_EMPTY",
            TrustStoreError::InvalidPem(_) => "TRUST_STORE_INVALID_PEM",
            TrustStoreError::InvalidCertificate { .. } => "TRUST_STORE_INVALID_CERTIFICATE",
        }
    }
}

/// Ordered, read-only set of trusted root certificates. Clones share storage.
#[derive(Debug, Clone)]
pub struct TrustedRootSet {
    roots: Arc<[ParsedCert]>,
}

impl TrustedRootSet {
    /// Build from one or more concatenated PEM blocks.
    ///
    /// `CERTIFICATE` and `TRUSTED CERTIFICATE` blocks are used; other labels
    /// (keys, CRLs) are skipped.
    pub fn from_pem(pem_bundle: &[u8]) -> Result<Self, TrustStoreError> {
        let mut ders = Vec::new();
        for pem in Pem::iter_from_buffer(pem_bundle) {
            let pem = pem.map_err(|e| TrustStoreError::InvalidPem(e.to_string()))?;
            if pem.label == "CERTIFICATE" || pem.label == "TRUSTED CERTIFICATE" {
                ders.push(pem.contents);
            } else {
                debug!(label = %pem.label, "skipping non-certificate PEM block");
            }
        }
        Self::from_der_certs(ders)
    }

    pub fn from_der_certs<I, D>(ders: I) -> Result<Self, TrustStoreError>
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[u8]>,
    {
        let mut roots = Vec::new();
        for (index, der) in ders.into_iter().enumerate() {
            let parsed = ParsedCert::from_der(der.as_ref())
                .map_err(|reason| TrustStoreError::InvalidCertificate { index, reason })?;
            roots.push(parsed);
        }
        if roots.is_empty() {
            return Err(TrustStoreError::NoCertificates);
        }
        debug!(count = roots.len(), "loaded trusted roots");
        Ok(Self { roots: roots.into() })
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedCert> {
        self.roots.iter()
    }

    /// The root whose DER is byte-identical to `der`.
    pub fn find_exact(&self, der: &[u8]) -> Option<&ParsedCert> {
        self.roots.iter().find(|r| r.der == der)
    }

    /// Roots whose subject is the issuer named by `cert`.
    pub fn candidate_issuers<'a>(&'a self, cert: &'a ParsedCert) -> impl Iterator<Item = &'a ParsedCert> + 'a {
        self.roots.iter().filter(move |r| cert.names_issuer(r))
    }
}

/// Copy-and-swap holder for the current [`TrustedRootSet`].
#[derive(Debug)]
pub struct TrustedRootsHandle {
    current: RwLock<Arc<TrustedRootSet>>,
}

impl TrustedRootsHandle {
    pub fn new(roots: TrustedRootSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(roots)),
        }
    }

    /// Snapshot of the current set. Later replacements do not affect it.
    pub fn current(&self) -> Arc<TrustedRootSet> {
        self.current.read().clone()
    }

    /// Install `roots` and return the previous set.
    pub fn replace(&self, roots: TrustedRootSet) -> Arc<TrustedRootSet> {
        let count = roots.len();
        let previous = std::mem::replace(&mut *self.current.write(), Arc::new(roots));
        debug!(count, "trusted roots replaced");
        previous
    }
}

impl From<TrustedRootSet> for TrustedRootsHandle {
    fn from(roots: TrustedRootSet) -> Self {
        Self::new(roots)
    }
}
