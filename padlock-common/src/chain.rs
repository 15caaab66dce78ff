// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The certificate chain carried in a token's `x5c` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::MalformedTokenError;

/// Ordered DER certificates, leaf first.
///
/// Construction only guarantees the chain is non-empty and that no entry is
/// empty. Whether adjacent certificates actually link up is decided later by
/// chain evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<Vec<u8>>,
}

impl CertificateChain {
    pub fn new(certs: Vec<Vec<u8>>) -> Result<Self, MalformedTokenError> {
        if certs.is_empty() {
            return Err(MalformedTokenError::new("certificate chain is empty"));
        }
        if let Some(i) = certs.iter().position(|c| c.is_empty()) {
            return Err(MalformedTokenError::new(format!("certificate {i} in chain is empty")));
        }
        Ok(Self { certs })
    }

    /// Decode an `x5c` array (standard base64, padded) into a chain.
    pub fn from_x5c<S: AsRef<str>>(entries: &[S]) -> Result<Self, MalformedTokenError> {
        let mut certs = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let der = STANDARD
                .decode(entry.as_ref())
                .map_err(|e| MalformedTokenError::new(format!("x5c[{i}] is not valid base64: {e}")))?;
            certs.push(der);
        }
        Self::new(certs)
    }

    pub fn leaf(&self) -> &[u8] {
        // Non-empty by construction.
        &self.certs[0]
    }

    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certs
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.certs.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.certs.iter().map(Vec::as_slice)
    }

    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.certs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_chain_and_empty_entries() {
        assert!(CertificateChain::new(Vec::new()).is_err());
        let err = CertificateChain::new(vec![vec![1], Vec::new()]).unwrap_err();
        assert!(err.reason().contains("certificate 1"));
    }

    #[test]
    fn from_x5c_uses_standard_alphabet() {
        let chain = CertificateChain::from_x5c(&["AQID", "+/8="]).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.leaf(), &[1, 2, 3]);
        assert_eq!(chain.get(1), Some(&[0xfb, 0xff][..]));

        assert!(CertificateChain::from_x5c(&["-_8"]).is_err());
    }
}
