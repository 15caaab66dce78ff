// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compact JWS parsing.
//!
//! A token is `base64url(header) '.' base64url(payload) '.' base64url(signature)`
//! with unpadded base64url segments. Parsing only establishes structure: the
//! payload stays opaque bytes until its signature has been verified.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::chain::CertificateChain;
use crate::error::MalformedTokenError;
use crate::header::JwsHeader;

/// Decode one unpadded base64url segment.
pub fn base64url_decode(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(segment)
}

pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A structurally valid compact JWS whose signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct SignedToken {
    header_b64: String,
    payload_b64: String,
    header: JwsHeader,
    payload: Vec<u8>,
    signature: Vec<u8>,
    chain: CertificateChain,
}

impl SignedToken {
    pub fn parse(token: &[u8]) -> Result<Self, MalformedTokenError> {
        let text = std::str::from_utf8(token).map_err(|_| MalformedTokenError::new("token is not UTF-8"))?;

        let mut parts = text.split('.');
        let (Some(h), Some(p), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(MalformedTokenError::new("expected three '.'-separated segments"));
        };

        let header_bytes = decode_segment("header", h)?;
        let payload = decode_segment("payload", p)?;
        let signature = decode_segment("signature", s)?;

        let header = JwsHeader::from_json_slice(&header_bytes)?;
        let x5c = match header.x5c.as_deref() {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Err(MalformedTokenError::new("header: x5c is missing or empty")),
        };
        let chain = CertificateChain::from_x5c(x5c)?;

        Ok(Self {
            header_b64: h.to_string(),
            payload_b64: p.to_string(),
            header,
            payload,
            signature,
            chain,
        })
    }

    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    /// The bytes the signature covers: the first two segments as they appear on the wire.
    pub fn signing_input(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_b64.len() + 1 + self.payload_b64.len());
        out.extend_from_slice(self.header_b64.as_bytes());
        out.push(b'.');
        out.extend_from_slice(self.payload_b64.as_bytes());
        out
    }

    /// Decoded payload bytes. Not authenticated until the signature is verified.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn certificate_chain(&self) -> &CertificateChain {
        &self.chain
    }

    pub fn into_certificate_chain(self) -> CertificateChain {
        self.chain
    }
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, MalformedTokenError> {
    base64url_decode(segment).map_err(|e| MalformedTokenError::new(format!("{name} segment is not base64url: {e}")))
}
