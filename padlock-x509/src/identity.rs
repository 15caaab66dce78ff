// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binding the signing certificate to the expected host name.
//!
//! Candidates are every subject CN and every SAN `dNSName`, plus SAN
//! `iPAddress` entries when the expected host is itself an IP address.
//! Names compare ASCII case-insensitively. A certificate name of the form
//! `*.<label>.<label>[...]` matches exactly one extra left-most label.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityExtractionError {
    #[error("leaf certificate could not be parsed: {0}")]
    Unparseable(String),

    #[error("leaf certificate has no subject common name or subject alternative name")]
    NoIdentity,
}

impl IdentityExtractionError {
    pub fn error_code(&self) -> &'static str {
        "IDENTITY_EXTRACTION_FAILED"
    }
}

/// Identity fields of a certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertIdentities {
    pub common_names: Vec<String>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl CertIdentities {
    pub fn extract(cert: &X509Certificate<'_>) -> Self {
        let mut out = CertIdentities::default();

        for attr in cert.subject().iter_common_name() {
            if let Ok(cn) = attr.as_str() {
                out.common_names.push(cn.to_string());
            }
        }

        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for gn in &san.value.general_names {
                match gn {
                    GeneralName::DNSName(name) => out.dns_names.push(name.to_string()),
                    GeneralName::IPAddress(raw) => {
                        if let Some(ip) = ip_from_san(raw) {
                            out.ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.common_names.is_empty() && self.dns_names.is_empty() && self.ip_addresses.is_empty()
    }

    pub fn matches(&self, expected_host: &str) -> bool {
        if let Ok(ip) = expected_host.parse::<IpAddr>() {
            return self.ip_addresses.contains(&ip)
                || self.names().any(|n| n.eq_ignore_ascii_case(expected_host));
        }
        self.names().any(|n| dns_name_matches(n, expected_host))
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.common_names.iter().chain(self.dns_names.iter()).map(String::as_str)
    }
}

/// Whether the certificate in `leaf_der` names `expected_host`.
pub fn matches_identity(leaf_der: &[u8], expected_host: &str) -> Result<bool, IdentityExtractionError> {
    let (_, cert) = X509Certificate::from_der(leaf_der).map_err(|e| IdentityExtractionError::Unparseable(e.to_string()))?;
    matches_identity_parsed(&cert, expected_host)
}

pub fn matches_identity_parsed(cert: &X509Certificate<'_>, expected_host: &str) -> Result<bool, IdentityExtractionError> {
    let ids = CertIdentities::extract(cert);
    if ids.is_empty() {
        return Err(IdentityExtractionError::NoIdentity);
    }
    Ok(ids.matches(expected_host))
}

fn dns_name_matches(pattern: &str, host: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        let labels_ok = suffix.split('.').count() >= 2 && suffix.split('.').all(|l| !l.is_empty());
        if labels_ok {
            return match host.split_once('.') {
                Some((first, rest)) => !first.is_empty() && rest.eq_ignore_ascii_case(suffix),
                None => false,
            };
        }
    }
    pattern.eq_ignore_ascii_case(host)
}

fn ip_from_san(raw: &[u8]) -> Option<IpAddr> {
    match raw.len() {
        4 => {
            let octets: [u8; 4] = raw.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let octets: [u8; 16] = raw.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}
