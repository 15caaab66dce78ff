// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use padlock_common::{CertificateChain, Claims};
use padlock_validation::{JwsAlgorithm, ValidationResult};
use thiserror::Error;

/// Outcome of a verification whose signature checked out.
///
/// Each stage is reported on its own. Acceptance is the caller's decision.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub signature: ValidationResult,
    pub chain_trust: ValidationResult,
    pub hostname: ValidationResult,
    pub request: ValidationResult,
    pub algorithm: JwsAlgorithm,
    /// Claims from the authenticated payload.
    pub claims: Claims,
    /// The `x5c` chain as presented, leaf first.
    pub chain: CertificateChain,
}

impl VerificationResult {
    pub fn signature_valid(&self) -> bool {
        self.signature.is_valid()
    }

    pub fn chain_trusted(&self) -> bool {
        self.chain_trust.is_valid()
    }

    pub fn hostname_matches(&self) -> bool {
        self.hostname.is_valid()
    }

    pub fn request_matches(&self) -> bool {
        self.request.is_valid()
    }

    /// All four stages succeeded. A not-applicable stage does not count as success.
    pub fn all_checks_passed(&self) -> bool {
        self.stages().iter().all(|s| s.is_valid())
    }

    /// Stage results in pipeline order.
    pub fn stages(&self) -> [&ValidationResult; 4] {
        [&self.signature, &self.chain_trust, &self.hostname, &self.request]
    }
}

/// Which stages must succeed for a caller to accept a token.
///
/// The signature stage is implied: a result only exists once it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcceptancePolicy {
    pub require_chain_trust: bool,
    pub require_hostname: bool,
    pub require_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token rejected by policy; failed stages: {}", failed_stages.join(", "))]
pub struct PolicyRejection {
    pub failed_stages: Vec<String>,
}

impl AcceptancePolicy {
    /// Require every stage.
    pub fn strict() -> Self {
        Self {
            require_chain_trust: true,
            require_hostname: true,
            require_request: true,
        }
    }

    pub fn evaluate(&self, result: &VerificationResult) -> Result<(), PolicyRejection> {
        let required = [
            (self.require_chain_trust, &result.chain_trust),
            (self.require_hostname, &result.hostname),
            (self.require_request, &result.request),
        ];

        let failed_stages: Vec<String> = std::iter::once(&result.signature)
            .filter(|s| !s.is_valid())
            .chain(required.iter().filter(|(req, s)| *req && !s.is_valid()).map(|(_, s)| *s))
            .map(|s| s.validator_name.clone())
            .collect();

        if failed_stages.is_empty() {
            Ok(())
        } else {
            Err(PolicyRejection { failed_stages })
        }
    }
}
