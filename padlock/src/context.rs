// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use padlock_validation::{DecodedToken, SignatureError, SignatureVerifyOptions};
use padlock_x509::{TrustedRootSet, TrustedRootsHandle};

use crate::correlation::ClaimExpectation;
use crate::pipeline;
use crate::verification_result::VerificationResult;

/// Everything a verification needs besides the token itself.
///
/// Built once and shared; it is never mutated. To pick up reloaded roots,
/// build a new context from [`TrustedRootsHandle::current`].
#[derive(Debug, Clone)]
pub struct VerificationContext {
    roots: Arc<TrustedRootSet>,
    expected_host: String,
    signature_options: SignatureVerifyOptions,
}

impl VerificationContext {
    /// An empty `expected_host` makes the hostname stage not applicable.
    pub fn new(roots: Arc<TrustedRootSet>, expected_host: impl Into<String>) -> Self {
        Self {
            roots,
            expected_host: expected_host.into(),
            signature_options: SignatureVerifyOptions::default(),
        }
    }

    /// Snapshot the handle's current roots.
    pub fn from_handle(handle: &TrustedRootsHandle, expected_host: impl Into<String>) -> Self {
        Self::new(handle.current(), expected_host)
    }

    pub fn with_signature_options(mut self, options: SignatureVerifyOptions) -> Self {
        self.signature_options = options;
        self
    }

    pub fn roots(&self) -> &TrustedRootSet {
        &self.roots
    }

    pub fn expected_host(&self) -> &str {
        &self.expected_host
    }

    pub fn signature_options(&self) -> &SignatureVerifyOptions {
        &self.signature_options
    }

    /// Run every stage. `Err` means the signature stage aborted the run.
    pub fn verify(&self, token: &[u8], expectation: &ClaimExpectation) -> Result<VerificationResult, SignatureError> {
        pipeline::run(self, token, Some(expectation))
    }

    /// Stage 1 only: verify the signature and decode the claims.
    ///
    /// Together with [`Self::evaluate`] this is [`Self::verify_with`] split in
    /// two, for callers that act on the claims before the remaining stages run.
    pub fn decode(&self, token: &[u8]) -> Result<DecodedToken, SignatureError> {
        pipeline::decode(self, token)
    }

    /// Stages 2-4 over a token returned by [`Self::decode`].
    pub fn evaluate(&self, decoded: DecodedToken, expectation: Option<&ClaimExpectation>) -> VerificationResult {
        pipeline::evaluate(self, decoded, expectation)
    }

    /// Like [`Self::verify`]; without an expectation the request stage is not applicable.
    pub fn verify_with(
        &self,
        token: &[u8],
        expectation: Option<&ClaimExpectation>,
    ) -> Result<VerificationResult, SignatureError> {
        pipeline::run(self, token, expectation)
    }
}
