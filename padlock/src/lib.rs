// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Web Padlock token verification.
//!
//! A token is a compact JWS whose `x5c` header carries the signer's
//! certificate chain. [`VerificationContext::verify`] establishes, in order:
//! 1) the signature is valid under the leaf certificate (fatal on failure);
//! 2) the chain leads to a trusted root;
//! 3) the leaf certificate names the expected host;
//! 4) the token carries the expected request claim (usually `nonce`).
//!
//! Stages 2-4 always run once the signature verifies and are reported
//! independently in a [`VerificationResult`]. What to accept is the caller's
//! decision; [`AcceptancePolicy`] packages the common strict policy.
//!
//! The building blocks are re-exported at the crate root.

mod context;
mod correlation;
mod pipeline;
mod verification_result;

pub use context::VerificationContext;
pub use correlation::{matches_claim, ClaimExpectation, ClaimMissingError, DEFAULT_CLAIM_NAME};
pub use pipeline::{CHAIN_TRUST_STAGE, HOSTNAME_STAGE, REQUEST_STAGE, SIGNATURE_STAGE};
pub use verification_result::{AcceptancePolicy, PolicyRejection, VerificationResult};

pub use padlock_common::{CertificateChain, Claims, JwsHeader, MalformedTokenError, SignedToken};
pub use padlock_validation::{
    verify_and_decode, DecodedToken, JwsAlgorithm, SignatureError, SignatureVerifyOptions, ValidationFailure,
    ValidationResult, ValidationResultKind,
};
pub use padlock_x509::{
    evaluate_trust, evaluate_trust_at, matches_identity, ChainBreak, ChainUntrustedError, IdentityExtractionError,
    TrustStoreError, TrustedPath, TrustedRootSet, TrustedRootsHandle,
};
