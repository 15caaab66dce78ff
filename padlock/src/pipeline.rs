// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The staged verification pipeline.
//!
//! 1) signature: fatal, returns `Err` and stops;
//! 2) chain trust, 3) hostname, 4) request: each always runs once the
//!    signature verified and records its own verdict.

use padlock_common::{CertificateChain, Claims};
use padlock_validation::{verify_and_decode, DecodedToken, SignatureError, ValidationResult};
use padlock_x509::{evaluate_trust, matches_identity};
use tracing::{error, info, warn};

use crate::context::VerificationContext;
use crate::correlation::{matches_claim, ClaimExpectation};
use crate::verification_result::VerificationResult;

pub const SIGNATURE_STAGE: &str = "Signature";
pub const CHAIN_TRUST_STAGE: &str = "ChainTrust";
pub const HOSTNAME_STAGE: &str = "Hostname";
pub const REQUEST_STAGE: &str = "Request";

pub(crate) fn run(
    ctx: &VerificationContext,
    token: &[u8],
    expectation: Option<&ClaimExpectation>,
) -> Result<VerificationResult, SignatureError> {
    let decoded = decode(ctx, token)?;
    Ok(evaluate(ctx, decoded, expectation))
}

/// Stage 1. `Err` aborts the run.
pub(crate) fn decode(ctx: &VerificationContext, token: &[u8]) -> Result<DecodedToken, SignatureError> {
    match verify_and_decode(token, ctx.signature_options()) {
        Ok(d) => {
            info!(alg = %d.algorithm, "Decoding token ok");
            Ok(d)
        }
        Err(e) => {
            match &e {
                SignatureError::SignatureInvalid(_) => error!(code = e.error_code(), "Token signature verification failed."),
                _ => error!(code = e.error_code(), error = %e, "Decoding token failed."),
            }
            Err(e)
        }
    }
}

/// Stages 2-4 over an authenticated token.
pub(crate) fn evaluate(
    ctx: &VerificationContext,
    decoded: DecodedToken,
    expectation: Option<&ClaimExpectation>,
) -> VerificationResult {
    let signature = ValidationResult::success(SIGNATURE_STAGE, None).with_metadata("jws.alg", decoded.algorithm.name());
    let chain_trust = chain_trust_stage(ctx, &decoded.chain);
    let hostname = hostname_stage(ctx.expected_host(), decoded.chain.leaf());
    let request = request_stage(&decoded.claims, expectation);

    VerificationResult {
        signature,
        chain_trust,
        hostname,
        request,
        algorithm: decoded.algorithm,
        claims: decoded.claims,
        chain: decoded.chain,
    }
}

fn chain_trust_stage(ctx: &VerificationContext, chain: &CertificateChain) -> ValidationResult {
    match evaluate_trust(chain, ctx.roots()) {
        Ok(path) => {
            info!(depth = path.depth(), "Certificate verification OK");
            ValidationResult::success(CHAIN_TRUST_STAGE, None)
                .with_metadata("chain.depth", path.depth().to_string())
                .with_metadata("chain.anchor", path.anchor.subject_dn)
        }
        Err(e) => {
            warn!(code = e.error_code(), "Certificate verification failed: {}", e.message);
            let mut r = ValidationResult::failure_message(CHAIN_TRUST_STAGE, e.message.clone(), Some(e.error_code().to_string()));
            if let Some(index) = e.break_point.index() {
                r.metadata.insert("chain.break_index".to_string(), index.to_string());
            }
            r
        }
    }
}

fn hostname_stage(expected_host: &str, leaf_der: &[u8]) -> ValidationResult {
    if expected_host.is_empty() {
        warn!("No expected host name; certificate name not checked.");
        return ValidationResult::not_applicable(HOSTNAME_STAGE, Some("no expected host configured"));
    }

    match matches_identity(leaf_der, expected_host) {
        Ok(true) => {
            info!(host = expected_host, "System hostname matches certificate CN.");
            ValidationResult::success(HOSTNAME_STAGE, None).with_metadata("hostname.expected", expected_host)
        }
        Ok(false) => {
            warn!(host = expected_host, "Certificate/Host name mismatch.");
            ValidationResult::failure_message(
                HOSTNAME_STAGE,
                format!("certificate does not name host '{expected_host}'"),
                Some("HOSTNAME_MISMATCH".to_string()),
            )
        }
        Err(e) => {
            error!(error = %e, "Error matching hostname.");
            ValidationResult::failure_message(HOSTNAME_STAGE, e.to_string(), Some(e.error_code().to_string()))
        }
    }
}

fn request_stage(claims: &Claims, expectation: Option<&ClaimExpectation>) -> ValidationResult {
    let Some(expected) = expectation else {
        return ValidationResult::not_applicable(REQUEST_STAGE, Some("no expected claim"));
    };

    match matches_claim(claims, &expected.name, expected.value.clone()) {
        Ok(true) => {
            info!(claim = %expected.name, "Token is for the expected request.");
            ValidationResult::success(REQUEST_STAGE, None).with_metadata("request.claim", expected.name.as_str())
        }
        Ok(false) => {
            warn!(claim = %expected.name, "Token is for another request.");
            ValidationResult::failure_message(
                REQUEST_STAGE,
                format!("claim `{}` does not have the expected value", expected.name),
                Some("CLAIM_MISMATCH".to_string()),
            )
        }
        Err(e) => {
            error!(claim = %expected.name, "Token format unknown.");
            ValidationResult::failure_message(REQUEST_STAGE, e.to_string(), Some(e.error_code().to_string()))
        }
    }
}
