// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use padlock_common::MalformedTokenError;
use thiserror::Error;

/// Fatal outcome of signature verification. Any of these aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error(transparent)]
    MalformedToken(#[from] MalformedTokenError),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature invalid: {0}")]
    SignatureInvalid(String),
}

impl SignatureError {
    pub fn error_code(&self) -> &'static str {
        match self {
            SignatureError::MalformedToken(e) => e.error_code(),
            SignatureError::UnsupportedAlgorithm(_) => "UNSUPPORTED_ALGORITHM",
            SignatureError::SignatureInvalid(_) => "SIGNATURE_INVALID",
        }
    }
}
