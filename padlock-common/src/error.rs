// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// The token bytes could not be decoded into a well-formed compact JWS.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed token: {reason}")]
pub struct MalformedTokenError {
    reason: String,
}

impl MalformedTokenError {
    pub const ERROR_CODE: &'static str = "MALFORMED_TOKEN";

    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// Human-readable detail without the `malformed token:` prefix.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn error_code(&self) -> &'static str {
        Self::ERROR_CODE
    }
}
