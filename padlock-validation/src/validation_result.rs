// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-stage validation results.
//!
//! Recoverable findings are reported as data rather than errors so the caller
//! sees every stage's verdict, not just the first problem.

use std::collections::BTreeMap;

/// Outcome classification for a single verification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationResultKind {
    /// Stage ran and succeeded.
    Success,
    /// Stage ran and failed.
    Failure,
    /// Stage had no input to work on.
    #[default]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationFailure {
    /// Human-readable failure message.
    pub message: String,
    /// Stable error code for programmatic handling.
    pub error_code: Option<String>,
}

/// Result for a single stage, with optional diagnostic metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub kind: ValidationResultKind,
    /// Friendly stage name (e.g. "ChainTrust").
    pub validator_name: String,
    /// Failures when `kind == Failure`.
    pub failures: Vec<ValidationFailure>,
    pub metadata: BTreeMap<String, String>,
}

impl ValidationResult {
    pub const METADATA_REASON_KEY: &'static str = "Reason";

    pub fn is_valid(&self) -> bool {
        matches!(self.kind, ValidationResultKind::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ValidationResultKind::Failure)
    }

    pub fn success(validator_name: impl Into<String>, metadata: Option<BTreeMap<String, String>>) -> Self {
        Self {
            kind: ValidationResultKind::Success,
            validator_name: validator_name.into(),
            failures: Vec::new(),
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Create a not-applicable result.
    ///
    /// A non-blank `reason` is stored under [`Self::METADATA_REASON_KEY`].
    pub fn not_applicable(validator_name: impl Into<String>, reason: Option<&str>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(r) = reason {
            if !r.trim().is_empty() {
                metadata.insert(Self::METADATA_REASON_KEY.to_string(), r.to_string());
            }
        }
        Self {
            kind: ValidationResultKind::NotApplicable,
            validator_name: validator_name.into(),
            failures: Vec::new(),
            metadata,
        }
    }

    pub fn failure(validator_name: impl Into<String>, failures: Vec<ValidationFailure>) -> Self {
        Self {
            kind: ValidationResultKind::Failure,
            validator_name: validator_name.into(),
            failures,
            metadata: BTreeMap::new(),
        }
    }

    /// Convenience helper for a single failure message.
    pub fn failure_message(
        validator_name: impl Into<String>,
        message: impl Into<String>,
        error_code: Option<String>,
    ) -> Self {
        Self::failure(
            validator_name,
            vec![ValidationFailure {
                message: message.into(),
                error_code,
            }],
        )
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Error code of the first failure, if any.
    pub fn first_error_code(&self) -> Option<&str> {
        self.failures.first().and_then(|f| f.error_code.as_deref())
    }
}
