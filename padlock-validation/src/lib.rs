// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod algorithms;
pub mod error;
pub mod signature_verifier;
pub mod validation_result;

pub use algorithms::JwsAlgorithm;
pub use error::SignatureError;
pub use signature_verifier::{verify_and_decode, DecodedToken, SignatureVerifyOptions};
pub use validation_result::{ValidationFailure, ValidationResult, ValidationResultKind};
