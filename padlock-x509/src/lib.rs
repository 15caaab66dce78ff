// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod cert;
pub mod chain_verifier;
pub mod identity;
pub mod trusted_roots;

pub use cert::ParsedCert;
pub use chain_verifier::{evaluate_trust, evaluate_trust_at, ChainBreak, ChainUntrustedError, TrustedPath, MAX_CHAIN_LEN};
pub use identity::{matches_identity, matches_identity_parsed, CertIdentities, IdentityExtractionError};
pub use trusted_roots::{TrustStoreError, TrustedRootSet, TrustedRootsHandle};
