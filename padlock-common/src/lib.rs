// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod chain;
pub mod claims;
pub mod error;
pub mod header;
pub mod token;

pub use chain::CertificateChain;
pub use claims::Claims;
pub use error::MalformedTokenError;
pub use header::JwsHeader;
pub use token::{base64url_decode, base64url_encode, SignedToken};
