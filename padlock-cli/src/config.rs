// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `check-token` configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context as _, Result};
use padlock::{JwsAlgorithm, SignatureVerifyOptions, DEFAULT_CLAIM_NAME};
use serde::Deserialize;

/// Settings read from a TOML file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckTokenConfig {
    /// PEM bundle of trusted roots.
    pub cacert: PathBuf,
    pub expected_host: Option<String>,
    pub claim_name: String,
    pub log_level: String,
    /// JWS `alg` names to accept; all supported algorithms when absent.
    pub allowed_algorithms: Option<Vec<String>>,
}

impl Default for CheckTokenConfig {
    fn default() -> Self {
        Self {
            cacert: PathBuf::from("cacert.pem"),
            expected_host: None,
            claim_name: DEFAULT_CLAIM_NAME.to_string(),
            log_level: "debug".to_string(),
            allowed_algorithms: None,
        }
    }
}

impl CheckTokenConfig {
    /// Load `path`. A file that does not exist yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn signature_options(&self) -> Result<SignatureVerifyOptions> {
        let Some(names) = &self.allowed_algorithms else {
            return Ok(SignatureVerifyOptions::default());
        };
        let algs = names
            .iter()
            .map(|n| JwsAlgorithm::from_str(n).map_err(|e| anyhow::anyhow!("allowed_algorithms: {e}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(SignatureVerifyOptions::with_allowed_algorithms(algs))
    }
}
