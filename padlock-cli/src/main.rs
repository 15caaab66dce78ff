// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `check-token`: verify a Web Padlock token against a trusted root bundle.
//!
//! Exit codes: 0 when the token was verified (stage findings are logged),
//! 1 when `--strict` is given and a stage failed, 2 when the token could not
//! be verified at all or the inputs could not be loaded.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use padlock::{AcceptancePolicy, ClaimExpectation, TrustedRootSet, VerificationContext, VerificationResult};
use tracing::{debug, error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::CheckTokenConfig;

#[derive(Parser, Debug)]
#[command(name = "check-token", version, about = "Verify a Web Padlock token", long_about = None)]
struct Cli {
    /// File containing the compact JWS token.
    token_file: PathBuf,

    /// TOML configuration file.
    #[arg(long, default_value = "check-token.toml")]
    config: PathBuf,

    /// PEM bundle of trusted roots (overrides `cacert`).
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Expected host name (overrides `expected_host` and $HOSTNAME).
    #[arg(long)]
    host: Option<String>,

    /// Expected value of the request claim.
    #[arg(long)]
    nonce: Option<String>,

    /// Name of the request claim (overrides `claim_name`).
    #[arg(long)]
    claim: Option<String>,

    /// Log filter, e.g. `info` or `padlock=debug` (overrides `log_level`).
    #[arg(long, env = "PADLOCK_LOG")]
    log_level: Option<String>,

    /// Fail unless every check passes.
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CheckTokenConfig::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("check-token: {e:#}");
            return ExitCode::from(2);
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match run(&cli, &config) {
        Ok(result) => {
            if cli.strict {
                if let Err(rejection) = AcceptancePolicy::strict().evaluate(&result) {
                    error!(stages = ?rejection.failed_stages, "{rejection}");
                    return ExitCode::from(1);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli, config: &CheckTokenConfig) -> Result<VerificationResult> {
    let token_path = &cli.token_file;
    let raw = std::fs::read(token_path).with_context(|| format!("reading token {}", token_path.display()))?;
    let token = raw.trim_ascii();

    let cacert = cli.ca_cert.as_ref().unwrap_or(&config.cacert);
    let pem = std::fs::read(cacert).with_context(|| format!("reading trusted roots {}", cacert.display()))?;
    let roots = TrustedRootSet::from_pem(&pem).with_context(|| format!("loading trusted roots {}", cacert.display()))?;
    debug!(roots = roots.len(), path = %cacert.display(), "Loaded trusted roots");

    let host = expected_host(cli.host.as_deref(), config.expected_host.as_deref());
    let ctx = VerificationContext::new(Arc::new(roots), host).with_signature_options(config.signature_options()?);

    let claim_name = cli.claim.clone().unwrap_or_else(|| config.claim_name.clone());
    let expectation = cli.nonce.clone().map(|v| ClaimExpectation::new(claim_name, v));

    let decoded = ctx.decode(token).context("token verification aborted")?;

    // Claims go out before the remaining checks are logged.
    println!("Token claims:");
    println!("{}", decoded.claims.to_pretty_json());

    let result = ctx.evaluate(decoded, expectation.as_ref());
    for stage in result.stages() {
        debug!(stage = %stage.validator_name, kind = ?stage.kind, code = stage.first_error_code().unwrap_or(""), "stage result");
    }

    Ok(result)
}

/// `--host`, then the config file, then `$HOSTNAME`, then the system host name.
/// Empty when none of them is available.
fn expected_host(flag: Option<&str>, configured: Option<&str>) -> String {
    flag.or(configured)
        .map(str::to_string)
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
        .or_else(system_hostname)
        .unwrap_or_default()
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok().filter(|h| !h.is_empty()),
        Err(e) => {
            warn!(error = %e, "Could not read the system host name.");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
