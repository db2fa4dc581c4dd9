// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! validated [`RelayConfig`] built from them at startup. It is the only place
//! that reads the process environment; everything else receives its settings
//! through constructors.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `POOL_SECRET_KEY` | Pool secret (JSON byte array, base58 or base64) | Required unless `POOL_SECRET_KEY_PATH` |
//! | `POOL_SECRET_KEY_PATH` | File holding the pool secret | Optional |
//! | `POOL_PUBLIC_KEY` | Expected pool address (cross-check) | Optional |
//! | `POOL_ADDRESS_MISMATCH` | `fatal` or `warn` on cross-check mismatch | `fatal` |
//! | `RPC_URL` | JSON-RPC endpoint | `https://api.devnet.solana.com` |
//! | `RPC_API_KEY` | Static API key sent with every RPC call | Optional |
//! | `RPC_API_KEY_HEADER` | Header carrying the API key | `x-api-key` |
//! | `RPC_TIMEOUT_SECS` | Per-call HTTP timeout | `15` |
//! | `RATE_LIMIT_MAX` | Withdrawals admitted per window | `10` |
//! | `RATE_LIMIT_WINDOW_SECS` | Admission window length | `60` |
//! | `BLOCKHASH_COMMITMENT` | Finality of fetched reference hashes | `confirmed` |
//! | `CONFIRM_COMMITMENT` | Finality required to report success | `confirmed` |
//! | `CONFIRM_TIMEOUT_SECS` | Confirmation polling budget, at most `3600` | `60` |
//! | `CONFIRM_POLL_INTERVAL_MS` | Delay between status polls | `1200` |
//! | `SKIP_PREFLIGHT` | Submit without node pre-validation | `false` |
//! | `PREFLIGHT_BALANCE_CHECK` | Check pool balance before building | `true` |
//! | `MAX_WITHDRAWAL_LAMPORTS` | Per-request cap | Optional |
//! | `JOURNAL_CAPACITY` | Withdrawal outcomes kept in memory | `1024` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key; HTTPS when both set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=info` |

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::blockchain::types::Commitment;

pub const POOL_SECRET_KEY_ENV: &str = "POOL_SECRET_KEY";
pub const POOL_SECRET_KEY_PATH_ENV: &str = "POOL_SECRET_KEY_PATH";
pub const POOL_PUBLIC_KEY_ENV: &str = "POOL_PUBLIC_KEY";
pub const POOL_ADDRESS_MISMATCH_ENV: &str = "POOL_ADDRESS_MISMATCH";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const RPC_API_KEY_ENV: &str = "RPC_API_KEY";
pub const RPC_API_KEY_HEADER_ENV: &str = "RPC_API_KEY_HEADER";
pub const RPC_TIMEOUT_SECS_ENV: &str = "RPC_TIMEOUT_SECS";
pub const RATE_LIMIT_MAX_ENV: &str = "RATE_LIMIT_MAX";
pub const RATE_LIMIT_WINDOW_SECS_ENV: &str = "RATE_LIMIT_WINDOW_SECS";
pub const BLOCKHASH_COMMITMENT_ENV: &str = "BLOCKHASH_COMMITMENT";
pub const CONFIRM_COMMITMENT_ENV: &str = "CONFIRM_COMMITMENT";
pub const CONFIRM_TIMEOUT_SECS_ENV: &str = "CONFIRM_TIMEOUT_SECS";
pub const CONFIRM_POLL_INTERVAL_MS_ENV: &str = "CONFIRM_POLL_INTERVAL_MS";
pub const SKIP_PREFLIGHT_ENV: &str = "SKIP_PREFLIGHT";
pub const PREFLIGHT_BALANCE_CHECK_ENV: &str = "PREFLIGHT_BALANCE_CHECK";
pub const MAX_WITHDRAWAL_LAMPORTS_ENV: &str = "MAX_WITHDRAWAL_LAMPORTS";
pub const JOURNAL_CAPACITY_ENV: &str = "JOURNAL_CAPACITY";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RATE_LIMIT_MAX: u32 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;
const MAX_CONFIRM_TIMEOUT_SECS: u64 = 3_600;
const DEFAULT_CONFIRM_POLL_INTERVAL_MS: u64 = 1_200;
const DEFAULT_JOURNAL_CAPACITY: usize = 1_024;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("set exactly one of {POOL_SECRET_KEY_ENV} and {POOL_SECRET_KEY_PATH_ENV}")]
    ConflictingSecretSources,

    #[error("failed to read {path}: {reason}")]
    SecretFile { path: String, reason: String },

    #[error("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together")]
    IncompleteTls,
}

// =============================================================================
// Sections
// =============================================================================

/// What to do when the pool secret does not derive the expected address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    #[default]
    Fatal,
    Warn,
}

impl FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(MismatchPolicy::Fatal),
            "warn" => Ok(MismatchPolicy::Warn),
            other => Err(format!("expected `fatal` or `warn`, got `{other}`")),
        }
    }
}

/// Inputs to Key Custody.
#[derive(Clone, Default)]
pub struct CustodyConfig {
    /// Secret text, already read from file if a path was configured.
    pub secret: Option<String>,
    pub expected_address: Option<String>,
    pub mismatch_policy: MismatchPolicy,
}

impl fmt::Debug for CustodyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodyConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("expected_address", &self.expected_address)
            .field("mismatch_policy", &self.mismatch_policy)
            .finish()
    }
}

/// Network client settings.
#[derive(Clone)]
pub struct RpcConfig {
    pub url: Url,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub timeout: Duration,
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_header", &self.api_key_header)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Rate admission gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Withdrawal pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalConfig {
    pub blockhash_commitment: Commitment,
    pub confirm_commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub skip_preflight: bool,
    pub preflight_balance_check: bool,
    pub max_lamports: Option<u64>,
    /// Automatic rebuilds after a hash-expiry failure.
    pub max_rebuilds: u32,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            blockhash_commitment: Commitment::Confirmed,
            confirm_commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_CONFIRM_POLL_INTERVAL_MS),
            skip_preflight: false,
            preflight_balance_check: true,
            max_lamports: None,
            max_rebuilds: 1,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Fully validated process configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub tls: Option<TlsConfig>,
    pub custody: CustodyConfig,
    pub rpc: RpcConfig,
    pub gate: GateConfig,
    pub withdrawal: WithdrawalConfig,
    pub journal_capacity: usize,
}

impl RelayConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let custody = CustodyConfig {
            secret: load_secret(&env)?,
            expected_address: env.optional(POOL_PUBLIC_KEY_ENV),
            mismatch_policy: env.parsed(POOL_ADDRESS_MISMATCH_ENV, MismatchPolicy::Fatal)?,
        };

        let url_raw = env.or_default(RPC_URL_ENV, DEFAULT_RPC_URL);
        let url = Url::parse(&url_raw).map_err(|e| invalid(RPC_URL_ENV, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(RPC_URL_ENV, "scheme must be http or https"));
        }
        let rpc = RpcConfig {
            url,
            api_key: env.optional(RPC_API_KEY_ENV),
            api_key_header: env.or_default(RPC_API_KEY_HEADER_ENV, DEFAULT_API_KEY_HEADER),
            timeout: Duration::from_secs(
                env.positive(RPC_TIMEOUT_SECS_ENV, DEFAULT_RPC_TIMEOUT_SECS)?,
            ),
        };

        let gate = GateConfig {
            max_requests: u32::try_from(
                env.positive(RATE_LIMIT_MAX_ENV, u64::from(DEFAULT_RATE_LIMIT_MAX))?,
            )
            .map_err(|_| invalid(RATE_LIMIT_MAX_ENV, "too large"))?,
            window: Duration::from_secs(
                env.positive(RATE_LIMIT_WINDOW_SECS_ENV, DEFAULT_RATE_LIMIT_WINDOW_SECS)?,
            ),
        };

        let max_lamports = match env.optional(MAX_WITHDRAWAL_LAMPORTS_ENV) {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .ok_or_else(|| invalid(MAX_WITHDRAWAL_LAMPORTS_ENV, "expected a positive integer"))?,
            ),
            None => None,
        };

        let withdrawal = WithdrawalConfig {
            blockhash_commitment: env.parsed(BLOCKHASH_COMMITMENT_ENV, Commitment::Confirmed)?,
            confirm_commitment: env.parsed(CONFIRM_COMMITMENT_ENV, Commitment::Confirmed)?,
            confirm_timeout: Duration::from_secs(env.bounded(
                CONFIRM_TIMEOUT_SECS_ENV,
                DEFAULT_CONFIRM_TIMEOUT_SECS,
                MAX_CONFIRM_TIMEOUT_SECS,
            )?),
            poll_interval: Duration::from_millis(
                env.positive(CONFIRM_POLL_INTERVAL_MS_ENV, DEFAULT_CONFIRM_POLL_INTERVAL_MS)?,
            ),
            skip_preflight: env.flag(SKIP_PREFLIGHT_ENV, false)?,
            preflight_balance_check: env.flag(PREFLIGHT_BALANCE_CHECK_ENV, true)?,
            max_lamports,
            max_rebuilds: 1,
        };

        let tls = match (env.optional(TLS_CERT_PATH_ENV), env.optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        let log_format = match env.optional(LOG_FORMAT_ENV).as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let journal_capacity = env.positive(JOURNAL_CAPACITY_ENV, DEFAULT_JOURNAL_CAPACITY as u64)?;

        Ok(Self {
            host: env.or_default(HOST_ENV, DEFAULT_HOST),
            port: env.parsed(PORT_ENV, DEFAULT_PORT)?,
            log_format,
            tls,
            custody,
            rpc,
            gate,
            withdrawal,
            journal_capacity: journal_capacity as usize,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed, non-empty value.
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e| invalid(name, e)),
            None => Ok(default),
        }
    }

    fn positive(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value: u64 = self.parsed(name, default)?;
        if value == 0 {
            return Err(invalid(name, "must be greater than zero"));
        }
        Ok(value)
    }

    fn bounded(&self, name: &'static str, default: u64, max: u64) -> Result<u64, ConfigError> {
        let value = self.positive(name, default)?;
        if value > max {
            return Err(invalid(name, format!("must be at most {max}")));
        }
        Ok(value)
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(invalid(name, format!("expected a boolean, got `{other}`"))),
        }
    }
}

fn invalid(var: &'static str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn load_secret<F>(env: &Env<F>) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match (env.optional(POOL_SECRET_KEY_ENV), env.optional(POOL_SECRET_KEY_PATH_ENV)) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingSecretSources),
        (Some(secret), None) => Ok(Some(secret)),
        (None, Some(path)) => {
            let contents = fs::read_to_string(&path).map_err(|e| ConfigError::SecretFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::SecretFile {
                    path,
                    reason: "file is empty".to_string(),
                });
            }
            Ok(Some(trimmed.to_string()))
        }
        (None, None) => Ok(None),
    }
}
