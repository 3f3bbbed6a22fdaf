//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PINVAULT_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PINVAULT_` override YAML values
//! 3. **PINATA_JWT / GATEWAY_URL** - Special case: override `pinata.jwt` and `pinata.gateway`.
//!    `NEXT_PUBLIC_GATEWAY_URL` is accepted as an alias for `GATEWAY_URL`.
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PINVAULT_PINATA__API_URL=http://localhost:9000` sets the `pinata.api_url` field.
//!
//! ## Credentials
//!
//! The Pinata JWT and the gateway hostname are *not* required at startup. The list and upload
//! operations check for them on every request and answer with a configuration error when either
//! is absent, without contacting the pinning service.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! PINVAULT_PORT=8080
//!
//! # Pinning service credentials
//! PINATA_JWT="eyJhbGciOi..."
//! GATEWAY_URL="example.mypinata.cloud"
//!
//! # Allow a browser client served from another origin
//! PINVAULT_CORS__ALLOWED_ORIGINS='["http://localhost:5173"]'
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PINVAULT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Override for `pinata.jwt`, populated from `PINATA_JWT`
    #[serde(skip_serializing)]
    pub pinata_jwt: Option<String>,
    /// Override for `pinata.gateway`, populated from `GATEWAY_URL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    /// Pinning service connection settings
    pub pinata: PinataConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Pinata connection settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PinataConfig {
    /// Bearer token for the Pinata API
    #[serde(skip_serializing)]
    pub jwt: Option<String>,
    /// Gateway hostname used to build public access URLs (e.g. `example.mypinata.cloud`)
    pub gateway: Option<String>,
    /// Base URL of the Pinata API
    pub api_url: Url,
    /// Total timeout for pin listing requests
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout for all requests. Uploads have no total timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Number of body chunks buffered between the inbound upload and the outbound forward
    pub upload_buffer_chunks: usize,
}

impl PinataConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.pinata.cloud";
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            jwt: None,
            gateway: None,
            api_url: Url::parse(Self::DEFAULT_API_URL).expect("default Pinata API URL is valid"),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            upload_buffer_chunks: 16,
        }
    }
}

// Keeps the JWT out of `debug!("{:?}", config)` output.
impl fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataConfig")
            .field("jwt", &self.jwt.as_ref().map(|_| "<redacted>"))
            .field("gateway", &self.gateway)
            .field("api_url", &self.api_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("upload_buffer_chunks", &self.upload_buffer_chunks)
            .finish()
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests. Empty means same-origin only.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            pinata_jwt: None,
            gateway_url: None,
            pinata: PinataConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // Raw credential env vars win over anything nested under `pinata`
        if let Some(jwt) = config.pinata_jwt.take() {
            config.pinata.jwt = Some(jwt);
        }
        if let Some(gateway) = config.gateway_url.take() {
            config.pinata.gateway = Some(gateway);
        }

        // Blank values behave like unset ones
        config.pinata.jwt = config.pinata.jwt.take().filter(|v| !v.trim().is_empty());
        config.pinata.gateway = config.pinata.gateway.take().filter(|v| !v.trim().is_empty());

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.pinata.api_url.scheme(), "http" | "https") {
            return Err(Error::Other(anyhow::anyhow!(
                "Config validation: pinata.api_url must use http or https, got '{}'",
                self.pinata.api_url
            )));
        }

        if self.pinata.request_timeout.is_zero() || self.pinata.connect_timeout.is_zero() {
            return Err(Error::Other(anyhow::anyhow!(
                "Config validation: pinata.request_timeout and pinata.connect_timeout must be greater than zero"
            )));
        }

        if self.pinata.upload_buffer_chunks == 0 {
            return Err(Error::Other(anyhow::anyhow!(
                "Config validation: pinata.upload_buffer_chunks must be greater than 0"
            )));
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("PINVAULT_").ignore(&["config"]).split("__"))
            // Credentials under the names the deployment environment already uses.
            // GATEWAY_URL is merged last so it wins over the alias.
            .merge(
                Env::raw()
                    .only(&["NEXT_PUBLIC_GATEWAY_URL"])
                    .map(|_| "gateway_url".into()),
            )
            .merge(Env::raw().only(&["PINATA_JWT", "GATEWAY_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
