//! # CLI Configuration
//!
//! Engine settings for every subcommand, layered from lowest to highest
//! precedence:
//!
//! 1. Built-in defaults ([`CliConfig::default`]).
//! 2. A YAML file given with `--config`.
//! 3. `OASV_COERCE_TYPES`, `OASV_NULLABLE_POLICY`, `OASV_ERROR_FORMAT`.
//! 4. Command-line flags.
//!
//! ```yaml
//! coerce_types: true
//! nullable_policy: type-only
//! profile: standard
//! error_format: detailed
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use oasv_schema::{ErrorFormat, NullablePolicy, ValidatorOptions, ValidatorProfile};

/// Environment variable toggling type coercion.
pub const ENV_COERCE_TYPES: &str = "OASV_COERCE_TYPES";
/// Environment variable selecting the nullable policy.
pub const ENV_NULLABLE_POLICY: &str = "OASV_NULLABLE_POLICY";
/// Environment variable selecting the error format.
pub const ENV_ERROR_FORMAT: &str = "OASV_ERROR_FORMAT";

/// Resolved engine and output settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Convert wire strings toward declared types before validating.
    pub coerce_types: bool,
    /// How `null` interacts with `type`.
    pub nullable_policy: NullablePolicy,
    /// Keyword registry selection.
    pub profile: ValidatorProfile,
    /// How failures are printed.
    pub error_format: ErrorFormat,
}

/// Global flags shared by every subcommand.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Coerce string payload values toward declared types.
    #[arg(long, global = true)]
    pub coerce: bool,

    /// Null handling: `flag` (3.0 `nullable`) or `type-only` (3.1).
    #[arg(long, global = true, value_name = "POLICY")]
    pub nullable_policy: Option<String>,

    /// Keyword set: `standard` or `lightweight`.
    #[arg(long, global = true, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Failure output: `concise`, `detailed` or `structured`.
    #[arg(long, global = true, value_name = "FORMAT")]
    pub format: Option<ErrorFormat>,
}

impl CliConfig {
    /// Read a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        // An empty file is a valid, all-default config.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_COERCE_TYPES) {
            self.coerce_types =
                parse_bool(&raw).with_context(|| format!("invalid {ENV_COERCE_TYPES}"))?;
        }
        if let Some(raw) = lookup(ENV_NULLABLE_POLICY) {
            self.nullable_policy =
                parse_policy(&raw).with_context(|| format!("invalid {ENV_NULLABLE_POLICY}"))?;
        }
        if let Some(raw) = lookup(ENV_ERROR_FORMAT) {
            self.error_format = raw
                .parse()
                .with_context(|| format!("invalid {ENV_ERROR_FORMAT}"))?;
        }
        Ok(self)
    }

    /// Apply command-line flags.
    pub fn with_flags(mut self, args: &ConfigArgs) -> Result<Self> {
        if args.coerce {
            self.coerce_types = true;
        }
        if let Some(raw) = &args.nullable_policy {
            self.nullable_policy = parse_policy(raw)?;
        }
        if let Some(raw) = &args.profile {
            self.profile = match ValidatorProfile::from_name(raw) {
                Some(p) => p,
                None => bail!("unknown profile \"{raw}\" (expected standard or lightweight)"),
            };
        }
        if let Some(format) = args.format {
            self.error_format = format;
        }
        Ok(self)
    }

    /// File, then process environment, then flags.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let base = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base
            .with_env(|key| std::env::var(key).ok())?
            .with_flags(args)?;
        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }

    /// Engine options.
    pub fn options(&self) -> ValidatorOptions {
        ValidatorOptions {
            coerce_types: self.coerce_types,
            nullable_policy: self.nullable_policy,
            profile: self.profile,
        }
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got \"{other}\""),
    }
}

fn parse_policy(raw: &str) -> Result<NullablePolicy> {
    match NullablePolicy::from_name(raw) {
        Some(p) => Ok(p),
        None => bail!("unknown nullable policy \"{raw}\" (expected flag or type-only)"),
    }
}
