//! Configuration file loading and merging with CLI flags.
//!
//! Precedence: explicit CLI flag, then config file, then built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pagegrab_core::download::{CONNECT_TIMEOUT_SECS, PAGE_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use pagegrab_core::{ClientConfig, DEFAULT_CONCURRENCY};
use serde::Deserialize;
use tracing::debug;

use crate::cli::Args;

/// Default output directory for downloads.
const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default output directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Default concurrency (same range as CLI).
    pub concurrency: Option<u8>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Total page fetch deadline in seconds.
    pub page_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against the CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_timeout_secs("page_timeout_secs", self.page_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub links_file: PathBuf,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub client: ClientConfig,
}

impl Settings {
    /// Merges CLI flags over file config over defaults.
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let output_dir = args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let concurrency = args
            .concurrency
            .or(file.concurrency)
            .map_or(DEFAULT_CONCURRENCY, usize::from);
        let connect_secs = args
            .connect_timeout
            .or(file.connect_timeout_secs)
            .unwrap_or(CONNECT_TIMEOUT_SECS);
        let read_secs = args
            .read_timeout
            .or(file.read_timeout_secs)
            .unwrap_or(READ_TIMEOUT_SECS);
        let page_secs = args
            .page_timeout
            .or(file.page_timeout_secs)
            .unwrap_or(PAGE_TIMEOUT_SECS);

        Self {
            links_file: args.links_file.clone(),
            output_dir,
            concurrency,
            client: ClientConfig {
                connect_timeout: Duration::from_secs(connect_secs),
                read_timeout: Duration::from_secs(read_secs),
                page_timeout: Duration::from_secs(page_secs),
            },
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/pagegrab/config.toml`
/// 2. `$HOME/.config/pagegrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("pagegrab")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("pagegrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file");
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}
