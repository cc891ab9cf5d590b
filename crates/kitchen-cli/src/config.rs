// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use kitchen_app::Tab;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const APP_NAME: &str = "kitchen";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8099/api";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub fallback_tab: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            fallback_tab: Some(Tab::Shopping.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("KITCHEN_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set KITCHEN_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [api], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            validate_base_url(base_url)
                .with_context(|| format!("api.base_url in {}", path.display()))?;
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(tab) = &self.ui.fallback_tab
            && Tab::parse(tab).is_none()
        {
            bail!(
                "ui.fallback_tab in {} must be one of shopping, inventory, templates, recipes; got {tab:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}; got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!("log.file in {} must not be empty", path.display());
        }

        Ok(())
    }

    /// `--api-url` wins over `KITCHEN_API_URL`, which wins over `[api].base_url`.
    pub fn api_base_url(&self, cli_override: Option<&str>) -> String {
        let env_override = env::var("KITCHEN_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let raw = match (cli_override, env_override) {
            (Some(url), _) => url.to_owned(),
            (None, Some(url)) => url,
            (None, None) => self
                .api
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
        };
        raw.trim().trim_end_matches('/').to_owned()
    }

    pub fn api_timeout(&self) -> Result<Option<Duration>> {
        self.api.timeout.as_deref().map(parse_duration).transpose()
    }

    pub fn fallback_tab(&self) -> Tab {
        self.ui
            .fallback_tab
            .as_deref()
            .and_then(Tab::parse)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .trim()
            .to_ascii_lowercase()
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir()
            .ok_or_else(|| anyhow!("cannot resolve data directory; set [log].file explicitly"))?;
        Ok(data_root.join(APP_NAME).join("kitchen.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# kitchen config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Overridden by KITCHEN_API_URL or --api-url.\nbase_url = \"{}\"\n# Optional request timeout: <N>ms, <N>s or <N>m. Unset means no timeout.\n# timeout = \"10s\"\n\n[ui]\n# Tab shown when the backend settings cannot be fetched.\nfallback_tab = \"shopping\"\n\n[log]\n# trace, debug, info, warn, error or off. KITCHEN_LOG overrides.\nlevel = \"{}\"\n# Default is the platform data dir (for example ~/.local/share/kitchen/kitchen.log)\n# file = \"/absolute/path/to/kitchen.log\"\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn validate_base_url(raw: &str) -> Result<()> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("base url must not be empty");
    }
    let parsed = Url::parse(trimmed).with_context(|| format!("invalid base url {trimmed:?}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "base url {trimmed:?} must use http or https, got scheme {:?}",
            parsed.scheme()
        );
    }
    Ok(())
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("timeout duration {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
