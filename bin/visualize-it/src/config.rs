// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Service settings: built-in defaults, then an optional `visualize-it.toml`,
//! then environment variables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vista::FallbackPolicy;

pub const CONFIG_FILE: &str = "visualize-it.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub default_model: String,
    pub ollama_api_url: String,
    /// Seconds.
    pub ollama_api_timeout: u64,
    pub ollama_max_retries: u32,
    pub max_visualizations: usize,
    pub log_level: String,
    pub server_log_file: PathBuf,
    pub client_log_file: PathBuf,
    pub http_addr: String,
    pub fallback_policy: FallbackPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_model: "deepseek-coder-v2".to_string(),
            ollama_api_url: "http://localhost:11434".to_string(),
            ollama_api_timeout: 60,
            ollama_max_retries: 3,
            max_visualizations: vista::limits::MAX_VISUALIZATIONS,
            log_level: "info".to_string(),
            server_log_file: PathBuf::from("backend.log"),
            client_log_file: PathBuf::from("client.log"),
            http_addr: "0.0.0.0:8000".to_string(),
            fallback_policy: FallbackPolicy::Sample,
        }
    }
}

impl Settings {
    /// Loads from `visualize-it.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Path::new(CONFIG_FILE), None)
    }

    /// `env` replaces the process environment when given.
    pub fn load_from(
        file: &Path,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        let settings: Settings = config::Config::builder()
            .set_default("default_model", defaults.default_model)?
            .set_default("ollama_api_url", defaults.ollama_api_url)?
            .set_default("ollama_api_timeout", defaults.ollama_api_timeout)?
            .set_default("ollama_max_retries", u64::from(defaults.ollama_max_retries))?
            .set_default("max_visualizations", defaults.max_visualizations as u64)?
            .set_default("log_level", defaults.log_level)?
            .set_default(
                "server_log_file",
                defaults.server_log_file.to_string_lossy().into_owned(),
            )?
            .set_default(
                "client_log_file",
                defaults.client_log_file.to_string_lossy().into_owned(),
            )?
            .set_default("http_addr", defaults.http_addr)?
            .set_default("fallback_policy", "sample")?
            .add_source(config::File::from(file).required(false))
            .add_source(config::Environment::default().try_parsing(true).source(env))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        reqwest::Url::parse(&self.ollama_api_url).map_err(|e| SettingsError::Invalid {
            key: "ollama_api_url",
            reason: e.to_string(),
        })?;
        if self.ollama_api_timeout == 0 {
            return Err(SettingsError::Invalid {
                key: "ollama_api_timeout",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_visualizations == 0 {
            return Err(SettingsError::Invalid {
                key: "max_visualizations",
                reason: "must be greater than 0".to_string(),
            });
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.http_addr.parse().map_err(|e: std::net::AddrParseError| SettingsError::Invalid {
            key: "http_addr",
            reason: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ollama_api_timeout)
    }

    /// The API URL without scheme or trailing slash.
    pub fn ollama_host(&self) -> &str {
        let url = self.ollama_api_url.trim_end_matches('/');
        url.split_once("://").map_or(url, |(_, host)| host)
    }

    pub fn ollama_base_url(&self) -> &str {
        self.ollama_api_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_host() {
        let settings = Settings {
            ollama_api_url: "http://192.168.1.2:11434/".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.ollama_host(), "192.168.1.2:11434");
        assert_eq!(settings.ollama_base_url(), "http://192.168.1.2:11434");
    }

    #[test]
    fn test_validation() {
        assert!(Settings::default().validate().is_ok());
        let bad = Settings {
            max_visualizations: 0,
            ..Settings::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(SettingsError::Invalid { key: "max_visualizations", .. })
        ));
        let bad_url = Settings {
            ollama_api_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(bad_url.validate().is_err());
    }
}
