//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

/// Configuration for talking to the build server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Server root, e.g. `http://localhost:8111`
    pub base_url: String,

    /// Super user authentication token printed in the server log
    pub superuser_token: Option<String>,

    /// Administrator account used when no super user token is set
    pub admin: AdminConfig,

    /// Timeout for a single request
    pub request_timeout_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8111".to_string(),
            superuser_token: None,
            admin: AdminConfig::default(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl HarnessConfig {
    /// Load configuration from file, then apply `CIPROBE_*` environment overrides
    pub fn load(path: &Path) -> E2eResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("CIPROBE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(token) = non_empty("CIPROBE_SUPERUSER_TOKEN") {
            self.superuser_token = Some(token);
        }
        if let Some(username) = non_empty("CIPROBE_ADMIN_USERNAME") {
            self.admin.username = Some(username);
        }
        if let Some(password) = non_empty("CIPROBE_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Server root without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(E2eError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
