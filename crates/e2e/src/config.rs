//! Harness configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::Browser;
use crate::error::{E2eError, E2eResult};
use crate::shortcuts::Platform;
use crate::visual::VisualConfig;

/// Prefix of every environment variable the harness reads.
pub const ENV_PREFIX: &str = "STUDIO_E2E_";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the running product
    pub base_url: String,

    /// Browser engine to drive
    pub browser: Browser,

    /// Platform used for shortcut resolution (None = host platform)
    pub platform: Option<Platform>,

    /// Run the browser headless
    pub headless: bool,

    /// Viewport dimensions
    pub viewport: Viewport,

    /// Bounded waits
    pub timeouts: Timeouts,

    /// Concurrent scenario workers
    pub workers: usize,

    /// Prefix for randomized team names
    pub team_prefix: String,

    /// Read-only sample files
    pub fixtures_dir: PathBuf,

    /// Results, traces and sync artifacts
    pub output_dir: PathBuf,

    /// Visual regression settings
    pub visual: VisualConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3449".to_string(),
            browser: Browser::Chromium,
            platform: None,
            headless: true,
            viewport: Viewport::default(),
            timeouts: Timeouts::default(),
            workers: 4,
            team_prefix: "autotest".to_string(),
            fixtures_dir: PathBuf::from("fixtures"),
            output_dir: PathBuf::from("test-results"),
            visual: VisualConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Every polling wait in the harness is bounded by one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Element resolution before an action
    pub action_ms: u64,

    /// Polling assertions
    pub assertion_ms: u64,

    /// Waiting for the save indicator to reach `saved`
    pub save_ms: u64,

    /// Waiting for the save indicator to leave `saved` after a mutation
    pub unsaved_ms: u64,

    /// Page loads
    pub navigation_ms: u64,

    /// Delay between two polls
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 5_000,
            assertion_ms: 5_000,
            save_ms: 10_000,
            unsaved_ms: 1_500,
            navigation_ms: 30_000,
            poll_interval_ms: 100,
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }

    pub fn save(&self) -> Duration {
        Duration::from_millis(self.save_ms)
    }

    pub fn unsaved(&self) -> Duration {
        Duration::from_millis(self.unsaved_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl HarnessConfig {
    /// Load configuration from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                debug!("Loading harness config from {}", path.display());
                let content = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&content)?
            }
            Some(path) => {
                return Err(E2eError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )))
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `STUDIO_E2E_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(url) = var("BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(browser) = var("BROWSER") {
            self.browser = browser.parse()?;
        }
        if let Some(platform) = var("PLATFORM") {
            self.platform = Some(platform.parse()?);
        }
        if let Some(headless) = var("HEADLESS") {
            self.headless = parse_bool("HEADLESS", &headless)?;
        }
        if let Some(workers) = var("WORKERS") {
            self.workers = parse_number("WORKERS", &workers)?;
        }
        if let Some(ms) = var("TIMEOUT_MS") {
            self.timeouts.action_ms = parse_number("TIMEOUT_MS", &ms)?;
            self.timeouts.assertion_ms = self.timeouts.action_ms;
        }
        if let Some(ms) = var("SAVE_TIMEOUT_MS") {
            self.timeouts.save_ms = parse_number("SAVE_TIMEOUT_MS", &ms)?;
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("FIXTURES_DIR") {
            self.fixtures_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Platform used for shortcut resolution and baseline keys
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> E2eResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(E2eError::Config(format!(
            "{ENV_PREFIX}{name}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> E2eResult<T> {
    value.trim().parse().map_err(|_| {
        E2eError::Config(format!(
            "{ENV_PREFIX}{name}: expected a number, got '{value}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = HarnessConfig::default();
        config
            .apply_env(lookup(&[
                ("STUDIO_E2E_BASE_URL", "https://studio.test/"),
                ("STUDIO_E2E_BROWSER", "webkit"),
                ("STUDIO_E2E_PLATFORM", "macos"),
                ("STUDIO_E2E_WORKERS", "8"),
                ("STUDIO_E2E_HEADLESS", "no"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "https://studio.test");
        assert_eq!(config.browser, Browser::Webkit);
        assert_eq!(config.platform(), Platform::MacOs);
        assert_eq!(config.workers, 8);
        assert!(!config.headless);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env(lookup(&[("STUDIO_E2E_WORKERS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("STUDIO_E2E_WORKERS"));
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let yaml = r#"
base_url: http://127.0.0.1:9001
browser: firefox
timeouts:
  save_ms: 20000
"#;
        let config: HarnessConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.browser, Browser::Firefox);
        assert_eq!(config.timeouts.save_ms, 20_000);
        assert_eq!(config.timeouts.action_ms, 5_000);
        assert_eq!(config.workers, 4);
        config.validate().unwrap();
    }

    #[test]
    fn zero_workers_is_invalid() {
        let config = HarnessConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
