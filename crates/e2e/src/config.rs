//! Suite configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::fixtures::FixtureSet;
use crate::locator::LocatorTable;

/// Suite configuration, usually read from `eventhub-e2e.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application under test
    pub app: AppConfig,

    /// Browser session settings
    pub browser: BrowserConfig,

    /// Wait budgets
    pub timeouts: TimeoutConfig,

    /// Spawn a local WebDriver server instead of using `browser.webdriver_url`
    pub driver: Option<DriverProcessConfig>,

    /// Output settings
    pub report: ReportConfig,

    /// Seeded users and event form defaults
    pub fixtures: FixtureSet,

    /// Semantic element names mapped to selectors
    pub locators: LocatorTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,

    /// Wait for `base_url` to answer before opening a browser
    pub preflight: bool,

    pub preflight_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            preflight: true,
            preflight_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl std::str::FromStr for BrowserKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            other => Err(E2eError::Config(format!("unsupported browser: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub kind: BrowserKind,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            kind: BrowserKind::Chrome,
            headless: true,
            window_width: 1280,
            window_height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget for every positive wait
    pub default_ms: u64,

    /// Window in which an element that must not exist is watched for
    pub negative_ms: u64,

    /// Budget for the duplicate-registration error message
    pub registration_error_ms: u64,

    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 10_000,
            negative_ms: 3_000,
            registration_error_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl TimeoutConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn negative(&self) -> Duration {
        Duration::from_millis(self.negative_ms)
    }

    pub fn registration_error(&self) -> Duration {
        Duration::from_millis(self.registration_error_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Configuration for spawning a WebDriver server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverProcessConfig {
    /// Path to chromedriver / geckodriver
    pub binary_path: PathBuf,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    pub startup_timeout_ms: u64,

    /// Extra arguments after `--port`
    pub args: Vec<String>,
}

impl Default for DriverProcessConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("chromedriver"),
            port: None,
            startup_timeout_ms: 30_000,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub screenshots_on_failure: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
            screenshots_on_failure: true,
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EVENTHUB_*` environment overrides
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> E2eResult<()> {
        if let Some(url) = var("EVENTHUB_BASE_URL") {
            self.app.base_url = url;
        }
        if let Some(url) = var("EVENTHUB_WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(flag) = var("EVENTHUB_HEADLESS") {
            self.browser.headless = match flag.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(E2eError::Config(format!(
                        "EVENTHUB_HEADLESS must be a boolean, got '{}'",
                        other
                    )))
                }
            };
        }
        self.validate()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.app.base_url.starts_with("http://") || self.app.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "app.base_url must be an http(s) URL: {}",
                self.app.base_url
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(E2eError::Config("timeouts.poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }

    fn base(&self) -> &str {
        self.app.base_url.trim_end_matches('/')
    }

    /// `base + path`; `path` starts with `/`
    pub fn route(&self, path: &str) -> String {
        format!("{}{}", self.base(), path)
    }

    /// Site root. Event creation redirects here.
    pub fn root_url(&self) -> String {
        self.route("/")
    }

    pub fn register_url(&self) -> String {
        self.route("/register")
    }

    pub fn login_url(&self) -> String {
        self.route("/login")
    }

    pub fn dashboard_url(&self) -> String {
        self.route("/dashboard")
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.report.output_dir.join("screenshots")
    }
}
