//! Suite runner: driver lifecycle, scenario execution, and result reporting

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::SuiteConfig;
use crate::driver::{wait_for_app, DriverProcess};
use crate::error::{E2eError, E2eResult, ErrorKind};
use crate::page::{Page, WebDriverPage};
use crate::scenario::{Group, Scenario, ScenarioContext, ScenarioGroup};
use crate::suite::catalogue;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub group: Group,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub screenshot: Option<PathBuf>,
}

/// Result of running the selected scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which scenarios to run. Empty selects everything; filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub group: Option<Group>,
    pub tag: Option<String>,
    pub name: Option<String>,
}

impl Selection {
    pub fn matches<P: Page>(&self, scenario: &Scenario<P>) -> bool {
        self.group.map_or(true, |g| g == scenario.group)
            && self.tag.as_deref().map_or(true, |t| scenario.has_tag(t))
            && self.name.as_deref().map_or(true, |n| n == scenario.name)
    }

    pub fn count<P: Page>(&self, groups: &[ScenarioGroup<P>]) -> usize {
        groups
            .iter()
            .flat_map(|g| g.scenarios.iter())
            .filter(|s| self.matches(s))
            .count()
    }
}

/// One line per scenario: `group: name [tags]`
pub fn list<P: Page>(groups: &[ScenarioGroup<P>]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|g| g.scenarios.iter())
        .map(|s| format!("{}: {} [{}]", s.group, s.name, s.tags.join(", ")))
        .collect()
}

/// File-name-safe form of a scenario name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Main E2E suite runner
pub struct TestRunner {
    config: Arc<SuiteConfig>,

    /// Locally spawned WebDriver server (if any)
    driver: Option<DriverProcess>,
}

impl TestRunner {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config: Arc::new(config),
            driver: None,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Spawn the configured WebDriver server, if one is configured
    pub async fn start_driver(&mut self) -> E2eResult<()> {
        if self.driver.is_some() {
            return Ok(());
        }
        let Some(driver_config) = self.config.driver.clone() else {
            return Ok(());
        };

        let driver = DriverProcess::spawn(&driver_config).await?;

        // Point the browser session at the spawned driver
        Arc::make_mut(&mut self.config).browser.webdriver_url = driver.url().to_string();

        self.driver = Some(driver);
        Ok(())
    }

    pub fn stop_driver(&mut self) -> E2eResult<()> {
        if let Some(mut driver) = self.driver.take() {
            driver.stop()?;
        }
        Ok(())
    }

    /// Wait for the application under test, when preflight is enabled
    pub async fn preflight(&self) -> E2eResult<()> {
        if !self.config.app.preflight {
            return Ok(());
        }
        wait_for_app(
            &self.config.root_url(),
            Duration::from_millis(self.config.app.preflight_timeout_ms),
        )
        .await
    }

    /// Run the selected scenarios in one browser session
    pub async fn run(&mut self, selection: &Selection) -> E2eResult<SuiteResult> {
        let groups = catalogue::<WebDriverPage>();
        if selection.count(&groups) == 0 {
            return Err(E2eError::Config(format!(
                "no scenario matches the selection {:?}",
                selection
            )));
        }

        self.start_driver().await?;
        self.preflight().await?;

        let page = Arc::new(WebDriverPage::connect(&self.config.browser).await?);
        let results = self.run_groups(Arc::clone(&page), &groups, selection).await;

        if let Err(e) = page.quit().await {
            warn!("Failed to close browser session: {}", e);
        }

        Ok(results)
    }

    /// Run `groups` sequentially against `page`
    pub async fn run_groups<P: Page>(
        &self,
        page: Arc<P>,
        groups: &[ScenarioGroup<P>],
        selection: &Selection,
    ) -> SuiteResult {
        let start = Instant::now();
        let total: usize = groups.iter().map(|g| g.scenarios.len()).sum();
        let selected = selection.count(groups);
        let mut results = Vec::with_capacity(selected);
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} of {} scenario(s)...", selected, total);

        for group in groups {
            for scenario in group.scenarios.iter().filter(|s| selection.matches(s)) {
                let result = self.run_scenario(&page, group, scenario).await;
                if result.success {
                    passed += 1;
                    info!("✓ {} ({} ms)", result.name, result.duration_ms);
                } else {
                    failed += 1;
                    error!(
                        "✗ {} - {}",
                        result.name,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                results.push(result);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let skipped = total - selected;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            total,
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    async fn run_scenario<P: Page>(
        &self,
        page: &Arc<P>,
        group: &ScenarioGroup<P>,
        scenario: &Scenario<P>,
    ) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {} / {}", group.group, scenario.name);

        let cx = ScenarioContext::new(Arc::clone(page), Arc::clone(&self.config));

        let outcome: E2eResult<()> = async {
            cx.reset_session().await?;
            if let Some(hook) = group.before_each {
                hook(cx.clone()).await?;
            }
            (scenario.run)(cx.clone()).await
        }
        .await;

        let screenshot = match &outcome {
            Err(_) if self.config.report.screenshots_on_failure => {
                self.capture_failure(&**page, scenario.name).await
            }
            _ => None,
        };

        if let Some(hook) = group.after_each {
            if let Err(e) = hook(cx.clone()).await {
                warn!("Cleanup after '{}' failed: {}", scenario.name, e);
            }
        }

        cx.events().sweep_leftovers(&cx.session()).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let (error, error_kind) = match outcome {
            Ok(()) => (None, None),
            Err(e) => (Some(e.to_string()), Some(e.kind())),
        };

        ScenarioResult {
            name: scenario.name.to_string(),
            group: scenario.group,
            success: error.is_none(),
            duration_ms,
            error,
            error_kind,
            screenshot,
        }
    }

    async fn capture_failure<P: Page>(&self, page: &P, name: &str) -> Option<PathBuf> {
        let dir = self.config.screenshot_dir();
        let path = dir.join(format!("{}.png", slug(name)));

        let saved: E2eResult<()> = async {
            let png = page.screenshot_png().await?;
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, png)?;
            Ok(())
        }
        .await;

        match saved {
            Ok(()) => {
                info!("Screenshot saved to: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to capture screenshot for '{}': {}", name, e);
                None
            }
        }
    }

    /// Write suite results to `<output_dir>/test-results.json`
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.config.report.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_driver();
    }
}
