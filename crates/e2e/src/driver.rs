//! WebDriver server management and application preflight

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::DriverProcessConfig;
use crate::error::{E2eError, E2eResult};

/// Handle to a running chromedriver / geckodriver process
pub struct DriverProcess {
    child: Child,
    pub url: String,
    pub port: u16,
}

impl DriverProcess {
    /// Spawn the driver binary and wait until it reports ready
    pub async fn spawn(config: &DriverProcessConfig) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let url = format!("http://127.0.0.1:{}", port);

        info!("Spawning {} on port {}", config.binary_path.display(), port);

        let child = Command::new(&config.binary_path)
            .arg(format!("--port={}", port))
            .args(&config.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                E2eError::DriverStartup(format!(
                    "Failed to spawn {}: {}",
                    config.binary_path.display(),
                    e
                ))
            })?;

        let mut handle = DriverProcess { child, url, port };

        if let Err(e) = handle
            .wait_for_ready(Duration::from_millis(config.startup_timeout_ms))
            .await
        {
            let _ = handle.stop();
            return Err(e);
        }

        info!("WebDriver ready at {}", handle.url);
        Ok(handle)
    }

    /// Poll `GET /status` until `value.ready` is true
    async fn wait_for_ready(&mut self, timeout: Duration) -> E2eResult<()> {
        let status_url = format!("{}/status", self.url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(E2eError::DriverStartup(format!(
                    "driver exited during startup with {}",
                    status
                )));
            }

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<serde_json::Value>().await {
                        Ok(body) if is_ready(&body) => return Ok(()),
                        Ok(_) => {
                            if attempts == 1 {
                                info!("Driver is up but not ready yet...");
                            }
                        }
                        Err(e) => warn!("Unreadable /status body: {}", e),
                    }
                }
                Ok(resp) => {
                    warn!("Status check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for driver to start...");
                    }
                    // Connection refused is expected while the driver is starting
                    if !e.is_connect() {
                        warn!("Status check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::DriverHealthCheck(attempts))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stop the driver
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping WebDriver (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Whether a WebDriver `/status` body reports ready
pub fn is_ready(body: &serde_json::Value) -> bool {
    body.pointer("/value/ready")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Wait for the application under test to answer any HTTP response
pub async fn wait_for_app(base_url: &str, timeout: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match client.get(base_url).send().await {
            Ok(resp) => {
                info!("Application at {} answered {}", base_url, resp.status());
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for application at {}...", base_url);
                }
                if !e.is_connect() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout {
            return Err(E2eError::AppUnreachable {
                url: base_url.to_string(),
                attempts,
            });
        }
        sleep(Duration::from_millis(250)).await;
    }
}

/// Find a free port to use
pub fn find_free_port() -> E2eResult<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
