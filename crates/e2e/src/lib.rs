//! EventHub E2E Test Suite
//!
//! Browser-level tests for the EventHub event management site, driven over
//! the WebDriver protocol. The suite:
//! - Optionally spawns a chromedriver / geckodriver process
//! - Opens one browser session and runs every scenario against it
//! - Resets cookies before each scenario and sweeps events it leaves behind
//! - Writes a JSON report and failure screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Suite Runner (Rust)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_driver() -> DriverProcess                      │
//! │    ├── preflight()    -> app answers on base_url            │
//! │    └── run_groups(page, catalogue(), selection)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioGroup { before_each, after_each, scenarios }       │
//! │    └── Scenario(ScenarioContext)                            │
//! │          ├── SessionActions  login / logout / register      │
//! │          ├── EventActions    create / delete / reserve      │
//! │          └── Waiter          url, element, visible, stale,  │
//! │                              alert, absence                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page trait ── WebDriverPage (thirtyfour)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod locator;
pub mod page;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod suite;
pub mod wait;

#[cfg(test)]
mod testing;

pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult, ErrorKind};
pub use locator::{Locator, LocatorTable};
pub use page::{Page, WebDriverPage};
pub use runner::{Selection, SuiteResult, TestRunner};
pub use scenario::{Group, Scenario, ScenarioContext, ScenarioGroup};
pub use session::{Role, SessionState};
pub use suite::catalogue;
