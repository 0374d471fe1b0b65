//! Scenario model
//!
//! A [`Scenario`] is a plain async function over a [`ScenarioContext`].
//! Scenarios are grouped into [`ScenarioGroup`]s, which may carry hooks run
//! around every scenario of the group.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::events::{CreatedEvents, EventActions};
use crate::fixtures::FixtureSet;
use crate::locator::LocatorTable;
use crate::page::Page;
use crate::session::{SessionActions, SessionState, SessionTracker};
use crate::wait::Waiter;

pub type ScenarioFn<P> = fn(ScenarioContext<P>) -> BoxFuture<'static, E2eResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Registration,
    Login,
    Dashboard,
    EventManagement,
    Smoke,
}

impl Group {
    pub fn all() -> &'static [Group] {
        &[
            Group::Registration,
            Group::Login,
            Group::Dashboard,
            Group::EventManagement,
            Group::Smoke,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Registration => "registration",
            Group::Login => "login",
            Group::Dashboard => "dashboard",
            Group::EventManagement => "event_management",
            Group::Smoke => "smoke",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Group::all()
            .iter()
            .copied()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| E2eError::Config(format!("unknown scenario group: {}", s)))
    }
}

pub struct Scenario<P: Page> {
    pub name: &'static str,
    pub group: Group,
    pub tags: &'static [&'static str],
    pub run: ScenarioFn<P>,
}

impl<P: Page> Clone for Scenario<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            group: self.group,
            tags: self.tags,
            run: self.run,
        }
    }
}

impl<P: Page> Scenario<P> {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }
}

pub struct ScenarioGroup<P: Page> {
    pub group: Group,
    pub before_each: Option<ScenarioFn<P>>,
    pub after_each: Option<ScenarioFn<P>>,
    pub scenarios: Vec<Scenario<P>>,
}

impl<P: Page> ScenarioGroup<P> {
    pub fn new(group: Group) -> Self {
        Self {
            group,
            before_each: None,
            after_each: None,
            scenarios: Vec::new(),
        }
    }

    pub fn before_each(mut self, hook: ScenarioFn<P>) -> Self {
        self.before_each = Some(hook);
        self
    }

    /// Runs after every scenario whatever its outcome; its failure is only logged.
    pub fn after_each(mut self, hook: ScenarioFn<P>) -> Self {
        self.after_each = Some(hook);
        self
    }

    pub fn scenario(
        mut self,
        name: &'static str,
        tags: &'static [&'static str],
        run: ScenarioFn<P>,
    ) -> Self {
        self.scenarios.push(Scenario {
            name,
            group: self.group,
            tags,
            run,
        });
        self
    }
}

/// Everything one scenario needs: the browser, the configuration, and the
/// per-scenario session and cleanup trackers.
pub struct ScenarioContext<P: Page> {
    page: Arc<P>,
    config: Arc<SuiteConfig>,
    waiter: Waiter<P>,
    state: SessionTracker,
    created: CreatedEvents,
}

impl<P: Page> Clone for ScenarioContext<P> {
    fn clone(&self) -> Self {
        Self {
            page: Arc::clone(&self.page),
            config: Arc::clone(&self.config),
            waiter: self.waiter.clone(),
            state: self.state.clone(),
            created: self.created.clone(),
        }
    }
}

impl<P: Page> ScenarioContext<P> {
    pub fn new(page: Arc<P>, config: Arc<SuiteConfig>) -> Self {
        let waiter = Waiter::new(Arc::clone(&page), &config.timeouts);
        Self {
            page,
            config,
            waiter,
            state: SessionTracker::default(),
            created: CreatedEvents::default(),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &FixtureSet {
        &self.config.fixtures
    }

    pub fn locators(&self) -> &LocatorTable {
        &self.config.locators
    }

    pub fn waiter(&self) -> &Waiter<P> {
        &self.waiter
    }

    pub fn session(&self) -> SessionActions<P> {
        SessionActions::new(self.waiter.clone(), Arc::clone(&self.config), self.state.clone())
    }

    pub fn events(&self) -> EventActions<P> {
        EventActions::new(
            self.waiter.clone(),
            Arc::clone(&self.config),
            self.state.clone(),
            self.created.clone(),
        )
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Navigate to `path` under the application base URL.
    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        self.page.goto(&self.config.route(path)).await
    }

    /// Drop the browser's cookies and forget the logged-in role.
    pub async fn reset_session(&self) -> E2eResult<()> {
        self.page.delete_all_cookies().await?;
        self.state.reset();
        Ok(())
    }
}
