//! In-memory browser for unit tests
//!
//! [`FakePage`] stores nodes keyed by the exact [`Locator`] that finds them.
//! With a [`FakeSite`] attached it also plays the event site: login,
//! registration, the admin dashboard and the event list re-render on every
//! navigation or click, detaching previous nodes the way a real DOM would.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::UserFixture;
use crate::locator::Locator;
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeElement(pub usize);

pub(crate) struct Node {
    pub locator: Locator,
    pub scope: Option<usize>,
    pub displayed: bool,
    pub attached: bool,
    pub text: String,
    pub value: String,
    /// Lookups that miss this node before it starts matching.
    pub hidden_for: usize,
    /// Event a card or card control belongs to.
    pub event: Option<String>,
}

type Reaction = Arc<dyn Fn(&mut FakeDom) + Send + Sync>;

pub(crate) struct FakeDom {
    pub url: String,
    pub nodes: Vec<Node>,
    pub alert: Option<String>,
    pub cookies_cleared: usize,
    pub log: Vec<String>,
    pub fail_lookups: bool,
    reactions: HashMap<usize, Reaction>,
    site: Option<FakeSite>,
}

fn stale() -> E2eError {
    E2eError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "stale element reference",
    ))
}

fn crashed() -> E2eError {
    E2eError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "browser connection lost",
    ))
}

impl FakeDom {
    pub fn add(&mut self, locator: Locator) -> usize {
        self.push(locator, None)
    }

    pub fn add_in(&mut self, scope: usize, locator: Locator) -> usize {
        self.push(locator, Some(scope))
    }

    fn push(&mut self, locator: Locator, scope: Option<usize>) -> usize {
        self.nodes.push(Node {
            locator,
            scope,
            displayed: true,
            attached: true,
            text: String::new(),
            value: String::new(),
            hidden_for: 0,
            event: None,
        });
        self.nodes.len() - 1
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Detach a node and everything scoped under it.
    pub fn detach(&mut self, id: usize) {
        self.nodes[id].attached = false;
        let children: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.scope == Some(id) && n.attached)
            .map(|(i, _)| i)
            .collect();
        for child in children {
            self.detach(child);
        }
    }

    pub fn detach_all(&mut self) {
        for node in &mut self.nodes {
            node.attached = false;
        }
    }

    pub fn on_click(&mut self, id: usize, reaction: impl Fn(&mut FakeDom) + Send + Sync + 'static) {
        self.reactions.insert(id, Arc::new(reaction));
    }

    /// Value typed into the first attached node matching `locator`.
    pub fn value_of(&self, locator: &Locator) -> String {
        self.nodes
            .iter()
            .find(|n| n.attached && &n.locator == locator)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    pub fn attached_count(&self, locator: &Locator) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.attached && &n.locator == locator)
            .count()
    }

    pub fn clicked(&self, locator: &Locator) -> bool {
        let entry = format!("click {}", locator);
        self.log.iter().any(|l| l == &entry)
    }

    fn lookup(&mut self, scope: Option<usize>, locator: &Locator) -> Vec<FakeElement> {
        let mut found = Vec::new();
        for (id, node) in self.nodes.iter_mut().enumerate() {
            if !node.attached || node.scope != scope || &node.locator != locator {
                continue;
            }
            if node.hidden_for > 0 {
                node.hidden_for -= 1;
                continue;
            }
            found.push(FakeElement(id));
        }
        found
    }

    fn live(&self, element: &FakeElement) -> E2eResult<&Node> {
        match self.nodes.get(element.0) {
            Some(node) if node.attached => Ok(node),
            _ => Err(stale()),
        }
    }

    fn with_site(&mut self, f: impl FnOnce(&mut FakeSite, &mut FakeDom)) {
        if let Some(mut site) = self.site.take() {
            f(&mut site, self);
            self.site = Some(site);
        }
    }
}

pub(crate) struct FakePage {
    dom: Mutex<FakeDom>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            dom: Mutex::new(FakeDom {
                url: url.to_string(),
                nodes: Vec::new(),
                alert: None,
                cookies_cleared: 0,
                log: Vec::new(),
                fail_lookups: false,
                reactions: HashMap::new(),
                site: None,
            }),
        }
    }

    /// A page backed by the scripted event site, parked on `about:blank`.
    pub fn with_site(site: FakeSite) -> Self {
        let page = Self::new("about:blank");
        page.dom.lock().site = Some(site);
        page
    }

    pub fn with_dom<R>(&self, f: impl FnOnce(&mut FakeDom) -> R) -> R {
        f(&mut *self.dom.lock())
    }

    pub fn site<R>(&self, f: impl FnOnce(&mut FakeSite) -> R) -> R {
        let mut dom = self.dom.lock();
        let site = dom.site.as_mut().expect("page has no site attached");
        f(site)
    }
}

#[async_trait]
impl Page for FakePage {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        dom.log.push(format!("goto {}", url));
        dom.url = url.to_string();
        dom.with_site(|site, dom| site.render(dom));
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.dom.lock().url.clone())
    }

    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<FakeElement>> {
        let mut dom = self.dom.lock();
        if dom.fail_lookups {
            return Err(crashed());
        }
        Ok(dom.lookup(None, locator))
    }

    async fn find_all_in(&self, scope: &FakeElement, locator: &Locator) -> E2eResult<Vec<FakeElement>> {
        let mut dom = self.dom.lock();
        if dom.fail_lookups {
            return Err(crashed());
        }
        dom.live(scope)?;
        Ok(dom.lookup(Some(scope.0), locator))
    }

    async fn is_displayed(&self, element: &FakeElement) -> E2eResult<bool> {
        Ok(self.dom.lock().live(element)?.displayed)
    }

    async fn is_attached(&self, element: &FakeElement) -> E2eResult<bool> {
        Ok(self
            .dom
            .lock()
            .nodes
            .get(element.0)
            .map(|n| n.attached)
            .unwrap_or(false))
    }

    async fn click(&self, element: &FakeElement) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        let entry = format!("click {}", dom.live(element)?.locator);
        dom.log.push(entry);
        if let Some(reaction) = dom.reactions.get(&element.0).cloned() {
            reaction(&mut *dom);
        } else {
            dom.with_site(|site, dom| site.click(dom, element.0));
        }
        Ok(())
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        dom.live(element)?;
        dom.nodes[element.0].value.push_str(text);
        Ok(())
    }

    async fn clear(&self, element: &FakeElement) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        dom.live(element)?;
        dom.nodes[element.0].value.clear();
        Ok(())
    }

    async fn text(&self, element: &FakeElement) -> E2eResult<String> {
        Ok(self.dom.lock().live(element)?.text.clone())
    }

    async fn alert_text(&self) -> E2eResult<Option<String>> {
        Ok(self.dom.lock().alert.clone())
    }

    async fn accept_alert(&self) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        match dom.alert.take() {
            Some(text) => {
                dom.log.push(format!("accept alert {}", text));
                Ok(())
            }
            None => Err(E2eError::AssertionFailed("no alert open".into())),
        }
    }

    async fn dismiss_alert(&self) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        match dom.alert.take() {
            Some(_) => Ok(()),
            None => Err(E2eError::AssertionFailed("no alert open".into())),
        }
    }

    async fn delete_all_cookies(&self) -> E2eResult<()> {
        let mut dom = self.dom.lock();
        dom.cookies_cleared += 1;
        dom.with_site(|site, _| site.role = None);
        Ok(())
    }

    async fn screenshot_png(&self) -> E2eResult<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SiteRole {
    Admin,
    Regular,
}

#[derive(Debug, Clone)]
pub(crate) struct SiteEvent {
    pub name: String,
    pub description: String,
    pub date: String,
    pub rsvped: bool,
}

/// Scripted behaviour of the event site.
pub(crate) struct FakeSite {
    config: SuiteConfig,
    pub role: Option<SiteRole>,
    pub users: Vec<UserFixture>,
    pub events: Vec<SiteEvent>,
    registration_failed: bool,
    /// Delete controls do nothing.
    pub broken_delete: bool,
    /// The create form submits without redirecting.
    pub stuck_create: bool,
    /// Regular users also get the dashboard link.
    pub leaky_dashboard_link: bool,
}

impl FakeSite {
    /// Site seeded with the admin and registered fixtures from `config`.
    pub fn new(config: &SuiteConfig) -> Self {
        Self {
            config: config.clone(),
            role: None,
            users: vec![config.fixtures.admin.clone(), config.fixtures.registered.clone()],
            events: Vec::new(),
            registration_failed: false,
            broken_delete: false,
            stuck_create: false,
            leaky_dashboard_link: false,
        }
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|e| e.name.clone()).collect()
    }

    fn path<'a>(&self, url: &'a str) -> &'a str {
        let base = self.config.app.base_url.trim_end_matches('/');
        url.strip_prefix(base).unwrap_or(url)
    }

    fn go(&mut self, dom: &mut FakeDom, url: String) {
        dom.url = url;
        self.render(dom);
    }

    fn render(&mut self, dom: &mut FakeDom) {
        dom.detach_all();
        let l = self.config.locators.clone();

        match self.role {
            None => {
                dom.add(l.register_link.clone());
                dom.add(l.login_link.clone());
            }
            Some(SiteRole::Admin) => {
                dom.add(l.dashboard_link.clone());
                dom.add(l.logout_button.clone());
            }
            Some(SiteRole::Regular) => {
                if self.leaky_dashboard_link {
                    dom.add(l.dashboard_link.clone());
                }
                dom.add(l.logout_button.clone());
            }
        }

        let path = self.path(&dom.url).to_string();
        match path.as_str() {
            "/" => {
                for event in &self.events {
                    let card = dom.add(l.event_card(&event.name));
                    dom.node_mut(card).event = Some(event.name.clone());
                    match self.role {
                        Some(SiteRole::Admin) => {
                            let delete = dom.add_in(card, l.event_delete_control.clone());
                            dom.node_mut(delete).event = Some(event.name.clone());
                        }
                        Some(SiteRole::Regular) if event.rsvped => {
                            dom.add_in(card, l.rsvp_confirmation.clone());
                        }
                        Some(SiteRole::Regular) => {
                            let rsvp = dom.add_in(card, l.event_rsvp_control.clone());
                            dom.node_mut(rsvp).event = Some(event.name.clone());
                        }
                        None => {}
                    }
                }
            }
            "/login" => {
                dom.add(l.login_heading.clone());
                dom.add(l.login_identifier_input.clone());
                dom.add(l.login_password_input.clone());
                dom.add(l.login_submit.clone());
            }
            "/register" => {
                dom.add(l.register_heading.clone());
                dom.add(l.register_username_input.clone());
                dom.add(l.register_email_input.clone());
                dom.add(l.register_password_input.clone());
                dom.add(l.register_confirm_password_input.clone());
                dom.add(l.register_submit.clone());
                if self.registration_failed {
                    let err = dom.add(l.registration_error.clone());
                    dom.node_mut(err).text = "Registration failed. User already exists.".into();
                }
            }
            "/dashboard" if self.role == Some(SiteRole::Admin) => {
                dom.add(l.create_event_heading.clone());
                dom.add(l.event_name_input.clone());
                dom.add(l.event_description_input.clone());
                dom.add(l.event_date_input.clone());
                dom.add(l.event_time_input.clone());
                dom.add(l.event_location_input.clone());
                dom.add(l.create_event_submit.clone());
            }
            _ => {}
        }
    }

    fn click(&mut self, dom: &mut FakeDom, id: usize) {
        let l = self.config.locators.clone();
        let locator = dom.nodes[id].locator.clone();
        let event = dom.nodes[id].event.clone();

        if locator == l.register_link {
            self.registration_failed = false;
            self.go(dom, self.config.register_url());
        } else if locator == l.login_link {
            self.go(dom, self.config.login_url());
        } else if locator == l.dashboard_link {
            self.go(dom, self.config.dashboard_url());
        } else if locator == l.login_submit {
            let email = dom.value_of(&l.login_identifier_input);
            let password = dom.value_of(&l.login_password_input);
            if email.is_empty() && password.is_empty() {
                return;
            }
            let admin_email = self.config.fixtures.admin.email.clone();
            let role = self
                .users
                .iter()
                .find(|u| u.email == email && u.password == password)
                .map(|u| {
                    if u.email == admin_email {
                        SiteRole::Admin
                    } else {
                        SiteRole::Regular
                    }
                });
            match role {
                Some(role) => {
                    self.role = Some(role);
                    self.go(dom, self.config.root_url());
                }
                None => dom.alert = Some("Invalid login credentials. Please try again.".into()),
            }
        } else if locator == l.logout_button {
            self.role = None;
            self.go(dom, self.config.login_url());
        } else if locator == l.register_submit {
            let user = UserFixture {
                username: dom.value_of(&l.register_username_input),
                email: dom.value_of(&l.register_email_input),
                password: dom.value_of(&l.register_password_input),
                confirm_password: dom.value_of(&l.register_confirm_password_input),
            };
            if self
                .users
                .iter()
                .any(|u| u.email == user.email || u.username == user.username)
            {
                self.registration_failed = true;
                self.render(dom);
            } else {
                self.users.push(user);
                self.go(dom, self.config.login_url());
            }
        } else if locator == l.create_event_submit {
            let name = dom.value_of(&l.event_name_input);
            if !name.is_empty() {
                self.events.push(SiteEvent {
                    name,
                    description: dom.value_of(&l.event_description_input),
                    date: dom.value_of(&l.event_date_input),
                    rsvped: false,
                });
            }
            if !self.stuck_create {
                self.go(dom, self.config.root_url());
            }
        } else if locator == l.event_delete_control {
            if self.broken_delete {
                return;
            }
            if let Some(name) = event {
                self.events.retain(|e| e.name != name);
                self.render(dom);
            }
        } else if locator == l.event_rsvp_control {
            if let Some(name) = event {
                if let Some(e) = self.events.iter_mut().find(|e| e.name == name) {
                    e.rsvped = true;
                }
                self.render(dom);
            }
        }
    }
}

/// Config with a tight poll interval for tests.
pub(crate) fn test_config() -> SuiteConfig {
    let mut config = SuiteConfig::default();
    config.timeouts.poll_interval_ms = 50;
    config
}
