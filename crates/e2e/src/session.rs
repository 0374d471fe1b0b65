//! Session actions: login, logout, registration and role checks

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::UserFixture;
use crate::page::Page;
use crate::wait::Waiter;

/// Alert text the site shows for a rejected login.
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    RegularUser,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::RegularUser => write!(f, "regular user"),
        }
    }
}

/// What the browser session is authenticated as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Admin,
    RegularUser,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Anonymous => write!(f, "anonymous"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::Admin => write!(f, "admin"),
            SessionState::RegularUser => write!(f, "regular user"),
        }
    }
}

impl SessionState {
    fn denied(self, action: &str) -> E2eError {
        E2eError::PermissionDenied {
            action: action.to_string(),
            state: self.to_string(),
        }
    }

    /// Submitting the login form. A rejected attempt may be retried.
    pub fn begin_login(self) -> E2eResult<Self> {
        match self {
            SessionState::Anonymous | SessionState::Authenticating => Ok(SessionState::Authenticating),
            other => Err(other.denied("log in")),
        }
    }

    pub fn confirm(self, role: Role) -> E2eResult<Self> {
        match self {
            SessionState::Authenticating => Ok(match role {
                Role::Admin => SessionState::Admin,
                Role::RegularUser => SessionState::RegularUser,
            }),
            other => Err(other.denied(&format!("confirm {} login", role))),
        }
    }

    /// The site refused the credentials.
    pub fn reject(self) -> E2eResult<Self> {
        match self {
            SessionState::Authenticating => Ok(SessionState::Anonymous),
            other => Err(other.denied("reject a login")),
        }
    }

    pub fn logout(self) -> E2eResult<Self> {
        match self {
            SessionState::Anonymous => Err(self.denied("log out")),
            _ => Ok(SessionState::Anonymous),
        }
    }

    pub fn role(self) -> Option<Role> {
        match self {
            SessionState::Admin => Some(Role::Admin),
            SessionState::RegularUser => Some(Role::RegularUser),
            _ => None,
        }
    }

    pub fn require(self, role: Role, action: &str) -> E2eResult<()> {
        if self.role() == Some(role) {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }
}

/// Session state shared by the actions of one scenario.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker(Arc<Mutex<SessionState>>);

impl SessionTracker {
    pub fn get(&self) -> SessionState {
        *self.0.lock()
    }

    pub fn apply(&self, step: impl FnOnce(SessionState) -> E2eResult<SessionState>) -> E2eResult<SessionState> {
        let mut state = self.0.lock();
        *state = step(*state)?;
        Ok(*state)
    }

    /// Cookies were cleared.
    pub fn reset(&self) {
        *self.0.lock() = SessionState::Anonymous;
    }
}

pub struct SessionActions<P: Page> {
    waiter: Waiter<P>,
    config: Arc<SuiteConfig>,
    state: SessionTracker,
}

impl<P: Page> SessionActions<P> {
    pub fn new(waiter: Waiter<P>, config: Arc<SuiteConfig>, state: SessionTracker) -> Self {
        Self { waiter, config, state }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Open the login page and submit `email` / `password`.
    ///
    /// Asserts nothing about the outcome; follow with [`Self::confirm_role`]
    /// or [`Self::expect_invalid_credentials`].
    pub async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.open_login().await?;
        self.submit_login(email, password).await
    }

    /// Fill and submit the login form already on screen.
    pub async fn submit_login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.state.apply(SessionState::begin_login)?;
        info!("Logging in as '{}'", email);

        self.fill_login_form(email, password).await?;
        self.click_login_button().await
    }

    pub async fn open_login(&self) -> E2eResult<()> {
        let l = &self.config.locators;
        self.waiter.page().goto(&self.config.login_url()).await?;
        self.waiter.wait_for_element(&l.login_heading).await?;
        Ok(())
    }

    pub async fn fill_login_form(&self, email: &str, password: &str) -> E2eResult<()> {
        let l = &self.config.locators;
        let page = self.waiter.page();
        let identifier = self.waiter.wait_for_element(&l.login_identifier_input).await?;
        page.send_keys(&identifier, email).await?;
        let secret = self.waiter.wait_for_element(&l.login_password_input).await?;
        page.send_keys(&secret, password).await?;
        Ok(())
    }

    pub async fn click_login_button(&self) -> E2eResult<()> {
        let button = self.waiter.wait_for_visible(&self.config.locators.login_submit).await?;
        self.waiter.page().click(&button).await
    }

    /// Check the markers that identify `role` after a login.
    ///
    /// Admins see the dashboard link. Regular users see the logout control
    /// and no dashboard link. Only a marker that never shows up becomes a
    /// [`E2eError::RoleAssertion`]; driver failures propagate as they are.
    pub async fn confirm_role(&self, role: Role) -> E2eResult<()> {
        let l = &self.config.locators;
        let marker = match role {
            Role::Admin => &l.dashboard_link,
            Role::RegularUser => &l.logout_button,
        };

        match self.waiter.wait_for_element(marker).await {
            Ok(_) => {}
            Err(e) if e.is_timeout() => {
                return Err(E2eError::RoleAssertion {
                    role: role.to_string(),
                    detail: format!("{} never appeared after login", marker),
                })
            }
            Err(e) => return Err(e),
        }

        if role == Role::RegularUser && !self.waiter.stays_absent(&l.dashboard_link, Duration::ZERO).await? {
            return Err(E2eError::RoleAssertion {
                role: role.to_string(),
                detail: "dashboard link is visible".to_string(),
            });
        }

        self.state.apply(|s| s.confirm(role))?;
        info!("Logged in as {}", role);
        Ok(())
    }

    pub async fn login_as(&self, user: &UserFixture, role: Role) -> E2eResult<()> {
        self.login(&user.email, &user.password).await?;
        self.confirm_role(role).await
    }

    pub async fn login_as_admin(&self) -> E2eResult<()> {
        let admin = self.config.fixtures.admin.clone();
        self.login_as(&admin, Role::Admin).await
    }

    pub async fn login_as_regular_user(&self) -> E2eResult<()> {
        let user = self.config.fixtures.registered.clone();
        self.login_as(&user, Role::RegularUser).await
    }

    /// Expect the rejection alert, accept it, and stay on the login route.
    pub async fn expect_invalid_credentials(&self) -> E2eResult<()> {
        let alert = self.waiter.wait_for_alert().await?;
        let text = alert.text().to_string();
        if !text.contains(INVALID_CREDENTIALS) {
            return Err(E2eError::AssertionFailed(format!(
                "alert should mention '{}', got '{}'",
                INVALID_CREDENTIALS, text
            )));
        }
        alert.accept().await?;
        self.waiter.wait_for_url("/login").await?;
        self.state.apply(SessionState::reject)?;
        debug!("Login rejected: {}", text);
        Ok(())
    }

    pub async fn logout(&self) -> E2eResult<()> {
        let button = self.waiter.wait_for_visible(&self.config.locators.logout_button).await?;
        self.waiter.page().click(&button).await?;
        self.waiter.wait_for_url("/login").await?;
        self.state.apply(SessionState::logout)?;
        info!("Logged out");
        Ok(())
    }

    pub async fn open_registration(&self) -> E2eResult<()> {
        self.waiter.page().goto(&self.config.register_url()).await?;
        self.waiter.wait_for_element(&self.config.locators.register_heading).await?;
        Ok(())
    }

    /// Fill the registration form and submit it.
    pub async fn register(&self, user: &UserFixture) -> E2eResult<()> {
        let l = &self.config.locators;
        let page = self.waiter.page();
        info!("Registering '{}'", user.username);

        for (locator, value) in [
            (&l.register_username_input, &user.username),
            (&l.register_email_input, &user.email),
            (&l.register_password_input, &user.password),
            (&l.register_confirm_password_input, &user.confirm_password),
        ] {
            let field = self.waiter.wait_for_element(locator).await?;
            page.send_keys(&field, value).await?;
        }

        let submit = self.waiter.wait_for_visible(&l.register_submit).await?;
        page.click(&submit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakePage, FakeSite, SiteRole};
    use test_case::test_case;

    fn actions(config: &SuiteConfig, page: &Arc<FakePage>) -> SessionActions<FakePage> {
        let waiter = Waiter::new(Arc::clone(page), &config.timeouts);
        SessionActions::new(waiter, Arc::new(config.clone()), SessionTracker::default())
    }

    fn site_page(config: &SuiteConfig) -> Arc<FakePage> {
        Arc::new(FakePage::with_site(FakeSite::new(config)))
    }

    #[test_case(SessionState::Anonymous, true)]
    #[test_case(SessionState::Authenticating, true)]
    #[test_case(SessionState::Admin, false)]
    #[test_case(SessionState::RegularUser, false)]
    fn test_begin_login(from: SessionState, allowed: bool) {
        assert_eq!(from.begin_login().is_ok(), allowed);
    }

    #[test]
    fn test_state_machine_round_trip() {
        let state = SessionState::Anonymous
            .begin_login()
            .and_then(|s| s.confirm(Role::Admin))
            .unwrap();
        assert_eq!(state, SessionState::Admin);
        assert!(state.require(Role::Admin, "create an event").is_ok());
        assert_eq!(state.logout().unwrap(), SessionState::Anonymous);
    }

    #[test]
    fn test_confirm_requires_authenticating() {
        let err = SessionState::Anonymous.confirm(Role::Admin).unwrap_err();
        assert_eq!(err.to_string(), "Cannot confirm admin login while session is anonymous");
    }

    #[test]
    fn test_regular_user_cannot_act_as_admin() {
        let err = SessionState::RegularUser
            .require(Role::Admin, "create an event")
            .unwrap_err();
        assert!(matches!(err, E2eError::PermissionDenied { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_as_admin() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        session.login_as_admin().await.unwrap();
        assert_eq!(session.state(), SessionState::Admin);
        assert_eq!(page.site(|s| s.role), Some(SiteRole::Admin));
        assert_eq!(page.with_dom(|d| d.url.clone()), "http://localhost:3000/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_as_regular_user_then_logout() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        session.login_as_regular_user().await.unwrap();
        assert_eq!(session.state(), SessionState::RegularUser);

        session.logout().await.unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(page.with_dom(|d| d.url.ends_with("/login")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_regular_user_with_dashboard_link_fails_role_check() {
        let config = test_config();
        let page = site_page(&config);
        page.site(|s| s.leaky_dashboard_link = true);
        let session = actions(&config, &page);

        let err = session.login_as_regular_user().await.unwrap_err();
        match err {
            E2eError::RoleAssertion { role, detail } => {
                assert_eq!(role, "regular user");
                assert_eq!(detail, "dashboard link is visible");
            }
            other => panic!("expected role assertion, got {other}"),
        }
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[tokio::test(start_paused = true)]
    async fn test_regular_user_is_not_admin() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        let registered = config.fixtures.registered.clone();
        let err = session.login_as(&registered, Role::Admin).await.unwrap_err();
        assert!(matches!(err, E2eError::RoleAssertion { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_raises_alert() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        let user = config.fixtures.wrong_password.clone();
        session.login(&user.email, &user.password).await.unwrap();
        session.expect_invalid_credentials().await.unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(page.with_dom(|d| d.alert.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_types_into_fields_by_type() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        session.open_login().await.unwrap();
        session.fill_login_form("someone@example.com", "pw").await.unwrap();
        let l = &config.locators;
        assert_eq!(
            page.with_dom(|d| d.value_of(&l.login_identifier_input)),
            "someone@example.com"
        );
        assert_eq!(page.with_dom(|d| d.value_of(&l.login_password_input)), "pw");
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_without_redirect_times_out() {
        let config = test_config();
        let page = Arc::new(FakePage::new("http://localhost:3000/"));
        let logout = config.locators.logout_button.clone();
        page.with_dom(|d| {
            let id = d.add(logout.clone());
            d.on_click(id, |_| {});
        });
        let session = actions(&config, &page);

        let err = session.logout().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(page.with_dom(|d| d.clicked(&logout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_new_user_redirects_to_login() {
        let config = test_config();
        let page = site_page(&config);
        let session = actions(&config, &page);

        let user = config.fixtures.new_user();
        session.open_registration().await.unwrap();
        session.register(&user).await.unwrap();
        session.waiter.wait_for_url("/login").await.unwrap();
        assert!(page.site(|s| s.users.iter().any(|u| u.email == user.email)));
    }
}
