//! Event lifecycle actions: create, look up, delete, RSVP

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::EventFixture;
use crate::page::Page;
use crate::session::{Role, SessionActions, SessionTracker};
use crate::wait::Waiter;

/// Names of events created in the current scenario and not yet deleted.
#[derive(Debug, Clone, Default)]
pub struct CreatedEvents(Arc<Mutex<Vec<String>>>);

impl CreatedEvents {
    pub fn track(&self, name: &str) {
        self.0.lock().push(name.to_string());
    }

    pub fn untrack(&self, name: &str) {
        self.0.lock().retain(|n| n != name);
    }

    pub fn names(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

pub struct EventActions<P: Page> {
    waiter: Waiter<P>,
    config: Arc<SuiteConfig>,
    state: SessionTracker,
    created: CreatedEvents,
}

impl<P: Page> EventActions<P> {
    pub fn new(
        waiter: Waiter<P>,
        config: Arc<SuiteConfig>,
        state: SessionTracker,
        created: CreatedEvents,
    ) -> Self {
        Self {
            waiter,
            config,
            state,
            created,
        }
    }

    pub fn created(&self) -> &CreatedEvents {
        &self.created
    }

    /// Follow the header link to the creation form.
    pub async fn open_dashboard(&self) -> E2eResult<()> {
        let l = &self.config.locators;
        let link = self.waiter.wait_for_visible(&l.dashboard_link).await?;
        self.waiter.page().click(&link).await?;
        self.waiter.wait_for_element(&l.create_event_heading).await?;
        Ok(())
    }

    /// Create `event` through the dashboard form and wait for the root redirect.
    ///
    /// The name is tracked for cleanup as soon as the form is submitted, so an
    /// unconfirmed creation is still swept after the scenario.
    pub async fn create_event(&self, event: &EventFixture) -> E2eResult<String> {
        self.state.get().require(Role::Admin, "create an event")?;
        info!("Creating event '{}'", event.name);

        self.open_dashboard().await?;

        let l = &self.config.locators;
        let page = self.waiter.page();

        let name = self.waiter.wait_for_element(&l.event_name_input).await?;
        page.send_keys(&name, &event.name).await?;
        let description = self.waiter.wait_for_element(&l.event_description_input).await?;
        page.send_keys(&description, &event.description).await?;
        let date = self.waiter.wait_for_element(&l.event_date_input).await?;
        page.clear(&date).await?;
        page.send_keys(&date, &event.date).await?;
        let time = self.waiter.wait_for_element(&l.event_time_input).await?;
        page.send_keys(&time, &event.time).await?;
        let location = self.waiter.wait_for_element(&l.event_location_input).await?;
        page.send_keys(&location, &event.location).await?;

        let submit = self.waiter.wait_for_visible(&l.create_event_submit).await?;
        page.click(&submit).await?;
        self.created.track(&event.name);

        match self.waiter.wait_for_url_exact(&self.config.root_url()).await {
            Ok(()) => {
                debug!("Event '{}' confirmed", event.name);
                Ok(event.name.clone())
            }
            Err(E2eError::Timeout { timeout_ms, .. }) => Err(E2eError::CreationTimeout {
                name: event.name.clone(),
                timeout_ms,
            }),
            Err(e) => Err(e),
        }
    }

    /// The card of the event named `name`. Exactly one must exist.
    pub async fn find_event(&self, name: &str) -> E2eResult<P::Element> {
        self.waiter
            .find_unique(&self.config.locators.event_card(name))
            .await
    }

    /// Fail if a card for `name` appears within `within`.
    pub async fn assert_event_absent(&self, name: &str, within: Duration) -> E2eResult<()> {
        self.waiter
            .assert_element_absent(
                &self.config.locators.event_card(name),
                within,
                &format!("event '{}'", name),
            )
            .await
    }

    /// Best-effort delete. Failures are logged and reported as `false`.
    pub async fn delete_event(&self, name: &str) -> bool {
        match self.try_delete_event(name).await {
            Ok(()) => {
                self.created.untrack(name);
                info!("Deleted event '{}'", name);
                true
            }
            Err(e) => {
                warn!("Failed to delete event '{}': {}", name, e);
                false
            }
        }
    }

    async fn try_delete_event(&self, name: &str) -> E2eResult<()> {
        self.state.get().require(Role::Admin, "delete an event")?;
        let card = self.find_event(name).await?;
        let delete = self
            .waiter
            .wait_for_visible_in(&card, &self.config.locators.event_delete_control)
            .await?;
        self.waiter.page().click(&delete).await?;
        self.waiter.wait_for_staleness(&card).await
    }

    /// RSVP to `name` as the logged-in regular user.
    ///
    /// Both confirmation checks look inside the event's own card, so RSVPs
    /// to other listed events do not count.
    pub async fn reserve_event(&self, name: &str) -> E2eResult<()> {
        self.state.get().require(Role::RegularUser, "RSVP to an event")?;
        info!("Reserving event '{}'", name);

        let l = &self.config.locators;

        let card = self.find_event(name).await?;
        let rsvp = self.waiter.wait_for_visible_in(&card, &l.event_rsvp_control).await?;
        self.waiter
            .assert_absent_in(&card, &l.rsvp_confirmation, Duration::ZERO, "RSVP confirmation before reserving")
            .await?;

        self.waiter.page().click(&rsvp).await?;

        // The list re-renders on RSVP, so the old card may be detached.
        let card = self.find_event(name).await?;
        self.waiter.wait_for_element_in(&card, &l.rsvp_confirmation).await?;
        self.waiter
            .assert_absent_in(&card, &l.event_rsvp_control, Duration::ZERO, "RSVP control after reserving")
            .await
    }

    /// Delete every tracked event still on the site, as admin, from a clean session.
    pub async fn sweep_leftovers(&self, session: &SessionActions<P>) {
        let leftovers = self.created.names();
        if leftovers.is_empty() {
            return;
        }
        info!("Sweeping {} leftover event(s)", leftovers.len());

        if let Err(e) = self.prepare_sweep(session).await {
            warn!("Leftover sweep could not log in as admin: {}", e);
            return;
        }
        for name in leftovers {
            self.delete_event(&name).await;
        }
    }

    async fn prepare_sweep(&self, session: &SessionActions<P>) -> E2eResult<()> {
        self.waiter.page().delete_all_cookies().await?;
        self.state.reset();
        session.login_as_admin().await?;
        self.waiter.page().goto(&self.config.root_url()).await
    }
}
