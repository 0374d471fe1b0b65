//! The scenario catalogue

use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::scenario::{Group, ScenarioContext, ScenarioGroup};
use crate::session::Role;

type Step = BoxFuture<'static, E2eResult<()>>;

/// Every scenario group, in execution order.
pub fn catalogue<P: Page>() -> Vec<ScenarioGroup<P>> {
    vec![
        ScenarioGroup::<P>::new(Group::Registration)
            .before_each(open_root)
            .scenario("opens the registration page", &["registration"], open_registration_page)
            .scenario("registers a new user", &["registration"], register_new_user)
            .scenario("navigates from registration to login", &["registration"], registration_to_login)
            .scenario("rejects a duplicate registration", &["registration", "negative"], duplicate_registration),
        ScenarioGroup::<P>::new(Group::Login)
            .before_each(open_login)
            .scenario("displays the login page", &["login"], login_page_displays)
            .scenario("logs in a registered user", &["login"], registered_user_login)
            .scenario("rejects an unregistered user", &["login", "negative"], unregistered_user_login)
            .scenario("rejects a wrong password", &["login", "negative"], wrong_password_login)
            .scenario("keeps an empty login form on the login page", &["login", "negative"], empty_login)
            .scenario("logs in the admin with dashboard access", &["login"], admin_login),
        ScenarioGroup::<P>::new(Group::Dashboard)
            .before_each(login_as_admin)
            .after_each(logout)
            .scenario("navigates to the admin dashboard", &["dashboard"], navigate_to_dashboard)
            .scenario("creates an event from the dashboard", &["dashboard", "events"], dashboard_create_event)
            .scenario(
                "restricts the dashboard URL to admins",
                &["dashboard", "access_control"],
                dashboard_url_admin_only,
            ),
        ScenarioGroup::<P>::new(Group::EventManagement)
            .before_each(login_as_admin)
            .after_each(logout)
            .scenario("creates and deletes an event", &["events"], create_and_delete_event)
            .scenario(
                "shows admin events read-only to regular users",
                &["events", "access_control"],
                events_read_only_for_regular_users,
            )
            .scenario(
                "prevents regular users from creating events",
                &["events", "access_control"],
                regular_user_cannot_create,
            )
            .scenario("lets a regular user RSVP to an event", &["events", "rsvp"], regular_user_rsvp),
        ScenarioGroup::<P>::new(Group::Smoke)
            .scenario("completes a journey with role separation", &["smoke"], role_separation_journey)
            .scenario("runs the admin event workflow", &["smoke", "events"], admin_event_workflow)
            .scenario(
                "keeps anonymous visitors out of the dashboard",
                &["smoke", "access_control"],
                anonymous_dashboard,
            ),
    ]
}

// Hooks

fn open_root<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move { cx.goto("/").await }.boxed()
}

fn open_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move { cx.session().open_login().await }.boxed()
}

fn login_as_admin<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move { cx.session().login_as_admin().await }.boxed()
}

fn logout<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move { cx.session().logout().await }.boxed()
}

// Registration

fn open_registration_page<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let w = cx.waiter();
        let link = w.wait_for_visible(&cx.locators().register_link).await?;
        cx.page().click(&link).await?;
        w.wait_for_url("/register").await?;
        w.wait_for_element(&cx.locators().register_heading).await?;
        Ok(())
    }
    .boxed()
}

fn register_new_user<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let user = cx.fixtures().new_user();
        session.open_registration().await?;
        session.register(&user).await?;
        cx.waiter().wait_for_url("/login").await?;
        Ok(())
    }
    .boxed()
}

fn registration_to_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let w = cx.waiter();
        cx.session().open_registration().await?;
        let link = w.wait_for_visible(&cx.locators().login_link).await?;
        cx.page().click(&link).await?;
        w.wait_for_url("/login").await?;
        w.wait_for_element(&cx.locators().login_heading).await?;
        Ok(())
    }
    .boxed()
}

fn duplicate_registration<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let w = cx.waiter();
        let session = cx.session();
        let existing = cx.fixtures().registered.clone();
        session.open_registration().await?;
        session.register(&existing).await?;

        let budget = cx.config().timeouts.registration_error();
        match w.wait_for_element_within(&cx.locators().registration_error, budget).await {
            Ok(message) => {
                w.wait_for_element_visible(&message).await?;
                let text = cx.page().text(&message).await?;
                if !text.contains("Registration failed.") {
                    return Err(E2eError::AssertionFailed(format!(
                        "unexpected registration error text: '{}'",
                        text
                    )));
                }
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                warn!("No registration failure message: {}", e);
                let url = cx.page().current_url().await?;
                if url.contains("/register") {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "duplicate registration left the register page for {}",
                        url
                    )))
                }
            }
            Err(e) => Err(e),
        }
    }
    .boxed()
}

// Login

fn login_page_displays<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        cx.waiter().wait_for_url("/login").await?;
        cx.waiter().wait_for_element(&cx.locators().login_heading).await?;
        Ok(())
    }
    .boxed()
}

fn registered_user_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let user = cx.fixtures().registered.clone();
        session.submit_login(&user.email, &user.password).await?;
        session.confirm_role(Role::RegularUser).await?;
        session.logout().await
    }
    .boxed()
}

async fn rejected_login<P: Page>(cx: &ScenarioContext<P>, email: &str, password: &str) -> E2eResult<()> {
    let session = cx.session();
    session.submit_login(email, password).await?;
    session.expect_invalid_credentials().await
}

fn unregistered_user_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let user = cx.fixtures().unregistered.clone();
        rejected_login(&cx, &user.email, &user.password).await
    }
    .boxed()
}

fn wrong_password_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let user = cx.fixtures().wrong_password.clone();
        rejected_login(&cx, &user.email, &user.password).await
    }
    .boxed()
}

fn empty_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        cx.session().submit_login("", "").await?;
        cx.waiter().wait_for_url("/login").await?;
        cx.waiter().wait_for_element(&cx.locators().login_heading).await?;
        Ok(())
    }
    .boxed()
}

fn admin_login<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let admin = cx.fixtures().admin.clone();
        session.submit_login(&admin.email, &admin.password).await?;
        session.confirm_role(Role::Admin).await?;
        session.logout().await
    }
    .boxed()
}

// Dashboard

fn navigate_to_dashboard<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        cx.events().open_dashboard().await?;
        cx.waiter().wait_for_url("/dashboard").await?;
        Ok(())
    }
    .boxed()
}

fn dashboard_create_event<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let events = cx.events();
        let fixture = cx
            .fixtures()
            .event("Dashboard Test Event", "Dashboard test event description");
        let name = events.create_event(&fixture).await?;
        cx.goto("/").await?;
        events.find_event(&name).await?;
        events.delete_event(&name).await;
        Ok(())
    }
    .boxed()
}

/// A regular user must not see the creation form within the negative window.
async fn assert_dashboard_closed<P: Page>(cx: &ScenarioContext<P>, who: &str) -> E2eResult<()> {
    cx.goto("/dashboard").await?;
    cx.waiter()
        .assert_element_absent(
            &cx.locators().create_event_heading,
            cx.config().timeouts.negative(),
            &format!("event creation form for {}", who),
        )
        .await
}

fn dashboard_url_admin_only<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        cx.goto("/dashboard").await?;
        cx.waiter().wait_for_element(&cx.locators().create_event_heading).await?;
        info!("Admin reached the dashboard directly");

        session.logout().await?;
        session.login_as_regular_user().await?;
        assert_dashboard_closed(&cx, "a regular user").await
    }
    .boxed()
}

// Event management

fn create_and_delete_event<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let events = cx.events();
        let fixture = cx
            .fixtures()
            .event("Management Test Event", "Event management test description");
        let name = events.create_event(&fixture).await?;
        events.find_event(&name).await?;
        events.delete_event(&name).await;
        Ok(())
    }
    .boxed()
}

/// Log back in as admin and delete `name` from the root page.
async fn delete_as_admin<P: Page>(cx: &ScenarioContext<P>, name: &str) -> E2eResult<()> {
    let session = cx.session();
    session.logout().await?;
    session.login_as_admin().await?;
    cx.goto("/").await?;
    cx.events().delete_event(name).await;
    Ok(())
}

fn events_read_only_for_regular_users<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let events = cx.events();
        let fixture = cx
            .fixtures()
            .event("User View Test Event", "Event for user view testing");
        let name = events.create_event(&fixture).await?;

        session.logout().await?;
        session.login_as_regular_user().await?;
        cx.goto("/").await?;
        let card = events.find_event(&name).await?;
        cx.waiter()
            .assert_absent_in(
                &card,
                &cx.locators().event_delete_control,
                Duration::ZERO,
                "delete control for a regular user",
            )
            .await?;

        delete_as_admin(&cx, &name).await
    }
    .boxed()
}

fn regular_user_cannot_create<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        session.logout().await?;
        session.login_as_regular_user().await?;
        cx.waiter()
            .assert_element_absent(
                &cx.locators().dashboard_link,
                Duration::ZERO,
                "dashboard link for a regular user",
            )
            .await?;
        assert_dashboard_closed(&cx, "a regular user").await
    }
    .boxed()
}

fn regular_user_rsvp<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let events = cx.events();
        let fixture = cx
            .fixtures()
            .event("Reservation Test Event", "Event for reservation testing");
        let name = events.create_event(&fixture).await?;

        session.logout().await?;
        session.login_as_regular_user().await?;
        cx.goto("/").await?;
        events.reserve_event(&name).await?;
        info!("Reserved a spot for '{}'", name);

        delete_as_admin(&cx, &name).await
    }
    .boxed()
}

// Smoke

fn role_separation_journey<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let events = cx.events();

        session.login_as_regular_user().await?;
        session.logout().await?;

        session.login_as_admin().await?;
        cx.waiter().wait_for_element(&cx.locators().dashboard_link).await?;

        let fixture = cx.fixtures().event("Smoke Test Event", "Smoke test event");
        let name = events.create_event(&fixture).await?;
        events.find_event(&name).await?;
        events.delete_event(&name).await;
        events.assert_event_absent(&name, Duration::ZERO).await?;

        session.logout().await
    }
    .boxed()
}

fn admin_event_workflow<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move {
        let session = cx.session();
        let events = cx.events();
        session.login_as_admin().await?;

        let mut names = Vec::new();
        for prefix in ["Workflow Test Event 1", "Workflow Test Event 2"] {
            let mut fixture = cx.fixtures().event(prefix, "");
            fixture.description = format!("Workflow test: {}", fixture.name);
            names.push(events.create_event(&fixture).await?);
        }
        for name in &names {
            events.find_event(name).await?;
        }
        for name in &names {
            events.delete_event(name).await;
        }

        session.logout().await
    }
    .boxed()
}

fn anonymous_dashboard<P: Page>(cx: ScenarioContext<P>) -> Step {
    async move { assert_dashboard_closed(&cx, "an anonymous visitor").await }.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, FakePage, FakeSite};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_catalogue_shape() {
        let groups = catalogue::<FakePage>();
        let order: Vec<Group> = groups.iter().map(|g| g.group).collect();
        assert_eq!(order, Group::all());

        let names: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.scenarios.iter().map(|s| s.name))
            .collect();
        assert_eq!(names.len(), 20);
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), names.len());
    }

    #[test]
    fn test_authenticated_groups_have_hooks() {
        for group in catalogue::<FakePage>() {
            let authenticated = matches!(group.group, Group::Dashboard | Group::EventManagement);
            assert_eq!(group.after_each.is_some(), authenticated, "{}", group.group);
        }
    }

    fn context(site: FakeSite) -> (Arc<FakePage>, ScenarioContext<FakePage>) {
        let page = Arc::new(FakePage::with_site(site));
        let cx = ScenarioContext::new(Arc::clone(&page), Arc::new(test_config()));
        (page, cx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaky_dashboard_link_fails_journey() {
        let mut site = FakeSite::new(&test_config());
        site.leaky_dashboard_link = true;
        let (_, cx) = context(site);

        let err = role_separation_journey(cx).await.unwrap_err();
        assert!(matches!(err, E2eError::RoleAssertion { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_registration_shows_message() {
        let (page, cx) = context(FakeSite::new(&test_config()));
        open_root(cx.clone()).await.unwrap();
        duplicate_registration(cx).await.unwrap();
        assert_eq!(page.site(|s| s.users.len()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_smoke_journey_leaves_no_events() {
        let (page, cx) = context(FakeSite::new(&test_config()));
        role_separation_journey(cx.clone()).await.unwrap();
        assert!(page.site(|s| s.events.is_empty()));
        assert!(cx.events().created().is_empty());
    }
}
