//! User and event fixtures

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp, strictly increasing within this process.
///
/// Two fixtures generated inside the same millisecond still get distinct
/// stamps, which keeps by-text lookups unambiguous.
pub fn unique_stamp() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// `"{prefix}_{stamp}"`
pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, unique_stamp())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFixture {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl UserFixture {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        }
    }

    /// A never-registered identity, e.g. `testuser_<stamp>@example.com`.
    pub fn unique(prefix: &str, domain: &str, password: &str) -> Self {
        let username = unique_name(prefix);
        let email = format!("{}@{}", username, domain);
        Self::new(&username, &email, password)
    }

    pub fn empty() -> Self {
        Self::new("", "", "")
    }
}

/// The seeded identities the suite logs in as.
///
/// `admin` and `registered` must already exist server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSet {
    pub admin: UserFixture,
    pub registered: UserFixture,
    pub unregistered: UserFixture,
    pub wrong_password: UserFixture,
    pub event_defaults: EventDefaults,
}

impl Default for FixtureSet {
    fn default() -> Self {
        Self {
            admin: UserFixture::new("adminUser", "adminemail@edges.com", "adminpassword123"),
            registered: UserFixture::new("testuser", "testemail@gmail.com", "testpassword123"),
            unregistered: UserFixture::new(
                "unregisteredUser",
                "unregemail@edges.com",
                "unregpassword123",
            ),
            wrong_password: UserFixture::new("testuser", "testemail@gmail.com", "wrongpassword123"),
            event_defaults: EventDefaults::default(),
        }
    }
}

impl FixtureSet {
    pub fn new_user(&self) -> UserFixture {
        UserFixture::unique("testuser", "example.com", &self.registered.password)
    }

    /// A fresh event named `"{prefix}_{stamp}"`.
    pub fn event(&self, prefix: &str, description: &str) -> EventFixture {
        EventFixture {
            name: unique_name(prefix),
            description: description.to_string(),
            date: self.event_defaults.date.clone(),
            time: self.event_defaults.time.clone(),
            location: self.event_defaults.location.clone(),
        }
    }
}

/// Form values shared by every generated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDefaults {
    /// Typed into the date input as-is, in the browser's locale format.
    pub date: String,
    pub time: String,
    pub location: String,
}

impl Default for EventDefaults {
    fn default() -> Self {
        Self {
            date: "31/12/2023".to_string(),
            time: "12:00".to_string(),
            location: "Test Location".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFixture {
    pub name: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
}
