//! Element addressing: locators and the named locator table
//!
//! Scenarios never spell selectors inline. Every element they touch has a
//! semantic name in [`LocatorTable`], so a UI copy or markup change is a
//! config edit rather than a code change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference used to find a DOM node.
///
/// Serialized as a single-key map, `css: ...`, `xpath: ...` or `id: ...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LocatorRepr", into = "LocatorRepr")]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocatorRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl TryFrom<LocatorRepr> for Locator {
    type Error = String;

    fn try_from(repr: LocatorRepr) -> Result<Self, Self::Error> {
        match (repr.css, repr.xpath, repr.id) {
            (Some(s), None, None) => Ok(Locator::Css(s)),
            (None, Some(s), None) => Ok(Locator::XPath(s)),
            (None, None, Some(s)) => Ok(Locator::Id(s)),
            _ => Err("locator needs exactly one of `css`, `xpath` or `id`".to_string()),
        }
    }
}

impl From<Locator> for LocatorRepr {
    fn from(locator: Locator) -> Self {
        match locator {
            Locator::Css(s) => LocatorRepr { css: Some(s), ..Default::default() },
            Locator::XPath(s) => LocatorRepr { xpath: Some(s), ..Default::default() },
            Locator::Id(s) => LocatorRepr { id: Some(s), ..Default::default() },
        }
    }
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    /// Element whose own text equals `text` exactly, e.g. `//button[text()="Login"]`.
    pub fn tag_with_text(tag: &str, text: &str) -> Self {
        Locator::XPath(format!("//{}[text()={}]", tag, xpath_literal(text)))
    }

    /// Descendant of the search scope whose text contains `text`.
    pub fn scoped_containing(tag: &str, text: &str) -> Self {
        Locator::XPath(format!(".//{}[contains(text(), {})]", tag, xpath_literal(text)))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) | Locator::Id(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{}`", s),
            Locator::XPath(s) => write!(f, "xpath `{}`", s),
            Locator::Id(s) => write!(f, "id `{}`", s),
        }
    }
}

/// Quote `value` as an XPath 1.0 string literal.
///
/// XPath has no escape character, so a value containing both quote kinds is
/// spliced together with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let mut parts = Vec::new();
    for (i, chunk) in value.split('"').enumerate() {
        if i > 0 {
            parts.push("'\"'".to_string());
        }
        if !chunk.is_empty() {
            parts.push(format!("\"{}\"", chunk));
        }
    }
    format!("concat({})", parts.join(", "))
}

/// A locator with a `{name}` placeholder filled per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorTemplate(pub Locator);

impl LocatorTemplate {
    pub const PLACEHOLDER: &'static str = "{name}";

    pub fn render(&self, name: &str) -> Locator {
        match &self.0 {
            Locator::XPath(t) => Locator::XPath(t.replace(Self::PLACEHOLDER, &xpath_literal(name))),
            Locator::Css(t) => {
                let quoted = format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""));
                Locator::Css(t.replace(Self::PLACEHOLDER, &quoted))
            }
            Locator::Id(t) => Locator::Id(t.replace(Self::PLACEHOLDER, name)),
        }
    }
}

/// Semantic element roles mapped to concrete selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorTable {
    // Navigation
    pub register_link: Locator,
    pub login_link: Locator,
    pub dashboard_link: Locator,

    // Page headings
    pub register_heading: Locator,
    pub login_heading: Locator,
    pub create_event_heading: Locator,

    // Login form. The app exposes no names on these inputs, only types.
    pub login_identifier_input: Locator,
    pub login_password_input: Locator,
    pub login_submit: Locator,
    pub logout_button: Locator,

    // Registration form
    pub register_username_input: Locator,
    pub register_email_input: Locator,
    pub register_password_input: Locator,
    pub register_confirm_password_input: Locator,
    pub register_submit: Locator,
    pub registration_error: Locator,

    // Event creation form
    pub event_name_input: Locator,
    pub event_description_input: Locator,
    pub event_date_input: Locator,
    pub event_time_input: Locator,
    pub event_location_input: Locator,
    pub create_event_submit: Locator,

    // Event list
    pub event_card: LocatorTemplate,
    /// Relative to an event card.
    pub rsvp_confirmation: Locator,
    /// Relative to an event card.
    pub event_delete_control: Locator,
    /// Relative to an event card.
    pub event_rsvp_control: Locator,
}

impl LocatorTable {
    pub fn event_card(&self, name: &str) -> Locator {
        self.event_card.render(name)
    }
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self {
            register_link: Locator::css(r#"a[href="/register"]"#),
            login_link: Locator::css(r#"a[href="/login"]"#),
            dashboard_link: Locator::css(r#"a[href="/dashboard"]"#),

            register_heading: Locator::tag_with_text("h5", "Register"),
            login_heading: Locator::tag_with_text("h5", "Login"),
            create_event_heading: Locator::tag_with_text("h4", "Create New Event"),

            login_identifier_input: Locator::css(r#"input[type="text"]"#),
            login_password_input: Locator::css(r#"input[type="password"]"#),
            login_submit: Locator::tag_with_text("button", "Login"),
            logout_button: Locator::tag_with_text("button", "Logout"),

            register_username_input: Locator::id("username"),
            register_email_input: Locator::id("email"),
            register_password_input: Locator::id("password"),
            register_confirm_password_input: Locator::id("confirmPassword"),
            register_submit: Locator::css(r#"button[type="submit"]"#),
            registration_error: Locator::xpath(r#"//div[contains(text(), "Registration failed.")]"#),

            event_name_input: Locator::css(r#"input[name="name"]"#),
            event_description_input: Locator::css(r#"textarea[name="description"]"#),
            event_date_input: Locator::css(r#"input[type="date"]"#),
            event_time_input: Locator::css(r#"input[type="time"]"#),
            event_location_input: Locator::css(r#"input[name="location"]"#),
            create_event_submit: Locator::tag_with_text("button", "Create Event"),

            event_card: LocatorTemplate(Locator::xpath("//div[h6[text()={name}]]/..")),
            rsvp_confirmation: Locator::scoped_containing("p", "You have RSVPed to this event."),
            event_delete_control: Locator::scoped_containing("button", "Delete"),
            event_rsvp_control: Locator::scoped_containing("button", "RSVP"),
        }
    }
}
