//! Trackable events.
//!
//! An [`Event`] describes one occurrence (a page view, a login, a field edit, ...) with a
//! fixed attribute schema. Eight attributes are expected at submission time, nine are
//! optional, and a [`Payload`] or a field history can be attached.
//!
//! Events are normally obtained from [`Tracker::create_event`](crate::Tracker::create_event)
//! so that they are registered for exactly one submission.
//!
//! # Examples
//!
//! ```
//! use tirreno_tracker::{Event, Payload};
//!
//! let mut event = Event::new("example-id");
//! event
//!     .set_user_name("alice")
//!     .set_url("https://example.com/profile")
//!     .set_http_method("POST")
//!     .set_event_type_field_edit();
//!
//! let mut change = Payload::new();
//! change.set_field_name("email").set_old_value("a@ex").set_new_value("b@ex");
//! event.add_field_history(change);
//!
//! let dump = event.dump();
//! assert_eq!(dump["userName"], "alice");
//! assert_eq!(dump["eventType"], "field_edit");
//! assert_eq!(dump["fieldHistory"][0]["field_name"], "email");
//! ```

use crate::payload::Payload;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Wire mapping produced by [`Event::dump`] and [`Payload::dump`].
pub type Dump = Map<String, Value>;

/// Format of `eventTime`: UTC, millisecond precision, no zone suffix.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Kinds of events understood by the ingestion endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventType {
    #[default]
    PageView,
    PageEdit,
    PageDelete,
    PageSearch,
    AccountLogin,
    AccountLogout,
    AccountLoginFail,
    AccountRegistration,
    AccountEmailChange,
    AccountPasswordChange,
    AccountEdit,
    PageError,
    FieldEdit,
}

impl EventType {
    pub const ALL: [EventType; 13] = [
        EventType::PageView,
        EventType::PageEdit,
        EventType::PageDelete,
        EventType::PageSearch,
        EventType::AccountLogin,
        EventType::AccountLogout,
        EventType::AccountLoginFail,
        EventType::AccountRegistration,
        EventType::AccountEmailChange,
        EventType::AccountPasswordChange,
        EventType::AccountEdit,
        EventType::PageError,
        EventType::FieldEdit,
    ];

    /// Wire value sent as `eventType`
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::PageEdit => "page_edit",
            EventType::PageDelete => "page_delete",
            EventType::PageSearch => "page_search",
            EventType::AccountLogin => "account_login",
            EventType::AccountLogout => "account_logout",
            EventType::AccountLoginFail => "account_login_fail",
            EventType::AccountRegistration => "account_registration",
            EventType::AccountEmailChange => "account_email_change",
            EventType::AccountPasswordChange => "account_password_change",
            EventType::AccountEdit => "account_edit",
            EventType::PageError => "page_error",
            EventType::FieldEdit => "field_edit",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trackable occurrence.
///
/// Every setter returns `&mut Self` so calls can be chained. Unset attributes are left
/// out of [`dump`](Event::dump); the identifier is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(skip)]
    id: String,

    // Expected at submission time
    #[serde(skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    browser_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_created: Option<String>,

    // Nested
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_history: Option<Vec<Payload>>,
}

impl Event {
    /// Create an event stamped with the current UTC time and the `page_view` type.
    pub fn new(id: impl Into<String>) -> Self {
        let mut event = Self {
            id: id.into(),
            user_name: None,
            event_time: None,
            ip_address: None,
            user_agent: None,
            browser_language: None,
            http_method: None,
            http_referer: None,
            url: None,
            page_title: None,
            full_name: None,
            first_name: None,
            last_name: None,
            email_address: None,
            phone_number: None,
            event_type: None,
            http_code: None,
            user_created: None,
            payload: None,
            field_history: None,
        };
        event.set_event_time_now().set_event_type_page_view();
        event
    }

    /// Identifier issued at creation, used for registry lookup
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_event_type(&mut self, event_type: EventType) -> &mut Self {
        self.event_type = Some(event_type.as_str().to_string());
        self
    }

    pub fn set_event_type_page_view(&mut self) -> &mut Self {
        self.set_event_type(EventType::PageView)
    }

    pub fn set_event_type_page_edit(&mut self) -> &mut Self {
        self.set_event_type(EventType::PageEdit)
    }

    pub fn set_event_type_page_delete(&mut self) -> &mut Self {
        self.set_event_type(EventType::PageDelete)
    }

    pub fn set_event_type_page_search(&mut self) -> &mut Self {
        self.set_event_type(EventType::PageSearch)
    }

    pub fn set_event_type_account_login(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountLogin)
    }

    pub fn set_event_type_account_logout(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountLogout)
    }

    pub fn set_event_type_account_login_fail(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountLoginFail)
    }

    pub fn set_event_type_account_registration(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountRegistration)
    }

    pub fn set_event_type_account_email_change(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountEmailChange)
    }

    pub fn set_event_type_account_password_change(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountPasswordChange)
    }

    pub fn set_event_type_account_edit(&mut self) -> &mut Self {
        self.set_event_type(EventType::AccountEdit)
    }

    pub fn set_event_type_page_error(&mut self) -> &mut Self {
        self.set_event_type(EventType::PageError)
    }

    pub fn set_event_type_field_edit(&mut self) -> &mut Self {
        self.set_event_type(EventType::FieldEdit)
    }

    pub fn clear_event_type(&mut self) -> &mut Self {
        self.event_type = None;
        self
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Store a caller-supplied time verbatim
    pub fn set_event_time(&mut self, value: impl Into<String>) -> &mut Self {
        self.event_time = Some(value.into());
        self
    }

    /// Stamp the event with the current UTC time
    pub fn set_event_time_now(&mut self) -> &mut Self {
        self.event_time = Some(Utc::now().format(EVENT_TIME_FORMAT).to_string());
        self
    }

    pub fn clear_event_time(&mut self) -> &mut Self {
        self.event_time = None;
        self
    }

    pub fn event_time(&self) -> Option<&str> {
        self.event_time.as_deref()
    }

    pub fn set_user_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.user_name = Some(value.into());
        self
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn set_ip_address(&mut self, value: impl Into<String>) -> &mut Self {
        self.ip_address = Some(value.into());
        self
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn set_user_agent(&mut self, value: impl Into<String>) -> &mut Self {
        self.user_agent = Some(value.into());
        self
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn set_browser_language(&mut self, value: impl Into<String>) -> &mut Self {
        self.browser_language = Some(value.into());
        self
    }

    pub fn browser_language(&self) -> Option<&str> {
        self.browser_language.as_deref()
    }

    pub fn set_http_method(&mut self, value: impl Into<String>) -> &mut Self {
        self.http_method = Some(value.into());
        self
    }

    pub fn http_method(&self) -> Option<&str> {
        self.http_method.as_deref()
    }

    pub fn set_http_referer(&mut self, value: impl Into<String>) -> &mut Self {
        self.http_referer = Some(value.into());
        self
    }

    pub fn http_referer(&self) -> Option<&str> {
        self.http_referer.as_deref()
    }

    pub fn set_url(&mut self, value: impl Into<String>) -> &mut Self {
        self.url = Some(value.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_http_code(&mut self, value: i64) -> &mut Self {
        self.http_code = Some(value);
        self
    }

    pub fn http_code(&self) -> Option<i64> {
        self.http_code
    }

    pub fn set_page_title(&mut self, value: impl Into<String>) -> &mut Self {
        self.page_title = Some(value.into());
        self
    }

    pub fn page_title(&self) -> Option<&str> {
        self.page_title.as_deref()
    }

    pub fn set_full_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.full_name = Some(value.into());
        self
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    pub fn set_first_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn set_last_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn set_email_address(&mut self, value: impl Into<String>) -> &mut Self {
        self.email_address = Some(value.into());
        self
    }

    pub fn email_address(&self) -> Option<&str> {
        self.email_address.as_deref()
    }

    pub fn set_phone_number(&mut self, value: impl Into<String>) -> &mut Self {
        self.phone_number = Some(value.into());
        self
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    pub fn set_user_created(&mut self, value: impl Into<String>) -> &mut Self {
        self.user_created = Some(value.into());
        self
    }

    pub fn user_created(&self) -> Option<&str> {
        self.user_created.as_deref()
    }

    pub fn set_payload(&mut self, payload: Payload) -> &mut Self {
        self.payload = Some(payload);
        self
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn set_field_history(&mut self, history: Vec<Payload>) -> &mut Self {
        self.field_history = Some(history);
        self
    }

    /// Append one change to the field history, starting it if needed
    pub fn add_field_history(&mut self, payload: Payload) -> &mut Self {
        self.field_history.get_or_insert_with(Vec::new).push(payload);
        self
    }

    pub fn field_history(&self) -> Option<&[Payload]> {
        self.field_history.as_deref()
    }

    /// Names of the expected attributes that are still unset, in declaration order.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let required = [
            ("user_name", self.user_name.is_some()),
            ("event_time", self.event_time.is_some()),
            ("ip_address", self.ip_address.is_some()),
            ("user_agent", self.user_agent.is_some()),
            ("browser_language", self.browser_language.is_some()),
            ("http_method", self.http_method.is_some()),
            ("http_referer", self.http_referer.is_some()),
            ("url", self.url.is_some()),
        ];

        required.into_iter().filter(|(_, set)| !set).map(|(name, _)| name).collect()
    }

    /// Serialize the set attributes into a wire mapping.
    ///
    /// Expected attributes that are unset are omitted and reported with a single
    /// warning; the dump is produced regardless.
    pub fn dump(&self) -> Dump {
        let missing = self.missing_required_fields();
        if !missing.is_empty() {
            warn!(
                event_id = %self.id,
                missing = %missing.join(", "),
                "Event properties {} are not set",
                missing.join(", ")
            );
        }

        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Dump::new(),
        }
    }
}
