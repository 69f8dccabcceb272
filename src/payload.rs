//! Field-level change descriptions attached to an [`Event`](crate::Event).

use crate::event::Dump;
use serde::Serialize;
use serde_json::Value;

/// One field change: old and new value, the field it belongs to, or a plain value.
///
/// Fields serialize in declaration order under their wire names and are omitted
/// while unset. No validation is applied to the content.
///
/// # Examples
///
/// ```
/// use tirreno_tracker::Payload;
///
/// let mut payload = Payload::new();
/// payload.set_field_id("id1").set_old_value("a").set_new_value("b");
///
/// let dump = payload.dump();
/// assert_eq!(dump["field_id"], "id1");
/// assert_eq!(dump.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    #[serde(rename = "new_value", skip_serializing_if = "Option::is_none")]
    new_value: Option<String>,
    #[serde(rename = "old_value", skip_serializing_if = "Option::is_none")]
    old_value: Option<String>,
    #[serde(rename = "field_id", skip_serializing_if = "Option::is_none")]
    field_id: Option<String>,
    #[serde(rename = "field_name", skip_serializing_if = "Option::is_none")]
    field_name: Option<String>,
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_new_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    pub fn set_old_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.old_value = Some(value.into());
        self
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn set_field_id(&mut self, value: impl Into<String>) -> &mut Self {
        self.field_id = Some(value.into());
        self
    }

    pub fn field_id(&self) -> Option<&str> {
        self.field_id.as_deref()
    }

    pub fn set_field_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.field_name = Some(value.into());
        self
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    /// Dump the set fields into a wire mapping.
    pub fn dump(&self) -> Dump {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Dump::new(),
        }
    }
}
