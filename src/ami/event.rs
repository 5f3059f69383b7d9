// src/ami/event.rs
use std::fmt;

use crate::ami::AmiError;

/// One decoded manager block: an ordered list of `Key: Value` fields.
///
/// Field order is preserved exactly as received. Header names are matched
/// case-insensitively on access, since Asterisk is not consistent about
/// casing across versions.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    fields: Vec<(String, String)>,
}

impl RawEvent {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, key: String, value: String) {
        self.fields.push((key, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get), but absence is an error rather than a
    /// silently substituted default.
    pub fn require(&self, name: &str) -> Result<&str, AmiError> {
        self.get(name)
            .ok_or_else(|| AmiError::MissingField(name.to_string()))
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // Common header accessors.

    pub fn event_type(&self) -> Option<&str> {
        self.get("Event")
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.get("Uniqueid")
    }

    /// Linkedid ties every channel leg of one physical call together;
    /// Uniqueid is the per-leg fallback.
    pub fn linked_id(&self) -> Option<&str> {
        self.get("Linkedid").or_else(|| self.unique_id())
    }

    pub fn channel(&self) -> Option<&str> {
        self.get("Channel")
    }

    pub fn caller_id_num(&self) -> Option<&str> {
        self.get("CallerIDNum")
    }

    pub fn connected_line_num(&self) -> Option<&str> {
        self.get("ConnectedLineNum")
    }

    pub fn dest_channel(&self) -> Option<&str> {
        self.get("DestChannel")
    }

    pub fn state_desc(&self) -> Option<&str> {
        self.get("ChannelStateDesc")
    }

    pub fn response(&self) -> Option<&str> {
        self.get("Response")
    }

    pub fn message(&self) -> Option<&str> {
        self.get("Message")
    }

    /// Whether this block is a login/command reply rather than an event.
    pub fn is_response(&self) -> bool {
        self.response().is_some()
    }
}

impl fmt::Display for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawEvent {{")?;
        if let Some(ev) = self.event_type() {
            write!(f, " Event: {}", ev)?;
        }
        if let Some(id) = self.linked_id() {
            write!(f, ", Linkedid: {}", id)?;
        }
        write!(f, ", fields: {} }}", self.fields.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        let mut event = RawEvent::new();
        event.push("Event".to_string(), "Newstate".to_string());
        assert_eq!(event.get("event"), Some("Newstate"));
        assert_eq!(event.get("EVENT"), Some("Newstate"));
    }

    #[test]
    fn require_reports_missing_field() {
        let event = RawEvent::new();
        match event.require("Uniqueid") {
            Err(AmiError::MissingField(name)) => assert_eq!(name, "Uniqueid"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn linked_id_falls_back_to_unique_id() {
        let mut event = RawEvent::new();
        event.push("Uniqueid".to_string(), "1700000000.42".to_string());
        assert_eq!(event.linked_id(), Some("1700000000.42"));

        event.push("Linkedid".to_string(), "1700000000.41".to_string());
        assert_eq!(event.linked_id(), Some("1700000000.41"));
    }

    #[test]
    fn field_order_is_preserved() {
        let mut event = RawEvent::new();
        event.push("B".to_string(), "2".to_string());
        event.push("A".to_string(), "1".to_string());
        let keys: Vec<&str> = event.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
    }
}
