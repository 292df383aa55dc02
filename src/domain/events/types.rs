//! Application events
//!
//! Defines all event types that can be published on the event bus.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submitted form fields, keyed by field name
pub type FormData = BTreeMap<String, Value>;

/// A post was created or edited through the content form.
///
/// Immutable once built: listeners only ever see the submitted data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostEvent {
    form_data: FormData,
}

impl PostEvent {
    /// Event name under which post submissions are dispatched
    pub const POST_DATA: &'static str = "bolt.post_data";

    pub fn new(form_data: FormData) -> Self {
        Self { form_data }
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }
}

/// Event types for notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    PostSubmitted(PostEvent),
    UserCreated(UserCreatedEvent),
    UserUpdated(UserUpdatedEvent),
    UserDeleted(UserDeletedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PostSubmitted(_) => PostEvent::POST_DATA,
            Event::UserCreated(_) => "bolt.user_created",
            Event::UserUpdated(_) => "bolt.user_updated",
            Event::UserDeleted(_) => "bolt.user_deleted",
        }
    }

    pub fn user_id(&self) -> Option<i32> {
        match self {
            Event::PostSubmitted(_) => None,
            Event::UserCreated(e) => Some(e.user_id),
            Event::UserUpdated(e) => Some(e.user_id),
            Event::UserDeleted(e) => Some(e.user_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedEvent {
    pub user_id: i32,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdatedEvent {
    pub user_id: i32,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeletedEvent {
    pub user_id: i32,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_event_exposes_form_data() {
        let mut data = FormData::new();
        data.insert("title".into(), json!("Hello"));
        let event = PostEvent::new(data.clone());
        assert_eq!(event.form_data(), &data);
    }

    #[test]
    fn event_types() {
        let post = Event::PostSubmitted(PostEvent::new(FormData::new()));
        assert_eq!(post.event_type(), "bolt.post_data");
        assert_eq!(post.user_id(), None);

        let deleted = Event::UserDeleted(UserDeletedEvent {
            user_id: 4,
            timestamp: Utc::now(),
        });
        assert_eq!(deleted.event_type(), "bolt.user_deleted");
        assert_eq!(deleted.user_id(), Some(4));
    }

    #[test]
    fn message_serializes_with_type_tag() {
        let mut data = FormData::new();
        data.insert("title".into(), json!("Hello"));
        let message = EventMessage::new(Event::PostSubmitted(PostEvent::new(data)));

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "PostSubmitted");
        assert_eq!(value["data"]["form_data"]["title"], "Hello");
    }
}
