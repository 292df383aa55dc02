pub mod events;
pub mod identity;

// Re-export key types for convenience
pub use events::{
    create_event_bus, Event, EventBus, EventListener, EventSubscriber, SharedEventBus,
};
pub use identity::UserService;
