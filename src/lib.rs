//! # Bolt CMS identity
//!
//! User identity records and form-submission events for a content
//! management backend.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: the `User` record, its auth token, validation and events
//! - **application**: the event bus and the user management service
//! - **infrastructure**: SeaORM persistence, in-memory storage, password hashing
//! - **shared**: slugs, JSON scalar helpers and pagination

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryUserRepository, SeaOrmUserRepository,
};

// Re-export events and services
pub use application::{create_event_bus, Event, EventBus, SharedEventBus, UserService};
pub use domain::{DomainError, DomainResult, PostEvent, User, UserAuthToken, UserStatus};
