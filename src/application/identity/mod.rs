//! Identity module: user management & authentication
//!
//! Contains the `UserService` which orchestrates all user-related
//! use-cases: registration, authentication, profile updates, password changes.

pub mod service;

pub use service::UserService;
