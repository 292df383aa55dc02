//! User aggregate
//!
//! Contains the User entity, its auth token, DTOs, validation and the
//! repository interface.

pub mod auth_token;
pub mod identity;
pub mod model;
pub mod repository;
pub mod validation;

mod dto_create;
mod dto_get;
mod dto_update;

// Re-export model types
pub use auth_token::UserAuthToken;
pub use identity::{IdentityPayloadError, SessionIdentity};
pub use model::{StoredUser, User, UserStatus, DEFAULT_ROLE};
pub use validation::{validate_user, USERNAME_PATTERN};

// Re-export DTOs
pub use dto_create::CreateUserDto;
pub use dto_get::GetUserDto;
pub use dto_update::UpdateUserDto;

// Re-export repository trait
pub use repository::UserRepositoryInterface;
