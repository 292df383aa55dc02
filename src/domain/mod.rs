//! Domain layer: the user identity record, its auth token and the
//! application events.

pub mod error;
pub mod events;
pub mod user;

pub use error::{DomainError, DomainResult, FieldError};
pub use events::{Event, EventMessage, FormData, PostEvent};
pub use user::{
    validate_user, CreateUserDto, GetUserDto, IdentityPayloadError, SessionIdentity,
    StoredUser, UpdateUserDto, User, UserAuthToken, UserRepositoryInterface, UserStatus,
    DEFAULT_ROLE,
};
