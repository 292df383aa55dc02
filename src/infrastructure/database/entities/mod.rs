//! Database entities module

pub mod user;
pub mod user_auth_token;

pub use user::Entity as User;
pub use user_auth_token::Entity as UserAuthToken;
