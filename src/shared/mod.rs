pub mod json;
pub mod slug;
pub mod types;

pub use json::{find_scalar, find_scalar_in_str};
pub use slug::{slugify_username, slugify_with};
pub use types::*;
