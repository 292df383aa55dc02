use super::UserStatus;

/// Profile changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<String>>,
    pub locale: Option<String>,
    pub backend_theme: Option<String>,
    pub status: Option<UserStatus>,
}
