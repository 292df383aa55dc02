use super::UserStatus;

#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    /// Matches username, email or display name
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
}
