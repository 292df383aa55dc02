/// Input of the registration workflow
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub display_name: String,
    /// Raw username; normalized into a slug on registration
    pub username: String,
    pub email: String,
    pub plain_password: String,
    pub roles: Vec<String>,
    pub locale: Option<String>,
}
