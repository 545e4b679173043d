/// Identity-provider user views
use serde::Serialize;

/// A pool user as listed in the admin console
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub username: String,
    pub email: String,
    pub status: String,
    pub enabled: bool,
    pub user_create_date: Option<String>,
    pub last_modified_date: Option<String>,
    pub groups: Vec<String>,
}

/// Attributes of a single pool user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    /// Name attribute, else the email local part, else the user id prefix
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(local) = self
            .email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|l| !l.is_empty())
        {
            return local.to_string();
        }
        user_id_prefix(&self.username)
    }
}

/// First `-`-separated segment of a user id (the leading UUID group)
pub fn user_id_prefix(user_id: &str) -> String {
    user_id.split('-').next().unwrap_or_default().to_string()
}

/// Tokens issued by a successful password sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct AuthTokens {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}
