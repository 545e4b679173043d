/// User pool operations (Cognito)
use crate::error::BoxError;
use crate::models::{AdminUser, AuthTokens, UserProfile};
use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::error::ProvideErrorMetadata;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, AuthFlowType, MessageActionType, UserType,
};
use aws_smithy_types::date_time::{DateTime as SmithyDateTime, Format};
use std::fmt::Display;
use tracing::{debug, info};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in; `None` when the pool asks for a further challenge
    async fn admin_initiate_auth(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthTokens>, BoxError>;

    async fn admin_get_user(&self, username: &str) -> Result<UserProfile, BoxError>;

    async fn admin_list_groups_for_user(&self, username: &str) -> Result<Vec<String>, BoxError>;

    /// Creates a user with a verified email and no welcome message
    async fn admin_create_user(
        &self,
        username: &str,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), BoxError>;

    /// Sets a permanent password
    async fn admin_set_user_password(&self, username: &str, password: &str)
    -> Result<(), BoxError>;

    async fn admin_add_user_to_group(&self, username: &str, group: &str) -> Result<(), BoxError>;

    async fn admin_remove_user_from_group(
        &self,
        username: &str,
        group: &str,
    ) -> Result<(), BoxError>;

    async fn admin_update_user_attributes(
        &self,
        username: &str,
        attributes: &[(String, String)],
    ) -> Result<(), BoxError>;

    async fn admin_delete_user(&self, username: &str) -> Result<(), BoxError>;

    /// All users of the pool; `groups` is left empty
    async fn list_users(&self) -> Result<Vec<AdminUser>, BoxError>;

    async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        password: &str,
    ) -> Result<(), BoxError>;

    /// Resolves the owner of an access token
    async fn get_user(&self, access_token: &str) -> Result<UserProfile, BoxError>;
}

/// Maps a user pool error code to the matching error variant
///
/// `NotAuthorizedException` only means bad credentials for sign-in and token
/// lookups, and `ResourceNotFoundException` only names a missing group for the
/// group membership calls. Elsewhere both point at the pool setup itself.
pub fn classify_error(operation: &str, code: Option<&str>, message: String) -> BoxError {
    match (code, operation) {
        (Some("NotAuthorizedException"), "AdminInitiateAuth" | "GetUser") => {
            BoxError::NotAuthorized(message)
        }
        (Some("ResourceNotFoundException"), "AdminAddUserToGroup" | "AdminRemoveUserFromGroup") => {
            BoxError::GroupNotFound(message)
        }
        (Some("UserNotFoundException"), _) => BoxError::UserNotFound(message),
        (Some("UserNotConfirmedException"), _) => BoxError::UserNotConfirmed(message),
        (Some("UsernameExistsException"), _) => BoxError::UsernameExists(message),
        (Some("InvalidPasswordException"), _) => BoxError::InvalidPassword(message),
        (Some("CodeMismatchException"), _) => BoxError::CodeMismatch(message),
        (Some("ExpiredCodeException"), _) => BoxError::ExpiredCode(message),
        _ => BoxError::Identity(message),
    }
}

fn provider_error<E>(operation: &str, err: E) -> BoxError
where
    E: ProvideErrorMetadata + Display,
{
    let message = match err.message() {
        Some(message) => format!("{} failed: {}", operation, message),
        None => format!("{} failed: {}", operation, err),
    };
    classify_error(operation, err.code(), message)
}

fn attribute(name: &str, value: &str) -> Result<AttributeType, BoxError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| BoxError::Identity(format!("Invalid user attribute '{}': {}", name, e)))
}

fn attribute_value<'a>(attributes: &'a [AttributeType], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name() == name)
        .and_then(|a| a.value())
}

fn profile(username: &str, attributes: &[AttributeType]) -> UserProfile {
    UserProfile {
        username: username.to_string(),
        name: attribute_value(attributes, "name").map(str::to_string),
        email: attribute_value(attributes, "email").map(str::to_string),
    }
}

fn format_date(date: Option<&SmithyDateTime>) -> Option<String> {
    date.and_then(|d| d.fmt(Format::DateTime).ok())
}

fn admin_user(user: &UserType) -> AdminUser {
    AdminUser {
        username: user.username().unwrap_or_default().to_string(),
        email: attribute_value(user.attributes(), "email")
            .unwrap_or_default()
            .to_string(),
        status: user
            .user_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        enabled: user.enabled(),
        user_create_date: format_date(user.user_create_date()),
        last_modified_date: format_date(user.user_last_modified_date()),
        groups: Vec::new(),
    }
}

pub struct CognitoIdentityProvider {
    client: aws_sdk_cognitoidentityprovider::Client,
    user_pool_id: String,
    client_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(
        client: aws_sdk_cognitoidentityprovider::Client,
        user_pool_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn admin_initiate_auth(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthTokens>, BoxError> {
        let result = self
            .client
            .admin_initiate_auth()
            .user_pool_id(&self.user_pool_id)
            .client_id(&self.client_id)
            .auth_flow(AuthFlowType::AdminNoSrpAuth)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
            .map_err(|e| provider_error("AdminInitiateAuth", e))?;

        if let Some(challenge) = result.challenge_name() {
            debug!(challenge = challenge.as_str(), "Sign-in requires a challenge");
        }

        Ok(result.authentication_result().map(|auth| AuthTokens {
            id_token: auth.id_token().map(str::to_string),
            access_token: auth.access_token().map(str::to_string),
        }))
    }

    async fn admin_get_user(&self, username: &str) -> Result<UserProfile, BoxError> {
        let result = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| provider_error("AdminGetUser", e))?;

        Ok(profile(result.username(), result.user_attributes()))
    }

    async fn admin_list_groups_for_user(&self, username: &str) -> Result<Vec<String>, BoxError> {
        let result = self
            .client
            .admin_list_groups_for_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| provider_error("AdminListGroupsForUser", e))?;

        Ok(result
            .groups()
            .iter()
            .filter_map(|g| g.group_name().map(str::to_string))
            .collect())
    }

    async fn admin_create_user(
        &self,
        username: &str,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), BoxError> {
        self.client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .user_attributes(attribute("email", email)?)
            .user_attributes(attribute("email_verified", "true")?)
            .temporary_password(temporary_password)
            .message_action(MessageActionType::Suppress)
            .send()
            .await
            .map_err(|e| provider_error("AdminCreateUser", e))?;

        info!(username = username, "Created pool user");
        Ok(())
    }

    async fn admin_set_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), BoxError> {
        self.client
            .admin_set_user_password()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .password(password)
            .permanent(true)
            .send()
            .await
            .map_err(|e| provider_error("AdminSetUserPassword", e))?;
        Ok(())
    }

    async fn admin_add_user_to_group(&self, username: &str, group: &str) -> Result<(), BoxError> {
        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(|e| provider_error("AdminAddUserToGroup", e))?;
        Ok(())
    }

    async fn admin_remove_user_from_group(
        &self,
        username: &str,
        group: &str,
    ) -> Result<(), BoxError> {
        self.client
            .admin_remove_user_from_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(|e| provider_error("AdminRemoveUserFromGroup", e))?;
        Ok(())
    }

    async fn admin_update_user_attributes(
        &self,
        username: &str,
        attributes: &[(String, String)],
    ) -> Result<(), BoxError> {
        let attributes = attributes
            .iter()
            .map(|(name, value)| attribute(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .set_user_attributes(Some(attributes))
            .send()
            .await
            .map_err(|e| provider_error("AdminUpdateUserAttributes", e))?;
        Ok(())
    }

    async fn admin_delete_user(&self, username: &str) -> Result<(), BoxError> {
        self.client
            .admin_delete_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| provider_error("AdminDeleteUser", e))?;

        info!(username = username, "Deleted pool user");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<AdminUser>, BoxError> {
        let mut users = Vec::new();
        let mut pagination_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_users()
                .user_pool_id(&self.user_pool_id)
                .set_pagination_token(pagination_token.take())
                .send()
                .await
                .map_err(|e| provider_error("ListUsers", e))?;

            users.extend(page.users().iter().map(admin_user));

            match page.pagination_token() {
                Some(token) if !token.is_empty() => pagination_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(users)
    }

    async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        password: &str,
    ) -> Result<(), BoxError> {
        self.client
            .confirm_forgot_password()
            .client_id(&self.client_id)
            .username(username)
            .confirmation_code(code)
            .password(password)
            .send()
            .await
            .map_err(|e| provider_error("ConfirmForgotPassword", e))?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<UserProfile, BoxError> {
        let result = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| provider_error("GetUser", e))?;

        Ok(profile(result.username(), result.user_attributes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryIdentityProvider;

    #[test]
    fn test_classify_error_codes() {
        assert!(matches!(
            classify_error("AdminInitiateAuth", Some("NotAuthorizedException"), "x".into()),
            BoxError::NotAuthorized(_)
        ));
        assert!(matches!(
            classify_error("AdminCreateUser", Some("UsernameExistsException"), "x".into()),
            BoxError::UsernameExists(_)
        ));
        assert!(matches!(
            classify_error("AdminAddUserToGroup", Some("ResourceNotFoundException"), "x".into()),
            BoxError::GroupNotFound(_)
        ));
        assert!(matches!(
            classify_error("ConfirmForgotPassword", Some("ExpiredCodeException"), "x".into()),
            BoxError::ExpiredCode(_)
        ));
        assert!(matches!(
            classify_error("ListUsers", Some("TooManyRequestsException"), "x".into()),
            BoxError::Identity(_)
        ));
        assert!(matches!(
            classify_error("GetUser", None, "x".into()),
            BoxError::Identity(_)
        ));
    }

    #[test]
    fn test_classify_error_depends_on_operation() {
        // A missing pool is not a missing group
        assert!(matches!(
            classify_error("AdminDeleteUser", Some("ResourceNotFoundException"), "x".into()),
            BoxError::Identity(_)
        ));
        assert!(matches!(
            classify_error("AdminDeleteUser", Some("UserNotFoundException"), "x".into()),
            BoxError::UserNotFound(_)
        ));
        assert!(matches!(
            classify_error("AdminUpdateUserAttributes", Some("UserNotFoundException"), "x".into()),
            BoxError::UserNotFound(_)
        ));
        // Admin calls rejected by the pool are not credential failures
        assert!(matches!(
            classify_error("AdminUpdateUserAttributes", Some("NotAuthorizedException"), "x".into()),
            BoxError::Identity(_)
        ));
        assert!(matches!(
            classify_error("GetUser", Some("NotAuthorizedException"), "x".into()),
            BoxError::NotAuthorized(_)
        ));
    }

    #[tokio::test]
    async fn test_sign_in() {
        let pool = InMemoryIdentityProvider::new();
        pool.add_user("admin@example.com", "admin@example.com", "Sup3rSecret!");

        let tokens = pool
            .admin_initiate_auth("admin@example.com", "Sup3rSecret!")
            .await
            .unwrap()
            .unwrap();
        let access = tokens.access_token.unwrap();
        let profile = pool.get_user(&access).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("admin@example.com"));

        assert!(matches!(
            pool.admin_initiate_auth("admin@example.com", "wrong").await,
            Err(BoxError::NotAuthorized(_))
        ));
        assert!(matches!(
            pool.admin_initiate_auth("ghost@example.com", "x").await,
            Err(BoxError::UserNotFound(_))
        ));

        pool.set_status("admin@example.com", "UNCONFIRMED");
        assert!(matches!(
            pool.admin_initiate_auth("admin@example.com", "Sup3rSecret!")
                .await,
            Err(BoxError::UserNotConfirmed(_))
        ));
    }

    #[tokio::test]
    async fn test_create_user_and_groups() {
        let pool = InMemoryIdentityProvider::new();
        pool.add_group("staff");

        pool.admin_create_user("kenji", "kenji@example.com", "TempPass1!")
            .await
            .unwrap();
        assert!(matches!(
            pool.admin_create_user("kenji", "kenji@example.com", "TempPass1!")
                .await,
            Err(BoxError::UsernameExists(_))
        ));
        assert!(matches!(
            pool.admin_create_user("short", "s@example.com", "abc").await,
            Err(BoxError::InvalidPassword(_))
        ));

        pool.admin_add_user_to_group("kenji", "staff").await.unwrap();
        assert!(matches!(
            pool.admin_add_user_to_group("kenji", "missing").await,
            Err(BoxError::GroupNotFound(_))
        ));
        assert_eq!(
            pool.admin_list_groups_for_user("kenji").await.unwrap(),
            vec!["staff"]
        );

        pool.admin_remove_user_from_group("kenji", "staff")
            .await
            .unwrap();
        assert!(pool.groups_of("kenji").is_empty());

        let users = pool.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].status, "FORCE_CHANGE_PASSWORD");
    }

    #[tokio::test]
    async fn test_confirm_forgot_password() {
        let pool = InMemoryIdentityProvider::new();
        pool.add_user("mika@example.com", "mika@example.com", "OldPass123");
        pool.start_password_reset("mika@example.com", "123456");

        assert!(matches!(
            pool.confirm_forgot_password("mika@example.com", "000000", "NewPass123")
                .await,
            Err(BoxError::CodeMismatch(_))
        ));
        pool.confirm_forgot_password("mika@example.com", "123456", "NewPass123")
            .await
            .unwrap();
        assert_eq!(
            pool.password_of("mika@example.com").as_deref(),
            Some("NewPass123")
        );
    }
}
