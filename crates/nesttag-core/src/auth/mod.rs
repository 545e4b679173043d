/// Bearer-token authentication and group-based authorization
///
/// Tokens are user-pool JWTs. Their payload is decoded locally (with an
/// optional JWKS signature check), the expiry is enforced here, and admin
/// routes additionally require membership of the configured admin group.
/// Tokens that cannot be decoded are resolved through the identity provider
/// as opaque access tokens.
pub mod jwks;
pub mod token;

pub use jwks::JwksKeySet;
pub use token::{TokenClaims, TokenVerifier, extract_bearer};

use crate::services::IdentityProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingCredentials,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired {0} seconds ago")]
    Expired(i64),

    #[error("Not a member of group '{0}'")]
    Forbidden(String),
}

/// Level of access a route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    User,
    Admin,
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub sub: String,
    pub username: String,
    pub email: Option<String>,
    pub groups: Vec<String>,
}

impl Identity {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            username: claims.username().to_string(),
            sub: claims.sub,
            email: claims.email,
            groups: claims.groups,
        }
    }
}

pub struct Authenticator {
    verifier: TokenVerifier,
    identity: Arc<dyn IdentityProvider>,
    admin_group: String,
}

impl Authenticator {
    pub fn new(
        verifier: TokenVerifier,
        identity: Arc<dyn IdentityProvider>,
        admin_group: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            identity,
            admin_group: admin_group.into(),
        }
    }

    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }

    /// Authenticates the Authorization header value for the given access level
    pub async fn authenticate(
        &self,
        auth_header: Option<&str>,
        access: Access,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let token = extract_bearer(auth_header)?;

        let identity = match self.verifier.decode(token) {
            Ok(claims) => {
                let now = now.timestamp();
                if claims.is_expired(now) {
                    let exp = claims.exp.unwrap_or(now);
                    return Err(AuthError::Expired(now - exp));
                }
                Identity::from(claims)
            }
            Err(AuthError::Malformed(reason)) => {
                debug!(reason = %reason, "Token is not a decodable JWT, asking identity provider");
                self.resolve_access_token(token).await?
            }
            Err(e) => return Err(e),
        };

        if access == Access::Admin && !identity.in_group(&self.admin_group) {
            warn!(
                user = %identity.username,
                group = %self.admin_group,
                "Admin access denied"
            );
            return Err(AuthError::Forbidden(self.admin_group.clone()));
        }

        Ok(identity)
    }

    async fn resolve_access_token(&self, token: &str) -> Result<Identity, AuthError> {
        let profile = self
            .identity
            .get_user(token)
            .await
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        let groups = self
            .identity
            .admin_list_groups_for_user(&profile.username)
            .await
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        Ok(Identity {
            sub: profile.username.clone(),
            username: profile.username,
            email: profile.email,
            groups,
        })
    }
}
