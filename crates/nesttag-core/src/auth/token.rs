/// Bearer token extraction and claim decoding
use super::AuthError;
use super::jwks::JwksKeySet;
use crate::constants::BEARER_PREFIX;
use crate::error::BoxError;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Claims read from a user-pool ID or access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: Option<i64>,

    /// Groups the user belongs to
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,

    /// Present on access tokens
    #[serde(default)]
    pub username: Option<String>,

    /// Present on ID tokens
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .or(self.cognito_username.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Decodes bearer tokens, verifying signatures only when a JWKS is configured
pub struct TokenVerifier {
    keys: Option<JwksKeySet>,
}

impl TokenVerifier {
    pub fn new(jwks_json: Option<&str>) -> Result<Self, BoxError> {
        let keys = jwks_json.map(JwksKeySet::new).transpose()?;
        Ok(Self { keys })
    }

    /// Trusts the upstream authorizer and reads the payload as-is
    pub fn unverified() -> Self {
        Self { keys: None }
    }

    pub fn verifies_signatures(&self) -> bool {
        self.keys.is_some()
    }

    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        if token.split('.').count() != 3 {
            return Err(AuthError::Malformed(
                "Token must have header, payload and signature".to_string(),
            ));
        }

        let claims: TokenClaims = match &self.keys {
            Some(keys) => keys.verify(token)?,
            None => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims = HashSet::new();

                decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
                    .map(|data| data.claims)
                    .map_err(|e| AuthError::Malformed(format!("Failed to decode token: {}", e)))?
            }
        };

        if claims.exp.is_none() {
            return Err(AuthError::Malformed("Token has no 'exp' claim".to_string()));
        }

        Ok(claims)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(auth_header: Option<&str>) -> Result<&str, AuthError> {
    let auth_header = auth_header.ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn mint(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"any-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")).unwrap(), "abc123");
        assert!(matches!(
            extract_bearer(Some("abc123")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            extract_bearer(Some("Bearer ")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            extract_bearer(None),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_decode_reads_cognito_claims() {
        let token = mint(json!({
            "sub": "5e7f-11",
            "exp": 2_000_000_000,
            "cognito:groups": ["admins", "staff"],
            "cognito:username": "hanako",
            "email": "hanako@example.com",
            "aud": "client-id",
        }));
        let claims = TokenVerifier::unverified().decode(&token).unwrap();
        assert_eq!(claims.sub, "5e7f-11");
        assert!(claims.in_group("admins"));
        assert!(!claims.in_group("admin"));
        assert_eq!(claims.username(), "hanako");
        assert_eq!(claims.email.as_deref(), Some("hanako@example.com"));
    }

    #[test]
    fn test_username_falls_back_to_subject() {
        let token = mint(json!({"sub": "5e7f-11", "exp": 2_000_000_000}));
        let claims = TokenVerifier::unverified().decode(&token).unwrap();
        assert!(claims.groups.is_empty());
        assert_eq!(claims.username(), "5e7f-11");
    }

    #[test]
    fn test_expiry() {
        let token = mint(json!({"sub": "u", "exp": 1_000}));
        let claims = TokenVerifier::unverified().decode(&token).unwrap();
        assert!(claims.is_expired(1_001));
        assert!(!claims.is_expired(1_000));
    }

    #[test]
    fn test_missing_exp_is_malformed() {
        let token = mint(json!({"sub": "u"}));
        assert!(matches!(
            TokenVerifier::unverified().decode(&token),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_opaque_token_is_malformed() {
        assert!(matches!(
            TokenVerifier::unverified().decode("opaque-access-token"),
            Err(AuthError::Malformed(_))
        ));
        assert!(matches!(
            TokenVerifier::unverified().decode("a.b.c"),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_verifying_decoder_checks_signatures() {
        let verifier = TokenVerifier::new(Some(include_str!("testdata/jwks.json"))).unwrap();
        assert!(verifier.verifies_signatures());

        let claims = json!({
            "sub": "5e7f-11",
            "exp": 2_000_000_000,
            "cognito:groups": ["admins"],
        });
        let header = Header {
            kid: Some("nesttag-test".to_string()),
            ..Header::new(Algorithm::RS256)
        };

        let signed = encode(
            &header,
            &claims,
            &EncodingKey::from_rsa_pem(include_bytes!("testdata/signing_key.pem")).unwrap(),
        )
        .unwrap();
        let decoded = verifier.decode(&signed).unwrap();
        assert_eq!(decoded.sub, "5e7f-11");
        assert!(decoded.in_group("admins"));

        let forged = encode(
            &header,
            &claims,
            &EncodingKey::from_rsa_pem(include_bytes!("testdata/other_key.pem")).unwrap(),
        )
        .unwrap();
        assert!(matches!(verifier.decode(&forged), Err(AuthError::Invalid(_))));

        // HMAC tokens without a kid are refused once keys are configured
        assert!(matches!(
            verifier.decode(&mint(claims)),
            Err(AuthError::Invalid(_))
        ));
    }

    #[test]
    fn test_new_without_jwks() {
        let verifier = TokenVerifier::new(None).unwrap();
        assert!(!verifier.verifies_signatures());
        assert!(TokenVerifier::new(Some("{}")).is_err());
    }
}
