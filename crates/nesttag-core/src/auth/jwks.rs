/// RS256 signature verification against the user pool's published keys
use super::AuthError;
use crate::error::BoxError;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};

/// One entry of `/.well-known/jwks.json`; `n` and `e` are base64url
#[derive(Debug, Deserialize)]
struct PoolKey {
    kty: String,
    kid: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Debug, Deserialize)]
struct PoolKeyDocument {
    keys: Vec<PoolKey>,
}

/// RSA keys of the user pool, mapped by kid
pub struct JwksKeySet {
    keys: HashMap<String, DecodingKey>,
}

impl JwksKeySet {
    /// Loads the RSA entries of a JWKS document; other key types are skipped
    pub fn new(jwks_json: &str) -> Result<Self, BoxError> {
        let document: PoolKeyDocument = serde_json::from_str(jwks_json)
            .map_err(|e| BoxError::Config(format!("Invalid JWKS_JSON: {}", e)))?;

        let keys = document
            .keys
            .into_iter()
            .filter(|key| key.kty == "RSA")
            .map(|key| match DecodingKey::from_rsa_components(&key.n, &key.e) {
                Ok(decoding_key) => Ok((key.kid, decoding_key)),
                Err(e) => Err(BoxError::Config(format!(
                    "Unusable RSA key '{}' in JWKS_JSON: {}",
                    key.kid, e
                ))),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        if keys.is_empty() {
            return Err(BoxError::Config(
                "JWKS_JSON contains no RSA signing keys".to_string(),
            ));
        }

        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verifies the signature and returns the claims; expiry is checked by the caller
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::Malformed(format!("Unreadable token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| AuthError::Invalid("Token header has no kid".to_string()))?;

        let decoding_key = self
            .keys
            .get(&kid)
            .ok_or_else(|| AuthError::Invalid(format!("Unknown signing key: {}", kid)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<T>(token, decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Invalid(format!("Signature check failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};

    const JWKS: &str = include_str!("testdata/jwks.json");
    const SIGNING_KEY: &[u8] = include_bytes!("testdata/signing_key.pem");
    const OTHER_KEY: &[u8] = include_bytes!("testdata/other_key.pem");

    fn sign(pem: &[u8], kid: Option<&str>) -> String {
        let header = Header {
            kid: kid.map(str::to_string),
            ..Header::new(Algorithm::RS256)
        };
        encode(
            &header,
            &json!({"sub": "5e7f-11", "exp": 2_000_000_000}),
            &EncodingKey::from_rsa_pem(pem).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(JwksKeySet::new("not json").is_err());
    }

    #[test]
    fn test_rejects_documents_without_rsa_keys() {
        let jwks = r#"{"keys":[{"kty":"EC","kid":"k1","crv":"P-256"}]}"#;
        let err = JwksKeySet::new(jwks).err().unwrap();
        assert!(err.to_string().contains("no RSA signing keys"));
    }

    #[test]
    fn test_loads_rsa_key() {
        let keys = JwksKeySet::new(JWKS).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(!keys.is_empty());
    }

    #[test]
    fn test_accepts_token_signed_by_pool_key() {
        let keys = JwksKeySet::new(JWKS).unwrap();
        let claims: Value = keys
            .verify(&sign(SIGNING_KEY, Some("nesttag-test")))
            .unwrap();
        assert_eq!(claims["sub"], "5e7f-11");
    }

    #[test]
    fn test_rejects_token_signed_by_other_key() {
        let keys = JwksKeySet::new(JWKS).unwrap();
        let result: Result<Value, _> = keys.verify(&sign(OTHER_KEY, Some("nesttag-test")));
        assert!(matches!(result, Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_or_missing_kid() {
        let keys = JwksKeySet::new(JWKS).unwrap();

        let result: Result<Value, _> = keys.verify(&sign(SIGNING_KEY, Some("rotated")));
        assert!(matches!(result, Err(AuthError::Invalid(_))));

        let result: Result<Value, _> = keys.verify(&sign(SIGNING_KEY, None));
        assert!(matches!(result, Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_rejects_hmac_token_with_pool_kid() {
        let keys = JwksKeySet::new(JWKS).unwrap();
        let token = encode(
            &Header {
                kid: Some("nesttag-test".to_string()),
                ..Default::default()
            },
            &json!({"sub": "u1", "exp": 2_000_000_000}),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let result: Result<Value, _> = keys.verify(&token);
        assert!(matches!(result, Err(AuthError::Invalid(_))));
    }
}
