/// CloudFront signed URLs with a custom policy
use crate::config::CdnConfig;
use crate::error::BoxError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;

pub trait CdnSigner: Send + Sync {
    /// Signed URL for `key` that stops working at `expires_at`
    fn sign_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String, BoxError>;
}

/// Base64 with the substitutions CloudFront expects in query strings
pub fn cloudfront_base64(data: &[u8]) -> String {
    STANDARD
        .encode(data)
        .replace('+', "-")
        .replace('=', "_")
        .replace('/', "~")
}

/// Policy document limiting access to `resource` until `expires_at`
pub fn custom_policy(resource: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        r#"{{"Statement":[{{"Resource":"{}","Condition":{{"DateLessThan":{{"AWS:EpochTime":{}}}}}}}]}}"#,
        resource,
        expires_at.timestamp()
    )
}

pub struct CloudFrontSigner {
    key_pair_id: String,
    domain: String,
    signing_key: SigningKey<Sha1>,
}

impl CloudFrontSigner {
    /// Accepts PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8 PEM keys
    pub fn new(
        key_pair_id: impl Into<String>,
        private_key_pem: &str,
        domain: impl Into<String>,
    ) -> Result<Self, BoxError> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(private_key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(private_key_pem))
            .map_err(|e| BoxError::Config(format!("Invalid CloudFront private key: {}", e)))?;
        let domain: String = domain.into();

        Ok(Self {
            key_pair_id: key_pair_id.into(),
            domain: domain.trim_end_matches('/').to_string(),
            signing_key: SigningKey::<Sha1>::new(private_key),
        })
    }

    pub fn from_config(config: &CdnConfig) -> Result<Self, BoxError> {
        Self::new(&config.key_pair_id, &config.private_key_pem, &config.domain)
    }

    fn resource_url(&self, key: &str) -> String {
        let path = key
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("https://{}/{}", self.domain, path)
    }
}

impl CdnSigner for CloudFrontSigner {
    fn sign_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String, BoxError> {
        let resource = self.resource_url(key);
        let policy = custom_policy(&resource, expires_at);

        let signature = self
            .signing_key
            .try_sign(policy.as_bytes())
            .map_err(|e| BoxError::Signing(format!("Failed to sign CloudFront policy: {}", e)))?;

        Ok(format!(
            "{}?Policy={}&Signature={}&Key-Pair-Id={}",
            resource,
            cloudfront_base64(policy.as_bytes()),
            cloudfront_base64(&signature.to_bytes()),
            self.key_pair_id
        ))
    }
}
