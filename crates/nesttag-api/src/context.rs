/// API Context - shared state for all API handlers
use nesttag_core::AppConfig;
use nesttag_core::BoxError;
use nesttag_core::auth::{Authenticator, TokenVerifier};
use nesttag_core::services::{
    BoxIdRegistry, BoxStore, CdnSigner, CloudFrontSigner, CognitoIdentityProvider,
    DynamoBoxIdRegistry, DynamoBoxStore, DynamoLabelStore, IdentityProvider, LabelStore,
    ObjectStorage, S3ObjectStorage,
};
use std::sync::Arc;
use tracing::info;

/// Region used for object URLs when the SDK config has none
const DEFAULT_REGION: &str = "us-east-1";

/// Backend services used by the handlers
#[derive(Clone)]
pub struct Services {
    pub boxes: Arc<dyn BoxStore>,
    pub labels: Arc<dyn LabelStore>,
    pub box_ids: Arc<dyn BoxIdRegistry>,
    pub storage: Arc<dyn ObjectStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cdn: Option<Arc<dyn CdnSigner>>,
}

/// API Context contains shared resources for API handlers
#[derive(Clone)]
pub struct ApiContext {
    pub config: AppConfig,
    pub boxes: Arc<dyn BoxStore>,
    pub labels: Arc<dyn LabelStore>,
    pub box_ids: Arc<dyn BoxIdRegistry>,
    pub storage: Arc<dyn ObjectStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub cdn: Option<Arc<dyn CdnSigner>>,
    pub authenticator: Arc<Authenticator>,
}

impl ApiContext {
    /// Create a new API context from the environment
    pub async fn new() -> Result<Arc<Self>, BoxError> {
        let config = AppConfig::from_env()?;

        // Load AWS config; AWS_ENDPOINT_URL is honoured by the SDK
        let aws_config = aws_config::load_from_env().await;
        let region = aws_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        info!(region = %region, "Initializing API context");

        let dynamodb_client = aws_sdk_dynamodb::Client::new(&aws_config);
        let s3_client = aws_sdk_s3::Client::new(&aws_config);
        let cognito_client = aws_sdk_cognitoidentityprovider::Client::new(&aws_config);

        let cdn = match &config.cdn {
            Some(cdn) => Some(Arc::new(CloudFrontSigner::from_config(cdn)?) as Arc<dyn CdnSigner>),
            None => None,
        };

        let services = Services {
            boxes: Arc::new(DynamoBoxStore::new(
                dynamodb_client.clone(),
                &config.boxes_table,
            )),
            labels: Arc::new(DynamoLabelStore::new(
                dynamodb_client.clone(),
                &config.labels_table,
            )),
            box_ids: Arc::new(DynamoBoxIdRegistry::new(
                dynamodb_client,
                &config.box_ids_table,
            )),
            storage: Arc::new(S3ObjectStorage::new(s3_client, region)),
            identity: Arc::new(CognitoIdentityProvider::new(
                cognito_client,
                &config.user_pool_id,
                &config.client_id,
            )),
            cdn,
        };

        Self::with_services(config, services)
    }

    /// Builds a context around already constructed services
    pub fn with_services(config: AppConfig, services: Services) -> Result<Arc<Self>, BoxError> {
        let verifier = TokenVerifier::new(config.jwks_json.as_deref())?;
        let authenticator = Arc::new(Authenticator::new(
            verifier,
            Arc::clone(&services.identity),
            config.admin_group.clone(),
        ));

        Ok(Arc::new(Self {
            config,
            boxes: services.boxes,
            labels: services.labels,
            box_ids: services.box_ids,
            storage: services.storage,
            identity: services.identity,
            cdn: services.cdn,
            authenticator,
        }))
    }
}
