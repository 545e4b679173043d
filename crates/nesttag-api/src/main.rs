use lambda_http::{Error, Request, run, service_fn};
use nesttag_api::ApiContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Structured JSON logs for CloudWatch, level from RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!(version = nesttag_core::VERSION, "Starting NestTag API Lambda function");

    let ctx = ApiContext::new().await?;
    let app = nesttag_api::router(ctx);

    run(service_fn(|event: Request| {
        let app = app.clone();
        async move { nesttag_api::handler(app, event).await }
    }))
    .await
}
