use crate::config::AdapterConfig;
use crate::services::storage::S3ObjectClient;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::config::retry::RetryConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the SDK client for `config`: static credentials, SigV4, and the
/// retry settings from the client tuning.
pub async fn setup_storage(config: &AdapterConfig) -> Arc<S3ObjectClient> {
    match &config.endpoint {
        Some(endpoint) => info!("S3 Storage: {} (Bucket: {})", endpoint, config.bucket),
        None => info!("S3 Storage: {} (Bucket: {})", config.region, config.bucket),
    }

    let mut loader = aws_config::from_env()
        .region(Region::new(config.region.clone()))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            config.key.clone(),
            config.secret.clone(),
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    let retry_config = RetryConfig::standard()
        .with_max_attempts(config.tuning.retry_count + 1)
        .with_initial_backoff(Duration::from_millis(config.tuning.retry_delay_ms));

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .retry_config(retry_config)
        .force_path_style(config.force_path_style)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3ObjectClient::new(
        s3_client,
        config.tuning.clone(),
        config.endpoint.clone(),
    ))
}
