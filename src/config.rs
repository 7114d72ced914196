use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

/// S3 settings for the finished-recording store. The whole section is
/// optional; without a bucket the upload endpoint answers 503.
#[derive(Debug, Clone)]
pub struct RecordingsConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    /// Base URL recordings are served from, e.g. a CDN in front of the
    /// bucket. Object keys are appended to it.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub recordings: Option<RecordingsConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let cors_origin =
            env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".into());

        let recordings = match env::var("RECORDINGS_S3_BUCKET") {
            Ok(bucket) if !bucket.trim().is_empty() => {
                let region =
                    env::var("RECORDINGS_S3_REGION").unwrap_or_else(|_| "us-east-1".into());
                let endpoint = env::var("RECORDINGS_S3_ENDPOINT").ok();
                let public_base_url = env::var("RECORDINGS_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| format!("https://{bucket}.s3.{region}.amazonaws.com"));
                Some(RecordingsConfig {
                    bucket,
                    region,
                    endpoint,
                    public_base_url: public_base_url.trim_end_matches('/').to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            cors_origin,
            recordings,
        })
    }
}
