//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// HTTP header name for session token authentication (alternative to Authorization).
pub const SESSION_HEADER: &str = "X-Session-Token";

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_DATABASE_URL: &str = "file:data/sproutlog.db";
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_MAX_UPLOAD_SIZE: usize = 26_214_400; // 25MB per media file

    // S3/MinIO defaults for development
    pub const DEV_S3_ENDPOINT: &str = "http://localhost:9100";
    pub const DEV_S3_BUCKET: &str = "media";
    pub const DEV_S3_REGION: &str = "us-east-1";
    pub const DEV_S3_ACCESS_KEY: &str = "minioadmin";
    pub const DEV_S3_SECRET_KEY: &str = "minioadmin";

    // Seed admin for development bootstrap
    pub const DEV_ADMIN_EMAIL: &str = "admin@sproutlog.dev";
    pub const DEV_ADMIN_PASSWORD: &str = "dev-admin-password-do-not-use";

    // AI provider defaults
    pub const DEV_AI_CONNECT_TIMEOUT_MS: u64 = 10_000;
    pub const DEV_AI_REQUEST_TIMEOUT_MS: u64 = 120_000; // audio uploads can be slow
    pub const DEV_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";
    pub const DEV_OCR_ENGINE: &str = "2";
    pub const DEV_TRANSCRIBE_ENDPOINT: &str = "https://api.assemblyai.com/v2";
    pub const DEV_TRANSCRIBE_POLL_MS: u64 = 2000;
    pub const DEV_TRANSCRIBE_MAX_POLLS: u32 = 150;
    pub const DEV_GENERATION_ENDPOINT: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
    pub const DEV_GENERATION_TEMPERATURE: f64 = 0.7;
    pub const DEV_GENERATION_MAX_TOKENS: u32 = 1024;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Which AI provider strategy to use for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Call the real OCR/transcription/generation services over HTTP.
    Live,
    /// Fully deterministic in-process stub, no network traffic.
    Deterministic,
}

impl ProviderMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "live" => Some(Self::Live),
            "deterministic" | "stub" => Some(Self::Deterministic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Deterministic => "deterministic",
        }
    }
}

/// S3 storage configuration.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// S3 endpoint URL (for MinIO or custom S3-compatible services)
    pub endpoint: Option<String>,
    /// S3 bucket name
    pub bucket: String,
    /// S3 region
    pub region: String,
    /// S3 access key ID
    pub access_key: String,
    /// S3 secret access key
    pub secret_key: String,
}

/// AI provider configuration for the media-to-report pipeline.
#[derive(Debug, Clone)]
pub struct AiSettings {
    /// Strategy selection (live provider calls vs deterministic stub).
    pub mode: ProviderMode,
    /// TCP connect timeout for all provider calls.
    pub connect_timeout: Duration,
    /// Whole-request timeout for all provider calls. A stalled provider
    /// socket surfaces as a request error, not an indefinite hang.
    pub request_timeout: Duration,
    /// OCR endpoint (multipart image recognition).
    pub ocr_endpoint: String,
    /// OCR API credential.
    pub ocr_api_key: Option<String>,
    /// OCR engine selector, passed through to the provider.
    pub ocr_engine: String,
    /// Transcription provider base URL (upload/transcript endpoints below it).
    pub transcribe_endpoint: String,
    /// Transcription API credential.
    pub transcribe_api_key: Option<String>,
    /// Request per-speaker utterances from the transcription provider.
    pub speaker_labels: bool,
    /// Interval between transcription status polls.
    pub transcribe_poll_interval: Duration,
    /// Maximum number of status polls before giving up.
    pub transcribe_max_polls: u32,
    /// Generative report endpoint (generateContent-style).
    pub generation_endpoint: String,
    /// Generation API credential.
    pub generation_api_key: Option<String>,
    /// Sampling temperature for report generation.
    pub generation_temperature: f64,
    /// Output token cap for report generation.
    pub generation_max_tokens: u32,
    /// Require the full 7-area enumeration in generated reports.
    pub strict_seven_areas: bool,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL (SQLite, `file:` prefixed path)
    pub database_url: String,
    /// Maximum media upload size in bytes (default: 25MB)
    pub max_upload_size: usize,
    /// Seed admin credentials for development bootstrap
    pub dev_admin: Option<(String, String)>,
    /// S3 storage configuration
    pub storage: StorageSettings,
    /// AI provider configuration
    pub ai: AiSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) all variables have defaults
    /// and the AI provider defaults to the deterministic stub. In production
    /// mode the server refuses to start with development storage credentials,
    /// and `SPROUT_AI_PROVIDER=live` requires the provider API keys.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `SPROUT_HOST` / `SPROUT_PORT`: bind address (default 127.0.0.1:8080)
    /// - `DATABASE_URL`: SQLite path, `file:` prefixed
    /// - `SPROUT_MAX_UPLOAD_SIZE`: max media upload bytes (default 25MB)
    /// - `SPROUT_DEV_ADMIN_EMAIL` / `SPROUT_DEV_ADMIN_PASSWORD`: seed admin (dev only)
    /// - `S3_ENDPOINT` / `S3_BUCKET` / `S3_REGION` / `S3_ACCESS_KEY` / `S3_SECRET_KEY`
    /// - `SPROUT_AI_PROVIDER`: live | deterministic (default: deterministic in dev)
    /// - `SPROUT_AI_CONNECT_TIMEOUT_MS` / `SPROUT_AI_REQUEST_TIMEOUT_MS`
    /// - `SPROUT_OCR_ENDPOINT` / `SPROUT_OCR_API_KEY` / `SPROUT_OCR_ENGINE`
    /// - `SPROUT_TRANSCRIBE_ENDPOINT` / `SPROUT_TRANSCRIBE_API_KEY`
    /// - `SPROUT_TRANSCRIBE_SPEAKER_LABELS`: true/false (default true)
    /// - `SPROUT_TRANSCRIBE_POLL_MS` / `SPROUT_TRANSCRIBE_MAX_POLLS`
    /// - `SPROUT_GENERATION_ENDPOINT` / `SPROUT_GENERATION_API_KEY`
    /// - `SPROUT_GENERATION_TEMPERATURE` / `SPROUT_GENERATION_MAX_TOKENS`
    /// - `SPROUT_STRICT_SEVEN_AREAS`: true/false (default false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("SPROUT_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("SPROUT_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("SPROUT_PORT must be a valid port number"))?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| defaults::DEV_DATABASE_URL.to_string());

        let max_upload_size = env::var("SPROUT_MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| defaults::DEV_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_MAX_UPLOAD_SIZE must be a valid number")
            })?;

        let dev_admin = if environment.is_development() {
            let email = env::var("SPROUT_DEV_ADMIN_EMAIL")
                .unwrap_or_else(|_| defaults::DEV_ADMIN_EMAIL.to_string());
            let password = env::var("SPROUT_DEV_ADMIN_PASSWORD")
                .unwrap_or_else(|_| defaults::DEV_ADMIN_PASSWORD.to_string());
            Some((email, password))
        } else {
            None
        };

        let storage = StorageSettings {
            endpoint: env::var("S3_ENDPOINT").ok().or_else(|| {
                if environment.is_development() {
                    Some(defaults::DEV_S3_ENDPOINT.to_string())
                } else {
                    None
                }
            }),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| defaults::DEV_S3_BUCKET.to_string()),
            region: env::var("S3_REGION").unwrap_or_else(|_| defaults::DEV_S3_REGION.to_string()),
            access_key: env::var("S3_ACCESS_KEY")
                .unwrap_or_else(|_| defaults::DEV_S3_ACCESS_KEY.to_string()),
            secret_key: env::var("S3_SECRET_KEY")
                .unwrap_or_else(|_| defaults::DEV_S3_SECRET_KEY.to_string()),
        };

        let mode = match env::var("SPROUT_AI_PROVIDER") {
            Ok(value) => ProviderMode::parse(&value).ok_or(ConfigError::InvalidValue(
                "SPROUT_AI_PROVIDER must be 'live' or 'deterministic'",
            ))?,
            Err(_) => {
                if environment.is_development() {
                    ProviderMode::Deterministic
                } else {
                    ProviderMode::Live
                }
            }
        };

        let connect_timeout_ms = env::var("SPROUT_AI_CONNECT_TIMEOUT_MS")
            .unwrap_or_else(|_| defaults::DEV_AI_CONNECT_TIMEOUT_MS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_AI_CONNECT_TIMEOUT_MS must be a valid number")
            })?;

        let request_timeout_ms = env::var("SPROUT_AI_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| defaults::DEV_AI_REQUEST_TIMEOUT_MS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_AI_REQUEST_TIMEOUT_MS must be a valid number")
            })?;

        let transcribe_poll_ms = env::var("SPROUT_TRANSCRIBE_POLL_MS")
            .unwrap_or_else(|_| defaults::DEV_TRANSCRIBE_POLL_MS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_TRANSCRIBE_POLL_MS must be a valid number")
            })?;

        let transcribe_max_polls = env::var("SPROUT_TRANSCRIBE_MAX_POLLS")
            .unwrap_or_else(|_| defaults::DEV_TRANSCRIBE_MAX_POLLS.to_string())
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_TRANSCRIBE_MAX_POLLS must be a valid number")
            })?;

        let generation_temperature = env::var("SPROUT_GENERATION_TEMPERATURE")
            .unwrap_or_else(|_| defaults::DEV_GENERATION_TEMPERATURE.to_string())
            .parse::<f64>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_GENERATION_TEMPERATURE must be a valid number")
            })?;

        let generation_max_tokens = env::var("SPROUT_GENERATION_MAX_TOKENS")
            .unwrap_or_else(|_| defaults::DEV_GENERATION_MAX_TOKENS.to_string())
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue("SPROUT_GENERATION_MAX_TOKENS must be a valid number")
            })?;

        let ai = AiSettings {
            mode,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            request_timeout: Duration::from_millis(request_timeout_ms),
            ocr_endpoint: env::var("SPROUT_OCR_ENDPOINT")
                .unwrap_or_else(|_| defaults::DEV_OCR_ENDPOINT.to_string()),
            ocr_api_key: env::var("SPROUT_OCR_API_KEY").ok(),
            ocr_engine: env::var("SPROUT_OCR_ENGINE")
                .unwrap_or_else(|_| defaults::DEV_OCR_ENGINE.to_string()),
            transcribe_endpoint: env::var("SPROUT_TRANSCRIBE_ENDPOINT")
                .unwrap_or_else(|_| defaults::DEV_TRANSCRIBE_ENDPOINT.to_string()),
            transcribe_api_key: env::var("SPROUT_TRANSCRIBE_API_KEY").ok(),
            speaker_labels: parse_bool_env("SPROUT_TRANSCRIBE_SPEAKER_LABELS", true)?,
            transcribe_poll_interval: Duration::from_millis(transcribe_poll_ms),
            transcribe_max_polls,
            generation_endpoint: env::var("SPROUT_GENERATION_ENDPOINT")
                .unwrap_or_else(|_| defaults::DEV_GENERATION_ENDPOINT.to_string()),
            generation_api_key: env::var("SPROUT_GENERATION_API_KEY").ok(),
            generation_temperature,
            generation_max_tokens,
            strict_seven_areas: parse_bool_env("SPROUT_STRICT_SEVEN_AREAS", false)?,
        };

        let config = Config {
            environment,
            host,
            port,
            database_url,
            max_upload_size,
            dev_admin,
            storage,
            ai,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url == defaults::DEV_DATABASE_URL {
            errors.push(format!(
                "DATABASE_URL is using development default '{}'. Set a production database path.",
                defaults::DEV_DATABASE_URL
            ));
        }

        if self.storage.access_key == defaults::DEV_S3_ACCESS_KEY
            || self.storage.secret_key == defaults::DEV_S3_SECRET_KEY
        {
            errors.push(
                "S3_ACCESS_KEY/S3_SECRET_KEY are using development defaults. Set production S3 credentials."
                    .to_string(),
            );
        }

        if self.ai.mode == ProviderMode::Live {
            if self.ai.ocr_api_key.is_none() {
                errors.push("SPROUT_OCR_API_KEY is required when SPROUT_AI_PROVIDER=live".to_string());
            }
            if self.ai.transcribe_api_key.is_none() {
                errors.push(
                    "SPROUT_TRANSCRIBE_API_KEY is required when SPROUT_AI_PROVIDER=live".to_string(),
                );
            }
            if self.ai.generation_api_key.is_none() {
                errors.push(
                    "SPROUT_GENERATION_API_KEY is required when SPROUT_AI_PROVIDER=live".to_string(),
                );
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_bool_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue("boolean flags must be true/false")),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage_settings() -> StorageSettings {
        StorageSettings {
            endpoint: Some("http://localhost:9000".to_string()),
            bucket: "test".to_string(),
            region: "us-east-1".to_string(),
            access_key: "testkey".to_string(),
            secret_key: "testsecret".to_string(),
        }
    }

    fn test_ai_settings(mode: ProviderMode) -> AiSettings {
        AiSettings {
            mode,
            connect_timeout: Duration::from_millis(defaults::DEV_AI_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(defaults::DEV_AI_REQUEST_TIMEOUT_MS),
            ocr_endpoint: defaults::DEV_OCR_ENDPOINT.to_string(),
            ocr_api_key: None,
            ocr_engine: "2".to_string(),
            transcribe_endpoint: defaults::DEV_TRANSCRIBE_ENDPOINT.to_string(),
            transcribe_api_key: None,
            speaker_labels: true,
            transcribe_poll_interval: Duration::from_millis(2000),
            transcribe_max_polls: 150,
            generation_endpoint: defaults::DEV_GENERATION_ENDPOINT.to_string(),
            generation_api_key: None,
            generation_temperature: 0.7,
            generation_max_tokens: 1024,
            strict_seven_areas: false,
        }
    }

    #[test]
    fn test_bind_address() {
        let config = Config {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "file:test.db".to_string(),
            max_upload_size: 1024,
            dev_admin: None,
            storage: test_storage_settings(),
            ai: test_ai_settings(ProviderMode::Deterministic),
        };

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::parse("development"),
            Some(Environment::Development)
        );
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(
            Environment::parse("production"),
            Some(Environment::Production)
        );
        assert_eq!(Environment::parse("prod"), Some(Environment::Production));
        assert_eq!(Environment::parse("invalid"), None);
    }

    #[test]
    fn test_provider_mode_parsing() {
        assert_eq!(ProviderMode::parse("live"), Some(ProviderMode::Live));
        assert_eq!(
            ProviderMode::parse("deterministic"),
            Some(ProviderMode::Deterministic)
        );
        assert_eq!(ProviderMode::parse("stub"), Some(ProviderMode::Deterministic));
        assert_eq!(ProviderMode::parse("other"), None);
    }

    #[test]
    fn test_production_validation_fails_with_dev_defaults() {
        let config = Config {
            environment: Environment::Production,
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: defaults::DEV_DATABASE_URL.to_string(),
            max_upload_size: 1024,
            dev_admin: None,
            storage: StorageSettings {
                endpoint: None,
                bucket: "media".to_string(),
                region: "us-east-1".to_string(),
                access_key: defaults::DEV_S3_ACCESS_KEY.to_string(),
                secret_key: defaults::DEV_S3_SECRET_KEY.to_string(),
            },
            ai: test_ai_settings(ProviderMode::Live),
        };

        let result = config.validate_production();
        assert!(result.is_err());

        if let Err(ConfigError::ProductionValidation(errors)) = result {
            // dev database, dev S3 credentials and three missing provider keys
            assert!(errors.len() >= 4);
        }
    }

    #[test]
    fn test_production_validation_passes_with_proper_config() {
        let mut ai = test_ai_settings(ProviderMode::Live);
        ai.ocr_api_key = Some("ocr-key".to_string());
        ai.transcribe_api_key = Some("transcribe-key".to_string());
        ai.generation_api_key = Some("generation-key".to_string());

        let config = Config {
            environment: Environment::Production,
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "file:/var/lib/sproutlog/sproutlog.db".to_string(),
            max_upload_size: 1024,
            dev_admin: None,
            storage: StorageSettings {
                endpoint: None,
                bucket: "prod-media".to_string(),
                region: "us-west-2".to_string(),
                access_key: "AKIA...".to_string(),
                secret_key: "secret...".to_string(),
            },
            ai,
        };

        assert!(config.validate_production().is_ok());
    }
}
