use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub crm: CrmConfig,
    pub retry: RetryConfig,
    pub query: QueryConfig,
    pub security: SecurityConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Upstream Dynamics 365 Web API endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// e.g. https://org.crm.dynamics.com/api/data/v9.2
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub odata_max_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_page_size: i32,
    pub max_page_size: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Minimum severity emitted: "info" | "warning" | "error" | "critical"
    pub min_severity: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // CRM overrides
        if let Ok(v) = env::var("CRM_BASE_URL") {
            self.crm.base_url = v;
        }
        if let Ok(v) = env::var("CRM_REQUEST_TIMEOUT_SECS") {
            self.crm.request_timeout_secs = v.parse().unwrap_or(self.crm.request_timeout_secs);
        }

        // Retry overrides
        if let Ok(v) = env::var("CRM_MAX_RETRIES") {
            self.retry.max_retries = v.parse().unwrap_or(self.retry.max_retries);
        }
        if let Ok(v) = env::var("CRM_INITIAL_DELAY_MS") {
            self.retry.initial_delay_ms = v.parse().unwrap_or(self.retry.initial_delay_ms);
        }
        if let Ok(v) = env::var("CRM_MAX_DELAY_MS") {
            self.retry.max_delay_ms = v.parse().unwrap_or(self.retry.max_delay_ms);
        }
        if let Ok(v) = env::var("CRM_BACKOFF_FACTOR") {
            self.retry.backoff_factor = v.parse().unwrap_or(self.retry.backoff_factor);
        }
        if let Ok(v) = env::var("CRM_RETRY_JITTER") {
            self.retry.jitter = v.parse().unwrap_or(self.retry.jitter);
        }

        // Query overrides
        if let Ok(v) = env::var("QUERY_DEFAULT_PAGE_SIZE") {
            self.query.default_page_size = v.parse().unwrap_or(self.query.default_page_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_PAGE_SIZE") {
            self.query.max_page_size = v.parse().unwrap_or(self.query.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Audit overrides
        if let Ok(v) = env::var("AUDIT_MIN_SEVERITY") {
            self.audit.min_severity = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            crm: CrmConfig {
                base_url: "http://localhost:8080/api/data/v9.2".to_string(),
                request_timeout_secs: 30,
                odata_max_version: "4.0".to_string(),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 100,
                max_delay_ms: 5_000,
                backoff_factor: 2.0,
                jitter: false,
            },
            query: QueryConfig {
                default_page_size: 25,
                max_page_size: 100,
            },
            security: SecurityConfig {
                jwt_secret: "dev-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            audit: AuditConfig {
                min_severity: "info".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            crm: CrmConfig {
                base_url: String::new(),
                request_timeout_secs: 15,
                odata_max_version: "4.0".to_string(),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 250,
                max_delay_ms: 10_000,
                backoff_factor: 2.0,
                jitter: true,
            },
            query: QueryConfig {
                default_page_size: 25,
                max_page_size: 100,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.portal.example.com".to_string()],
            },
            audit: AuditConfig {
                min_severity: "info".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            crm: CrmConfig {
                base_url: String::new(),
                request_timeout_secs: 15,
                odata_max_version: "4.0".to_string(),
            },
            retry: RetryConfig {
                max_retries: 4,
                initial_delay_ms: 500,
                max_delay_ms: 30_000,
                backoff_factor: 2.0,
                jitter: true,
            },
            query: QueryConfig {
                default_page_size: 25,
                max_page_size: 50,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: true,
                cors_origins: vec!["https://portal.example.com".to_string()],
            },
            audit: AuditConfig {
                min_severity: "info".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
