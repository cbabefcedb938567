//! HTTP server configuration.

use std::time::Duration;

use tracing::warn;

use agrigate_core::defaults;

/// Ingress throttle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngressLimit {
    pub requests: u32,
    pub period: Duration,
}

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment name (`APP_ENV`).
    pub environment: String,
    /// Comma-separated CORS origins.
    pub allowed_origins: String,
    /// `None` disables the ingress throttle.
    pub ingress_limit: Option<IngressLimit>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            environment: defaults::APP_ENV.to_string(),
            allowed_origins: defaults::ALLOWED_ORIGINS.to_string(),
            ingress_limit: Some(IngressLimit {
                requests: defaults::RATE_LIMIT_REQUESTS,
                period: Duration::from_secs(defaults::RATE_LIMIT_PERIOD_SECS),
            }),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = match std::env::var(defaults::ENV_PORT) {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                warn!("Invalid {} '{}', using {}", defaults::ENV_PORT, v, defaults::SERVER_PORT);
                defaults::SERVER_PORT
            }),
            Err(_) => defaults::SERVER_PORT,
        };

        let enabled = std::env::var(defaults::ENV_RATE_LIMIT_ENABLED)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);
        let requests: u32 = std::env::var(defaults::ENV_RATE_LIMIT_REQUESTS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
        let period_secs: u64 = std::env::var(defaults::ENV_RATE_LIMIT_PERIOD_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);

        Self {
            host: std::env::var(defaults::ENV_HOST)
                .unwrap_or_else(|_| defaults::SERVER_HOST.to_string()),
            port,
            environment: std::env::var(defaults::ENV_APP_ENV)
                .unwrap_or_else(|_| defaults::APP_ENV.to_string()),
            allowed_origins: std::env::var(defaults::ENV_ALLOWED_ORIGINS)
                .unwrap_or_else(|_| defaults::ALLOWED_ORIGINS.to_string()),
            ingress_limit: (enabled && requests > 0 && period_secs > 0).then(|| IngressLimit {
                requests,
                period: Duration::from_secs(period_secs),
            }),
        }
    }

    /// Whether error details may be shown to clients.
    pub fn is_development(&self) -> bool {
        self.environment == defaults::APP_ENV_DEVELOPMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.allowed_origins, "http://localhost:3000");
        assert!(!config.is_development());
        assert_eq!(config.ingress_limit.map(|l| l.requests), Some(100));
    }

    #[test]
    fn test_is_development() {
        let config = ServerConfig {
            environment: "development".to_string(),
            ..Default::default()
        };
        assert!(config.is_development());
    }
}
