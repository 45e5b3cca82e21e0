//! Authentication configuration (hosted OIDC provider)

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token issuer URL, also the base for JWKS discovery
    pub issuer: String,

    /// Expected audience for tokens
    pub audience: String,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

impl AuthConfig {
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// In production the issuer must be HTTPS.
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.issuer.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_ISSUER"));
        }
        if self.audience.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH_AUDIENCE"));
        }
        if environment == Environment::Production && !self.issuer.starts_with("https://") {
            return Err(ValidationError::IssuerMustBeHttps);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: &str) -> AuthConfig {
        AuthConfig {
            issuer: issuer.to_string(),
            audience: "attune-api".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn http_issuer_allowed_outside_production() {
        assert!(config("http://localhost:8081").validate(Environment::Development).is_ok());
    }

    #[test]
    fn production_requires_https_issuer() {
        assert_eq!(
            config("http://auth.example.com").validate(Environment::Production),
            Err(ValidationError::IssuerMustBeHttps)
        );
        assert!(config("https://auth.example.com")
            .validate(Environment::Production)
            .is_ok());
    }

    #[test]
    fn missing_audience_is_reported() {
        let mut c = config("https://auth.example.com");
        c.audience.clear();
        assert_eq!(
            c.validate(Environment::Development),
            Err(ValidationError::MissingRequired("AUTH_AUDIENCE"))
        );
    }
}
