//! Video transport configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    /// Provider application id embedded in join tokens
    pub app_id: String,

    /// Certificate used to sign join tokens
    pub app_certificate: SecretString,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl VideoConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.app_id.is_empty() {
            return Err(ValidationError::MissingRequired("VIDEO_APP_ID"));
        }
        if self.app_certificate.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("VIDEO_APP_CERTIFICATE"));
        }
        if !(60..=86_400).contains(&self.token_ttl_secs) {
            return Err(ValidationError::InvalidTokenTtl);
        }
        Ok(())
    }
}

fn default_token_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: u64) -> VideoConfig {
        VideoConfig {
            app_id: "app".to_string(),
            app_certificate: SecretString::new("cert".to_string()),
            token_ttl_secs: ttl,
        }
    }

    #[test]
    fn ttl_bounds() {
        assert!(config(3600).validate().is_ok());
        assert_eq!(config(10).validate(), Err(ValidationError::InvalidTokenTtl));
    }

    #[test]
    fn empty_certificate_is_missing() {
        let mut c = config(3600);
        c.app_certificate = SecretString::new(String::new());
        assert_eq!(
            c.validate(),
            Err(ValidationError::MissingRequired("VIDEO_APP_CERTIFICATE"))
        );
    }
}
