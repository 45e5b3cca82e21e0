//! HMAC-SHA256 signed join tokens.
//!
//! Token layout: `v1.<app_id>.<channel>.<uid>.<expires_unix>.<hex signature>`
//! where the signature covers everything before the last dot. The video
//! provider holds the same certificate and verifies independently.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{JoinToken, TransportTokenIssuer};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Claims recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedJoin {
    pub channel: String,
    pub uid: u32,
    pub expires_at: Timestamp,
}

pub struct HmacTokenIssuer {
    app_id: String,
    certificate: SecretString,
    ttl_secs: u64,
}

impl HmacTokenIssuer {
    pub fn new(app_id: impl Into<String>, certificate: SecretString, ttl_secs: u64) -> Self {
        Self {
            app_id: app_id.into(),
            certificate,
            ttl_secs,
        }
    }

    fn sign(&self, payload: &str) -> Result<String, DomainError> {
        let mut mac = HmacSha256::new_from_slice(self.certificate.expose_secret().as_bytes())
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::TransportError,
                    format!("Invalid video certificate: {}", e),
                )
            })?;
        mac.update(payload.as_bytes());
        Ok(to_hex(&mac.finalize().into_bytes()))
    }

    /// Checks signature and expiry of a token this issuer produced.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<VerifiedJoin, DomainError> {
        let invalid = || DomainError::new(ErrorCode::Unauthorized, "Invalid join token");

        let (payload, signature) = token.rsplit_once('.').ok_or_else(invalid)?;
        let expected = self.sign(payload)?;
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(invalid());
        }

        let parts: Vec<&str> = payload.split('.').collect();
        let [version, app_id, channel, uid, expires] = parts.as_slice() else {
            return Err(invalid());
        };
        if *version != TOKEN_VERSION || *app_id != self.app_id {
            return Err(invalid());
        }

        let uid: u32 = uid.parse().map_err(|_| invalid())?;
        let expires: u64 = expires.parse().map_err(|_| invalid())?;
        let expires_at = Timestamp::from_unix_secs(expires);
        if !now.is_before(&expires_at) {
            return Err(DomainError::new(ErrorCode::Unauthorized, "Join token expired"));
        }

        Ok(VerifiedJoin {
            channel: channel.to_string(),
            uid,
            expires_at,
        })
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[async_trait]
impl TransportTokenIssuer for HmacTokenIssuer {
    async fn issue(
        &self,
        channel: &str,
        uid: u32,
        now: Timestamp,
    ) -> Result<JoinToken, DomainError> {
        if channel.contains('.') {
            return Err(DomainError::new(
                ErrorCode::TransportError,
                format!("Channel name '{}' cannot contain '.'", channel),
            ));
        }

        let expires_at = now.plus_secs(self.ttl_secs);
        let payload = format!(
            "{}.{}.{}.{}.{}",
            TOKEN_VERSION,
            self.app_id,
            channel,
            uid,
            expires_at.as_unix_secs()
        );
        let signature = self.sign(&payload)?;

        Ok(JoinToken {
            token: format!("{}.{}", payload, signature),
            channel: channel.to_string(),
            uid,
            expires_at,
        })
    }
}

impl std::fmt::Debug for HmacTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenIssuer")
            .field("app_id", &self.app_id)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> HmacTokenIssuer {
        HmacTokenIssuer::new("app-1", SecretString::new("cert-secret".to_string()), 3600)
    }

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    #[tokio::test]
    async fn issued_token_verifies() {
        let issuer = issuer();
        let token = issuer.issue("session-abc", 7, t0()).await.unwrap();

        assert_eq!(token.expires_at, t0().plus_secs(3600));

        let verified = issuer.verify(&token.token, t0().plus_secs(10)).unwrap();
        assert_eq!(verified.channel, "session-abc");
        assert_eq!(verified.uid, 7);
    }

    #[tokio::test]
    async fn tampered_uid_fails_verification() {
        let issuer = issuer();
        let token = issuer.issue("session-abc", 7, t0()).await.unwrap();
        let forged = token.token.replacen(".7.", ".8.", 1);

        assert!(issuer.verify(&forged, t0()).is_err());
    }

    #[tokio::test]
    async fn other_certificate_fails_verification() {
        let token = issuer().issue("session-abc", 7, t0()).await.unwrap();
        let other = HmacTokenIssuer::new("app-1", SecretString::new("different".to_string()), 3600);

        assert!(other.verify(&token.token, t0()).is_err());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let issuer = issuer();
        let token = issuer.issue("session-abc", 7, t0()).await.unwrap();

        let err = issuer.verify(&token.token, t0().plus_secs(3600)).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn dotted_channel_is_refused() {
        assert!(issuer().issue("a.b", 1, t0()).await.is_err());
    }

    #[test]
    fn hex_encoding_is_lowercase_and_padded() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xab]), "000fab");
    }
}
