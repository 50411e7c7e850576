use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, users::models::UserId};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,
}

/// Signs and verifies session tokens. Holds no per-call state; clones share nothing mutable.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    pub fn generate(&self, user_id: UserId, email: &str) -> Result<String, TokenError> {
        self.generate_at(user_id, email, OffsetDateTime::now_utc())
    }

    pub fn generate_at(
        &self,
        user_id: UserId,
        email: &str,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Signature and structure are checked before expiry, so a forged token
    /// is always `Invalid` even when its `exp` is in the past.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                TokenError::Invalid
            })?
            .claims;

        if claims.exp <= now.unix_timestamp() {
            return Err(TokenError::Expired);
        }
        debug!(user_id = claims.sub, "jwt verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(secret: &str, issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60 * 24,
        }
    }

    fn service() -> TokenService {
        TokenService::new(&cfg("dev-secret", "test-issuer", "test-aud"))
    }

    #[test]
    fn generate_then_verify_returns_encoded_claims() {
        let tokens = service();
        let now = OffsetDateTime::now_utc();
        let token = tokens.generate_at(42, "ann@x.com", now).expect("sign");
        let claims = tokens.verify_at(&token, now).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, now.unix_timestamp() + 24 * 60 * 60);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn still_valid_just_before_expiry() {
        let tokens = service();
        let t0 = OffsetDateTime::now_utc();
        let token = tokens.generate_at(1, "a@b.com", t0).unwrap();
        let later = t0 + Duration::hours(24) - Duration::seconds(1);
        assert!(tokens.verify_at(&token, later).is_ok());
    }

    #[test]
    fn expired_after_twenty_four_hours() {
        let tokens = service();
        let t0 = OffsetDateTime::now_utc();
        let token = tokens.generate_at(1, "a@b.com", t0).unwrap();

        let at_expiry = t0 + Duration::hours(24);
        assert!(matches!(
            tokens.verify_at(&token, at_expiry),
            Err(TokenError::Expired)
        ));
        let after = t0 + Duration::hours(24) + Duration::seconds(1);
        assert!(matches!(tokens.verify_at(&token, after), Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let tokens = service();
        let token = tokens.generate(7, "a@b.com").unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;

        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(tokens.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn forged_token_in_the_past_is_invalid_not_expired() {
        let other = TokenService::new(&cfg("other-secret", "test-issuer", "test-aud"));
        let t0 = OffsetDateTime::now_utc() - Duration::days(3);
        let token = other.generate_at(7, "a@b.com", t0).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_invalid() {
        let good = service();
        let bad = TokenService::new(&cfg("dev-secret", "bad-iss", "bad-aud"));
        let token = good.generate(1, "a@b.com").unwrap();
        assert!(matches!(bad.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = service();
        assert!(matches!(tokens.verify(""), Err(TokenError::Invalid)));
        assert!(matches!(tokens.verify("not.a.jwt"), Err(TokenError::Invalid)));
    }
}
