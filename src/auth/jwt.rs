use std::time::Duration;

use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::repo_types::Role, config::JwtConfig, state::AppState};

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token invalid: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: cfg.ttl,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign_at(user_id, role, OffsetDateTime::now_utc())
    }

    pub fn sign_at(
        &self,
        user_id: Uuid,
        role: Role,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).context("token lifetime out of range")?;
        let exp = issued_at
            .checked_add(TimeDuration::seconds(ttl))
            .context("token expiry out of range")?;
        let claims = Claims {
            user_id,
            role,
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, role = %role, "jwt signed");
        Ok(token)
    }

    /// Rejects bad signatures, malformed envelopes and any token past `exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, ttl_secs: u64) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: "test-aud".into(),
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    #[test]
    fn sign_and_verify_carries_user_and_role() {
        let keys = make_keys("dev-secret", "test-issuer", 300);
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, Role::Admin).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn payload_uses_user_id_key() {
        let keys = make_keys("dev-secret", "iss", 60);
        let token = keys.sign(Uuid::new_v4(), Role::Member).unwrap();
        let claims = keys.verify(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["role"], "member");
    }

    #[test]
    fn rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", 3600);
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = keys.sign_at(Uuid::new_v4(), Role::Member, issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn accepts_token_just_before_expiry() {
        let keys = make_keys("dev-secret", "iss", 3600);
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(3600 - 30);
        let token = keys.sign_at(Uuid::new_v4(), Role::Member, issued).unwrap();
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn signing_with_unrepresentable_expiry_errors() {
        let keys = make_keys("dev-secret", "iss", u64::MAX / 2);
        assert!(keys.sign(Uuid::new_v4(), Role::Member).is_err());

        let keys = make_keys("dev-secret", "iss", 60);
        let near_max = time::macros::datetime!(9999-12-31 23:59:30 UTC);
        assert!(keys.sign_at(Uuid::new_v4(), Role::Member, near_max).is_err());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let good = make_keys("secret-a", "iss", 60);
        let bad = make_keys("secret-b", "iss", 60);
        let token = bad.sign(Uuid::new_v4(), Role::Admin).unwrap();
        assert!(good.verify(&token).is_err());
    }

    #[test]
    fn rejects_wrong_issuer_and_garbage() {
        let good = make_keys("same", "good-iss", 60);
        let other = make_keys("same", "bad-iss", 60);
        let token = other.sign(Uuid::new_v4(), Role::Member).unwrap();
        assert!(good.verify(&token).is_err());
        assert!(good.verify("not.a.jwt").is_err());
        assert!(good.verify("").is_err());
    }
}
