//! HS256 bearer token verification

use anyhow::{Context, Result};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::Claims;
use crate::config::Settings;

/// Verifies (and, for tooling and tests, issues) portal access tokens
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.auth_jwt_secret,
            settings.auth_jwt_issuer.clone(),
            settings.auth_jwt_audience.clone(),
        )
    }

    /// Verify a JWT token and return the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .context("Token validation failed")?;

        Ok(data.claims)
    }

    /// Sign a token for `user_id` valid for `ttl`
    pub fn issue_token(&self, user_id: &str, role: Option<&str>, ttl: Duration) -> Result<String> {
        let mut claims = Claims::new(user_id, &self.issuer, &self.audience, ttl);
        claims.role = role.map(str::to_string);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to sign token")
    }
}
