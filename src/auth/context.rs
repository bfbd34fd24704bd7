use chrono::{DateTime, TimeZone, Utc};

use super::Claims;

/// The caller behind a verified bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    claims: Claims,
}

impl AuthContext {
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        let user_id = claims.sub.trim();
        if user_id.is_empty() {
            return Err("token has no subject");
        }

        Ok(Self {
            user_id: user_id.to_string(),
            claims,
        })
    }

    /// Value stamped into `created_by` / `uploaded_by`
    pub fn actor(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.claims.role.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.claims.name.as_deref()
    }

    pub fn secretariats(&self) -> &[String] {
        &self.claims.secretariats
    }

    pub fn serves(&self, secretariat: &str) -> bool {
        self.claims.serves(secretariat)
    }

    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    pub fn audience(&self) -> &str {
        &self.claims.aud
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.claims.exp, 0).single()
    }
}
