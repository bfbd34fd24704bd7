use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Payload of a portal access token.
///
/// Besides the registered claims, the city hall identity service names the
/// staff member, their role and the secretariats (culture, sports, urban
/// planning, social assistance, agriculture) they work for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// e.g. `CULTURE_MANAGER`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secretariats: Vec<String>,
}

impl Claims {
    /// Claims for `sub` issued now and valid for `ttl`
    pub fn new(sub: &str, issuer: &str, audience: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.to_string(),
            aud: audience.to_string(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            name: None,
            email: None,
            role: None,
            secretariats: Vec::new(),
        }
    }

    pub fn serves(&self, secretariat: &str) -> bool {
        self.secretariats
            .iter()
            .any(|s| s.eq_ignore_ascii_case(secretariat))
    }
}
