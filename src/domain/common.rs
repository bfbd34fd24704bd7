//! Sub-records shared by several entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Audit trail maintained by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Audit {
    pub fn new(actor: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Postal address
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Money planned and executed for an initiative
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    #[serde(default)]
    pub planned: Decimal,
    #[serde(default)]
    pub executed: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_source: Option<String>,
}

impl Budget {
    pub fn remaining(&self) -> Decimal {
        self.planned - self.executed
    }

    pub fn is_valid(&self) -> bool {
        self.planned >= Decimal::ZERO && self.executed >= Decimal::ZERO
    }
}

/// Metadata of a file uploaded against a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

/// Half-open interval overlap check
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn touching_intervals_do_not_overlap() {
        let t = |h| Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap();
        assert!(!overlaps(t(8), t(10), t(10), t(12)));
        assert!(overlaps(t(8), t(11), t(10), t(12)));
        assert!(overlaps(t(9), t(10), t(8), t(12)));
    }

    #[test]
    fn budget_remaining() {
        let budget = Budget {
            planned: Decimal::new(10_000, 0),
            executed: Decimal::new(2_500, 0),
            funding_source: None,
        };
        assert_eq!(budget.remaining(), Decimal::new(7_500, 0));
    }
}
