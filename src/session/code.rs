use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::PairingError;

/// Default lifetime of a pairing code
pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(5 * 60);

/// Short-lived numeric code binding a desktop capture session to a browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCode {
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl PairingCode {
    /// Issue a fresh code, uniform in 100000..=999999
    pub fn generate(now: DateTime<Utc>, ttl: Duration) -> Self {
        let value: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self::issued(value.to_string(), now, ttl)
    }

    /// A code typed in by the user, validated for format
    pub fn parse(code: &str, now: DateTime<Utc>, ttl: Duration) -> Result<Self, PairingError> {
        let code = code.trim();
        if !Self::is_well_formed(code) {
            return Err(PairingError::InvalidCode(code.to_string()));
        }
        Ok(Self::issued(code.to_string(), now, ttl))
    }

    fn issued(code: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(5));
        Self {
            code,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Exactly 6 ASCII digits without a leading zero
    pub fn is_well_formed(code: &str) -> bool {
        code.len() == 6
            && code.bytes().all(|b| b.is_ascii_digit())
            && !code.starts_with('0')
    }

    /// Recomputed on every call from `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
