//! Domain record type definitions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Store-assigned domain identifier
pub type DomainId = u64;

/// Maximum length of a fully qualified domain name (RFC 1035)
const MAX_DOMAIN_LEN: usize = 253;
/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Domain verification / billing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    /// Created, waiting for the TXT token to be published
    Pending,
    /// Ownership proven
    Verified,
    /// Billing period ended without auto-renewal
    Expired,
}

impl DomainStatus {
    /// Storage / wire representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Expired => "expired",
        }
    }

    /// Ownership has been proven at least once (verified or expired since).
    #[must_use]
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Verified | Self::Expired)
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "expired" => Ok(Self::Expired),
            other => Err(CoreError::SerializationError(format!(
                "Unknown domain status: '{other}'"
            ))),
        }
    }
}

/// A domain tracked by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// Domain ID
    pub id: DomainId,
    /// Normalized (lowercase) domain name
    #[serde(rename = "domain")]
    pub name: String,
    /// Current status
    pub status: DomainStatus,
    /// TXT token the operator must publish
    pub verify_token: String,
    /// Listed in the public scope
    pub is_public: bool,
    /// Raw billing payload (JSON text), see [`crate::types::BillingData`]
    #[serde(default)]
    pub billing_data: Option<String>,
    /// Optimistic concurrency counter, bumped by the store on every save
    pub revision: u64,
    /// 创建时间
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    /// 更新时间
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Values for a record that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDomainRecord {
    pub name: String,
    pub verify_token: String,
    pub status: DomainStatus,
    pub is_public: bool,
    pub billing_data: Option<String>,
}

impl NewDomainRecord {
    /// A freshly added domain: pending, public, no billing data.
    #[must_use]
    pub fn pending(name: String, verify_token: String) -> Self {
        Self {
            name,
            verify_token,
            status: DomainStatus::Pending,
            is_public: true,
            billing_data: None,
        }
    }
}

/// Visibility scope for listing domains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListScope {
    /// Every record
    #[default]
    Admin,
    /// Public, already-resolved records only
    Public,
}

impl FromStr for ListScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "admin" => Ok(Self::Admin),
            "public" => Ok(Self::Public),
            other => Err(CoreError::ValidationError(format!(
                "Invalid scope: '{other}'. Must be one of: admin, public"
            ))),
        }
    }
}

/// Parse a caller-supplied domain id.
pub fn parse_domain_id(raw: &str) -> CoreResult<DomainId> {
    raw.trim()
        .parse::<DomainId>()
        .map_err(|_| CoreError::ValidationError(format!("Invalid domain ID: '{raw}'")))
}

/// Normalize a caller-supplied domain name.
///
/// Trims whitespace and a trailing root dot, lowercases, and rejects names that
/// could never be looked up as a TXT owner name.
pub fn normalize_domain_name(raw: &str) -> CoreResult<String> {
    let name = raw.trim().trim_end_matches('.').to_lowercase();
    if name.is_empty() {
        return Err(CoreError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if name.len() > MAX_DOMAIN_LEN {
        return Err(CoreError::ValidationError(format!(
            "Domain name exceeds maximum length of {MAX_DOMAIN_LEN} characters (got {})",
            name.len()
        )));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '@' || c == ':')
    {
        return Err(CoreError::ValidationError(format!(
            "Invalid domain name: {name}"
        )));
    }
    for label in name.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(CoreError::ValidationError(format!(
                "Invalid domain name: {name}"
            )));
        }
    }
    Ok(name)
}
