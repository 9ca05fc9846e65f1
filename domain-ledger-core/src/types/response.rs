//! 响应相关类型定义

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

use super::billing::BillingData;
use super::domain::{DomainId, DomainRecord, DomainStatus, ListScope};

/// 响应包装类型
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 是否成功
    pub success: bool,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 错误详情
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CoreError>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Successful call with nothing to return (e.g. delete)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: CoreError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Result of a verification request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    pub message: String,
}

/// Domain record as returned to callers, with computed fields.
#[derive(Debug, Clone, Serialize)]
pub struct DomainView {
    pub id: DomainId,
    pub domain: String,
    pub status: DomainStatus,
    /// Omitted in the public scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,
    pub is_public: bool,
    pub billing_data: Option<Value>,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::utils::datetime")]
    pub updated_at: DateTime<Utc>,
    /// Whole days until the billing end date; omitted without a valid end date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<i64>,
}

impl DomainView {
    /// Build the outward view of a record at `now`.
    #[must_use]
    pub fn from_record(record: DomainRecord, scope: ListScope, now: DateTime<Utc>) -> Self {
        let expires_in_days = record
            .billing_data
            .as_deref()
            .and_then(|raw| BillingData::decode(raw).ok().flatten())
            .and_then(|billing| billing.parsed_end_date().ok().flatten())
            .map(|end| crate::utils::datetime::days_until(&end, now));

        // Undecodable payloads are passed through as text rather than hidden.
        let billing_data = record.billing_data.map(|raw| {
            serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw))
        });

        let verify_token = match scope {
            ListScope::Admin => Some(record.verify_token),
            ListScope::Public => None,
        };

        Self {
            id: record.id,
            domain: record.name,
            status: record.status,
            verify_token,
            is_public: record.is_public,
            billing_data,
            created_at: record.created_at,
            updated_at: record.updated_at,
            expires_in_days,
        }
    }
}
