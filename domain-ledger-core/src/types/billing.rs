//! Billing payload codec
//!
//! The billing payload is stored as opaque JSON text on the domain record.
//! Decoding is lenient about missing fields and strict about malformed JSON;
//! keys this version does not know about are carried through untouched.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{CoreError, CoreResult};
use crate::utils::datetime;

/// Decoded billing payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingData {
    #[serde(default, deserialize_with = "nullable_string")]
    pub registrar: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub registered_date: String,

    /// RFC3339 timestamp; empty means "no billing schedule"
    #[serde(default, deserialize_with = "nullable_string")]
    pub end_date: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub renewal_price: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renewal: Option<RenewalFlag>,

    #[serde(default, deserialize_with = "nullable_string")]
    pub notes: String,

    /// Raw cycle text, see [`BillingData::renewal_cycle`]
    #[serde(default, deserialize_with = "nullable_string")]
    pub cycle: String,

    #[serde(default, deserialize_with = "nullable_string")]
    pub amount: String,

    /// Keys not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Auto-renewal flag in whatever shape the client sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenewalFlag {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl RenewalFlag {
    /// Truthiness of the flag (`true`, non-zero, `"1"`, `"true"`, `"yes"`, `"on"`).
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
        }
    }
}

/// Renewal period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalCycle {
    Yearly,
    Monthly,
    Unknown,
}

impl RenewalCycle {
    /// Interpret the raw cycle text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "yearly" | "year" | "annual" | "annually" | "y" | "年" => Self::Yearly,
            "monthly" | "month" | "m" | "月" => Self::Monthly,
            _ => Self::Unknown,
        }
    }

    /// Length of one cycle in months.
    #[must_use]
    pub fn months(self) -> Option<u32> {
        match self {
            Self::Yearly => Some(12),
            Self::Monthly => Some(1),
            Self::Unknown => None,
        }
    }
}

impl BillingData {
    /// Decode a stored payload.
    ///
    /// Returns `Ok(None)` for an empty or `null` payload. Malformed JSON, a
    /// non-object payload, or a mistyped known field is a `DecodeError`.
    pub fn decode(raw: &str) -> CoreResult<Option<Self>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CoreError::DecodeError(format!("Invalid billing JSON: {e}")))?;
        if value.is_null() {
            return Ok(None);
        }
        if !value.is_object() {
            return Err(CoreError::DecodeError(
                "Billing payload must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CoreError::DecodeError(format!("Invalid billing field: {e}")))
    }

    /// Encode back to JSON text, preserving unknown keys.
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::SerializationError(e.to_string()))
    }

    /// Parsed end date; `Ok(None)` when no end date is set.
    pub fn parsed_end_date(&self) -> Result<Option<DateTime<FixedOffset>>, chrono::ParseError> {
        let raw = self.end_date.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        datetime::parse_rfc3339(raw).map(Some)
    }

    /// Rewrite `endDate` in a stored payload.
    ///
    /// Works on the raw JSON object, so every other key keeps the exact value
    /// and shape the client sent (including `null`s and absent fields).
    ///
    /// # Errors
    /// `DecodeError` if `raw` is not a JSON object.
    pub fn replace_end_date(raw: &str, end_date: &DateTime<FixedOffset>) -> CoreResult<String> {
        let mut fields: Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| CoreError::DecodeError(format!("Invalid billing JSON: {e}")))?;
        fields.insert(
            "endDate".to_string(),
            Value::String(datetime::format_rfc3339(end_date)),
        );
        serde_json::to_string(&fields).map_err(|e| CoreError::SerializationError(e.to_string()))
    }

    #[must_use]
    pub fn auto_renewal_enabled(&self) -> bool {
        self.auto_renewal.as_ref().is_some_and(RenewalFlag::is_set)
    }

    #[must_use]
    pub fn renewal_cycle(&self) -> RenewalCycle {
        RenewalCycle::parse(&self.cycle)
    }
}

/// `null` decodes to an empty string, matching clients that send `null` for blank fields.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
