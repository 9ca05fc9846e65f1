//! Billing lifecycle engine
//!
//! Decides, for a verified domain at a given instant, whether its billing
//! period should be renewed, the domain expired, or nothing done.
//! Evaluation is pure; [`LifecycleEngine::apply`] produces the record to persist.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};

use crate::error::CoreResult;
use crate::types::{BillingData, DomainRecord, DomainStatus};
use crate::utils::datetime;

/// What to do with a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    NoAction,
    /// Advance the billing end date to `new_end_date`
    Renew { new_end_date: DateTime<FixedOffset> },
    /// Mark the domain expired
    Expire,
}

/// Condition worth reporting that did not change the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleWarning {
    /// `endDate` is set but is not RFC3339
    InvalidEndDate { value: String, reason: String },
    /// Auto-renewal requested with a cycle we cannot interpret
    UnknownCycle(String),
    /// Renewed end date would fall outside the representable range
    RenewalOverflow(String),
}

impl fmt::Display for LifecycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEndDate { value, reason } => {
                write!(f, "invalid end date '{value}': {reason}")
            }
            Self::UnknownCycle(cycle) => write!(f, "unknown renewal cycle '{cycle}'"),
            Self::RenewalOverflow(end) => write!(f, "cannot renew past end date {end}"),
        }
    }
}

/// Engine decision plus an optional warning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub action: LifecycleAction,
    pub warning: Option<LifecycleWarning>,
}

impl Evaluation {
    fn act(action: LifecycleAction) -> Self {
        Self {
            action,
            warning: None,
        }
    }

    fn none() -> Self {
        Self::act(LifecycleAction::NoAction)
    }

    fn warn(warning: LifecycleWarning) -> Self {
        Self {
            action: LifecycleAction::NoAction,
            warning: Some(warning),
        }
    }
}

/// Stateless lifecycle rules
pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Evaluate a decoded billing payload at `now`.
    #[must_use]
    pub fn evaluate(billing: Option<&BillingData>, now: DateTime<Utc>) -> Evaluation {
        let Some(billing) = billing else {
            return Evaluation::none();
        };

        let end_date = match billing.parsed_end_date() {
            Ok(Some(end_date)) => end_date,
            Ok(None) => return Evaluation::none(),
            Err(e) => {
                return Evaluation::warn(LifecycleWarning::InvalidEndDate {
                    value: billing.end_date.clone(),
                    reason: e.to_string(),
                })
            }
        };

        if now <= end_date {
            return Evaluation::none();
        }

        if !billing.auto_renewal_enabled() {
            return Evaluation::act(LifecycleAction::Expire);
        }

        let Some(months) = billing.renewal_cycle().months() else {
            return Evaluation::warn(LifecycleWarning::UnknownCycle(billing.cycle.clone()));
        };

        match datetime::add_months(&end_date, months) {
            Some(new_end_date) => Evaluation::act(LifecycleAction::Renew { new_end_date }),
            None => Evaluation::warn(LifecycleWarning::RenewalOverflow(billing.end_date.clone())),
        }
    }

    /// Decode the record's billing payload and evaluate it.
    ///
    /// Only verified records are subject to lifecycle actions.
    ///
    /// # Errors
    /// `DecodeError` if the billing payload is malformed.
    pub fn evaluate_record(
        record: &DomainRecord,
        now: DateTime<Utc>,
    ) -> CoreResult<(Option<BillingData>, Evaluation)> {
        if record.status != DomainStatus::Verified {
            return Ok((None, Evaluation::none()));
        }
        let billing = match record.billing_data.as_deref() {
            Some(raw) => BillingData::decode(raw)?,
            None => None,
        };
        let evaluation = Self::evaluate(billing.as_ref(), now);
        Ok((billing, evaluation))
    }

    /// Produce the record that results from `action`, or `None` for `NoAction`.
    ///
    /// Renewal rewrites only `endDate` inside the stored billing payload.
    ///
    /// # Errors
    /// `DecodeError` if a renewal targets a payload that is not a JSON object.
    pub fn apply(
        record: &DomainRecord,
        action: &LifecycleAction,
    ) -> CoreResult<Option<DomainRecord>> {
        match action {
            LifecycleAction::NoAction => Ok(None),
            LifecycleAction::Expire => {
                let mut updated = record.clone();
                updated.status = DomainStatus::Expired;
                Ok(Some(updated))
            }
            LifecycleAction::Renew { new_end_date } => {
                let Some(raw) = record.billing_data.as_deref() else {
                    return Ok(None);
                };
                let mut updated = record.clone();
                updated.billing_data = Some(BillingData::replace_end_date(raw, new_end_date)?);
                Ok(Some(updated))
            }
        }
    }
}
