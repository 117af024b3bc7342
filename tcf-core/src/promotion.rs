//! Premium membership and the monthly free promotion quota
//!
//! Premium members get a fixed number of free listing promotions per calendar
//! month (UTC). The counter lives on the user row; it is lazily reset the
//! first time it is touched in a new month.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

/// Free promotions per calendar month for premium members
pub const FREE_PROMOTIONS_PER_MONTH: i32 = 3;

/// Longest premium upgrade accepted in one request
pub const MAX_PREMIUM_MONTHS: u32 = 12;

/// Longest listing promotion in days
pub const MAX_PROMOTION_DAYS: u32 = 30;

/// Premium membership: flagged and not past its end date.
pub fn is_premium(flag: bool, premium_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    flag && premium_until.map_or(true, |until| until > now)
}

/// New `premium_until` after buying `months` more.
///
/// Extends from the current end date while it is still in the future.
pub fn extend_premium(
    premium_until: Option<DateTime<Utc>>,
    months: u32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    if months == 0 || months > MAX_PREMIUM_MONTHS {
        return Err(ValidationError::OutOfRange {
            field: "months",
            min: "1".into(),
            max: MAX_PREMIUM_MONTHS.to_string(),
        });
    }
    let base = premium_until.filter(|until| *until > now).unwrap_or(now);
    base.checked_add_months(Months::new(months))
        .ok_or(ValidationError::InvalidFormat {
            field: "months",
            reason: "premium end date out of range",
        })
}

/// End time of a promotion of `days` starting at `starts_at`.
pub fn promotion_end(starts_at: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, ValidationError> {
    if days == 0 || days > MAX_PROMOTION_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "days",
            min: "1".into(),
            max: MAX_PROMOTION_DAYS.to_string(),
        });
    }
    Ok(starts_at + Duration::days(i64::from(days)))
}

/// Whether the monthly counter must be zeroed before use.
pub fn should_reset(last_reset: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_reset {
        None => true,
        Some(last) => (last.year(), last.month()) < (now.year(), now.month()),
    }
}

/// Quota fields loaded from the user row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub used: i32,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Result of consuming one free promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaOutcome {
    pub used: i32,
    pub remaining: i32,
    /// The counter was zeroed first; `reset_at` must be written back as `now`
    #[serde(skip)]
    pub was_reset: bool,
}

/// Why a free promotion could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("free promotions are a premium benefit")]
    NotPremium,

    #[error("no free promotions left this month")]
    Exhausted,
}

impl QuotaError {
    /// Machine-readable reason used in API bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotPremium => "not_premium",
            Self::Exhausted => "quota_exhausted",
        }
    }
}

/// The monthly free promotion allowance
#[derive(Debug, Clone, Copy)]
pub struct FreePromotionQuota {
    pub per_month: i32,
}

impl Default for FreePromotionQuota {
    fn default() -> Self {
        Self {
            per_month: FREE_PROMOTIONS_PER_MONTH,
        }
    }
}

impl FreePromotionQuota {
    /// Free promotions still available, without consuming one.
    pub fn remaining(&self, state: &QuotaState, now: DateTime<Utc>) -> i32 {
        if !is_premium(state.is_premium, state.premium_until, now) {
            return 0;
        }
        let used = if should_reset(state.reset_at, now) { 0 } else { state.used };
        (self.per_month - used).max(0)
    }

    /// Consume one free promotion.
    pub fn consume(&self, state: &QuotaState, now: DateTime<Utc>) -> Result<QuotaOutcome, QuotaError> {
        if !is_premium(state.is_premium, state.premium_until, now) {
            return Err(QuotaError::NotPremium);
        }

        let was_reset = should_reset(state.reset_at, now);
        let used = if was_reset { 0 } else { state.used.max(0) };
        if used >= self.per_month {
            return Err(QuotaError::Exhausted);
        }

        let used = used + 1;
        Ok(QuotaOutcome {
            used,
            remaining: (self.per_month - used).max(0),
            was_reset,
        })
    }
}

/// Lifecycle of a listing promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionStatus {
    Active,
    Expired,
    Scheduled,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Scheduled => "SCHEDULED",
        }
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromotionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            "SCHEDULED" => Ok(Self::Scheduled),
            _ => Err(ValidationError::InvalidVariant {
                field: "promotion status",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for PromotionStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn premium(used: i32, reset_at: Option<DateTime<Utc>>) -> QuotaState {
        QuotaState {
            is_premium: true,
            premium_until: None,
            used,
            reset_at,
        }
    }

    #[test]
    fn premium_requires_future_end_date() {
        let now = ymd(2025, 3, 10);
        assert!(is_premium(true, None, now));
        assert!(is_premium(true, Some(ymd(2025, 4, 1)), now));
        assert!(!is_premium(true, Some(ymd(2025, 3, 1)), now));
        assert!(!is_premium(false, Some(ymd(2026, 1, 1)), now));
    }

    #[test]
    fn reset_on_calendar_month_boundary() {
        let now = ymd(2025, 3, 1);
        assert!(should_reset(None, now));
        assert!(should_reset(Some(ymd(2025, 2, 28)), now));
        assert!(should_reset(Some(ymd(2024, 12, 31)), ymd(2025, 1, 1)));
        assert!(!should_reset(Some(ymd(2025, 3, 1)), ymd(2025, 3, 31)));
    }

    #[test]
    fn consume_counts_up_to_limit() {
        let quota = FreePromotionQuota::default();
        let now = ymd(2025, 3, 10);
        let mut state = premium(0, Some(ymd(2025, 3, 1)));

        for expected in 1..=3 {
            let outcome = quota.consume(&state, now).unwrap();
            assert_eq!(outcome.used, expected);
            assert_eq!(outcome.remaining, 3 - expected);
            assert!(!outcome.was_reset);
            state.used = outcome.used;
        }

        assert_eq!(quota.consume(&state, now), Err(QuotaError::Exhausted));
        assert_eq!(quota.remaining(&state, now), 0);
    }

    #[test]
    fn new_month_resets_exhausted_counter() {
        let quota = FreePromotionQuota::default();
        let state = premium(3, Some(ymd(2025, 2, 3)));
        let outcome = quota.consume(&state, ymd(2025, 3, 1)).unwrap();
        assert!(outcome.was_reset);
        assert_eq!(outcome.used, 1);
        assert_eq!(outcome.remaining, 2);
    }

    #[test]
    fn non_premium_is_refused() {
        let quota = FreePromotionQuota::default();
        let state = QuotaState {
            is_premium: true,
            premium_until: Some(ymd(2025, 1, 1)),
            used: 0,
            reset_at: None,
        };
        assert_eq!(quota.consume(&state, ymd(2025, 3, 1)), Err(QuotaError::NotPremium));
        assert_eq!(quota.remaining(&state, ymd(2025, 3, 1)), 0);
        assert_eq!(QuotaError::NotPremium.reason(), "not_premium");
    }

    #[test]
    fn promotion_length_is_bounded() {
        let start = ymd(2025, 3, 10);
        assert_eq!(promotion_end(start, 7).unwrap(), ymd(2025, 3, 17));
        assert!(promotion_end(start, 0).is_err());
        assert!(promotion_end(start, 31).is_err());
    }

    #[test]
    fn extend_premium_from_active_end_date() {
        let now = ymd(2025, 3, 10);
        assert_eq!(extend_premium(None, 1, now).unwrap(), ymd(2025, 4, 10));
        assert_eq!(
            extend_premium(Some(ymd(2025, 5, 1)), 2, now).unwrap(),
            ymd(2025, 7, 1)
        );
        assert_eq!(
            extend_premium(Some(ymd(2025, 1, 1)), 1, now).unwrap(),
            ymd(2025, 4, 10)
        );
        assert!(extend_premium(None, 0, now).is_err());
        assert!(extend_premium(None, 13, now).is_err());
    }
}
