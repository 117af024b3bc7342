//! Moderation reports and listing likes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{bounded_text, ValidationError};

const MAX_REASON_LEN: usize = 1000;

/// What a report points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportTarget {
    Listing,
    User,
}

impl ReportTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "LISTING",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LISTING" => Ok(Self::Listing),
            "USER" => Ok(Self::User),
            _ => Err(ValidationError::InvalidVariant {
                field: "target_type",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for ReportTarget {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Moderation state of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
            Self::Dismissed => "DISMISSED",
        }
    }

    /// Closed reports carry a `resolved_at` time.
    pub fn is_closed(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "RESOLVED" => Ok(Self::Resolved),
            "DISMISSED" => Ok(Self::Dismissed),
            _ => Err(ValidationError::InvalidVariant {
                field: "report status",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for ReportStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Report reason built from an optional category and free-text details,
/// joined as `"category - details"`. At least one must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportReason(String);

impl ReportReason {
    pub fn new(category: Option<&str>, details: Option<&str>) -> Result<Self, ValidationError> {
        let parts: Vec<&str> = [category, details]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        bounded_text("reason", &parts.join(" - "), 1, MAX_REASON_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Like or unlike a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    /// Whether the listing is liked once the action is applied.
    pub fn liked(&self) -> bool {
        matches!(self, Self::Like)
    }
}
