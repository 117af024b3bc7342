//! User roles, account status and review ratings

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validation::{bounded_text, ValidationError};

const MAX_REVIEW_COMMENT_LEN: usize = 1000;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,32}$").expect("invalid username regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(ValidationError::InvalidVariant {
                field: "role",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            _ => Err(ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for UserStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Validated public username
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// 3 to 32 characters of letters, digits, `_` and `.`.
    ///
    /// ```
    /// use tcf_core::Username;
    ///
    /// assert!(Username::new("vintage_hunter").is_ok());
    /// assert!(Username::new("no spaces").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }
        if s.chars().count() > 32 {
            return Err(ValidationError::TooLong {
                field: "username",
                max: 32,
            });
        }
        if !USERNAME_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                reason: "3-32 letters, digits, underscores or dots",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Review rating, 1 to 5 stars
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(i16);

impl Rating {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match i16::try_from(value) {
            Ok(v @ 1..=5) => Ok(Self(v)),
            _ => Err(ValidationError::OutOfRange {
                field: "rating",
                min: "1".into(),
                max: "5".into(),
            }),
        }
    }

    pub fn value(&self) -> i16 {
        self.0
    }
}

/// Optional review text, trimmed, at most 1000 characters.
pub fn review_comment(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => bounded_text("comment", text, 1, MAX_REVIEW_COMMENT_LEN).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_and_status_parse_any_case() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Suspended".parse::<UserStatus>().unwrap(), UserStatus::Suspended);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn usernames() {
        assert_eq!(Username::new(" emma.c ").unwrap().as_str(), "emma.c");
        assert!(Username::new("ab").is_err());
        assert!(matches!(
            Username::new(&"a".repeat(33)),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(Username::new("emoji😀").is_err());
    }

    #[test]
    fn rating_range() {
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(i64::MAX).is_err());
    }

    #[test]
    fn review_comment_is_optional() {
        assert_eq!(review_comment(None).unwrap(), None);
        assert_eq!(review_comment(Some(" great seller ")).unwrap(), Some("great seller".into()));
        assert!(review_comment(Some(&"x".repeat(1001))).is_err());
    }
}
