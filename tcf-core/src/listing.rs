//! Listing availability and validated listing input

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::ListingEffect;
use crate::validation::{bounded_text, ValidationError};

const MAX_NAME_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 5000;
const MAX_IMAGES: usize = 10;

/// Availability flags of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingState {
    pub listed: bool,
    pub sold: bool,
    pub sold_at: Option<DateTime<Utc>>,
}

impl ListingState {
    /// A fresh listing, visible on the marketplace.
    pub fn new_listed() -> Self {
        Self {
            listed: true,
            sold: false,
            sold_at: None,
        }
    }

    /// Can be bought right now.
    pub fn is_available(&self) -> bool {
        self.listed && !self.sold
    }

    /// A sold listing is never listed and always has a sale time.
    pub fn is_consistent(&self) -> bool {
        !self.sold || (!self.listed && self.sold_at.is_some())
    }

    /// Apply the effect of an order transition.
    ///
    /// An existing `sold_at` is kept so repeated sales stamps don't move it.
    pub fn apply(self, effect: ListingEffect, at: DateTime<Utc>) -> Self {
        match effect {
            ListingEffect::None => self,
            ListingEffect::MarkSold => Self {
                listed: false,
                sold: true,
                sold_at: Some(self.sold_at.unwrap_or(at)),
            },
            ListingEffect::Relist => Self::new_listed(),
        }
    }
}

/// Validated listing title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingName(String);

impl ListingName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text("name", s, 1, MAX_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Optional free-form description, trimmed, at most 5000 characters.
pub fn description(s: Option<&str>) -> Result<Option<String>, ValidationError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => bounded_text("description", text, 1, MAX_DESCRIPTION_LEN).map(Some),
    }
}

/// Validated listing price (USD, two decimal places)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(Decimal);

impl Price {
    pub fn max() -> Decimal {
        Decimal::new(1_000_000, 0)
    }

    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO || amount > Self::max() {
            return Err(ValidationError::OutOfRange {
                field: "price",
                min: "0.01".into(),
                max: Self::max().to_string(),
            });
        }
        if amount.round_dp(2) != amount {
            return Err(ValidationError::InvalidFormat {
                field: "price",
                reason: "at most two decimal places",
            });
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

/// Item condition as stored in `listings.condition_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::LikeNew => "LIKE_NEW",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NEW" | "BRAND_NEW" => Ok(Self::New),
            "LIKE_NEW" => Ok(Self::LikeNew),
            "GOOD" => Ok(Self::Good),
            "FAIR" => Ok(Self::Fair),
            "POOR" => Ok(Self::Poor),
            _ => Err(ValidationError::InvalidVariant {
                field: "condition",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Validated image URL list (http/https, at most 10)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageUrls(Vec<String>);

impl ImageUrls {
    pub fn new(urls: Vec<String>) -> Result<Self, ValidationError> {
        if urls.len() > MAX_IMAGES {
            return Err(ValidationError::OutOfRange {
                field: "image_urls",
                min: "0".into(),
                max: MAX_IMAGES.to_string(),
            });
        }
        let mut cleaned = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.trim();
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ValidationError::InvalidFormat {
                    field: "image_urls",
                    reason: "must be http(s) URLs",
                });
            }
            cleaned.push(url.to_owned());
        }
        Ok(Self(cleaned))
    }

    /// First image, used as the cover.
    pub fn cover(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn mark_sold_unlists_and_stamps() {
        let state = ListingState::new_listed().apply(ListingEffect::MarkSold, at(100));
        assert!(state.sold);
        assert!(!state.listed);
        assert_eq!(state.sold_at, Some(at(100)));
        assert!(state.is_consistent());
        assert!(!state.is_available());
    }

    #[test]
    fn mark_sold_keeps_earlier_stamp() {
        let state = ListingState {
            listed: false,
            sold: true,
            sold_at: Some(at(50)),
        };
        assert_eq!(state.apply(ListingEffect::MarkSold, at(100)).sold_at, Some(at(50)));
    }

    #[test]
    fn relist_clears_sale() {
        let reserved = ListingState {
            listed: false,
            sold: false,
            sold_at: None,
        };
        let state = reserved.apply(ListingEffect::Relist, at(100));
        assert_eq!(state, ListingState::new_listed());
        assert!(state.is_available());
    }

    #[test]
    fn detects_inconsistent_rows() {
        let listed_and_sold = ListingState {
            listed: true,
            sold: true,
            sold_at: Some(at(1)),
        };
        assert!(!listed_and_sold.is_consistent());

        let sold_without_stamp = ListingState {
            listed: false,
            sold: true,
            sold_at: None,
        };
        assert!(!sold_without_stamp.is_consistent());
    }

    #[test]
    fn price_bounds() {
        assert!(Price::new(Decimal::new(1999, 2)).is_ok());
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Price::new(Decimal::new(-5, 0)).is_err());
        assert!(Price::new(Decimal::new(1_000_001, 0)).is_err());
        assert!(matches!(
            Price::new(Decimal::new(19999, 3)),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn condition_parsing_is_lenient() {
        assert_eq!("like new".parse::<Condition>().unwrap(), Condition::LikeNew);
        assert_eq!("Brand-New".parse::<Condition>().unwrap(), Condition::New);
        assert!("mint".parse::<Condition>().is_err());
    }

    #[test]
    fn image_urls() {
        let urls = ImageUrls::new(vec![" https://cdn.example/a.jpg ".into()]).unwrap();
        assert_eq!(urls.cover(), Some("https://cdn.example/a.jpg"));
        assert!(ImageUrls::new(vec!["ftp://x".into()]).is_err());
        assert!(ImageUrls::new(vec!["https://x".into(); 11]).is_err());
    }

    #[test]
    fn description_blank_is_none() {
        assert_eq!(description(Some("   ")).unwrap(), None);
        assert_eq!(description(Some(" vintage ")).unwrap(), Some("vintage".into()));
    }
}
