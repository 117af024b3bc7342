//! Conversation and message kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::{bounded_text, ValidationError};

const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationKind {
    /// Buyer and seller talking about a listing
    Order,
    /// A user and the support account
    Support,
    General,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::Support => "SUPPORT",
            Self::General => "GENERAL",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ORDER" => Ok(Self::Order),
            "SUPPORT" => Ok(Self::Support),
            "GENERAL" => Ok(Self::General),
            _ => Err(ValidationError::InvalidVariant {
                field: "conversation type",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for ConversationKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    Image,
    /// Generated by the marketplace, e.g. order status changes
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::System => "SYSTEM",
        }
    }

    /// Kinds a user may send directly.
    pub fn is_user_sendable(&self) -> bool {
        !matches!(self, Self::System)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(Self::Text),
            "IMAGE" => Ok(Self::Image),
            "SYSTEM" => Ok(Self::System),
            _ => Err(ValidationError::InvalidVariant {
                field: "message type",
                value: s.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for MessageKind {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Validated message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text("content", s, 1, MAX_MESSAGE_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
