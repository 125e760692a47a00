//! Identifier wrappers for repository records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing an identifier from user input fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_string_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse user-supplied input. Repository payloads go through serde instead.
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(IdParseError::new(format!("{} must not be empty", $label)));
                }
                if trimmed.chars().any(char::is_whitespace) {
                    return Err(IdParseError::new(format!(
                        "Invalid {}: '{}' contains whitespace",
                        $label, trimmed
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(ContentTypeId, "content type ID");
define_string_id!(EntryId, "entry ID");
define_string_id!(FieldId, "field ID");
define_string_id!(LocaleCode, "locale code");
