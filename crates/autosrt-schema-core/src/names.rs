//! Validated names for collections and indexed fields.
//!
//! # Macro-based Name Types
//!
//! The `name_type!` macro reduces boilerplate for string-backed name types,
//! ensuring consistent implementation of serialization, parsing, and display traits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name is empty.
    #[error("name must not be empty")]
    Empty,

    /// The name contains a character the store rejects.
    #[error("name {name:?} contains forbidden character {character:?}")]
    ForbiddenCharacter {
        /// The offending name.
        name: String,
        /// The rejected character.
        character: char,
    },

    /// The name uses a prefix reserved by the store.
    #[error("name {name:?} uses reserved prefix {prefix:?}")]
    ReservedPrefix {
        /// The offending name.
        name: String,
        /// The reserved prefix.
        prefix: &'static str,
    },
}

/// Macro to define a validated, string-backed name type.
///
/// The generated type implements `Clone`, `PartialEq`, `Eq`, `Hash`, `Ord`,
/// `Serialize`/`Deserialize` (as a plain string), `FromStr`, `Display`,
/// `Debug`, `TryFrom<String>`, `Into<String>` and `AsRef<str>`.
macro_rules! name_type {
    ($name:ident, $validate:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a name after validating it.
            ///
            /// # Errors
            ///
            /// Returns a [`NameError`] if the name is rejected.
            pub fn new(value: impl Into<String>) -> Result<Self, NameError> {
                let value = value.into();
                $validate(&value)?;
                Ok(Self(value))
            }

            /// Return the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

fn validate_collection(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if let Some(character) = name.chars().find(|c| matches!(c, '$' | '\0')) {
        return Err(NameError::ForbiddenCharacter {
            name: name.to_string(),
            character,
        });
    }
    if name.starts_with("system.") {
        return Err(NameError::ReservedPrefix {
            name: name.to_string(),
            prefix: "system.",
        });
    }
    Ok(())
}

fn validate_field(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.starts_with('$') {
        return Err(NameError::ReservedPrefix {
            name: name.to_string(),
            prefix: "$",
        });
    }
    if name.contains('\0') {
        return Err(NameError::ForbiddenCharacter {
            name: name.to_string(),
            character: '\0',
        });
    }
    Ok(())
}

name_type!(
    CollectionName,
    validate_collection,
    "The name of a collection in the target database."
);
name_type!(
    FieldName,
    validate_field,
    "The name of a document field covered by an index.\n\nDotted paths are allowed."
);
