//! Typed identifier newtypes backed by opaque strings.
//!
//! Collaborators name devices and lights however they like
//! (`device_tracker.phone`, `light.porch`, a MAC address, …), so ids are
//! kept verbatim and only checked for emptiness.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $kind:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an id, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::EmptyId`] when `raw` is blank.
            pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(ValidationError::EmptyId { kind: $kind });
                }
                Ok(Self(raw))
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a presence-tracked device (phone, tag, …).
    DeviceId,
    "device"
);

define_id!(
    /// Identifier of a managed light.
    LightId,
    "light"
);
