//! Opaque 128-bit identifiers shared across the engine.
//!
//! Every id in the data model (project, artifact, review) is a UUIDv4,
//! matching spec.md §3's "all identifiers are opaque 128-bit values."

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Parse an id from its string form.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }
    };
}

id_type!(ProjectId, "Identifies a Project.");
id_type!(ArtifactId, "Identifies a StageArtifact.");
id_type!(ReviewId, "Identifies a Review.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_display_and_parse() {
        let id = ArtifactId::new();
        let parsed = ArtifactId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_are_not_equal() {
        assert_ne!(ProjectId::new(), ProjectId::new());
    }
}
