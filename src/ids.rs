//! Opaque identifier newtypes
//!
//! Event, bet and user ids are CHAR(24) opaque strings in the schema (spec
//! §6). Wrapping them keeps admission/cancellation/matching signatures from
//! accepting an id of the wrong entity by accident, the way the teacher
//! keeps `Uuid` for every id but distinguishes them solely by field name --
//! here we go one step further since three different opaque strings would
//! otherwise be interchangeable at the type level.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const ID_LEN: usize = 24;
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

fn generate_opaque_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(generate_opaque_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(EventId);
opaque_id!(BetId);
opaque_id!(UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_24_chars() {
        let id = EventId::new();
        assert_eq!(id.as_str().len(), ID_LEN);
    }

    #[test]
    fn ids_of_different_kinds_do_not_coerce() {
        let event_id = EventId::from("evt_12345678901234567890");
        let bet_id = BetId::from(event_id.as_str().to_string());
        assert_eq!(event_id.as_str(), bet_id.as_str());
        // Compiles only because conversion is explicit -- EventId and BetId
        // remain distinct types, so admission/cancellation signatures can't
        // silently swap them.
    }
}
