//! Advisory-lock key derivation shared by the Postgres store.
//!
//! Postgres advisory locks are keyed by a signed 64-bit integer. We derive
//! that key by hashing the opaque id so callers never have to think about
//! collisions between the user-lock and event-lock namespaces -- each gets
//! its own hash seed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const USER_LOCK_NAMESPACE: &str = "user";
const EVENT_LOCK_NAMESPACE: &str = "event";

fn hash_with_namespace(id: &str, namespace: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    namespace.hash(&mut hasher);
    id.hash(&mut hasher);
    hasher.finish() as i64
}

/// Advisory-lock key for a user id. Distinct from [`event_lock_key`] even
/// for the same raw id string, since the two locks guard unrelated
/// invariants and must never alias.
pub fn user_lock_key(user_id: &str) -> i64 {
    hash_with_namespace(user_id, USER_LOCK_NAMESPACE)
}

/// Advisory-lock key for an event id.
pub fn event_lock_key(event_id: &str) -> i64 {
    hash_with_namespace(event_id, EVENT_LOCK_NAMESPACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_hashes_differently_across_namespaces() {
        let id = "abcdefghijklmnopqrstuvwx";
        assert_ne!(user_lock_key(id), event_lock_key(id));
    }

    #[test]
    fn hash_is_deterministic() {
        let id = "abcdefghijklmnopqrstuvwx";
        assert_eq!(user_lock_key(id), user_lock_key(id));
    }
}
