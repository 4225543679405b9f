//! Identifier and token generation.
//!
//! Row ids are lowercase ULIDs: sortable by creation time, 26 characters,
//! safe in URLs. Bearer tokens are random UUIDs with no time component.

use ulid::Ulid;
use uuid::Uuid;

/// Generate a row id.
#[must_use]
pub fn new_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

/// Generate a bearer token.
#[must_use]
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_ulid_shaped() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 26);
        assert_eq!(a, a.to_lowercase());
    }

    #[test]
    fn tokens_have_no_hyphens() {
        let token = new_token();
        assert_eq!(token.len(), 32);
        assert!(!token.contains('-'));
    }
}
