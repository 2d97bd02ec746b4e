//! ID generation.
//!
//! Entity rows are keyed by lowercase ULIDs: sortable by creation time
//! and compact as strings. Token identifiers (`jti`) use random UUIDs
//! instead, so token order leaks nothing.

use ulid::Ulid;
use uuid::Uuid;

/// Generator for entity and token identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// New lowercase ULID for an entity row.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// New random UUID v4 for a token's `jti` claim.
    #[must_use]
    pub fn generate_jti(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_are_lowercase_ulids() {
        let id_gen = IdGenerator::new();
        let id = id_gen.generate();
        assert_eq!(id.len(), 26);
        assert_eq!(id, id.to_lowercase());
        assert_ne!(id, id_gen.generate());
    }

    #[test]
    fn test_jtis_are_uuids() {
        let id_gen = IdGenerator::new();
        let jti = id_gen.generate_jti();
        assert_eq!(jti.len(), 36);
        assert_ne!(jti, id_gen.generate_jti());
    }
}
