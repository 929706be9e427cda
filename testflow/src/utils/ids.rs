//! Identifier generation.

use uuid::Uuid;

/// Generates a time-ordered identifier for envelopes and file snapshots.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_versioned() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(Uuid::parse_str(&a).unwrap().get_version_num(), 7);
    }
}
