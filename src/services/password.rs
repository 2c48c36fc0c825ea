use crate::errors::AuthError;

/// One-way password hashing.
///
/// Hashes are salted, so two hashes of the same password differ; compare
/// only through [`CredentialHasher::matches`].
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Never fails: a malformed stored hash is simply a mismatch.
    fn matches(&self, password: &str, hashed: &str) -> bool;
}

/// Cheapest cost bcrypt accepts.
pub const MIN_BCRYPT_COST: u32 = 4;
/// Most expensive cost bcrypt accepts.
pub const MAX_BCRYPT_COST: u32 = 31;

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn matches(&self, password: &str, hashed: &str) -> bool {
        bcrypt::verify(password, hashed).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(MIN_BCRYPT_COST)
    }

    #[test]
    fn test_hash_then_match() {
        let h = hasher();
        let hashed = h.hash("rahasia").unwrap();
        assert!(h.matches("rahasia", &hashed));
        assert!(!h.matches("Rahasia", &hashed));
    }

    #[test]
    fn test_hashes_are_salted() {
        let h = hasher();
        let a = h.hash("rahasia").unwrap();
        let b = h.hash("rahasia").unwrap();
        // Same length, different bytes
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
        assert!(h.matches("rahasia", &b));
    }

    #[test]
    fn test_garbage_hash_is_mismatch() {
        assert!(!hasher().matches("rahasia", "not-a-bcrypt-hash"));
        assert!(!hasher().matches("rahasia", ""));
    }

    #[test]
    fn test_invalid_cost_is_hashing_error() {
        let err = BcryptHasher::new(99).hash("rahasia").unwrap_err();
        assert!(matches!(err, AuthError::Hashing(_)));
    }
}
