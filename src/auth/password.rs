use super::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a plain-text password with bcrypt.
///
/// This is CPU-bound; call it from `web::block` inside handlers.
pub fn hash_password(plain_text: &str, cost: u32) -> Result<String, AuthError> {
    let length = plain_text.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }

    bcrypt::hash(plain_text, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a password against a stored hash; malformed hashes never verify
pub fn verify_password(plain_text: &str, hash: &str) -> bool {
    bcrypt::verify(plain_text, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the tests fast
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery", TEST_COST).unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(hash_password("short", TEST_COST), Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_garbage_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
