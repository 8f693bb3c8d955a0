use argon2::Argon2;
use crate::error::AppError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Generate a cryptographically secure random salt
pub fn generate_salt() -> [u8; 32] {
    rand::thread_rng().gen()
}

/// Hash a password with Argon2id using the provided salt
pub fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; 32], AppError> {
    let argon2 = Argon2::default();
    let mut hash = [0u8; 32];

    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| AppError::Crypto(format!("Password hashing failed: {}", e)))?;

    Ok(hash)
}

/// Verify a password against a stored hash and salt
pub fn verify_password(password: &str, stored_hash: &[u8], salt: &[u8]) -> Result<bool, AppError> {
    let computed_hash = hash_password(password, salt)?;

    Ok(bool::from(computed_hash.as_slice().ct_eq(stored_hash)))
}

/// Random opaque bearer token for a session
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify() {
        let password = "test_password_123";
        let salt = generate_salt();

        let hash = hash_password(password, &salt).unwrap();
        assert!(verify_password(password, &hash, &salt).unwrap());
        assert!(!verify_password("wrong_password", &hash, &salt).unwrap());
    }

    #[test]
    fn test_truncated_hash_never_verifies() {
        let salt = generate_salt();
        let hash = hash_password("hunter22", &salt).unwrap();
        assert!(!verify_password("hunter22", &hash[..16], &salt).unwrap());
        assert!(!verify_password("hunter22", &[], &salt).unwrap());
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), 48);
        assert_ne!(a, b);
    }
}
