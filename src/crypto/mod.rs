pub mod password;

pub use password::{generate_salt, generate_session_token, hash_password, verify_password, MIN_PASSWORD_LEN};
