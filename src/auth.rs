//! Credential check guarding the forecast command
//!
//! Passwords are never stored; the config holds a salted bcrypt hash and
//! candidates are verified against it.

use crate::{AuthConfig, ForecastError, Result};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Anything able to accept or reject a username/password pair
pub trait Authenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<()>;
}

/// Single-user authenticator backed by a bcrypt password hash
#[derive(Debug, Clone)]
pub struct BcryptAuthenticator {
    username: String,
    password_bcrypt: String,
}

impl BcryptAuthenticator {
    pub fn new(username: impl Into<String>, password_bcrypt: impl Into<String>) -> Self {
        BcryptAuthenticator {
            username: username.into(),
            password_bcrypt: password_bcrypt.into(),
        }
    }

    /// `None` when the config carries no complete credential pair
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        match (&config.username, &config.password_bcrypt) {
            (Some(user), Some(hash)) if !user.is_empty() && !hash.is_empty() => {
                Some(BcryptAuthenticator::new(user.clone(), hash.clone()))
            }
            _ => None,
        }
    }

    /// Salted bcrypt hash of `password` at the given work factor
    pub fn hash(password: &str, cost: u32) -> Result<String> {
        bcrypt::hash(password, cost)
            .map_err(|e| ForecastError::Authentication(format!("Failed to hash password: {}", e)))
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Authenticator for BcryptAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        let verified = username == self.username
            && bcrypt::verify(password, &self.password_bcrypt).map_err(|e| {
                ForecastError::Authentication(format!("Stored password hash is unusable: {}", e))
            })?;

        if verified {
            log::info!("User {} authenticated", username);
            Ok(())
        } else {
            log::warn!("Rejected credentials for user {}", username);
            Err(ForecastError::Authentication(INVALID_CREDENTIALS.to_string()))
        }
    }
}
