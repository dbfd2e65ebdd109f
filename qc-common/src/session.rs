//! Operator login
//!
//! A [`Session`] is created once the username/PIN pair is verified and is
//! passed to every action that records who did it.

use crate::store::Store;
use crate::{Error, Result};
use tracing::{info, warn};

/// The logged-in operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Recorded as `confirmed_by` when this operator confirms a lot
    pub initials: String,
}

impl Session {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            initials: initials(username),
        }
    }
}

/// First letter of each word, uppercased: "jane q doe" -> "JQD"
pub fn initials(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Verify the username/PIN pair against the store
pub async fn login(store: &Store, username: &str, pin: &str) -> Result<Session> {
    if store.authenticate_user(username, pin).await? {
        let session = Session::new(username);
        info!("{} logged in ({})", session.username, session.initials);
        Ok(session)
    } else {
        warn!("Login failed for {}", username);
        Err(Error::AuthFailed)
    }
}
