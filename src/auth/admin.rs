//! Admin PIN verification and the elevated-session cache.
//!
//! The session store only saves the admin from re-typing the PIN in the
//! dashboard; it is not a security boundary. Every admin-tagged request
//! still carries the raw PIN in the x-admin-pin header and the server
//! re-validates it there. The PIN is a bearer credential with no expiry
//! or rotation, which is a documented weakness of this design.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

/// Sessions expire 24 hours after the PIN was last verified.
pub const SESSION_TTL_HOURS: i64 = 24;

pub fn verify_admin_pin(supplied: &str, configured: &str) -> bool {
    supplied == configured
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AdminSession {
    pub fn anonymous() -> Self {
        Self {
            is_admin: false,
            token: None,
        }
    }
}

/// Tracks minted admin session tokens and their creation instants.
/// Expiry is checked at the point of use against a caller-supplied `now`
/// rather than ambient state, so tests can simulate elapsed time.
#[derive(Debug, Default)]
pub struct AdminSessionStore {
    sessions: HashMap<String, DateTime<Utc>>,
}

impl AdminSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the PIN and mint a session token. Returns None (and changes
    /// nothing) on a wrong PIN.
    pub fn set(&mut self, pin: &str, configured_pin: &str, now: DateTime<Utc>) -> Option<String> {
        if !verify_admin_pin(pin, configured_pin) {
            return None;
        }
        let token = generate_token();
        self.sessions.insert(token.clone(), now);
        Some(token)
    }

    /// Look up a token. Expired or unknown tokens yield an anonymous
    /// session; expired state is cleared as a side effect.
    pub fn get(&mut self, token: &str, now: DateTime<Utc>) -> AdminSession {
        match self.sessions.get(token) {
            Some(created_at) if now - *created_at < Duration::hours(SESSION_TTL_HOURS) => {
                AdminSession {
                    is_admin: true,
                    token: Some(token.to_string()),
                }
            }
            Some(_) => {
                self.sessions.remove(token);
                AdminSession::anonymous()
            }
            None => AdminSession::anonymous(),
        }
    }

    pub fn clear(&mut self, token: &str) {
        self.sessions.remove(token);
    }
}

/// Cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: &str = "correct-pin";

    #[test]
    fn wrong_pin_mints_no_session() {
        let mut store = AdminSessionStore::new();
        let now = Utc::now();
        assert!(store.set("wrong", PIN, now).is_none());
        assert!(!store.get("anything", now).is_admin);
    }

    #[test]
    fn correct_pin_mints_valid_session() {
        let mut store = AdminSessionStore::new();
        let now = Utc::now();
        let token = store.set(PIN, PIN, now).expect("session token");
        let session = store.get(&token, now);
        assert!(session.is_admin);
        assert_eq!(session.token.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn session_valid_just_under_24h() {
        let mut store = AdminSessionStore::new();
        let now = Utc::now();
        let token = store.set(PIN, PIN, now).unwrap();
        let later = now + Duration::hours(SESSION_TTL_HOURS) - Duration::seconds(1);
        assert!(store.get(&token, later).is_admin);
    }

    #[test]
    fn session_expires_after_24h_and_clears_state() {
        let mut store = AdminSessionStore::new();
        let now = Utc::now();
        let token = store.set(PIN, PIN, now).unwrap();
        let later = now + Duration::hours(SESSION_TTL_HOURS);
        assert!(!store.get(&token, later).is_admin);
        // Stale state was removed: even asking again "before" expiry fails.
        assert!(!store.get(&token, now).is_admin);
    }

    #[test]
    fn clear_drops_session() {
        let mut store = AdminSessionStore::new();
        let now = Utc::now();
        let token = store.set(PIN, PIN, now).unwrap();
        store.clear(&token);
        assert!(!store.get(&token, now).is_admin);
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
