//! Registered users.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const API_KEY_PREFIX: &str = "pk_";
const API_KEY_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const API_KEY_LEN: usize = 32;

/// A user account. The API key doubles as the gateway password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub api_key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Generate a fresh `pk_`-prefixed API key.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..API_KEY_LEN)
        .map(|_| API_KEY_CHARSET[rng.gen_range(0..API_KEY_CHARSET.len())] as char)
        .collect();
    format!("{}{}", API_KEY_PREFIX, body)
}
