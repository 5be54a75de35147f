//! Shared upstream proxy entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of upstream proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    Residential,
    Datacenter,
    Mobile,
    Isp,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Residential => "residential",
            ProxyType::Datacenter => "datacenter",
            ProxyType::Mobile => "mobile",
            ProxyType::Isp => "isp",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "residential" => Ok(ProxyType::Residential),
            "datacenter" => Ok(ProxyType::Datacenter),
            "mobile" => Ok(ProxyType::Mobile),
            "isp" => Ok(ProxyType::Isp),
            other => Err(format!("unknown proxy type '{}'", other)),
        }
    }
}

/// One upstream proxy that can be shared by up to `max_users` users.
///
/// Invariant: `current_users <= max_users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolEntry {
    pub id: u64,
    pub proxy_type: ProxyType,
    pub ip_address: String,
    pub port: u16,
    pub country: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
    /// Capacity: how many users may be bound to this entry.
    pub max_users: u32,
    /// Current load.
    pub current_users: u32,
    pub last_used: Option<DateTime<Utc>>,
    pub success_rate: f64,
    /// Credentials for the upstream proxy itself, if it requires auth.
    #[serde(default)]
    pub proxy_username: Option<String>,
    #[serde(default)]
    pub proxy_password: Option<String>,
}

impl ProxyPoolEntry {
    /// Build a stored entry from operator input.
    pub fn from_new(id: u64, new: NewPoolEntry) -> Self {
        Self {
            id,
            proxy_type: new.proxy_type,
            ip_address: new.ip_address,
            port: new.port,
            country: new.country,
            city: new.city,
            is_active: new.is_active,
            max_users: new.max_users,
            current_users: 0,
            last_used: None,
            success_rate: 100.0,
            proxy_username: new.proxy_username,
            proxy_password: new.proxy_password,
        }
    }

    /// Active and below capacity.
    pub fn is_available(&self) -> bool {
        self.is_active && self.current_users < self.max_users
    }

    /// Remaining slots, zero when inactive.
    pub fn free_slots(&self) -> u32 {
        if self.is_active {
            self.max_users.saturating_sub(self.current_users)
        } else {
            0
        }
    }

    /// Bind one more user to this entry.
    ///
    /// Returns false (and changes nothing) if the entry is not available.
    pub fn occupy(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_available() {
            return false;
        }
        self.current_users += 1;
        self.last_used = Some(now);
        true
    }

    /// `ip:port` of the upstream.
    pub fn upstream_addr(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }
}

/// Operator-supplied description of a new pool entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoolEntry {
    pub proxy_type: ProxyType,
    pub ip_address: String,
    pub port: u16,
    #[serde(default = "default_country")]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_max_users")]
    pub max_users: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub proxy_username: Option<String>,
    #[serde(default)]
    pub proxy_password: Option<String>,
}

impl NewPoolEntry {
    /// Entry with defaults for everything but type and address.
    pub fn new(proxy_type: ProxyType, ip_address: impl Into<String>, port: u16) -> Self {
        Self {
            proxy_type,
            ip_address: ip_address.into(),
            port,
            country: default_country(),
            city: None,
            max_users: default_max_users(),
            is_active: true,
            proxy_username: None,
            proxy_password: None,
        }
    }

    pub fn with_max_users(mut self, max_users: u32) -> Self {
        self.max_users = max_users;
        self
    }

    pub fn with_location(mut self, country: impl Into<String>, city: Option<String>) -> Self {
        self.country = Some(country.into());
        self.city = city;
        self
    }

    /// Check the fields an operator can get wrong.
    pub fn validate(&self) -> Result<(), String> {
        if self.ip_address.trim().is_empty() {
            return Err("ip_address must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must be non-zero".to_string());
        }
        if self.max_users == 0 {
            return Err("max_users must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_country() -> Option<String> {
    Some("US".to_string())
}

fn default_max_users() -> u32 {
    10
}

fn default_active() -> bool {
    true
}
