//! Bulk pool files.
//!
//! TOML files list entries as `[[proxies]]` tables; JSON files are a bare
//! array of entries. The format is picked from the file extension.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::NewPoolEntry;
use crate::pool::types::PoolError;

#[derive(Deserialize)]
struct PoolFile {
    #[serde(default)]
    proxies: Vec<NewPoolEntry>,
}

/// Read and validate every entry in a pool file.
pub fn load_pool_file(path: &Path) -> Result<Vec<NewPoolEntry>, PoolError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let entries = if is_json {
        parse_json(&content)?
    } else {
        parse_toml(&content)?
    };
    validate_entries(&entries)?;
    Ok(entries)
}

pub fn parse_toml(content: &str) -> Result<Vec<NewPoolEntry>, PoolError> {
    let file: PoolFile = toml::from_str(content).map_err(|e| PoolError::Parse(e.to_string()))?;
    Ok(file.proxies)
}

pub fn parse_json(content: &str) -> Result<Vec<NewPoolEntry>, PoolError> {
    serde_json::from_str(content).map_err(|e| PoolError::Parse(e.to_string()))
}

/// Reject the whole batch on the first bad entry.
pub fn validate_entries(entries: &[NewPoolEntry]) -> Result<(), PoolError> {
    for (index, entry) in entries.iter().enumerate() {
        entry
            .validate()
            .map_err(|reason| PoolError::InvalidEntry { index, reason })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProxyType;

    #[test]
    fn test_parse_toml() {
        let content = r#"
            [[proxies]]
            proxy_type = "residential"
            ip_address = "192.168.1.100"
            port = 8080
            country = "US"
            city = "New York"

            [[proxies]]
            proxy_type = "isp"
            ip_address = "192.168.1.101"
            port = 3128
            max_users = 1
            proxy_username = "up"
            proxy_password = "secret"
        "#;
        let entries = parse_toml(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].city.as_deref(), Some("New York"));
        assert_eq!(entries[0].max_users, 10);
        assert_eq!(entries[1].proxy_type, ProxyType::Isp);
        assert_eq!(entries[1].max_users, 1);
        assert_eq!(entries[1].country.as_deref(), Some("US"));
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn test_parse_json_and_validate() {
        let content = r#"[
            {"proxy_type": "mobile", "ip_address": "10.0.0.1", "port": 1080, "country": "DE"},
            {"proxy_type": "mobile", "ip_address": "10.0.0.2", "port": 1080, "max_users": 0}
        ]"#;
        let entries = parse_json(content).unwrap();
        assert_eq!(entries[0].country.as_deref(), Some("DE"));

        match validate_entries(&entries) {
            Err(PoolError::InvalidEntry { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected invalid entry, got {:?}", other),
        }
    }

    #[test]
    fn test_load_pool_file_by_extension() {
        let path = std::env::temp_dir().join(format!("proxyflow-pool-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"[{"proxy_type": "datacenter", "ip_address": "1.2.3.4", "port": 80}]"#).unwrap();

        let entries = load_pool_file(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].proxy_type, ProxyType::Datacenter);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_unknown_proxy_type_is_parse_error() {
        let content = "[[proxies]]\nproxy_type = \"satellite\"\nip_address = \"1.1.1.1\"\nport = 1\n";
        assert!(matches!(parse_toml(content), Err(PoolError::Parse(_))));
    }
}
