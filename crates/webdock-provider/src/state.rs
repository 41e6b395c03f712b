//! Declarative state of managed resources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How to reach a resource over the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
}

/// State of a single resource as the caller records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource id (server slug, `{server_slug}/{id}` for shell users)
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Resource attributes (name, addresses, ...)
    pub attributes: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionInfo>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            attributes: BTreeMap::new(),
            connection: None,
        }
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_connection(mut self, host: impl Into<String>, port: u16) -> Self {
        self.connection = Some(ConnectionInfo {
            host: host.into(),
            port,
        });
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get_attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes() {
        let mut state = ResourceState::new("web01", "server")
            .with_attribute("name", "Web 01")
            .with_attribute("aliases", json!(["web01.vps.webdock.cloud"]));
        state.set_attribute("status", "running");

        assert_eq!(state.get_str("name"), Some("Web 01"));
        assert_eq!(state.get_str("status"), Some("running"));
        assert_eq!(
            state.get_attribute("aliases"),
            Some(&json!(["web01.vps.webdock.cloud"]))
        );
        assert_eq!(state.get_str("missing"), None);
    }

    #[test]
    fn test_serialization_omits_missing_connection() {
        let state = ResourceState::new("11", "public_key").with_attribute("name", "laptop");
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("connection").is_none());

        let state = state.with_connection("203.0.113.10", 22);
        let back: ResourceState =
            serde_json::from_value(serde_json::to_value(&state).unwrap()).unwrap();
        assert_eq!(back.connection.unwrap().port, 22);
    }
}
