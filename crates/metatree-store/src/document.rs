//! JSON dump of an in-memory store.
//!
//! A [`PacketDocument`] lists registered namespaces and every property tuple
//! with its flags in text form. It is how the CLI and tests persist an
//! [`InMemoryPropertyStore`]; it is not an XMP serialization.

use std::fs;
use std::path::Path;

use metatree_types::{Address, PropertyFlags};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryPropertyStore;
use crate::property::PropertyEntry;
use crate::traits::PropertyStore;

/// A registered namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// A property tuple with flags spelled `NAME|NAME`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub namespace: String,
    pub address: Address,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_flags")]
    pub flags: String,
}

fn default_flags() -> String {
    PropertyFlags::empty().to_text()
}

/// Serializable snapshot of a whole packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketDocument {
    #[serde(default)]
    pub namespaces: Vec<NamespaceRecord>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
}

impl PacketDocument {
    /// Snapshot every namespace and property of `store`.
    pub fn from_store(store: &InMemoryPropertyStore) -> StoreResult<Self> {
        let namespaces = store
            .namespaces()
            .map(|(uri, prefix)| NamespaceRecord {
                uri: uri.to_string(),
                prefix: prefix.map(str::to_string),
            })
            .collect();
        let properties = store
            .enumerate()?
            .into_iter()
            .filter(|entry| !entry.is_schema())
            .map(|entry| PropertyRecord {
                flags: entry.flags.to_text(),
                namespace: entry.namespace,
                address: entry.address,
                value: entry.value,
            })
            .collect();
        Ok(Self {
            namespaces,
            properties,
        })
    }

    /// Rebuild a clean store from this document.
    pub fn into_store(self) -> StoreResult<InMemoryPropertyStore> {
        let mut store = InMemoryPropertyStore::new();
        for ns in self.namespaces {
            store.register_namespace(ns.uri, ns.prefix.as_deref());
        }
        for record in self.properties {
            let flags = PropertyFlags::parse_text(&record.flags)?;
            store.insert(PropertyEntry::new(
                record.namespace,
                record.address,
                record.value,
                flags,
            ));
        }
        Ok(store)
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read a document from a JSON file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write the document as pretty JSON.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "namespaces": [{ "uri": "http://example.com/ns/", "prefix": "ex" }],
        "properties": [
            { "namespace": "http://example.com/ns/", "address": "ex:arr", "flags": "ARRAY|ORDERED" },
            { "namespace": "http://example.com/ns/", "address": "ex:arr[0]", "value": "1" },
            { "namespace": "urn:other", "address": "title", "value": "hi", "flags": "VALUE" }
        ]
    }"#;

    #[test]
    fn parse_and_build_store() {
        let doc = PacketDocument::from_json(JSON).unwrap();
        assert_eq!(doc.properties[1].flags, "VALUE");
        let store = doc.into_store().unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.prefix_for("http://example.com/ns/").unwrap(),
            Some("ex".to_string())
        );
        assert!(store.exists("urn:other", &Address::parse("title").unwrap()).unwrap());
        assert!(!store.is_dirty());
    }

    #[test]
    fn rejects_unknown_flags() {
        let doc = PacketDocument::from_json(
            r#"{ "properties": [{ "namespace": "n", "address": "a", "flags": "WEIRD" }] }"#,
        )
        .unwrap();
        assert!(matches!(doc.into_store(), Err(StoreError::InvalidProperty(_))));
    }

    #[test]
    fn rejects_malformed_addresses() {
        let result = PacketDocument::from_json(
            r#"{ "properties": [{ "namespace": "n", "address": "a//b" }] }"#,
        );
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packet.json");

        let store = PacketDocument::from_json(JSON).unwrap().into_store().unwrap();
        let doc = PacketDocument::from_store(&store).unwrap();
        doc.save(&path).unwrap();

        let loaded = PacketDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.namespaces.len(), 2);
        assert_eq!(loaded.properties.len(), 3);
    }
}
