use std::fmt;

use metatree_types::{Address, Addressed, PropertyFlags, Shape, TypeError};

/// One flat tuple of a store enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyEntry {
    /// URI of the namespace the property belongs to.
    pub namespace: String,
    /// Structural path inside the namespace (empty for declarations).
    pub address: Address,
    /// Raw stored text; empty for containers.
    pub value: String,
    /// What the tuple describes.
    pub flags: PropertyFlags,
}

impl PropertyEntry {
    pub fn new(
        namespace: impl Into<String>,
        address: Address,
        value: impl Into<String>,
        flags: PropertyFlags,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            address,
            value: value.into(),
            flags,
        }
    }

    /// A namespace declaration tuple.
    pub fn schema(namespace: impl Into<String>) -> Self {
        Self::new(namespace, Address::root(), "", PropertyFlags::SCHEMA)
    }

    pub fn is_schema(&self) -> bool {
        self.flags.is_schema()
    }

    pub fn shape(&self) -> Result<Shape, TypeError> {
        self.flags.shape()
    }

    pub fn is_container(&self) -> bool {
        self.flags
            .intersects(PropertyFlags::STRUCT | PropertyFlags::ARRAY)
    }

    /// The tuple as `(namespace, address, value, flags)`.
    pub fn as_tuple(&self) -> (&str, &Address, &str, PropertyFlags) {
        (&self.namespace, &self.address, &self.value, self.flags)
    }
}

impl Addressed for PropertyEntry {
    fn namespace_uri(&self) -> &str {
        &self.namespace
    }

    fn address(&self) -> &Address {
        &self.address
    }
}

impl fmt::Display for PropertyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if !self.value.is_empty() {
            write!(f, " = {}", self.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_empty_values() {
        let value = PropertyEntry::new("ns", Address::parse("a/b").unwrap(), "x", PropertyFlags::empty());
        assert_eq!(value.to_string(), "a/b = x");
        let container = PropertyEntry::new("ns", Address::parse("a").unwrap(), "", PropertyFlags::STRUCT);
        assert_eq!(container.to_string(), "a");
        assert!(container.is_container());
        assert!(!value.is_container());
    }

    #[test]
    fn schema_entries() {
        let schema = PropertyEntry::schema("http://example.com/ns/");
        assert!(schema.is_schema());
        assert!(schema.address.is_root());
    }
}
