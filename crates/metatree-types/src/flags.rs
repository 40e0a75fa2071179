//! Descriptor flags attached to every enumerated property.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

bitflags! {
    /// What kind of property a flat store tuple describes.
    ///
    /// The empty set describes a scalar value and is written `VALUE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u32 {
        /// A namespace declaration rather than a property.
        const SCHEMA = 1 << 0;
        /// A structure of named fields.
        const STRUCT = 1 << 1;
        /// An array-like container (set unless also `ORDERED`).
        const ARRAY = 1 << 2;
        /// Element order of an `ARRAY` is significant.
        const ORDERED = 1 << 3;
    }
}

/// Text form of the empty flag set.
pub const VALUE_FLAG_NAME: &str = "VALUE";

/// The node variant a property maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Value,
    Structure,
    OrderedArray,
    UnorderedSet,
}

impl Shape {
    pub fn is_container(&self) -> bool {
        !matches!(self, Shape::Value)
    }

    /// Whether children of this shape are addressed by `[n]`.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Shape::OrderedArray | Shape::UnorderedSet)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Structure => write!(f, "structure"),
            Self::OrderedArray => write!(f, "array"),
            Self::UnorderedSet => write!(f, "set"),
        }
    }
}

impl PropertyFlags {
    pub fn is_schema(&self) -> bool {
        self.contains(Self::SCHEMA)
    }

    /// Classify the flags into a node shape.
    ///
    /// A property flagged both `STRUCT` and `ARRAY`, or `ORDERED` without
    /// `ARRAY`, is rejected instead of guessed.
    pub fn shape(&self) -> Result<Shape, TypeError> {
        let is_struct = self.contains(Self::STRUCT);
        let is_array = self.contains(Self::ARRAY);
        let is_ordered = self.contains(Self::ORDERED);
        match (is_struct, is_array, is_ordered) {
            (true, true, _) | (_, false, true) => Err(TypeError::ConflictingFlags(self.to_text())),
            (true, false, false) => Ok(Shape::Structure),
            (false, true, true) => Ok(Shape::OrderedArray),
            (false, true, false) => Ok(Shape::UnorderedSet),
            (false, false, false) => Ok(Shape::Value),
        }
    }

    /// The flags a store should record for a freshly created `shape`.
    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Value => Self::empty(),
            Shape::Structure => Self::STRUCT,
            Shape::OrderedArray => Self::ARRAY | Self::ORDERED,
            Shape::UnorderedSet => Self::ARRAY,
        }
    }

    /// Parse `NAME|NAME` text; `VALUE` (or an empty string) is the empty set.
    pub fn parse_text(text: &str) -> Result<Self, TypeError> {
        let mut flags = Self::empty();
        for name in text.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case(VALUE_FLAG_NAME) {
                continue;
            }
            let flag = Self::from_name(&name.to_ascii_uppercase())
                .ok_or_else(|| TypeError::UnknownFlag(name.to_string()))?;
            flags |= flag;
        }
        Ok(flags)
    }

    /// Render as `NAME|NAME`, or `VALUE` for the empty set.
    pub fn to_text(&self) -> String {
        if self.is_empty() {
            return VALUE_FLAG_NAME.to_string();
        }
        self.iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_and_combinations() {
        assert_eq!(PropertyFlags::parse_text("VALUE").unwrap(), PropertyFlags::empty());
        assert_eq!(PropertyFlags::parse_text("").unwrap(), PropertyFlags::empty());
        assert_eq!(
            PropertyFlags::parse_text("ARRAY|ORDERED").unwrap(),
            PropertyFlags::ARRAY | PropertyFlags::ORDERED
        );
        assert_eq!(
            PropertyFlags::parse_text("struct | schema").unwrap(),
            PropertyFlags::STRUCT | PropertyFlags::SCHEMA
        );
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(
            PropertyFlags::parse_text("ARRAY|BOGUS"),
            Err(TypeError::UnknownFlag("BOGUS".into()))
        );
    }

    #[test]
    fn text_form() {
        assert_eq!(PropertyFlags::empty().to_text(), "VALUE");
        assert_eq!((PropertyFlags::ARRAY | PropertyFlags::ORDERED).to_text(), "ARRAY|ORDERED");
    }

    #[test]
    fn shape_dispatch() {
        assert_eq!(PropertyFlags::empty().shape().unwrap(), Shape::Value);
        assert_eq!(PropertyFlags::STRUCT.shape().unwrap(), Shape::Structure);
        assert_eq!(
            (PropertyFlags::ARRAY | PropertyFlags::ORDERED).shape().unwrap(),
            Shape::OrderedArray
        );
        assert_eq!(PropertyFlags::ARRAY.shape().unwrap(), Shape::UnorderedSet);
    }

    #[test]
    fn shape_rejects_conflicts() {
        assert!((PropertyFlags::STRUCT | PropertyFlags::ARRAY).shape().is_err());
        assert!(PropertyFlags::ORDERED.shape().is_err());
    }

    #[test]
    fn for_shape_roundtrips() {
        for shape in [
            Shape::Value,
            Shape::Structure,
            Shape::OrderedArray,
            Shape::UnorderedSet,
        ] {
            assert_eq!(PropertyFlags::for_shape(shape).shape().unwrap(), shape);
        }
    }
}
