//! Structural property addresses.
//!
//! An [`Address`] is a `/`-delimited path inside one namespace. Every segment
//! is a field name optionally followed by one or more `[n]` index suffixes:
//!
//! - `dc:title` -- a top-level field
//! - `ex:person/ex:name` -- a structure field
//! - `ex:tags[2]` -- the third element of an array or set
//! - `ex:faces[0]/ex:box[1]` -- mixed nesting
//!
//! The empty address is the namespace root. Every relation defined here is a
//! pure function of the path strings: the parent of an address can be derived
//! whether or not that parent exists in any store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Separator between structure levels.
pub const FIELD_SEPARATOR: char = '/';

/// Separator between a namespace prefix and a field name.
pub const PREFIX_SEPARATOR: char = ':';

/// A structural path identifying a property within its namespace.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The namespace root (the empty address).
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Parse and validate an address.
    ///
    /// The empty string parses to the root. Otherwise every `/` segment must
    /// be a non-empty field name followed by zero or more `[digits]` suffixes.
    ///
    /// # Examples
    ///
    /// ```
    /// use metatree_types::Address;
    ///
    /// assert!(Address::parse("ex:faces[0]/ex:box").is_ok());
    /// assert!(Address::parse("a//b").is_err());
    /// assert!(Address::parse("[0]").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        for segment in path.split(FIELD_SEPARATOR) {
            validate_segment(segment).map_err(|reason| TypeError::InvalidAddress {
                address: path.to_string(),
                reason,
            })?;
        }
        Ok(Self(path.to_string()))
    }

    /// Returns `true` for the namespace root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last `/` segment, including any index suffix.
    pub fn name(&self) -> &str {
        self.0.rsplit(FIELD_SEPARATOR).next().unwrap_or_default()
    }

    /// True iff the address has no `/` and does not end in `[n]`.
    pub fn is_top_level(&self) -> bool {
        !self.0.contains(FIELD_SEPARATOR) && !self.is_array_element()
    }

    /// True iff the address matches `<base>[<digits>]`.
    pub fn is_array_element(&self) -> bool {
        split_index(&self.0).is_some()
    }

    /// The trailing element index, if this is an array element.
    pub fn index(&self) -> Option<usize> {
        split_index(&self.0).map(|(_, index)| index)
    }

    /// The parent address, or `None` when the parent is the namespace itself.
    ///
    /// Array elements drop their trailing `[n]`; everything else drops the
    /// last `/` segment.
    pub fn parent(&self) -> Option<Address> {
        if self.is_top_level() {
            return None;
        }
        if let Some((base, _)) = split_index(&self.0) {
            return Some(Self(base.to_string()));
        }
        self.0
            .rfind(FIELD_SEPARATOR)
            .map(|at| Self(self.0[..at].to_string()))
    }

    /// Address of the structure field `name` below this address.
    pub fn field(&self, name: &str) -> Address {
        if self.is_root() {
            Self(name.to_string())
        } else {
            Self(format!("{}{FIELD_SEPARATOR}{name}", self.0))
        }
    }

    /// Address of element `index` of the array or set at this address.
    pub fn item(&self, index: usize) -> Address {
        Self(format!("{}[{index}]", self.0))
    }

    /// Resolve `relative` against this address.
    ///
    /// A bare `[n]` is appended without separator; anything else is joined
    /// with `/`. Relative to the root, the relative address is absolute.
    pub fn join(&self, relative: &str) -> Address {
        if self.is_root() {
            Self(relative.to_string())
        } else if split_index(relative).is_some_and(|(base, _)| base.is_empty()) {
            Self(format!("{}{relative}", self.0))
        } else {
            self.field(relative)
        }
    }

    /// True iff `self` lies strictly below `other`.
    ///
    /// The prefix must end on a segment boundary, so `ab` is not below `a`.
    pub fn is_descendant_of(&self, other: &Address) -> bool {
        let Some(delta) = self.0.strip_prefix(other.as_str()) else {
            return false;
        };
        if delta.is_empty() {
            return false;
        }
        other.is_root() || delta.starts_with(FIELD_SEPARATOR) || delta.starts_with('[')
    }

    pub fn is_ancestor_of(&self, other: &Address) -> bool {
        other.is_descendant_of(self)
    }

    /// True iff `self` is exactly one level below `other`.
    ///
    /// One level is either a single `[n]` suffix or a single `/segment`.
    /// Below the root, children are always named fields, never bare indices.
    pub fn is_child_of(&self, other: &Address) -> bool {
        let Some(delta) = self.0.strip_prefix(other.as_str()) else {
            return false;
        };
        if delta.is_empty() {
            return false;
        }
        let indexed = split_index(delta);
        if other.is_root() {
            return indexed.is_none() && !delta.contains(FIELD_SEPARATOR);
        }
        match indexed {
            Some((base, _)) => base.is_empty(),
            None => delta
                .strip_prefix(FIELD_SEPARATOR)
                .is_some_and(|rest| !rest.is_empty() && !rest.contains(FIELD_SEPARATOR)),
        }
    }

    pub fn is_parent_of(&self, other: &Address) -> bool {
        other.is_child_of(self)
    }

    /// Move this address from below `from` to below `to`.
    ///
    /// Returns `None` unless `self` is `from` or lies below it. The root
    /// cannot be moved.
    pub fn rebase(&self, from: &Address, to: &Address) -> Option<Address> {
        if self == from {
            return Some(to.clone());
        }
        if from.is_root() || !self.is_descendant_of(from) {
            return None;
        }
        Some(Self(format!("{}{}", to.0, &self.0[from.0.len()..])))
    }
}

/// Returns `true` if `name` already carries a namespace prefix.
pub fn is_qualified(name: &str) -> bool {
    name.contains(PREFIX_SEPARATOR)
}

/// Prefix `name` with `prefix:` unless it is already qualified.
pub fn qualify(name: &str, prefix: &str) -> String {
    if is_qualified(name) {
        name.to_string()
    } else {
        format!("{prefix}{PREFIX_SEPARATOR}{name}")
    }
}

/// Split `<base>[<digits>]` into its base and index.
fn split_index(path: &str) -> Option<(&str, usize)> {
    let body = path.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&path[..open], digits.parse().ok()?))
}

fn validate_segment(segment: &str) -> Result<(), String> {
    let name_end = segment.find('[').unwrap_or(segment.len());
    let (name, mut suffixes) = segment.split_at(name_end);
    if name.is_empty() {
        return Err("segments must start with a field name".into());
    }
    if name.contains(']') {
        return Err(format!("unbalanced ']' in segment {segment:?}"));
    }
    while !suffixes.is_empty() {
        let close = suffixes
            .find(']')
            .ok_or_else(|| format!("unterminated index in segment {segment:?}"))?;
        let digits = &suffixes[1..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("index must be decimal digits in segment {segment:?}"));
        }
        if digits.parse::<usize>().is_err() {
            return Err(format!("index out of range in segment {segment:?}"));
        }
        suffixes = &suffixes[close + 1..];
        if !suffixes.is_empty() && !suffixes.starts_with('[') {
            return Err(format!("trailing characters after index in segment {segment:?}"));
        }
    }
    Ok(())
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:?})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(path: &str) -> Address {
        Address::parse(path).unwrap()
    }

    #[test]
    fn root_is_empty() {
        let root = Address::root();
        assert!(root.is_root());
        assert_eq!(root.as_str(), "");
        assert_eq!(addr(""), root);
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        assert!(Address::parse("a//b").is_err());
        assert!(Address::parse("/a").is_err());
        assert!(Address::parse("a/").is_err());
        assert!(Address::parse("[0]").is_err());
        assert!(Address::parse("a[x]").is_err());
        assert!(Address::parse("a[1").is_err());
        assert!(Address::parse("a[1]b").is_err());
        assert!(Address::parse("a]").is_err());
        assert!(Address::parse("a[99999999999999999999999]").is_err());
        assert!(Address::parse("a[0]/b[99999999999999999999999]").is_err());
    }

    #[test]
    fn rebase_moves_subtrees() {
        let (from, to) = (addr("arr[2]"), addr("arr[1]"));
        assert_eq!(addr("arr[2]").rebase(&from, &to), Some(addr("arr[1]")));
        assert_eq!(addr("arr[2]/x[0]").rebase(&from, &to), Some(addr("arr[1]/x[0]")));
        assert_eq!(addr("arr[20]").rebase(&from, &to), None);
        assert_eq!(addr("arr").rebase(&from, &to), None);
        assert_eq!(addr("a").rebase(&Address::root(), &to), None);
    }

    #[test]
    fn parse_accepts_nested_indices() {
        assert!(Address::parse("ex:a[0][1]/ex:b").is_ok());
    }

    #[test]
    fn top_level_classification() {
        assert!(addr("a").is_top_level());
        assert!(!addr("a/b").is_top_level());
        assert!(!addr("a[0]").is_top_level());
    }

    #[test]
    fn array_element_classification() {
        assert!(addr("arr[3]").is_array_element());
        assert_eq!(addr("arr[3]").index(), Some(3));
        assert!(addr("arr[3]/x[10]").is_array_element());
        assert_eq!(addr("arr[3]/x[10]").index(), Some(10));
        assert!(!addr("arr[3]/x").is_array_element());
        assert_eq!(addr("arr").index(), None);
    }

    #[test]
    fn parent_of_struct_field_and_element() {
        assert_eq!(addr("a/b/c").parent(), Some(addr("a/b")));
        assert_eq!(addr("a/b[2]").parent(), Some(addr("a/b")));
        assert_eq!(addr("a[0][1]").parent(), Some(addr("a[0]")));
        assert_eq!(addr("a[0]/b").parent(), Some(addr("a[0]")));
        assert_eq!(addr("a").parent(), None);
        assert_eq!(Address::root().parent(), None);
    }

    #[test]
    fn name_is_last_segment() {
        assert_eq!(addr("ex:a/ex:b").name(), "ex:b");
        assert_eq!(addr("ex:a/ex:b[1]").name(), "ex:b[1]");
        assert_eq!(addr("top").name(), "top");
    }

    #[test]
    fn field_item_and_join() {
        let root = Address::root();
        assert_eq!(root.field("a"), addr("a"));
        assert_eq!(addr("a").field("b"), addr("a/b"));
        assert_eq!(addr("a").item(4), addr("a[4]"));
        assert_eq!(root.join("x"), addr("x"));
        assert_eq!(addr("a").join("[2]"), addr("a[2]"));
        assert_eq!(addr("a").join("b"), addr("a/b"));
    }

    #[test]
    fn child_relation() {
        let root = Address::root();
        assert!(addr("a").is_child_of(&root));
        assert!(!addr("a/b").is_child_of(&root));
        assert!(!addr("a[0]").is_child_of(&root));

        assert!(addr("a/b").is_child_of(&addr("a")));
        assert!(addr("a[0]").is_child_of(&addr("a")));
        assert!(!addr("a/b/c").is_child_of(&addr("a")));
        assert!(!addr("a/b[0]").is_child_of(&addr("a")));
        assert!(!addr("ab").is_child_of(&addr("a")));
        assert!(!addr("a[10]").is_child_of(&addr("a[1]")));
        assert!(addr("a[1]/x").is_child_of(&addr("a[1]")));
        assert!(!addr("a").is_child_of(&addr("a")));
    }

    #[test]
    fn descendant_relation() {
        assert!(addr("a/b/c").is_descendant_of(&addr("a")));
        assert!(addr("a[0]/c").is_descendant_of(&addr("a")));
        assert!(addr("a").is_descendant_of(&Address::root()));
        assert!(!addr("a").is_descendant_of(&addr("a")));
        assert!(!addr("ab").is_descendant_of(&addr("a")));
        assert!(addr("a").is_ancestor_of(&addr("a/b")));
    }

    #[test]
    fn qualify_only_unqualified_names() {
        assert_eq!(qualify("title", "dc"), "dc:title");
        assert_eq!(qualify("xmp:title", "dc"), "xmp:title");
        assert!(is_qualified("dc:title"));
    }

    #[test]
    fn serde_validates() {
        let json = serde_json::to_string(&addr("a/b[0]")).unwrap();
        assert_eq!(json, "\"a/b[0]\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr("a/b[0]"));
        assert!(serde_json::from_str::<Address>("\"a//b\"").is_err());
    }

    fn segment() -> impl Strategy<Value = String> {
        ("[a-z]{1,3}(:[a-z]{1,3})?", prop::collection::vec(0usize..20, 0..3)).prop_map(
            |(name, indices)| {
                let mut out = name;
                for index in indices {
                    out.push_str(&format!("[{index}]"));
                }
                out
            },
        )
    }

    fn address() -> impl Strategy<Value = Address> {
        prop::collection::vec(segment(), 1..5).prop_map(|segments| addr(&segments.join("/")))
    }

    proptest! {
        #[test]
        fn child_of_parent(a in address()) {
            match a.parent() {
                Some(parent) => prop_assert!(a.is_child_of(&parent)),
                None => prop_assert!(a.is_child_of(&Address::root())),
            }
        }

        #[test]
        fn child_and_parent_are_inverse(a in address(), b in address()) {
            prop_assert_eq!(a.is_child_of(&b), b.is_parent_of(&a));
        }

        #[test]
        fn children_are_descendants(a in address(), b in address()) {
            if a.is_child_of(&b) {
                prop_assert!(a.is_descendant_of(&b));
            }
        }

        #[test]
        fn descendants_reach_ancestor_through_parents(a in address(), b in address()) {
            let mut reached = false;
            let mut current = a.parent();
            while let Some(p) = current {
                if p == b {
                    reached = true;
                    break;
                }
                current = p.parent();
            }
            prop_assert_eq!(a.is_descendant_of(&b), reached);
        }
    }
}
